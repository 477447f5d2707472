use matrix::{Float, Matrix};

use crate::{Function, Result, check_output_grad};

/// Sums every element into a `1x1` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceSum;

/// Averages every element into a `1x1` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceMean;

/// Spreads a scalar gradient over `x`'s shape, scaled by `factor`.
fn broadcast(x: &Matrix, gy: &Matrix, factor: Float) -> Result<Matrix> {
    let g = gy.scalar_value()? * factor;
    let mut gx = Matrix::zeros(x.rows(), x.cols());
    gx.as_mut_slice().fill(g);
    Ok(gx)
}

impl Function for ReduceSum {
    fn name(&self) -> &'static str {
        "reduce_sum"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(Matrix::scalar(xs[0].sum()))
    }

    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        let gx = requires_grad[0].then(|| broadcast(xs[0], gy, 1.)).transpose()?;
        Ok(vec![gx])
    }
}

impl Function for ReduceMean {
    fn name(&self) -> &'static str {
        "reduce_mean"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        let x = xs[0];
        let mean = if x.is_empty() { 0. } else { x.sum() / x.len() as Float };
        Ok(Matrix::scalar(mean))
    }

    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        let x = xs[0];
        let gx = requires_grad[0]
            .then(|| broadcast(x, gy, 1. / x.len().max(1) as Float))
            .transpose()?;

        Ok(vec![gx])
    }
}
