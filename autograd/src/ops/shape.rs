use matrix::Matrix;

use crate::{Function, Result, check_output_grad};

/// Reinterprets its operand with new dimensions, preserving row-major element order.
#[derive(Debug, Clone, Copy)]
pub struct Reshape {
    rows: usize,
    cols: usize,
}

impl Reshape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

impl Function for Reshape {
    fn name(&self) -> &'static str {
        "reshape"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].reshape(self.rows, self.cols)?)
    }

    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        let (rows, cols) = xs[0].dims();
        let gx = requires_grad[0].then(|| gy.reshape(rows, cols)).transpose()?;
        Ok(vec![gx])
    }
}

/// Swaps rows and columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transpose;

impl Function for Transpose {
    fn name(&self) -> &'static str {
        "transpose"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].transpose())
    }

    fn backward(
        &self,
        _xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;
        Ok(vec![requires_grad[0].then(|| gy.transpose())])
    }
}
