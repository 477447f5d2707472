use matrix::Matrix;

use crate::{Function, Result, check_output_grad};

/// Element-wise sum of two same-shaped operands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

/// Element-wise difference of two same-shaped operands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;

/// Element-wise (Hadamard) product of two same-shaped operands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prod;

impl Function for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].add(xs[1])?)
    }

    fn backward(
        &self,
        _xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        Ok(requires_grad
            .iter()
            .map(|&rg| rg.then(|| gy.clone()))
            .collect())
    }
}

impl Function for Sub {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].sub(xs[1])?)
    }

    fn backward(
        &self,
        _xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        let ga = requires_grad[0].then(|| gy.clone());
        let gb = requires_grad[1].then(|| gy.map(|g| -g));
        Ok(vec![ga, gb])
    }
}

impl Function for Prod {
    fn name(&self) -> &'static str {
        "prod"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].prod(xs[1])?)
    }

    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        let ga = requires_grad[0].then(|| gy.prod(xs[1])).transpose()?;
        let gb = requires_grad[1].then(|| gy.prod(xs[0])).transpose()?;
        Ok(vec![ga, gb])
    }
}
