use matrix::Matrix;

use crate::{Function, Result, check_output_grad};

/// Matrix product of an `m x k` and a `k x n` operand.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mul;

impl Function for Mul {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].mul(xs[1])?)
    }

    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        // ga = gy * bT, gb = aT * gy
        let ga = requires_grad[0]
            .then(|| {
                let bt = xs[1].transpose();
                let ga = gy.mul(&bt);
                bt.release();
                ga
            })
            .transpose()?;

        let gb = requires_grad[1]
            .then(|| {
                let at = xs[0].transpose();
                let gb = at.mul(gy);
                at.release();
                gb
            })
            .transpose()?;

        Ok(vec![ga, gb])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradients_match_operand_shapes() {
        let a = Matrix::from_slice(2, 3, &[1., 2., 3., 4., 5., 6.]).unwrap();
        let b = Matrix::from_slice(3, 1, &[1., 0., -1.]).unwrap();

        let y = Mul.forward(&[&a, &b]).unwrap();
        assert_eq!(y.dims(), (2, 1));
        assert_eq!(y.as_slice(), [-2., -2.]);

        let gy = Matrix::ones(2, 1);
        let gs = Mul.backward(&[&a, &b], &y, &gy, &[true, true]).unwrap();

        let ga = gs[0].as_ref().unwrap();
        let gb = gs[1].as_ref().unwrap();
        assert_eq!(ga.dims(), (2, 3));
        assert_eq!(ga.as_slice(), [1., 0., -1., 1., 0., -1.]);
        assert_eq!(gb.dims(), (3, 1));
        assert_eq!(gb.as_slice(), [5., 7., 9.]);
    }

    #[test]
    fn inner_dims_must_agree() {
        let a = Matrix::ones(2, 3);
        let b = Matrix::ones(2, 3);
        assert!(Mul.forward(&[&a, &b]).is_err());
    }
}
