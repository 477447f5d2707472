use matrix::{Float, Matrix};

/// Creates a `rows x cols` matrix with every element set to `value`.
pub fn constant(rows: usize, cols: usize, value: Float) -> Matrix {
    let mut m = Matrix::zeros(rows, cols);
    m.as_mut_slice().fill(value);
    m
}
