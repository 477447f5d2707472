use std::ops::{Index, IndexMut};

use ndarray::{Array2, ArrayView2, ArrayViewMut2, linalg};

use crate::{MatErr, Result, pool};

/// The floating point type stored in every matrix.
pub type Float = f32;

/// A dense, row-major, two dimensional matrix.
///
/// The shape of a `Matrix` never changes once created, in-place operations only ever write its
/// contents. A scalar is a `1x1` matrix and a vector is a column (`nx1`) matrix.
#[derive(Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Float>,
}

impl Matrix {
    /// Creates a new zero filled `Matrix` using a buffer from the pool.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows.
    /// * `cols` - The amount of columns.
    ///
    /// # Returns
    /// A new `Matrix` instance.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: pool::acquire(rows * cols),
        }
    }

    /// Creates a new `Matrix` filled with ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        let mut m = Self::zeros(rows, cols);
        m.data.fill(1.);
        m
    }

    /// Creates a new `Matrix` taking ownership of a row-major buffer.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows.
    /// * `cols` - The amount of columns.
    /// * `data` - The row-major elements.
    ///
    /// # Returns
    /// A new `Matrix` or a `SizeMismatch` if `data` doesn't hold `rows * cols` elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Float>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatErr::SizeMismatch {
                got: data.len(),
                expected: rows * cols,
            });
        }

        Ok(Self { rows, cols, data })
    }

    /// Creates a new `Matrix` from a row-major slice, copying it into a pooled buffer.
    pub fn from_slice(rows: usize, cols: usize, data: &[Float]) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatErr::SizeMismatch {
                got: data.len(),
                expected: rows * cols,
            });
        }

        let mut m = Self::zeros(rows, cols);
        m.data.copy_from_slice(data);
        Ok(m)
    }

    /// Creates a new `1x1` matrix.
    pub fn scalar(value: Float) -> Self {
        let mut m = Self::zeros(1, 1);
        m.data[0] = value;
        m
    }

    /// Creates a new column vector holding a copy of `data`.
    pub fn vector(data: &[Float]) -> Self {
        let mut m = Self::zeros(data.len(), 1);
        m.data.copy_from_slice(data);
        m
    }

    /// Creates a new `Matrix` from an `ndarray` array, in logical (row-major) order.
    pub fn from_array(array: &Array2<Float>) -> Self {
        let (rows, cols) = array.dim();
        let mut m = Self::zeros(rows, cols);
        m.data
            .iter_mut()
            .zip(array.iter())
            .for_each(|(dst, &src)| *dst = src);
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the `(rows, cols)` pair of this matrix.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the amount of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims() == (1, 1)
    }

    /// Returns the row-major elements.
    pub fn as_slice(&self) -> &[Float] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Float] {
        &mut self.data
    }

    /// Gives an `ndarray` view over this matrix.
    pub fn view(&self) -> ArrayView2<'_, Float> {
        let shape = (self.rows, self.cols);
        ArrayView2::from_shape(shape, &self.data)
            .unwrap_or_else(|e| unreachable!("buffer doesn't hold {shape:?} elements: {e}"))
    }

    /// Gives a mutable `ndarray` view over this matrix.
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, Float> {
        let shape = (self.rows, self.cols);
        ArrayViewMut2::from_shape(shape, &mut self.data)
            .unwrap_or_else(|e| unreachable!("buffer doesn't hold {shape:?} elements: {e}"))
    }

    /// Copies this matrix into an owned `ndarray` array.
    pub fn to_array(&self) -> Array2<Float> {
        self.view().to_owned()
    }

    /// Returns the only element of a `1x1` matrix.
    ///
    /// # Returns
    /// The scalar value or `NotAScalar` if this matrix isn't `1x1`.
    pub fn scalar_value(&self) -> Result<Float> {
        if !self.is_scalar() {
            return Err(MatErr::NotAScalar { dims: self.dims() });
        }

        Ok(self.data[0])
    }

    /// Adds `other` into `self` element by element.
    ///
    /// # Arguments
    /// * `other` - A matrix of the same shape.
    ///
    /// # Returns
    /// A `ShapeMismatch` if the shapes differ, `self` is left untouched in that case.
    pub fn add_in_place(&mut self, other: &Matrix) -> Result<()> {
        self.zip_in_place("add_in_place", other, |a, b| *a += b)
    }

    /// Subtracts `other` from `self` element by element.
    pub fn sub_in_place(&mut self, other: &Matrix) -> Result<()> {
        self.zip_in_place("sub_in_place", other, |a, b| *a -= b)
    }

    /// Multiplies `self` by `other` element by element.
    pub fn prod_in_place(&mut self, other: &Matrix) -> Result<()> {
        self.zip_in_place("prod_in_place", other, |a, b| *a *= b)
    }

    pub fn scale_in_place(&mut self, factor: Float) {
        self.data.iter_mut().for_each(|x| *x *= factor);
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map("add", other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map("sub", other, |a, b| a - b)
    }

    pub fn prod(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map("prod", other, |a, b| a * b)
    }

    /// Computes the matrix product `self · other`.
    ///
    /// # Returns
    /// A new `rows x other.cols` matrix or a `ShapeMismatch` if the inner dimensions differ.
    pub fn mul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(MatErr::ShapeMismatch {
                op: "mul",
                got: other.dims(),
                expected: (self.cols, other.cols),
            });
        }

        let mut out = Self::zeros(self.rows, other.cols);
        linalg::general_mat_mul(1., &self.view(), &other.view(), 0., &mut out.view_mut());
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Self::zeros(self.cols, self.rows);
        out.view_mut().assign(&self.view().t());
        out
    }

    /// Applies `f` to every element, returning a new matrix of the same shape.
    pub fn map<F>(&self, f: F) -> Matrix
    where
        F: Fn(Float) -> Float,
    {
        let mut out = Self::zeros(self.rows, self.cols);
        out.data
            .iter_mut()
            .zip(&self.data)
            .for_each(|(o, &x)| *o = f(x));
        out
    }

    /// Combines `self` and `other` element by element through `f`.
    ///
    /// # Arguments
    /// * `op` - The name of the calling operation, used for error reporting.
    /// * `other` - A matrix of the same shape.
    /// * `f` - The combining function.
    pub fn zip_map<F>(&self, op: &'static str, other: &Matrix, f: F) -> Result<Matrix>
    where
        F: Fn(Float, Float) -> Float,
    {
        self.check_same_dims(op, other)?;

        let mut out = Self::zeros(self.rows, self.cols);
        out.data
            .iter_mut()
            .zip(self.data.iter().zip(&other.data))
            .for_each(|(o, (&a, &b))| *o = f(a, b));
        Ok(out)
    }

    /// Copies the elements into a new pooled matrix of a different shape.
    ///
    /// # Arguments
    /// * `rows` - The new amount of rows.
    /// * `cols` - The new amount of columns.
    ///
    /// # Returns
    /// The reshaped copy or a `SizeMismatch` if `rows * cols` differs from the element count.
    pub fn reshape(&self, rows: usize, cols: usize) -> Result<Matrix> {
        self.check_len(rows, cols)?;

        let mut out = Self::zeros(rows, cols);
        out.data.copy_from_slice(&self.data);
        Ok(out)
    }

    /// Reinterprets this matrix with a different shape, keeping the same backing buffer.
    pub fn into_shape(self, rows: usize, cols: usize) -> Result<Matrix> {
        self.check_len(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            data: self.data,
        })
    }

    pub fn sum(&self) -> Float {
        self.data.iter().sum()
    }

    /// Whether every element is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| x == 0.)
    }

    /// Gives the backing buffer back to the pool.
    ///
    /// The buffer may be handed to any future matrix, so nothing must keep reading it.
    pub fn release(self) {
        pool::release(self.data);
    }

    fn zip_in_place<F>(&mut self, op: &'static str, other: &Matrix, f: F) -> Result<()>
    where
        F: Fn(&mut Float, Float),
    {
        self.check_same_dims(op, other)?;
        self.data
            .iter_mut()
            .zip(&other.data)
            .for_each(|(a, &b)| f(a, b));
        Ok(())
    }

    fn check_same_dims(&self, op: &'static str, other: &Matrix) -> Result<()> {
        if self.dims() != other.dims() {
            return Err(MatErr::ShapeMismatch {
                op,
                got: other.dims(),
                expected: self.dims(),
            });
        }

        Ok(())
    }

    fn check_len(&self, rows: usize, cols: usize) -> Result<()> {
        if rows * cols != self.len() {
            return Err(MatErr::SizeMismatch {
                got: rows * cols,
                expected: self.len(),
            });
        }

        Ok(())
    }
}

impl Clone for Matrix {
    fn clone(&self) -> Self {
        let mut out = Self::zeros(self.rows, self.cols);
        out.data.copy_from_slice(&self.data);
        out
    }
}

/// An empty `0x0` matrix, it holds no buffer.
impl Default for Matrix {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Float;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        assert!(
            i < self.rows && j < self.cols,
            "index ({i}, {j}) out of bounds for a {}x{} matrix",
            self.rows,
            self.cols
        );
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        assert!(
            i < self.rows && j < self.cols,
            "index ({i}, {j}) out of bounds for a {}x{} matrix",
            self.rows,
            self.cols
        );
        &mut self.data[i * self.cols + j]
    }
}
