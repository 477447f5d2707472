use matrix::{Float, Matrix};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::Result;

/// Creates a `rows x cols` matrix sampling every element from `distribution`.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `distribution` - The distribution to sample the elements from.
/// * `rows` - The amount of rows.
/// * `cols` - The amount of columns.
pub fn sample<R, D>(rng: &mut R, distribution: &D, rows: usize, cols: usize) -> Matrix
where
    R: Rng + ?Sized,
    D: Distribution<Float>,
{
    let mut m = Matrix::zeros(rows, cols);
    m.as_mut_slice()
        .iter_mut()
        .for_each(|x| *x = distribution.sample(rng));
    m
}

/// Samples a matrix from a uniform distribution.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `rows`, `cols` - The dimensions of the matrix.
/// * `low` - The inclusive lower limit.
/// * `high` - The exclusive upper limit.
///
/// # Returns
/// An error if the range is invalid (low >= high).
pub fn uniform<R>(rng: &mut R, rows: usize, cols: usize, low: Float, high: Float) -> Result<Matrix>
where
    R: Rng + ?Sized,
{
    let distribution = Uniform::new(low, high)?;
    Ok(sample(rng, &distribution, rows, cols))
}

/// Samples a matrix from a normal distribution.
///
/// # Returns
/// An error if `std_dev` is not a valid standard deviation.
pub fn normal<R>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    mean: Float,
    std_dev: Float,
) -> Result<Matrix>
where
    R: Rng + ?Sized,
{
    let distribution = Normal::new(mean, std_dev)?;
    Ok(sample(rng, &distribution, rows, cols))
}

/// Samples a weight matrix using Xavier uniform initialization.
///
/// The fan in is the amount of columns and the fan out the amount of rows, as the matrix
/// multiplies column vectors.
///
/// # Returns
/// An error if the calculated range is invalid.
pub fn xavier_uniform<R>(rng: &mut R, rows: usize, cols: usize) -> Result<Matrix>
where
    R: Rng + ?Sized,
{
    let range = (6. / (rows + cols) as Float).sqrt();
    uniform(rng, rows, cols, -range, range)
}

/// Samples a weight matrix using Kaiming normal initialization, the fan in is `cols`.
///
/// # Returns
/// An error if the calculated standard deviation is not valid.
pub fn kaiming<R>(rng: &mut R, rows: usize, cols: usize) -> Result<Matrix>
where
    R: Rng + ?Sized,
{
    let std_dev = (2. / cols as Float).sqrt();
    normal(rng, rows, cols, 0., std_dev)
}
