use matrix::{MatErr, Matrix};
use parking_lot::MappedRwLockReadGuard;

use crate::Result;

/// A single differentiable operation.
///
/// Implementors compute an output from the values of their operands and, given the gradient of
/// that output, the gradient contribution of each operand.
pub trait Function: Send {
    /// The name of the operation, used for error reporting.
    fn name(&self) -> &'static str;

    /// The exact amount of operands the operation takes.
    fn arity(&self) -> usize;

    /// Computes the output of the operation.
    ///
    /// # Arguments
    /// * `xs` - The current values of the operands, `arity` of them.
    ///
    /// # Returns
    /// The output value or an error if the operand shapes are incompatible.
    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix>;

    /// Computes the gradient contribution of every operand.
    ///
    /// Implementations must reject a `gy` whose shape differs from `y` (see
    /// [`check_output_grad`]) and must not compute anything for the operands whose
    /// `requires_grad` flag is off, returning `None` in their place.
    ///
    /// # Arguments
    /// * `xs` - The operand values, the same ones used on `forward`.
    /// * `y` - The cached output of `forward`.
    /// * `gy` - The gradient of the output.
    /// * `requires_grad` - Which operands need a gradient.
    ///
    /// # Returns
    /// One optional gradient per operand, in operand order.
    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>>;
}

/// Anything holding a value that can be wrapped into a graph without being copied.
pub trait Parameter: Send + Sync {
    /// Borrows the current value, the parameter can't be mutated while the guard lives.
    ///
    /// The same parameter may be read more than once at the same time, e.g. when it's the
    /// operand of an operation twice.
    fn value(&self) -> MappedRwLockReadGuard<'_, Matrix>;

    fn requires_grad(&self) -> bool;

    /// Accumulates `grad` into the parameter's gradient.
    fn propagate_grad(&self, grad: &Matrix) -> matrix::Result<()>;
}

/// Validates that an incoming output gradient matches the shape of the forward output.
///
/// # Arguments
/// * `op` - The name of the validating operation.
/// * `y` - The forward output.
/// * `gy` - The output gradient.
pub fn check_output_grad(op: &'static str, y: &Matrix, gy: &Matrix) -> Result<()> {
    if y.dims() != gy.dims() {
        return Err(MatErr::ShapeMismatch {
            op,
            got: gy.dims(),
            expected: y.dims(),
        }
        .into());
    }

    Ok(())
}
