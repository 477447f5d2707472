use matrix::{Float, Matrix};

use crate::{Param, Payload, Result};

/// Defines the strategy for updating parameters based on their accumulated gradients.
///
/// An optimizer is stateless with respect to the parameters, whatever it needs to remember
/// between steps lives in the parameter's `Payload`.
pub trait Optimizer: Send + Sync {
    /// The payload label owned by this optimizer.
    fn label(&self) -> i64;

    fn learning_rate(&self) -> Float;

    fn set_learning_rate(&mut self, learning_rate: Float);

    /// Creates the initial payload for a parameter of the given dimensions.
    fn new_payload(&self, dims: (usize, usize)) -> Payload;

    /// Computes the delta to subtract from a parameter.
    ///
    /// # Arguments
    /// * `grad` - The accumulated gradient.
    /// * `payload` - This optimizer's payload for the parameter, updated in place.
    ///
    /// # Returns
    /// The delta or an error if the payload doesn't fit the gradient.
    fn delta(&self, grad: &Matrix, payload: &mut Payload) -> Result<Matrix>;
}

/// Runs one step of `optimizer` over `param`.
///
/// A payload left by a different optimizer is replaced with a fresh one.
///
/// # Returns
/// Whether the parameter had a gradient to optimize with.
pub fn optimize<O>(optimizer: &O, param: &Param) -> Result<bool>
where
    O: Optimizer + ?Sized,
{
    param.optimize_with(|grad, payload| delta(optimizer, grad, payload))
}

/// Like `optimize`, clearing the consumed gradient in the same locked step.
pub fn optimize_and_zero_grad<O>(optimizer: &O, param: &Param) -> Result<bool>
where
    O: Optimizer + ?Sized,
{
    param.optimize_and_zero_grad_with(|grad, payload| delta(optimizer, grad, payload))
}

fn delta<O>(optimizer: &O, grad: &Matrix, payload: &mut Option<Payload>) -> Result<Matrix>
where
    O: Optimizer + ?Sized,
{
    let label = optimizer.label();

    if payload.as_ref().is_some_and(|p| p.label != label) {
        payload.take().into_iter().for_each(Payload::release);
    }

    let payload = payload.get_or_insert_with(|| optimizer.new_payload(grad.dims()));
    optimizer.delta(grad, payload)
}
