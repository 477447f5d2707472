use matrix::{Float, Matrix};

use super::Optimizer;
use crate::{ParamErr, Payload, Result};

#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: Float,
    momentum: Float,
}

impl GradientDescentWithMomentum {
    /// The payload label, the payload holds the velocity.
    pub const LABEL: i64 = 1;

    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(learning_rate: Float, momentum: Float) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn label(&self) -> i64 {
        Self::LABEL
    }

    fn learning_rate(&self) -> Float {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: Float) {
        self.learning_rate = learning_rate;
    }

    fn new_payload(&self, (rows, cols): (usize, usize)) -> Payload {
        Payload::new(Self::LABEL, vec![Matrix::zeros(rows, cols)])
    }

    fn delta(&self, grad: &Matrix, payload: &mut Payload) -> Result<Matrix> {
        let [velocity] = payload.data.as_mut_slice() else {
            return Err(ParamErr::Payload(format!(
                "momentum expects 1 buffer, got {}",
                payload.data.len()
            )));
        };

        let lr = self.learning_rate;
        let mu = self.momentum;

        velocity.scale_in_place(mu);
        velocity.add_in_place(grad)?;
        Ok(velocity.map(|v| lr * v))
    }
}
