use matrix::{Float, Matrix};

use super::Optimizer;
use crate::{Payload, Result};

#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: Float,
}

impl GradientDescent {
    /// The payload label of plain gradient descent, it keeps no state.
    pub const LABEL: i64 = 0;

    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: Float) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn label(&self) -> i64 {
        Self::LABEL
    }

    fn learning_rate(&self) -> Float {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: Float) {
        self.learning_rate = learning_rate;
    }

    fn new_payload(&self, _dims: (usize, usize)) -> Payload {
        Payload::default()
    }

    fn delta(&self, grad: &Matrix, _payload: &mut Payload) -> Result<Matrix> {
        let lr = self.learning_rate;
        Ok(grad.map(|g| lr * g))
    }
}
