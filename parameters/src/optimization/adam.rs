use matrix::{Float, MatErr, Matrix};

use super::Optimizer;
use crate::{ParamErr, Payload, Result};

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: Float,
    beta1: Float,
    beta2: Float,
    epsilon: Float,
}

impl Adam {
    /// The payload label, the payload holds the first and second moments and a `1x1` step
    /// counter.
    pub const LABEL: i64 = 2;

    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(learning_rate: Float, beta1: Float, beta2: Float, epsilon: Float) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        }
    }
}

impl Optimizer for Adam {
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
        let data = vec![
            Matrix::zeros(rows, cols),
            Matrix::zeros(rows, cols),
            Matrix::scalar(0.),
        ];

        Payload::new(Self::LABEL, data)
    }

    fn delta(&self, grad: &Matrix, payload: &mut Payload) -> Result<Matrix> {
        let [m, v, t] = payload.data.as_mut_slice() else {
            return Err(ParamErr::Payload(format!(
                "adam expects 3 buffers, got {}",
                payload.data.len()
            )));
        };

        for moment in [&*m, &*v] {
            if moment.dims() != grad.dims() {
                return Err(MatErr::ShapeMismatch {
                    op: "adam",
                    got: grad.dims(),
                    expected: moment.dims(),
                }
                .into());
            }
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
        } = *self;

        let step = t.scalar_value()? + 1.;
        t[(0, 0)] = step;

        let bc1 = 1. - b1.powf(step);
        let bc2 = 1. - b2.powf(step);
        let step_size = lr * (bc2.sqrt() / bc1);

        let mut delta = Matrix::zeros(grad.rows(), grad.cols());
        delta
            .as_mut_slice()
            .iter_mut()
            .zip(grad.as_slice())
            .zip(m.as_mut_slice())
            .zip(v.as_mut_slice())
            .for_each(|(((d, g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g.powi(2);
                *d = step_size * *m / (v.sqrt() + eps);
            });

        Ok(delta)
    }
}
