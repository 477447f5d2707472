use matrix::Float;
use serde::{Deserialize, Serialize};

use crate::{ParamErr, Result};

/// An exponential learning rate decay from `init` down to `final_lr` over `times` steps.
///
/// At step `t` the learning rate becomes `exp(((times - t) * ln(lr) + ln(final_lr)) / (times -
/// t + 1))`, which reaches `final_lr` exactly at `t == times`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecay {
    init: Float,
    #[serde(rename = "final")]
    final_lr: Float,
    times: usize,
}

impl ExponentialDecay {
    /// Creates a new `ExponentialDecay`.
    ///
    /// # Arguments
    /// * `init` - The initial learning rate.
    /// * `final_lr` - The learning rate reached after `times` steps.
    /// * `times` - The amount of decaying steps.
    ///
    /// # Returns
    /// An `InvalidConfig` error if `init` is lower than `final_lr`.
    pub fn new(init: Float, final_lr: Float, times: usize) -> Result<Self> {
        if init < final_lr {
            return Err(ParamErr::InvalidConfig(format!(
                "the initial learning rate {init} is lower than the final one {final_lr}"
            )));
        }

        Ok(Self {
            init,
            final_lr,
            times,
        })
    }

    pub fn init(&self) -> Float {
        self.init
    }

    /// Decays `lr` for the time step `t`, steps start at 1.
    pub fn decay(&self, lr: Float, t: usize) -> Float {
        if t <= 1 || t > self.times || lr <= self.final_lr {
            return lr;
        }

        let remaining = (self.times - t) as f64;
        let lr = (remaining * (lr as f64).ln() + (self.final_lr as f64).ln()) / (remaining + 1.);
        lr.exp() as Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_growing_rates() {
        assert!(matches!(
            ExponentialDecay::new(0.01, 0.1, 10),
            Err(ParamErr::InvalidConfig(_))
        ));
    }

    #[test]
    fn reaches_the_final_rate() {
        const TIMES: usize = 10;
        let decay = ExponentialDecay::new(0.1, 0.001, TIMES).unwrap();

        let mut lr = decay.init();
        let mut previous = lr;
        for t in 1..=TIMES {
            lr = decay.decay(lr, t);
            assert!(lr <= previous);
            previous = lr;
        }

        assert!((lr - 0.001).abs() < 1e-6);
        assert_eq!(decay.decay(lr, TIMES + 1), lr);
    }

    #[test]
    fn first_step_keeps_the_rate() {
        let decay = ExponentialDecay::new(0.1, 0.01, 5).unwrap();
        assert_eq!(decay.decay(0.1, 1), 0.1);
    }

    #[test]
    fn from_json() {
        let json = r#"{ "init": 0.5, "final": 0.05, "times": 100 }"#;
        let decay: ExponentialDecay = serde_json::from_str(json).unwrap();
        assert_eq!(decay, ExponentialDecay::new(0.5, 0.05, 100).unwrap());
    }
}
