use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use super::{ExponentialDecay, Optimizer, optimize_and_zero_grad};
use crate::{Param, Result};

/// Applies an optimizer to a set of parameters, one step at a time.
#[derive(Debug)]
pub struct Trainer<O: Optimizer> {
    optimizer: O,
    decay: Option<ExponentialDecay>,
    time_step: usize,
}

impl<O: Optimizer> Trainer<O> {
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `optimizer` - The update strategy.
    pub fn new(optimizer: O) -> Self {
        Self {
            optimizer,
            decay: None,
            time_step: 0,
        }
    }

    /// Decays the learning rate on every step, starting from the decay's initial rate.
    pub fn with_decay(mut self, decay: ExponentialDecay) -> Self {
        self.optimizer.set_learning_rate(decay.init());
        self.decay = Some(decay);
        self
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// The amount of steps taken so far.
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Updates every parameter that has an accumulated gradient and then clears it.
    ///
    /// Parameters are updated in parallel, each one under its own lock.
    ///
    /// # Arguments
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// The amount of updated parameters or the first error found.
    pub fn step(&mut self, params: &[Arc<Param>]) -> Result<usize> {
        self.time_step += 1;

        if let Some(decay) = &self.decay {
            let lr = decay.decay(self.optimizer.learning_rate(), self.time_step);
            self.optimizer.set_learning_rate(lr);
        }

        let optimizer = &self.optimizer;
        let stepped: Vec<bool> = params
            .par_iter()
            .map(|param| optimize_and_zero_grad(optimizer, param))
            .collect::<Result<_>>()?;

        let updated = stepped.into_iter().filter(|&s| s).count();
        debug!(
            time_step = self.time_step,
            updated = updated,
            lr = self.optimizer.learning_rate();
            "optimization step done"
        );

        Ok(updated)
    }
}
