use matrix::{Float, Matrix};

use super::Sigmoid;
use crate::{Function, Result, check_output_grad};

/// An element-wise scalar function and its derivative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActFn {
    Identity,
    Sigmoid(Sigmoid),
    Tanh,
    Relu,
    Square,
}

use ActFn::*;

impl ActFn {
    pub fn sigmoid(amp: Float) -> Self {
        Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, x: Float) -> Float {
        match self {
            Identity => x,
            Sigmoid(a) => a.f(x),
            Tanh => x.tanh(),
            Relu => x.max(0.),
            Square => x * x,
        }
    }

    pub fn df(&self, x: Float) -> Float {
        match self {
            Identity => 1.,
            Sigmoid(a) => a.df(x),
            Tanh => 1. - x.tanh().powi(2),
            Relu if x > 0. => 1.,
            Relu => 0.,
            Square => 2. * x,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Identity => "identity",
            Sigmoid(_) => "sigmoid",
            Tanh => "tanh",
            Relu => "relu",
            Square => "square",
        }
    }
}

/// Applies an activation function to every element of its single operand.
#[derive(Debug, Clone, Copy)]
pub struct Activation {
    act_fn: ActFn,
}

impl Activation {
    pub fn new(act_fn: ActFn) -> Self {
        Self { act_fn }
    }
}

impl Function for Activation {
    fn name(&self) -> &'static str {
        self.act_fn.name()
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, xs: &[&Matrix]) -> Result<Matrix> {
        Ok(xs[0].map(|x| self.act_fn.f(x)))
    }

    fn backward(
        &self,
        xs: &[&Matrix],
        y: &Matrix,
        gy: &Matrix,
        requires_grad: &[bool],
    ) -> Result<Vec<Option<Matrix>>> {
        check_output_grad(self.name(), y, gy)?;

        if !requires_grad[0] {
            return Ok(vec![None]);
        }

        let mut gx = xs[0].map(|x| self.act_fn.df(x));
        gx.prod_in_place(gy)?;
        Ok(vec![Some(gx)])
    }
}
