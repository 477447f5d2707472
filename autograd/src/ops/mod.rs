//! The built-in differentiable operations.

mod activation;
mod binary;
mod matmul;
mod reduce;
mod shape;
mod sigmoid;

pub use activation::{ActFn, Activation};
pub use binary::{Add, Prod, Sub};
pub use matmul::Mul;
pub use reduce::{ReduceMean, ReduceSum};
pub use shape::{Reshape, Transpose};
pub use sigmoid::Sigmoid;
