//! Reverse-mode automatic differentiation over dynamically built graphs.
//!
//! A [`Graph`] is grown one [`Node`] at a time, every node's output is computed as soon as it's
//! appended. [`Graph::backward`] then walks the nodes in reverse creation order accumulating
//! gradients into nodes and, through [`Parameter::propagate_grad`], into wrapped parameters.

pub mod error;
mod function;
mod graph;
pub mod ops;

pub use error::{AgErr, Result};
pub use function::{Function, Parameter, check_output_grad};
pub use graph::{Graph, Node, ValueRef};
