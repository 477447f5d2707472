//! Initial values for new parameters.

mod constant;
mod random;

pub use constant::constant;
pub use random::{kaiming, normal, sample, uniform, xavier_uniform};
