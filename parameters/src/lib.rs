//! Trainable parameters, their binary encoding and the algorithms that update them.

mod error;
pub mod initialization;
pub mod optimization;
mod param;
pub mod serializer;

pub use error::{ParamErr, Result};
pub use param::{Param, ParamsType, Payload};
pub use serializer::ParamData;
