use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use kvdb::KvErr;
use matrix::MatErr;
use rand_distr::{NormalError, uniform::Error as UniformError};

/// The result type used in the entire parameters module.
pub type Result<T> = std::result::Result<T, ParamErr>;

/// The parameters module's error type.
#[derive(Debug)]
pub enum ParamErr {
    Mat(MatErr),
    Storage(KvErr),
    Decode(io::Error),
    /// An optimizer payload that doesn't hold what its label promises.
    Payload(String),
    /// A distribution that can't be built from the given arguments.
    Distribution(String),
    InvalidConfig(String),
}

impl Display for ParamErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamErr::Mat(e) => write!(f, "{e}"),
            ParamErr::Storage(e) => write!(f, "storage error: {e}"),
            ParamErr::Decode(e) => write!(f, "parameter codec error: {e}"),
            ParamErr::Payload(details) => write!(f, "invalid payload: {details}"),
            ParamErr::Distribution(details) => write!(f, "invalid distribution: {details}"),
            ParamErr::InvalidConfig(details) => write!(f, "invalid configuration: {details}"),
        }
    }
}

impl Error for ParamErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParamErr::Mat(e) => Some(e),
            ParamErr::Storage(e) => Some(e),
            ParamErr::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MatErr> for ParamErr {
    fn from(value: MatErr) -> Self {
        Self::Mat(value)
    }
}

impl From<KvErr> for ParamErr {
    fn from(value: KvErr) -> Self {
        Self::Storage(value)
    }
}

impl From<io::Error> for ParamErr {
    fn from(value: io::Error) -> Self {
        Self::Decode(value)
    }
}

impl From<NormalError> for ParamErr {
    fn from(value: NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<UniformError> for ParamErr {
    fn from(value: UniformError) -> Self {
        Self::Distribution(value.to_string())
    }
}
