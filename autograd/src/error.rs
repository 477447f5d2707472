use std::{
    error::Error,
    fmt::{self, Display},
};

use matrix::MatErr;

/// The result type used in the entire autograd module.
pub type Result<T> = std::result::Result<T, AgErr>;

/// The autograd module's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgErr {
    Mat(MatErr),
    ArityMismatch {
        op: &'static str,
        got: usize,
        expected: usize,
    },
}

impl Display for AgErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgErr::Mat(e) => write!(f, "{e}"),
            AgErr::ArityMismatch { op, got, expected } => write!(
                f,
                "Operation {op} takes {expected} operand(s), got {got}"
            ),
        }
    }
}

impl Error for AgErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AgErr::Mat(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MatErr> for AgErr {
    fn from(value: MatErr) -> Self {
        Self::Mat(value)
    }
}
