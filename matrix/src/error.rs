use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire matrix module.
pub type Result<T> = std::result::Result<T, MatErr>;

/// The matrix module's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatErr {
    ShapeMismatch {
        op: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    SizeMismatch {
        got: usize,
        expected: usize,
    },
    NotAScalar {
        dims: (usize, usize),
    },
}

impl Display for MatErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatErr::ShapeMismatch { op, got, expected } => format!(
                "Incompatible shapes in {op}, got {}x{} and expected {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
            MatErr::SizeMismatch { got, expected } => {
                format!("There's a size mismatch, got {got} elements and expected {expected}")
            }
            MatErr::NotAScalar { dims } => {
                format!("Expected a 1x1 matrix, got {}x{}", dims.0, dims.1)
            }
        };

        write!(f, "{s}")
    }
}

impl Error for MatErr {}
