use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire kvdb module.
pub type Result<T> = std::result::Result<T, KvErr>;

/// The kvdb module's error type.
#[derive(Debug)]
pub enum KvErr {
    Io(io::Error),
    ReadOnly,
    Closed,
    Corrupted(String),
    InvalidConfig(String),
}

impl Display for KvErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvErr::Io(e) => write!(f, "io error: {e}"),
            KvErr::ReadOnly => write!(f, "the store was opened read-only"),
            KvErr::Closed => write!(f, "the store has been closed"),
            KvErr::Corrupted(details) => write!(f, "corrupted store: {details}"),
            KvErr::InvalidConfig(details) => write!(f, "invalid store configuration: {details}"),
        }
    }
}

impl Error for KvErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            KvErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for KvErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
