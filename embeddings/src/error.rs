use std::{
    error::Error,
    fmt::{self, Display},
};

use kvdb::KvErr;
use parameters::ParamErr;

/// The result type used in the entire embeddings module.
pub type Result<T> = std::result::Result<T, EmbErr>;

/// The embeddings module's error type.
#[derive(Debug)]
pub enum EmbErr {
    ReadOnly,
    Closed,
    Storage(KvErr),
    Param(ParamErr),
}

impl Display for EmbErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbErr::ReadOnly => write!(f, "embeddings can't be set in read-only mode"),
            EmbErr::Closed => write!(f, "the embedding store has been closed"),
            EmbErr::Storage(e) => write!(f, "storage error: {e}"),
            EmbErr::Param(e) => write!(f, "parameter error: {e}"),
        }
    }
}

impl Error for EmbErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EmbErr::Storage(e) => Some(e),
            EmbErr::Param(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KvErr> for EmbErr {
    fn from(value: KvErr) -> Self {
        Self::Storage(value)
    }
}

impl From<ParamErr> for EmbErr {
    fn from(value: ParamErr) -> Self {
        Self::Param(value)
    }
}
