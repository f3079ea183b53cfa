use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DexError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("task not found: {0}")]
    NotFound(String),
}

impl DexError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type DexResult<T> = Result<T, DexError>;
