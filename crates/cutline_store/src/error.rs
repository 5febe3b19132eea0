use cutline_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session writer has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, StoreError>;
