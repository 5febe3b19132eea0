//! `cutline_store`: asynchronous persistence boundary for cutline sessions.

pub mod error;
pub mod writer;

pub use error::{Result, StoreError};
pub use writer::{load_session, FlushOutcome, SessionWriter, WriteStatus};
