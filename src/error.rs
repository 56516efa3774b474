//! Error taxonomy shared across the daemon.
//!
//! Low-level components (line client, matrix driver, STB queue) fail fast
//! with `Result<_, MvError>`. The reconcilers (matrix manager, volume
//! worker, STB queues) catch these, log them, reset, and keep running —
//! a single bad response from a device should never take the daemon down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MvError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("job failed: {0}")]
    Job(String),
}

impl From<serde_json::Error> for MvError {
    fn from(e: serde_json::Error) -> Self {
        MvError::Config(e.to_string())
    }
}

pub type MvResult<T> = Result<T, MvError>;
