//! Error types for the session store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(u64),

    #[error("session {0} already exists")]
    Conflict(u64),

    /// Slot index outside 1..=10. Raised before any statement is issued.
    #[error("metadata slot {0} is out of range (expected 1..=10)")]
    InvalidMetadataSlot(u32),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
