//! State backend trait and error types

use async_trait::async_trait;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another run
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    /// State file is corrupted or written by a newer format
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// The stored state belongs to a different lineage
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage of the state file and its lock
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state; `None` before the first write
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state
    ///
    /// Fails with `LineageMismatch` when the stored state has another
    /// lineage. Callers increment the serial before writing.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire the lock for `operation`, unless an unexpired lock is held
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock acquired by this run
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove the lock with the given ID regardless of its owner
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;
}
