//! Spotform State Management
//!
//! Persists the remote identifier and last known attributes of every managed
//! resource between runs, with a lock file guarding concurrent runs.
//!
//! # Overview
//!
//! - **StateFile**: all managed resources, with a serial and lineage
//! - **StateBackend**: storage of the state file and its lock
//! - **LockInfo**: who holds the lock, for which operation, until when
//!
//! # Example
//!
//! ```ignore
//! use spotform_state::{LocalBackend, StateBackend};
//!
//! let backend = LocalBackend::new();
//! let lock = backend.acquire_lock("apply").await?;
//!
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... apply changes, upsert resources ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//!
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

// Re-export main types for convenience
pub use backend::{BackendError, BackendResult, StateBackend};
pub use backends::LocalBackend;
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
