//! Error types and result alias for the globekey crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The key combination is malformed (no modifiers, or the primary
    /// key is itself a modifier).
    #[error("invalid key combination")]
    InvalidValue,
    /// An entry already exists for this combination.
    #[error("an entry already exists for this combination")]
    DuplicateEntry,
    /// No entry exists for this combination.
    #[error("no entry exists for this combination")]
    NotFound,
    /// A mutating call was made while the manager is not running.
    #[error("manager is not running")]
    WrongManagerState,
    /// The call was made from the manager's own worker thread, where it
    /// would deadlock waiting on itself.
    #[error("call not allowed from the worker thread")]
    WrongThread,
    /// The underlying OS call failed; the platform error code is kept
    /// for diagnostics.
    #[error("native hotkey call failed with code {0}")]
    NativeFailure(i32),
    /// The low-level keyboard listener could not be installed.
    #[error("keyboard listener failed to start")]
    ListenerStart,
    /// The worker thread could not be spawned or never became ready.
    #[error("worker thread failed to start: {0}")]
    WorkerStart(String),
}
