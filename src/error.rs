use std::io;
use std::result;

use thiserror::Error as DeriveError;

use crate::key::Key;

/// The error type for storage operations.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// There is no value stored under the key.
    #[error("no value for key `{0}`")]
    NotFound(Key),

    /// A key was constructed from invalid segments or used where it is not allowed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A key resolves to a path outside the storage root.
    #[error("entry path is out of storage: `{0}`")]
    OutOfSandbox(Key),

    /// One-time content was subscribed to more than once.
    #[error("one-time content has already been consumed")]
    AlreadyConsumed,

    /// A lock on the key could not be acquired.
    #[error("failed to acquire lock on `{key}`: {reason}")]
    Locked {
        /// The key the lock is scoped to.
        key: Key,
        /// Why acquisition failed, including competing proposals.
        reason: String,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Return `true` if this error means the requested key was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// The result type for storage operations.
pub type Result<T> = result::Result<T, Error>;
