use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::content::Content;
use crate::error::Result;
use crate::key::Key;
use crate::lock::{self, StorageLock};

/// Attributes of a stored value.
///
/// Every backend reports the size in bytes; backends with richer native
/// metadata add to it, like the modification time of the file backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    size: u64,
    modified: Option<SystemTime>,
}

impl Metadata {
    /// Create metadata with the given size in bytes.
    pub fn new(size: u64) -> Self {
        Metadata {
            size,
            modified: None,
        }
    }

    /// Attach the last modification time.
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// The size of the value in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The last modification time, if the backend tracks one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// An asynchronous store of binary values addressed by [`Key`].
///
/// Implementations abstract the storage medium: a directory tree, an
/// in-memory map, or a remote object store. Every operation is individually
/// atomic from the caller's perspective; sequences of operations that must
/// not interleave with other writers go through [`Storage::exclusively`].
///
/// Operations on different keys carry no ordering guarantee relative to each
/// other, and concurrent operations on the same key race unless coordinated
/// through [`Storage::exclusively`].
#[async_trait]
pub trait Storage: fmt::Debug + Send + Sync {
    /// Return whether a value is stored under `key`.
    async fn exists(&self, key: &Key) -> Result<bool>;

    /// Persist `content` under `key`, replacing any existing value.
    ///
    /// The content is fully persisted before this returns. On failure no
    /// partially written value is visible under `key`. Saving to
    /// [`Key::ROOT`] fails.
    async fn save(&self, key: &Key, content: Content) -> Result<()>;

    /// Return the value stored under `key`.
    ///
    /// Fails with [`Error::NotFound`] if the key is absent. The returned
    /// content is one-time: reading it twice is a coding error and fails
    /// loudly.
    ///
    /// [`Error::NotFound`]: crate::Error::NotFound
    async fn value(&self, key: &Key) -> Result<Content>;

    /// Return all keys equal to `prefix` or structurally nested under it,
    /// sorted by string form.
    async fn list(&self, prefix: &Key) -> Result<Vec<Key>>;

    /// Move the value under `source` to `destination`, replacing any
    /// existing value there.
    ///
    /// Fails with [`Error::NotFound`] if the source is absent. Atomicity is
    /// per backend: the file backend renames, the in-memory backend swaps
    /// entries under one guard.
    ///
    /// [`Error::NotFound`]: crate::Error::NotFound
    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()>;

    /// Remove the value stored under `key`.
    ///
    /// Fails with [`Error::NotFound`] if the key is absent.
    ///
    /// [`Error::NotFound`]: crate::Error::NotFound
    async fn delete(&self, key: &Key) -> Result<()>;

    /// Return the [`Metadata`] of the value stored under `key`.
    ///
    /// Fails with [`Error::NotFound`] if the key is absent.
    ///
    /// [`Error::NotFound`]: crate::Error::NotFound
    async fn metadata(&self, key: &Key) -> Result<Metadata>;

    /// A human-readable identifier for this storage instance, naming the
    /// backend and enough detail to tell instances apart.
    fn identifier(&self) -> String;

    /// Remove every value under `prefix`, sequentially.
    async fn delete_all(&self, prefix: &Key) -> Result<()> {
        for key in self.list(prefix).await? {
            self.delete(&key).await?;
        }
        Ok(())
    }

    /// Run `operation` while holding a lock scoped to `key`.
    ///
    /// No other `exclusively` call on the same key of the same logical
    /// storage, including one from another process sharing the backend, runs
    /// concurrently. The lock is released whether the operation succeeds or
    /// fails; the operation's error takes precedence over a release error.
    ///
    /// Locks are exact-key-only: a lock on a parent does not conflict with a
    /// lock on a nested key.
    fn exclusively<'a, T, F>(&'a self, key: &'a Key, operation: F) -> BoxFuture<'a, Result<T>>
    where
        Self: Sized,
        T: Send + 'a,
        F: FnOnce(&'a Self) -> BoxFuture<'a, Result<T>> + Send + 'a,
    {
        Box::pin(async move {
            let lock = StorageLock::new(self, key.clone());
            lock::under_lock(&lock, || operation(self)).await
        })
    }
}

// `Storage` stays object-safe for all value operations.
const _: Option<&dyn Storage> = None;

#[async_trait]
impl Storage for Box<dyn Storage> {
    async fn exists(&self, key: &Key) -> Result<bool> {
        self.as_ref().exists(key).await
    }

    async fn save(&self, key: &Key, content: Content) -> Result<()> {
        self.as_ref().save(key, content).await
    }

    async fn value(&self, key: &Key) -> Result<Content> {
        self.as_ref().value(key).await
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<Key>> {
        self.as_ref().list(prefix).await
    }

    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()> {
        self.as_ref().move_value(source, destination).await
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.as_ref().delete(key).await
    }

    async fn metadata(&self, key: &Key) -> Result<Metadata> {
        self.as_ref().metadata(key).await
    }

    fn identifier(&self) -> String {
        self.as_ref().identifier()
    }

    async fn delete_all(&self, prefix: &Key) -> Result<()> {
        self.as_ref().delete_all(prefix).await
    }
}
