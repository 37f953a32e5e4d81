use async_trait::async_trait;
use tracing::debug;

use crate::content::Content;
use crate::error::Result;
use crate::key::Key;
use crate::storage::{Metadata, Storage};

/// A [`Storage`] decorator that logs every operation.
///
/// Events go to `tracing` at debug level, tagged with the inner storage's
/// identifier. Results and errors pass through unchanged.
#[derive(Debug)]
pub struct LoggingStorage<S> {
    inner: S,
}

impl<S: Storage> LoggingStorage<S> {
    /// Wrap `inner` so its operations are logged.
    pub fn new(inner: S) -> Self {
        LoggingStorage { inner }
    }

    /// Unwrap the inner storage.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Storage> Storage for LoggingStorage<S> {
    async fn exists(&self, key: &Key) -> Result<bool> {
        let result = self.inner.exists(key).await;
        debug!(storage = %self.inner.identifier(), key = %key, ok = result.is_ok(), "exists");
        result
    }

    async fn save(&self, key: &Key, content: Content) -> Result<()> {
        let size = content.size();
        let result = self.inner.save(key, content).await;
        debug!(
            storage = %self.inner.identifier(),
            key = %key,
            size = ?size,
            ok = result.is_ok(),
            "save",
        );
        result
    }

    async fn value(&self, key: &Key) -> Result<Content> {
        let result = self.inner.value(key).await;
        debug!(storage = %self.inner.identifier(), key = %key, ok = result.is_ok(), "value");
        result
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<Key>> {
        let result = self.inner.list(prefix).await;
        debug!(
            storage = %self.inner.identifier(),
            prefix = %prefix,
            count = result.as_ref().map(Vec::len).unwrap_or(0),
            "list",
        );
        result
    }

    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()> {
        let result = self.inner.move_value(source, destination).await;
        debug!(
            storage = %self.inner.identifier(),
            source = %source,
            destination = %destination,
            ok = result.is_ok(),
            "move",
        );
        result
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        let result = self.inner.delete(key).await;
        debug!(storage = %self.inner.identifier(), key = %key, ok = result.is_ok(), "delete");
        result
    }

    async fn metadata(&self, key: &Key) -> Result<Metadata> {
        let result = self.inner.metadata(key).await;
        debug!(storage = %self.inner.identifier(), key = %key, ok = result.is_ok(), "metadata");
        result
    }

    fn identifier(&self) -> String {
        format!("logging [{}]", self.inner.identifier())
    }
}
