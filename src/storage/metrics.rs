use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::content::Content;
use crate::error::Result;
use crate::key::Key;
use crate::storage::{Metadata, Storage};

/// A snapshot of the number of operations a [`MeasuredStorage`] has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub exists: u64,
    pub save: u64,
    pub value: u64,
    pub list: u64,
    pub move_value: u64,
    pub delete: u64,
    pub metadata: u64,
}

impl OperationCounts {
    /// Total operations across all kinds.
    pub fn total(&self) -> u64 {
        self.exists
            + self.save
            + self.value
            + self.list
            + self.move_value
            + self.delete
            + self.metadata
    }
}

#[derive(Debug, Default)]
struct Counters {
    exists: AtomicU64,
    save: AtomicU64,
    value: AtomicU64,
    list: AtomicU64,
    move_value: AtomicU64,
    delete: AtomicU64,
    metadata: AtomicU64,
}

/// A [`Storage`] decorator that counts operations.
///
/// Useful for benchmarks and tests that assert how many backend calls a
/// higher-level routine makes. Counts include failed operations; results
/// and errors pass through unchanged. Clones share counters.
#[derive(Debug)]
pub struct MeasuredStorage<S> {
    inner: S,
    counters: Arc<Counters>,
}

impl<S: Storage> MeasuredStorage<S> {
    /// Wrap `inner` so its operations are counted.
    pub fn new(inner: S) -> Self {
        MeasuredStorage {
            inner,
            counters: Arc::new(Counters::default()),
        }
    }

    /// A snapshot of the counts so far.
    pub fn counts(&self) -> OperationCounts {
        OperationCounts {
            exists: self.counters.exists.load(Ordering::Relaxed),
            save: self.counters.save.load(Ordering::Relaxed),
            value: self.counters.value.load(Ordering::Relaxed),
            list: self.counters.list.load(Ordering::Relaxed),
            move_value: self.counters.move_value.load(Ordering::Relaxed),
            delete: self.counters.delete.load(Ordering::Relaxed),
            metadata: self.counters.metadata.load(Ordering::Relaxed),
        }
    }

    /// Unwrap the inner storage.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Storage> Storage for MeasuredStorage<S> {
    async fn exists(&self, key: &Key) -> Result<bool> {
        self.counters.exists.fetch_add(1, Ordering::Relaxed);
        self.inner.exists(key).await
    }

    async fn save(&self, key: &Key, content: Content) -> Result<()> {
        self.counters.save.fetch_add(1, Ordering::Relaxed);
        self.inner.save(key, content).await
    }

    async fn value(&self, key: &Key) -> Result<Content> {
        self.counters.value.fetch_add(1, Ordering::Relaxed);
        self.inner.value(key).await
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<Key>> {
        self.counters.list.fetch_add(1, Ordering::Relaxed);
        self.inner.list(prefix).await
    }

    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()> {
        self.counters.move_value.fetch_add(1, Ordering::Relaxed);
        self.inner.move_value(source, destination).await
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.counters.delete.fetch_add(1, Ordering::Relaxed);
        self.inner.delete(key).await
    }

    async fn metadata(&self, key: &Key) -> Result<Metadata> {
        self.counters.metadata.fetch_add(1, Ordering::Relaxed);
        self.inner.metadata(key).await
    }

    fn identifier(&self) -> String {
        format!("measured [{}]", self.inner.identifier())
    }
}
