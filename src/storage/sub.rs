use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::content::Content;
use crate::error::Result;
use crate::key::Key;
use crate::lock::{self, StorageLock};
use crate::storage::{Metadata, Storage};

/// A prefix-renaming view over another [`Storage`].
///
/// Every inbound key gets the prefix prepended before delegating; every key
/// in `list` results has the prefix stripped. The view owns no state of its
/// own: it is a bijective renaming, with consistency exactly that of the
/// backing storage. A [`Key::ROOT`] prefix is the identity transform.
///
/// [`Storage::exclusively`] locks the fully-prefixed key against the backing
/// storage, so a wrapped and an unwrapped view of the same storage contend
/// on the same lock.
#[derive(Debug)]
pub struct SubStorage<S> {
    prefix: Key,
    backing: S,
}

impl<S: Storage> SubStorage<S> {
    /// Create a view of `backing` under `prefix`.
    pub fn new(prefix: Key, backing: S) -> Self {
        SubStorage { prefix, backing }
    }

    /// The prefix of this view.
    pub fn prefix(&self) -> &Key {
        &self.prefix
    }

    /// Unwrap the backing storage.
    pub fn into_inner(self) -> S {
        self.backing
    }

    fn prefixed(&self, key: &Key) -> Key {
        self.prefix.join(key)
    }
}

#[async_trait]
impl<S: Storage> Storage for SubStorage<S> {
    async fn exists(&self, key: &Key) -> Result<bool> {
        self.backing.exists(&self.prefixed(key)).await
    }

    async fn save(&self, key: &Key, content: Content) -> Result<()> {
        self.backing.save(&self.prefixed(key), content).await
    }

    async fn value(&self, key: &Key) -> Result<Content> {
        self.backing.value(&self.prefixed(key)).await
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<Key>> {
        let keys = self.backing.list(&self.prefixed(prefix)).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix))
            .collect())
    }

    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()> {
        self.backing
            .move_value(&self.prefixed(source), &self.prefixed(destination))
            .await
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.backing.delete(&self.prefixed(key)).await
    }

    async fn metadata(&self, key: &Key) -> Result<Metadata> {
        self.backing.metadata(&self.prefixed(key)).await
    }

    fn identifier(&self) -> String {
        format!("sub: {} [{}]", self.prefix, self.backing.identifier())
    }

    fn exclusively<'a, T, F>(&'a self, key: &'a Key, operation: F) -> BoxFuture<'a, Result<T>>
    where
        Self: Sized,
        T: Send + 'a,
        F: FnOnce(&'a Self) -> BoxFuture<'a, Result<T>> + Send + 'a,
    {
        Box::pin(async move {
            let lock = StorageLock::new(&self.backing, self.prefixed(key));
            lock::under_lock(&lock, || operation(self)).await
        })
    }
}
