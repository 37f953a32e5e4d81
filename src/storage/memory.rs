use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::content::Content;
use crate::error::{Error, Result};
use crate::key::Key;
use crate::storage::{Metadata, Storage};

/// A [`Storage`] that holds all data in memory.
///
/// Values live in an ordered map guarded by a read-write lock, so single
/// operations are safe under concurrent use without external coordination.
/// Nothing is stored persistently and data is visible only to the current
/// process; this backend exists for tests and short-lived caches. Clones
/// share the same underlying map.
///
/// `move_value` swaps entries under one write guard rather than renaming,
/// which is atomic with respect to other operations on this storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`.
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, key: &Key) -> Result<bool> {
        Ok(self.data.read().contains_key(&key.to_string()))
    }

    async fn save(&self, key: &Key, content: Content) -> Result<()> {
        if key.is_root() {
            return Err(Error::InvalidKey(String::from("unable to save to root")));
        }
        // Drain fully before touching the map so a failed stream leaves no
        // visible entry.
        let bytes = content.bytes().await?;
        self.data.write().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn value(&self, key: &Key) -> Result<Content> {
        if key.is_root() {
            return Err(Error::InvalidKey(String::from("unable to load from root")));
        }
        let bytes = self
            .data
            .read()
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        Ok(Content::from(bytes).one_time())
    }

    async fn list(&self, prefix: &Key) -> Result<Vec<Key>> {
        let data = self.data.read();
        let start = prefix.to_string();
        let mut keys = Vec::new();
        for name in data.range(start.clone()..).map(|(name, _)| name) {
            if !name.starts_with(&start) {
                break;
            }
            // Matching the string form is necessary but not sufficient:
            // `pref` starts with `pre` yet is not nested under it.
            let key = Key::from_parts(name.split('/').map(str::to_owned).collect());
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn move_value(&self, source: &Key, destination: &Key) -> Result<()> {
        let mut data = self.data.write();
        let bytes = data
            .remove(&source.to_string())
            .ok_or_else(|| Error::NotFound(source.clone()))?;
        data.insert(destination.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.data
            .write()
            .remove(&key.to_string())
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(key.clone()))
    }

    async fn metadata(&self, key: &Key) -> Result<Metadata> {
        self.data
            .read()
            .get(&key.to_string())
            .map(|bytes| Metadata::new(bytes.len() as u64))
            .ok_or_else(|| Error::NotFound(key.clone()))
    }

    fn identifier(&self) -> String {
        String::from("memory")
    }
}
