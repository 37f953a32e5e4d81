use std::fmt;

use futures::future;

use crate::error::Result;
use crate::key::Key;
use crate::storage::Storage;

/// Which keys a [`BulkCopy`] transfers.
enum Selection {
    /// Everything under the source root.
    All,
    /// An explicit list of keys.
    Keys(Vec<Key>),
    /// Every key under the source root matching a predicate.
    Filtered(Box<dyn Fn(&Key) -> bool + Send + Sync>),
}

/// Bulk-copies keys from one [`Storage`] to another.
///
/// Every selected key is read from the source and saved under the same key
/// in the destination. Keys are disjoint and each transfer is self-contained,
/// so all of them run concurrently; the overall copy completes when every
/// transfer completes and fails as soon as any one fails.
pub struct BulkCopy<'a, S: Storage + ?Sized> {
    source: &'a S,
    selection: Selection,
}

impl<'a, S: Storage + ?Sized> BulkCopy<'a, S> {
    /// Copy everything stored in `source`.
    pub fn all(source: &'a S) -> Self {
        BulkCopy {
            source,
            selection: Selection::All,
        }
    }

    /// Copy exactly the given keys.
    pub fn keys(source: &'a S, keys: Vec<Key>) -> Self {
        BulkCopy {
            source,
            selection: Selection::Keys(keys),
        }
    }

    /// Copy every key matching `predicate`.
    pub fn filtered<F>(source: &'a S, predicate: F) -> Self
    where
        F: Fn(&Key) -> bool + Send + Sync + 'static,
    {
        BulkCopy {
            source,
            selection: Selection::Filtered(Box::new(predicate)),
        }
    }

    /// Run the copy into `destination`.
    pub async fn copy_to<D: Storage + ?Sized>(&self, destination: &D) -> Result<()> {
        let keys = match &self.selection {
            Selection::All => self.source.list(&Key::ROOT).await?,
            Selection::Keys(keys) => keys.clone(),
            Selection::Filtered(predicate) => self
                .source
                .list(&Key::ROOT)
                .await?
                .into_iter()
                .filter(|key| predicate(key))
                .collect(),
        };
        future::try_join_all(keys.iter().map(|key| async move {
            let value = self.source.value(key).await?;
            destination.save(key, value).await
        }))
        .await?;
        Ok(())
    }
}

impl<S: Storage + ?Sized> fmt::Debug for BulkCopy<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selection = match &self.selection {
            Selection::All => "all",
            Selection::Keys(_) => "keys",
            Selection::Filtered(_) => "filtered",
        };
        f.debug_struct("BulkCopy")
            .field("source", &self.source.identifier())
            .field("selection", &selection)
            .finish()
    }
}
