use std::fmt;

use futures::Future;

use crate::content::{ByteStream, Content};
use crate::error::Result;
use crate::key::Key;
use crate::storage::Storage;

/// Reads a value, transforms it, and writes the result back.
///
/// The pipeline reads the value under the read key (if any), hands its chunk
/// stream to an action, and saves the content the action produces under the
/// write key. Both keys may be the same, which makes this the in-place
/// read-modify-write companion to [`Storage::exclusively`]: run the pipeline
/// inside the exclusive closure to edit a value without racing other
/// writers.
///
/// The action receives `None` when nothing is stored under the read key, so
/// a pipeline can also initialize a missing value.
pub struct ValuePipeline<'a, S: Storage + ?Sized> {
    storage: &'a S,
    read: Key,
    write: Key,
}

impl<'a, S: Storage + ?Sized> ValuePipeline<'a, S> {
    /// Create a pipeline that reads and writes the same key.
    pub fn new(storage: &'a S, key: Key) -> Self {
        ValuePipeline {
            storage,
            read: key.clone(),
            write: key,
        }
    }

    /// Create a pipeline that reads one key and writes another.
    pub fn between(storage: &'a S, read: Key, write: Key) -> Self {
        ValuePipeline {
            storage,
            read,
            write,
        }
    }

    /// Process the value and save the action's output.
    pub async fn process<F, Fut>(&self, action: F) -> Result<()>
    where
        F: FnOnce(Option<ByteStream>) -> Fut + Send,
        Fut: Future<Output = Result<Content>> + Send,
    {
        self.process_with_result(|input| async move { Ok((action(input).await?, ())) })
            .await
    }

    /// Process the value, save the action's output, and return its result.
    pub async fn process_with_result<T, F, Fut>(&self, action: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(Option<ByteStream>) -> Fut + Send,
        Fut: Future<Output = Result<(Content, T)>> + Send,
    {
        let input = if self.storage.exists(&self.read).await? {
            Some(self.storage.value(&self.read).await?.stream()?)
        } else {
            None
        };
        let (output, result) = action(input).await?;
        self.storage.save(&self.write, output).await?;
        Ok(result)
    }
}

impl<S: Storage + ?Sized> fmt::Debug for ValuePipeline<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuePipeline")
            .field("storage", &self.storage.identifier())
            .field("read", &self.read)
            .field("write", &self.write)
            .finish()
    }
}
