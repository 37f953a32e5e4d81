use std::fmt;

use bytes::Bytes;
use parking_lot::Mutex;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{Error, Result};
use crate::stream::Concatenation;

/// A stream of byte chunks produced by a [`Content`] subscription.
///
/// The stream is pull-based: no chunk is produced until the consumer polls,
/// which bounds memory when piping large payloads.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// A byte payload as a lazy sequence of chunks with an optional known size.
///
/// Content built from in-memory bytes is *repeatable*: every call to
/// [`Content::stream`] replays the full payload. Content built from a stream
/// is *one-time*: the first subscription takes the stream and every later one
/// fails with [`Error::AlreadyConsumed`]. The distinction exists because live
/// upstream streams genuinely cannot be replayed; reading one twice is a
/// coding error that must surface loudly instead of hanging or yielding
/// nothing.
pub struct Content {
    size: Option<u64>,
    inner: Inner,
}

enum Inner {
    /// Repeatable in-memory payload.
    Bytes(Bytes),
    /// One-shot stream, taken by the first subscriber.
    Stream(Mutex<Option<ByteStream>>),
}

impl Content {
    /// Create content from a chunk stream with an optionally known total size.
    ///
    /// The size should be given whenever the producer can predict it (reading
    /// a file) and omitted otherwise (live network streaming).
    pub fn new<S>(stream: S, size: Option<u64>) -> Self
    where
        S: futures::Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Content {
            size,
            inner: Inner::Stream(Mutex::new(Some(stream.boxed()))),
        }
    }

    /// The empty repeatable content.
    pub fn empty() -> Self {
        Content::from(Bytes::new())
    }

    /// The total size in bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Subscribe to the chunks of this content.
    ///
    /// Repeatable content returns a fresh replay on every call. Stream-backed
    /// content yields its stream exactly once; later calls fail with
    /// [`Error::AlreadyConsumed`].
    pub fn stream(&self) -> Result<ByteStream> {
        match &self.inner {
            Inner::Bytes(bytes) => {
                let chunk = bytes.clone();
                Ok(stream::once(future::ready(Ok(chunk))).boxed())
            }
            Inner::Stream(slot) => slot.lock().take().ok_or(Error::AlreadyConsumed),
        }
    }

    /// Demote this content to a single subscription.
    ///
    /// Wrapping repeatable content makes an accidental second read fail the
    /// same way a live upstream stream would.
    pub fn one_time(self) -> Self {
        let size = self.size;
        match self.inner {
            Inner::Bytes(bytes) => {
                Content::new(stream::once(future::ready(Ok(bytes))), size)
            }
            inner @ Inner::Stream(_) => Content { size, inner },
        }
    }

    /// Drain this content into a single contiguous buffer.
    ///
    /// Consumes a subscription, so on one-time content this can succeed only
    /// once.
    pub async fn bytes(&self) -> Result<Bytes> {
        Concatenation::new(self.stream()?).concat().await
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content {
            size: Some(bytes.len() as u64),
            inner: Inner::Bytes(bytes),
        }
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::from(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Content {
    fn from(bytes: &'static [u8]) -> Self {
        Content::from(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Content {
    fn from(value: &'static str) -> Self {
        Content::from(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::from(Bytes::from(value.into_bytes()))
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            Inner::Bytes(_) => "bytes",
            Inner::Stream(_) => "stream",
        };
        f.debug_struct("Content")
            .field("size", &self.size)
            .field("kind", &kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeatable_content_replays() -> Result<()> {
        let content = Content::from("hello");
        assert_eq!(content.bytes().await?, Bytes::from_static(b"hello"));
        assert_eq!(content.bytes().await?, Bytes::from_static(b"hello"));
        assert_eq!(content.size(), Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn stream_content_yields_once() -> Result<()> {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let content = Content::new(stream::iter(chunks), Some(4));
        assert_eq!(content.bytes().await?, Bytes::from_static(b"abcd"));
        assert!(matches!(content.stream(), Err(Error::AlreadyConsumed)));
        Ok(())
    }

    #[tokio::test]
    async fn one_time_fails_on_second_subscription() -> Result<()> {
        let content = Content::from("payload").one_time();
        assert_eq!(content.bytes().await?, Bytes::from_static(b"payload"));
        assert!(matches!(content.stream(), Err(Error::AlreadyConsumed)));
        Ok(())
    }

    #[test]
    fn unknown_size_is_preserved() {
        let content = Content::new(stream::empty(), None);
        assert_eq!(content.size(), None);
    }
}
