//! Transforms between chunked streams and contiguous buffers.

use std::cmp;
use std::io::Cursor;

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::content::{ByteStream, Content};
use crate::error::Result;

/// Collapses a stream of byte chunks into a single contiguous buffer.
///
/// The buffer grows by capacity doubling, so the total copy work is O(n) for
/// n bytes across all chunks, at the cost of up to 2x peak memory right after
/// a reallocation.
pub struct Concatenation {
    source: ByteStream,
}

impl Concatenation {
    /// Create a concatenation over the given chunk stream.
    pub fn new(source: ByteStream) -> Self {
        Concatenation { source }
    }

    /// Drain the stream and return the accumulated bytes.
    pub async fn concat(mut self) -> Result<Bytes> {
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = self.source.try_next().await? {
            let needed = buffer.len() + chunk.len();
            if needed > buffer.capacity() {
                let mut capacity = cmp::max(buffer.capacity(), 32);
                while capacity < needed {
                    capacity *= 2;
                }
                buffer.reserve_exact(capacity - buffer.len());
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }
}

/// Splits one buffer into successive chunks no larger than a limit.
///
/// Each yielded chunk is a zero-copy slice of the source buffer. The inverse
/// of [`Concatenation`]: concatenating the chunks reproduces the source
/// exactly.
pub struct Splitting {
    source: Bytes,
    limit: usize,
}

impl Splitting {
    /// Create a splitting over `source` with the given maximum chunk size.
    ///
    /// # Panics
    /// Panics if `limit` is zero.
    pub fn new(source: Bytes, limit: usize) -> Self {
        assert!(limit > 0, "chunk size limit must be non-zero");
        Splitting { source, limit }
    }

    /// Turn the chunks into a [`Content`] with known total size.
    pub fn into_content(self) -> Content {
        let size = self.source.len() as u64;
        Content::new(stream::iter(self.map(Ok)).boxed(), Some(size))
    }
}

impl Iterator for Splitting {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.source.is_empty() {
            None
        } else {
            let take = cmp::min(self.limit, self.source.len());
            Some(self.source.split_to(take))
        }
    }
}

/// Extracts the unread portion of a cursor into a fresh buffer.
///
/// With `restore` set, the read position is put back afterward so the cursor
/// can be read again; this supports non-destructive peeks at shared,
/// position-stateful buffers.
pub struct Remaining<'a, T: AsRef<[u8]>> {
    cursor: &'a mut Cursor<T>,
    restore: bool,
}

impl<'a, T: AsRef<[u8]>> Remaining<'a, T> {
    /// Extract the unread bytes, consuming them from the cursor.
    pub fn new(cursor: &'a mut Cursor<T>) -> Self {
        Remaining {
            cursor,
            restore: false,
        }
    }

    /// Extract the unread bytes, restoring the read position afterward.
    pub fn restoring(cursor: &'a mut Cursor<T>) -> Self {
        Remaining {
            cursor,
            restore: true,
        }
    }

    /// Copy out the unread bytes.
    pub fn bytes(self) -> Vec<u8> {
        let data = self.cursor.get_ref().as_ref();
        // Clamp in u64 space first; casting a position past 4 GiB would
        // wrap on 32-bit targets.
        let position = cmp::min(self.cursor.position(), data.len() as u64) as usize;
        let remaining = data[position..].to_vec();
        if !self.restore {
            self.cursor.set_position(data.len() as u64);
        }
        remaining
    }
}
