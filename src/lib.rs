//! `stowage` is an asynchronous, backend-agnostic blob storage core.
//!
//! The crate abstracts binary storage behind the [`Storage`] trait:
//! hierarchical [`Key`]s address lazily streamed [`Content`] values, with
//! atomic saves and moves, prefix listing, and per-key exclusive execution.
//! Backends implement the trait once and get namespace composition
//! ([`SubStorage`]), observability decorators, storage-backed locking, and
//! bulk copying for free:
//!
//! - [`MemoryStorage`] holds data in an ordered in-memory map, for tests and
//!   ephemeral caches.
//! - [`FileStorage`] keeps one file per key under a sandboxed root
//!   directory, streaming values of arbitrary size.
//! - [`SubStorage`] presents a prefixed slice of another storage as a
//!   storage of its own.
//! - [`LoggingStorage`] and [`MeasuredStorage`] wrap any backend for
//!   observability.
//! - [`ValuePipeline`] reads a value as a stream, transforms it, and writes
//!   the result back.
//! - [`StorageLock`](lock::StorageLock) serializes read-modify-write
//!   sequences on a key, persisted in the storage itself so it works across
//!   processes sharing a backend.
//!
//! # Examples
//! ```no_run
//! use stowage::{Content, FileStorage, Key, Storage};
//!
//! async fn example() -> stowage::Result<()> {
//!     let storage = FileStorage::new("/var/lib/repo");
//!     let key: Key = "a/b/test.deb".parse()?;
//!
//!     storage.save(&key, Content::from("Hello world!!!")).await?;
//!     let value = storage.value(&key).await?;
//!     assert_eq!(value.bytes().await?.as_ref(), b"Hello world!!!");
//!
//!     for key in storage.list(&Key::ROOT).await? {
//!         println!("{key}");
//!     }
//!     Ok(())
//! }
//! ```

pub use content::{ByteStream, Content};
pub use copy::BulkCopy;
pub use error::{Error, Result};
pub use key::Key;
pub use pipeline::ValuePipeline;
pub use storage::{
    FileStorage, LoggingStorage, MeasuredStorage, MemoryStorage, Metadata, OperationCounts,
    Storage, SubStorage,
};
pub use stream::{Concatenation, Remaining, Splitting};

mod content;
mod copy;
mod error;
mod key;
pub mod lock;
mod pipeline;
pub mod storage;
mod stream;
