//! The storage contract and its backends and decorators.
//!
//! [`Storage`] is the abstract contract: an asynchronous key-value blob
//! store. Two backends are provided out of the box — [`MemoryStorage`] over
//! an ordered in-memory map and [`FileStorage`] over a sandboxed directory
//! tree — plus decorators that compose over any backend: [`SubStorage`]
//! re-maps a key namespace, [`LoggingStorage`] logs operations, and
//! [`MeasuredStorage`] counts them. Implementing the trait is all it takes
//! to add a new backend.

pub use self::file::FileStorage;
pub use self::logging::LoggingStorage;
pub use self::memory::MemoryStorage;
pub use self::metrics::{MeasuredStorage, OperationCounts};
pub use self::storage::{Metadata, Storage};
pub use self::sub::SubStorage;

mod file;
mod logging;
mod memory;
mod metrics;
#[allow(clippy::module_inception)]
mod storage;
mod sub;
