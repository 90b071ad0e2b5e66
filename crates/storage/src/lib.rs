//! Record store access for tally.
//!
//! The store holds catalogued objects, each carrying an opaque JSON metadata
//! payload. Readers get the payload back as raw text; interpreting it is the
//! evaluator's job, not the store's.

pub mod conformance;
mod error;
mod memory;
mod record;
pub mod seed;
mod sqlite;
mod traits;

pub use error::StorageError;
pub use memory::MemoryObjectStore;
pub use record::{ObjectRecord, RawRecord};
pub use sqlite::{SqliteObjectStore, SqliteStoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
pub use traits::ObjectStore;
