use crate::error::StorageError;
use crate::record::{ObjectRecord, RawRecord};

/// The storage trait for tally object stores.
///
/// ## Enumeration order
///
/// `list_records` returns every object, in whatever order the backend
/// enumerates them. Callers may rely on that order being stable within one
/// run and on nothing more. No filtering happens here.
///
/// ## Raw metadata
///
/// Metadata is stored as serialized JSON text and handed back verbatim.
/// A backend never rejects or repairs a payload on read, so malformed rows
/// written by other tools reach the evaluator untouched.
///
/// ## Batches
///
/// `insert_records` is all-or-nothing: if any record in the batch fails
/// (most commonly a duplicate id) none of the batch is persisted.
pub trait ObjectStore {
    /// Create the objects table if it does not exist. Idempotent.
    fn create_schema(&self) -> Result<(), StorageError>;

    /// Insert a batch of objects atomically. Returns the number inserted.
    ///
    /// Returns `Err(StorageError::DuplicateId)` if an id is already present,
    /// either in the store or earlier in the same batch.
    fn insert_records(&self, records: &[ObjectRecord]) -> Result<usize, StorageError>;

    /// Insert a single object whose metadata text is stored verbatim.
    fn insert_raw(&self, id: &str, name: &str, metadata_raw: &str) -> Result<(), StorageError>;

    /// Every object as `(name, metadata text)`, in enumeration order.
    fn list_records(&self) -> Result<Vec<RawRecord>, StorageError>;

    /// Number of objects currently stored.
    fn count_records(&self) -> Result<usize, StorageError>;
}
