/// All errors that can be returned by an ObjectStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store could not be opened, created, or queried. Fatal to a run.
    #[error("store unavailable at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    /// A record with this id already exists. The whole batch was rejected.
    #[error("duplicate object id: {id}")]
    DuplicateId { id: String },

    /// A record's metadata or connections could not be serialized for storage.
    #[error("failed to serialize object {id}: {reason}")]
    Serialization { id: String, reason: String },

    /// A backend-specific storage error that happened after the store was opened.
    #[error("storage backend error: {0}")]
    Backend(String),
}
