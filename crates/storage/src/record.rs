use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// A catalogued object as written by seeding or ingestion.
///
/// `metadata` has no fixed shape. Different kinds of objects carry
/// different keys; only the `type` key is conventional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: String,
    pub name: String,
    pub metadata: serde_json::Value,
    pub description: Option<String>,
    #[serde(default)]
    pub connections: Vec<String>,
}

impl ObjectRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata,
            description: None,
            connections: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_connections<I, S>(mut self, connections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.connections = connections.into_iter().map(Into::into).collect();
        self
    }
}

/// The read projection handed to the evaluator: a name plus the metadata
/// text exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub name: String,
    pub metadata_raw: String,
}

impl RawRecord {
    pub fn new(name: impl Into<String>, metadata_raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata_raw: metadata_raw.into(),
        }
    }
}

/// The stored text forms of an object's JSON columns.
pub(crate) struct EncodedColumns {
    pub metadata: String,
    pub connections: String,
}

impl ObjectRecord {
    pub(crate) fn encode_columns(&self) -> Result<EncodedColumns, StorageError> {
        let metadata = serde_json::to_string(&self.metadata).map_err(|e| self.encode_error(e))?;
        let connections =
            serde_json::to_string(&self.connections).map_err(|e| self.encode_error(e))?;
        Ok(EncodedColumns {
            metadata,
            connections,
        })
    }

    fn encode_error(&self, e: serde_json::Error) -> StorageError {
        StorageError::Serialization {
            id: self.id.clone(),
            reason: e.to_string(),
        }
    }
}
