use std::cell::RefCell;

use crate::error::StorageError;
use crate::record::{ObjectRecord, RawRecord};
use crate::traits::ObjectStore;

#[derive(Debug, Clone)]
struct StoredObject {
    id: String,
    name: String,
    metadata_raw: String,
}

/// In-process object store. Enumerates objects in insertion order.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RefCell<Vec<StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, id: &str) -> bool {
        self.objects.borrow().iter().any(|o| o.id == id)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn create_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn insert_records(&self, records: &[ObjectRecord]) -> Result<usize, StorageError> {
        // Validate the whole batch before touching the store.
        let mut staged: Vec<StoredObject> = Vec::with_capacity(records.len());
        for record in records {
            if self.contains(&record.id) || staged.iter().any(|o| o.id == record.id) {
                return Err(StorageError::DuplicateId {
                    id: record.id.clone(),
                });
            }
            let columns = record.encode_columns()?;
            staged.push(StoredObject {
                id: record.id.clone(),
                name: record.name.clone(),
                metadata_raw: columns.metadata,
            });
        }
        let count = staged.len();
        self.objects.borrow_mut().extend(staged);
        Ok(count)
    }

    fn insert_raw(&self, id: &str, name: &str, metadata_raw: &str) -> Result<(), StorageError> {
        if self.contains(id) {
            return Err(StorageError::DuplicateId { id: id.to_string() });
        }
        self.objects.borrow_mut().push(StoredObject {
            id: id.to_string(),
            name: name.to_string(),
            metadata_raw: metadata_raw.to_string(),
        });
        Ok(())
    }

    fn list_records(&self) -> Result<Vec<RawRecord>, StorageError> {
        Ok(self
            .objects
            .borrow()
            .iter()
            .map(|o| RawRecord::new(o.name.clone(), o.metadata_raw.clone()))
            .collect())
    }

    fn count_records(&self) -> Result<usize, StorageError> {
        Ok(self.objects.borrow().len())
    }
}
