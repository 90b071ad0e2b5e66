//! tally aggregation engine -- accepts the store's raw records plus a
//! policy, produces a compliance verdict.
//!
//! Metadata is read schema-on-read: each payload is parsed as a generic
//! JSON mapping and probed for the discriminator and usage keys. A bad
//! record is logged, recorded as an issue, and skipped; it never stops the
//! rest of the run. The only failure a caller can see is the store's.

pub mod aggregate;
pub mod policy;
pub mod verdict;

pub use aggregate::{aggregate, aggregate_at};
pub use policy::{AggregationPolicy, DEFAULT_ATTRIBUTE_KEY, DEFAULT_DISCRIMINATOR_KEY};
pub use tally_storage::{RawRecord, StorageError};
pub use verdict::{DatasetUsage, IssueKind, RecordIssue, Verdict};

use tally_storage::ObjectStore;

/// Read every record from `store` once and aggregate it under `policy`.
///
/// The store is only borrowed; the caller owns the connection and releases
/// it by dropping the store. Returns `Err` only when the store cannot be
/// queried, in which case no verdict exists.
pub fn check_store<S: ObjectStore + ?Sized>(
    store: &S,
    policy: &AggregationPolicy,
) -> Result<Verdict, StorageError> {
    let records = store.list_records()?;
    tracing::debug!(
        records = records.len(),
        target_type = %policy.target_type,
        "aggregating object store"
    );
    Ok(aggregate(&records, policy))
}
