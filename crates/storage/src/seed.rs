//! Sample catalogue used by `tally init --seed` and by tests.
//!
//! Three datasets (50 + 75 + 40 = 165.0 percent), one tool and one config
//! object that the default policy ignores.

use serde_json::json;

use crate::error::StorageError;
use crate::record::ObjectRecord;
use crate::traits::ObjectStore;

/// Combined `memory_percent` of the `dataset` objects in [`sample_records`].
pub const SAMPLE_DATASET_TOTAL: f64 = 165.0;

pub fn sample_records() -> Vec<ObjectRecord> {
    vec![
        ObjectRecord::new(
            "obj-001",
            "User_Activity_Log",
            json!({"type": "dataset", "memory_percent": 50.0, "owner": "team_a"}),
        )
        .with_description("Logs user activity for auditing.")
        .with_connections(["conn-01"]),
        ObjectRecord::new(
            "obj-002",
            "Product_Catalog",
            json!({"type": "dataset", "memory_percent": 75.0, "owner": "team_b"}),
        )
        .with_description("Current product inventory list.")
        .with_connections(["conn-02", "conn-03"]),
        ObjectRecord::new(
            "obj-003",
            "ETL_Script_V2",
            json!({"type": "tool", "version": "2.1", "dependencies": 3}),
        )
        .with_description("Script for transforming user data.")
        .with_connections(["conn-04"]),
        ObjectRecord::new(
            "obj-004",
            "Sales_Metrics_EU",
            json!({"type": "dataset", "memory_percent": 40.0, "owner": "team_a"}),
        )
        .with_description("European sales performance metrics."),
        ObjectRecord::new(
            "obj-005",
            "App_Config_Dev",
            json!({"type": "config", "status": "draft"}),
        )
        .with_description("Development environment settings.")
        .with_connections(["conn-05"]),
    ]
}

/// Insert [`sample_records`] into `store`. Returns the number inserted.
pub fn seed_sample_data<S: ObjectStore + ?Sized>(store: &S) -> Result<usize, StorageError> {
    let inserted = store.insert_records(&sample_records())?;
    tracing::info!(count = inserted, "inserted sample objects");
    Ok(inserted)
}
