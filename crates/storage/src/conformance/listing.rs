use serde_json::json;

use super::{make_object, names, Area, Guarantee};
use crate::record::ObjectRecord;
use crate::ObjectStore;

pub(super) fn check_listing<S, F>(factory: &F) -> Vec<Guarantee>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    observe!(
        Area::Listing, factory;
        insert_returns_batch_size,
        list_preserves_insertion_order,
        list_returns_every_kind,
        metadata_round_trips_as_json_text,
        raw_metadata_is_returned_verbatim,
        list_is_stable_across_calls,
    )
}

fn insert_returns_batch_size<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    let inserted = s
        .insert_records(&[
            make_object("obj-1", "A", "dataset"),
            make_object("obj-2", "B", "dataset"),
        ])
        .map_err(|e| e.to_string())?;
    if inserted != 2 {
        return Err(format!("expected 2 inserted, got {inserted}"));
    }
    let count = s.count_records().map_err(|e| e.to_string())?;
    if count != 2 {
        return Err(format!("expected count 2, got {count}"));
    }
    Ok(())
}

fn list_preserves_insertion_order<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    // Ids deliberately out of lexical order.
    s.insert_records(&[
        make_object("obj-9", "First", "dataset"),
        make_object("obj-1", "Second", "dataset"),
    ])
    .map_err(|e| e.to_string())?;
    s.insert_raw("obj-5", "Third", "{}")
        .map_err(|e| e.to_string())?;
    let listed = names(&s)?;
    if listed != ["First", "Second", "Third"] {
        return Err(format!("unexpected order: {listed:?}"));
    }
    Ok(())
}

fn list_returns_every_kind<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    s.insert_records(&[
        make_object("obj-1", "Data", "dataset"),
        make_object("obj-2", "Tool", "tool"),
        ObjectRecord::new("obj-3", "Untyped", json!({ "status": "draft" })),
    ])
    .map_err(|e| e.to_string())?;
    let listed = names(&s)?;
    if listed.len() != 3 {
        return Err(format!(
            "expected 3 records regardless of kind, got {listed:?}"
        ));
    }
    Ok(())
}

fn metadata_round_trips_as_json_text<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    let metadata = json!({ "type": "dataset", "memory_percent": 12.5, "owner": "team_a" });
    s.insert_records(&[ObjectRecord::new("obj-1", "A", metadata.clone())])
        .map_err(|e| e.to_string())?;
    let listed = s.list_records().map_err(|e| e.to_string())?;
    let raw = &listed
        .first()
        .ok_or_else(|| "expected one record".to_string())?
        .metadata_raw;
    let parsed: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("stored metadata is not JSON: {e}"))?;
    if parsed != metadata {
        return Err(format!("expected {metadata}, got {parsed}"));
    }
    Ok(())
}

fn raw_metadata_is_returned_verbatim<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    let malformed = "{'type': 'dataset', memory_percent: 10";
    s.insert_raw("obj-1", "Broken", malformed)
        .map_err(|e| e.to_string())?;
    let listed = s.list_records().map_err(|e| e.to_string())?;
    match listed.as_slice() {
        [only] if only.name == "Broken" && only.metadata_raw == malformed => Ok(()),
        other => Err(format!("expected verbatim malformed text, got {other:?}")),
    }
}

fn list_is_stable_across_calls<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    s.insert_records(&crate::seed::sample_records())
        .map_err(|e| e.to_string())?;
    let first = s.list_records().map_err(|e| e.to_string())?;
    let second = s.list_records().map_err(|e| e.to_string())?;
    if first != second {
        return Err("two listings of unchanged data differ".to_string());
    }
    Ok(())
}
