use super::{make_object, Area, Guarantee};
use crate::ObjectStore;

pub(super) fn check_schema<S, F>(factory: &F) -> Vec<Guarantee>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    observe!(
        Area::Schema, factory;
        fresh_store_is_empty,
        create_schema_is_idempotent,
        create_schema_keeps_existing_objects,
    )
}

/// A freshly created store lists nothing and counts zero.
fn fresh_store_is_empty<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    let listed = s.list_records().map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err(format!("expected no records, got {}", listed.len()));
    }
    let count = s.count_records().map_err(|e| e.to_string())?;
    if count != 0 {
        return Err(format!("expected count 0, got {count}"));
    }
    Ok(())
}

fn create_schema_is_idempotent<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    s.create_schema().map_err(|e| e.to_string())?;
    s.create_schema().map_err(|e| e.to_string())?;
    Ok(())
}

fn create_schema_keeps_existing_objects<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    s.insert_records(&[make_object("obj-1", "Kept", "dataset")])
        .map_err(|e| e.to_string())?;
    s.create_schema().map_err(|e| e.to_string())?;
    let count = s.count_records().map_err(|e| e.to_string())?;
    if count != 1 {
        return Err(format!(
            "expected 1 object after re-creating schema, got {count}"
        ));
    }
    Ok(())
}
