use super::{make_object, names, Area, Guarantee};
use crate::{ObjectStore, StorageError};

pub(super) fn check_errors<S, F>(factory: &F) -> Vec<Guarantee>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    observe!(
        Area::Errors, factory;
        duplicate_id_across_batches_is_rejected,
        duplicate_id_within_batch_rejects_whole_batch,
        duplicate_raw_insert_is_rejected,
    )
}

fn expect_duplicate(result: Result<usize, StorageError>, id: &str) -> Result<(), String> {
    match result {
        Err(StorageError::DuplicateId { id: got }) if got == id => Ok(()),
        Err(e) => Err(format!("expected DuplicateId({id}), got {e}")),
        Ok(n) => Err(format!(
            "expected DuplicateId({id}), but {n} records were inserted"
        )),
    }
}

fn duplicate_id_across_batches_is_rejected<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    s.insert_records(&[make_object("obj-1", "Original", "dataset")])
        .map_err(|e| e.to_string())?;
    let result = s.insert_records(&[
        make_object("obj-2", "Fresh", "dataset"),
        make_object("obj-1", "Clash", "dataset"),
    ]);
    expect_duplicate(result, "obj-1")?;
    let listed = names(&s)?;
    if listed != ["Original"] {
        return Err(format!("rejected batch left records behind: {listed:?}"));
    }
    Ok(())
}

fn duplicate_id_within_batch_rejects_whole_batch<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    let result = s.insert_records(&[
        make_object("obj-1", "A", "dataset"),
        make_object("obj-2", "B", "dataset"),
        make_object("obj-1", "C", "dataset"),
    ]);
    expect_duplicate(result, "obj-1")?;
    let count = s.count_records().map_err(|e| e.to_string())?;
    if count != 0 {
        return Err(format!(
            "expected empty store after rejected batch, got {count}"
        ));
    }
    Ok(())
}

fn duplicate_raw_insert_is_rejected<S, F>(factory: &F) -> Result<(), String>
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let s = factory();
    s.insert_raw("obj-1", "A", "{}").map_err(|e| e.to_string())?;
    match s.insert_raw("obj-1", "B", "{}") {
        Err(StorageError::DuplicateId { id }) if id == "obj-1" => Ok(()),
        Err(e) => Err(format!("expected DuplicateId(obj-1), got {e}")),
        Ok(()) => Err("second insert with the same id succeeded".to_string()),
    }
}
