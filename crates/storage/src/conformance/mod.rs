//! Conformance test suite for `ObjectStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `ObjectStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Schema**: creation is idempotent and leaves data in place
//! - **Listing**: every object is returned, in insertion order, unfiltered
//! - **Raw metadata**: stored text comes back verbatim, including malformed text
//! - **Errors**: duplicate ids are reported and reject the whole batch
//!
//! # Usage
//!
//! Backend tests call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use tally_storage::conformance::run_conformance_suite;
//!
//! #[test]
//! fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| open_temp_sqlite_store());
//!     assert!(report.is_clean(), "{report}");
//! }
//! ```

use std::fmt;

use serde_json::json;

use crate::record::ObjectRecord;
use crate::ObjectStore;

/// Run each named check against a fresh store from `$factory`.
macro_rules! observe {
    ($area:expr, $factory:expr; $($check:ident),+ $(,)?) => {
        vec![$(
            $crate::conformance::Guarantee::observe($area, stringify!($check), $check($factory))
        ),+]
    };
}

mod error;
mod listing;
mod schema;

/// The part of the store contract a guarantee belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Schema,
    Listing,
    Errors,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Area::Schema => "schema",
            Area::Listing => "listing",
            Area::Errors => "errors",
        })
    }
}

/// One store guarantee and, if the backend broke it, what was observed.
#[derive(Debug, Clone)]
pub struct Guarantee {
    pub area: Area,
    pub name: &'static str,
    pub violation: Option<String>,
}

impl Guarantee {
    fn observe(area: Area, name: &'static str, outcome: Result<(), String>) -> Self {
        Self {
            area,
            name,
            violation: outcome.err(),
        }
    }

    pub fn holds(&self) -> bool {
        self.violation.is_none()
    }
}

/// Every guarantee checked against one backend.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub guarantees: Vec<Guarantee>,
}

impl ConformanceReport {
    pub fn violations(&self) -> impl Iterator<Item = &Guarantee> {
        self.guarantees.iter().filter(|g| !g.holds())
    }

    pub fn is_clean(&self) -> bool {
        self.violations().next().is_none()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let broken: Vec<_> = self.violations().collect();
        writeln!(
            f,
            "{} of {} store guarantees broken",
            broken.len(),
            self.guarantees.len()
        )?;
        for g in broken {
            if let Some(violation) = &g.violation {
                writeln!(f, "  [{}] {}: {}", g.area, g.name, violation)?;
            }
        }
        Ok(())
    }
}

/// Check every store guarantee against the backend built by `factory`.
///
/// `factory` must return a new, empty store on each call; no check sees
/// another's objects.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: ObjectStore,
    F: Fn() -> S,
{
    let mut guarantees = schema::check_schema(&factory);
    guarantees.extend(listing::check_listing(&factory));
    guarantees.extend(error::check_errors(&factory));
    ConformanceReport { guarantees }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_object(id: &str, name: &str, kind: &str) -> ObjectRecord {
    ObjectRecord::new(id, name, json!({ "type": kind }))
}

fn names<S: ObjectStore>(store: &S) -> Result<Vec<String>, String> {
    Ok(store
        .list_records()
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|r| r.name)
        .collect())
}
