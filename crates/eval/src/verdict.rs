//! Verdict types produced by one aggregation run.

use serde::Serialize;

/// One record that contributed to the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetUsage {
    pub name: String,
    pub value: f64,
}

/// Why a record was left out of the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The metadata text is not a JSON object.
    MalformedMetadata,
    /// The usage attribute is present but not a number.
    AttributeTypeMismatch,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::MalformedMetadata => "malformed metadata",
            IssueKind::AttributeTypeMismatch => "attribute type mismatch",
        }
    }
}

/// A non-fatal data-quality problem with a single record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssue {
    pub record: String,
    pub kind: IssueKind,
    pub detail: String,
}

/// Structured result of one aggregation run.
///
/// Non-compliance is an ordinary outcome, carried by `is_compliant` and
/// `exceeded_by` rather than by an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// RFC 3339 generation time (UTC).
    pub timestamp: String,
    pub threshold: f64,
    pub target_type: String,
    pub total_usage: f64,
    /// Contributing records, in store enumeration order.
    pub datasets: Vec<DatasetUsage>,
    /// `total_usage <= threshold`.
    pub is_compliant: bool,
    /// `max(0, total_usage - threshold)`.
    pub exceeded_by: f64,
    /// Records skipped because of bad data, in enumeration order.
    pub issues: Vec<RecordIssue>,
}

impl Verdict {
    /// Signed distance to the limit: positive while under it, negative once over.
    pub fn margin(&self) -> f64 {
        self.threshold - self.total_usage
    }

    /// Room left before the limit, never negative.
    pub fn headroom(&self) -> f64 {
        self.margin().max(0.0)
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_compliant {
            "SUCCESS"
        } else {
            "FAILURE"
        }
    }
}
