//! Filter-and-sum over raw store records.
//!
//! Per record, in enumeration order:
//! 1. parse the metadata text as a JSON object (else: MalformedMetadata, skip)
//! 2. compare the discriminator with the target type (else: silent skip)
//! 3. read the usage attribute, 0.0 when absent (non-number: AttributeTypeMismatch, skip)
//! 4. add it to the total and record the contribution

use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::policy::AggregationPolicy;
use crate::verdict::{DatasetUsage, IssueKind, RecordIssue, Verdict};
use tally_storage::RawRecord;

/// Aggregate `records` under `policy`, stamping the verdict with the current time.
pub fn aggregate(records: &[RawRecord], policy: &AggregationPolicy) -> Verdict {
    aggregate_at(records, policy, OffsetDateTime::now_utc())
}

/// Aggregate `records` under `policy`, stamping the verdict with `generated_at`.
///
/// Never fails: every per-record problem becomes a [`RecordIssue`].
pub fn aggregate_at(
    records: &[RawRecord],
    policy: &AggregationPolicy,
    generated_at: OffsetDateTime,
) -> Verdict {
    let mut total_usage = 0.0_f64;
    let mut datasets = Vec::new();
    let mut issues = Vec::new();

    for record in records {
        match evaluate_record(record, policy) {
            Outcome::Counted(value) => {
                total_usage += value;
                datasets.push(DatasetUsage {
                    name: record.name.clone(),
                    value,
                });
            }
            Outcome::NotApplicable => {}
            Outcome::Skipped(issue) => {
                tracing::warn!(
                    record = %issue.record,
                    kind = issue.kind.label(),
                    "skipping record: {}",
                    issue.detail
                );
                issues.push(issue);
            }
        }
    }

    let timestamp = generated_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    Verdict {
        timestamp,
        threshold: policy.threshold,
        target_type: policy.target_type.clone(),
        total_usage,
        datasets,
        is_compliant: total_usage <= policy.threshold,
        exceeded_by: (total_usage - policy.threshold).max(0.0),
        issues,
    }
}

enum Outcome {
    Counted(f64),
    NotApplicable,
    Skipped(RecordIssue),
}

fn evaluate_record(record: &RawRecord, policy: &AggregationPolicy) -> Outcome {
    let metadata = match parse_metadata(&record.metadata_raw) {
        Ok(map) => map,
        Err(detail) => {
            return Outcome::Skipped(RecordIssue {
                record: record.name.clone(),
                kind: IssueKind::MalformedMetadata,
                detail,
            });
        }
    };

    // Absent or non-string discriminators never match.
    let matches = metadata
        .get(&policy.discriminator_key)
        .and_then(Value::as_str)
        .is_some_and(|kind| kind == policy.target_type);
    if !matches {
        return Outcome::NotApplicable;
    }

    match metadata.get(&policy.attribute_key) {
        None => Outcome::Counted(0.0),
        Some(value) => match value.as_f64() {
            Some(n) => Outcome::Counted(n),
            None => Outcome::Skipped(RecordIssue {
                record: record.name.clone(),
                kind: IssueKind::AttributeTypeMismatch,
                detail: format!(
                    "'{}' must be a number, got {}",
                    policy.attribute_key,
                    json_type_name(value)
                ),
            }),
        },
    }
}

fn parse_metadata(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "metadata must be a JSON object, got {}",
            json_type_name(&other)
        )),
        Err(e) => Err(format!("metadata is not valid JSON: {e}")),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(name: &str, metadata: Value) -> RawRecord {
        RawRecord::new(name, metadata.to_string())
    }

    fn dataset(name: &str, percent: f64) -> RawRecord {
        rec(name, json!({"type": "dataset", "memory_percent": percent}))
    }

    fn policy(threshold: f64) -> AggregationPolicy {
        AggregationPolicy::new("dataset", threshold)
    }

    #[test]
    fn absent_attribute_counts_as_zero_and_is_listed() {
        let records = vec![
            dataset("A", 10.0),
            rec("NoUsage", json!({"type": "dataset", "owner": "team_c"})),
        ];
        let v = aggregate(&records, &policy(100.0));
        assert_eq!(v.total_usage, 10.0);
        assert_eq!(
            v.datasets,
            vec![
                DatasetUsage {
                    name: "A".into(),
                    value: 10.0,
                },
                DatasetUsage {
                    name: "NoUsage".into(),
                    value: 0.0,
                },
            ]
        );
        assert!(v.issues.is_empty());
    }

    #[test]
    fn string_attribute_is_excluded_not_zeroed() {
        let stringly = json!({"type": "dataset", "memory_percent": "20"});
        let records = vec![dataset("A", 10.0), rec("Stringly", stringly)];
        let v = aggregate(&records, &policy(100.0));
        assert_eq!(v.total_usage, 10.0);
        assert_eq!(v.datasets.len(), 1);
        assert_eq!(v.issues.len(), 1);
        assert_eq!(v.issues[0].record, "Stringly");
        assert_eq!(v.issues[0].kind, IssueKind::AttributeTypeMismatch);
        let detail = &v.issues[0].detail;
        assert!(detail.contains("string"), "{detail}");
    }

    #[test]
    fn null_attribute_is_a_type_mismatch() {
        let nulled = json!({"type": "dataset", "memory_percent": null});
        let records = vec![rec("Nulled", nulled)];
        let v = aggregate(&records, &policy(100.0));
        assert!(v.datasets.is_empty());
        assert_eq!(v.issues[0].kind, IssueKind::AttributeTypeMismatch);
    }

    #[test]
    fn integer_attribute_is_widened() {
        let records = vec![rec("Int", json!({"type": "dataset", "memory_percent": 7}))];
        let v = aggregate(&records, &policy(100.0));
        assert_eq!(v.total_usage, 7.0);
    }

    #[test]
    fn unparseable_metadata_is_reported_and_skipped() {
        let records = vec![RawRecord::new("Broken", "{not json"), dataset("Good", 30.0)];
        let v = aggregate(&records, &policy(100.0));
        assert_eq!(v.total_usage, 30.0);
        assert_eq!(v.issues.len(), 1);
        assert_eq!(v.issues[0].record, "Broken");
        assert_eq!(v.issues[0].kind, IssueKind::MalformedMetadata);
    }

    #[test]
    fn non_object_json_is_malformed() {
        let records = vec![
            RawRecord::new("List", "[1, 2, 3]"),
            RawRecord::new("Null", "null"),
            RawRecord::new("Number", "42"),
        ];
        let v = aggregate(&records, &policy(100.0));
        assert_eq!(v.total_usage, 0.0);
        assert_eq!(v.issues.len(), 3);
        assert!(v
            .issues
            .iter()
            .all(|i| i.kind == IssueKind::MalformedMetadata));
    }

    #[test]
    fn other_kinds_are_skipped_silently() {
        let records = vec![
            rec("Tool", json!({"type": "tool", "memory_percent": 999.0})),
            rec("Untyped", json!({"memory_percent": 5.0})),
            rec("NumericType", json!({"type": 1, "memory_percent": 5.0})),
            // A bad attribute on a non-matching record is not our concern.
            rec("Config", json!({"type": "config", "memory_percent": []})),
        ];
        let v = aggregate(&records, &policy(100.0));
        assert_eq!(v.total_usage, 0.0);
        assert!(v.datasets.is_empty());
        assert!(v.issues.is_empty());
    }

    #[test]
    fn custom_keys_are_honoured() {
        let records = vec![
            rec("A", json!({"kind": "cache", "disk_percent": 12.0})),
            rec("B", json!({"type": "cache", "memory_percent": 99.0})),
        ];
        let p = AggregationPolicy::new("cache", 50.0).with_keys("kind", "disk_percent");
        let v = aggregate(&records, &p);
        assert_eq!(v.total_usage, 12.0);
        assert_eq!(v.datasets[0].name, "A");
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let at = time::macros::datetime!(2025-03-01 12:30:00 UTC);
        let v = aggregate_at(&[], &policy(1.0), at);
        assert_eq!(v.timestamp, "2025-03-01T12:30:00Z");
    }

    #[test]
    fn margin_and_headroom() {
        let v = aggregate(&[dataset("A", 120.0)], &policy(100.0));
        assert_eq!(v.margin(), -20.0);
        assert_eq!(v.headroom(), 0.0);
        assert_eq!(v.exceeded_by, 20.0);
        assert_eq!(v.status_label(), "FAILURE");

        let v = aggregate(&[dataset("A", 60.0)], &policy(100.0));
        assert_eq!(v.margin(), 40.0);
        assert_eq!(v.headroom(), 40.0);
        assert_eq!(v.status_label(), "SUCCESS");
    }

    #[test]
    fn negative_threshold_fails_an_empty_store() {
        let v = aggregate(&[], &policy(-1.0));
        assert!(!v.is_compliant);
        assert_eq!(v.exceeded_by, 1.0);
    }
}
