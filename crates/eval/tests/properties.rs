//! Property tests for the aggregation engine.

use proptest::prelude::*;
use serde_json::json;
use tally_eval::{aggregate, AggregationPolicy, RawRecord};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// The shape a generated record takes, and what it should contribute.
#[derive(Debug, Clone)]
enum Shape {
    /// Matching kind with a numeric usage.
    Counted(f64),
    /// Matching kind with no usage key.
    NoUsage,
    /// Some other kind.
    OtherKind(f64),
    /// Matching kind whose usage is not a number.
    Mismatched,
    /// Metadata text that does not parse.
    Garbage,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        4 => (0u32..10_000).prop_map(|n| Shape::Counted(f64::from(n) / 4.0)),
        1 => Just(Shape::NoUsage),
        2 => (0u32..10_000).prop_map(|n| Shape::OtherKind(f64::from(n))),
        1 => Just(Shape::Mismatched),
        1 => Just(Shape::Garbage),
    ]
}

fn to_record(i: usize, shape: &Shape) -> RawRecord {
    let name = format!("obj_{i}");
    let raw = match shape {
        Shape::Counted(v) => json!({"type": "dataset", "memory_percent": v}).to_string(),
        Shape::NoUsage => json!({"type": "dataset"}).to_string(),
        Shape::OtherKind(v) => json!({"type": "tool", "memory_percent": v}).to_string(),
        Shape::Mismatched => json!({"type": "dataset", "memory_percent": "n/a"}).to_string(),
        Shape::Garbage => "{\"type\": \"dataset\", ".to_string(),
    };
    RawRecord::new(name, raw)
}

fn arb_records() -> impl Strategy<Value = (Vec<Shape>, Vec<RawRecord>)> {
    prop::collection::vec(arb_shape(), 0..40).prop_map(|shapes| {
        let records = shapes
            .iter()
            .enumerate()
            .map(|(i, s)| to_record(i, s))
            .collect();
        (shapes, records)
    })
}

fn arb_threshold() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        (-1_000i32..1_000).prop_map(f64::from),
        (-100_000i32..100_000).prop_map(|n| f64::from(n) / 8.0),
    ]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn total_is_sum_of_valid_matching_records(
        (shapes, records) in arb_records(),
        threshold in arb_threshold(),
    ) {
        let verdict = aggregate(&records, &AggregationPolicy::new("dataset", threshold));

        let mut expected = 0.0_f64;
        let mut expected_len = 0;
        for shape in &shapes {
            match shape {
                Shape::Counted(v) => { expected += *v; expected_len += 1; }
                Shape::NoUsage => expected_len += 1,
                _ => {}
            }
        }
        prop_assert_eq!(verdict.total_usage, expected);
        prop_assert_eq!(verdict.datasets.len(), expected_len);
        let listed: f64 = verdict.datasets.iter().map(|d| d.value).sum();
        prop_assert_eq!(listed, verdict.total_usage);
    }

    #[test]
    fn compliance_and_margin_follow_total(
        (_, records) in arb_records(),
        threshold in arb_threshold(),
    ) {
        let verdict = aggregate(&records, &AggregationPolicy::new("dataset", threshold));
        prop_assert_eq!(verdict.is_compliant, verdict.total_usage <= threshold);
        prop_assert_eq!(verdict.exceeded_by, (verdict.total_usage - threshold).max(0.0));
        if verdict.is_compliant {
            prop_assert_eq!(verdict.exceeded_by, 0.0);
        } else {
            prop_assert!(verdict.exceeded_by > 0.0);
        }
    }

    #[test]
    fn bad_records_change_nothing_but_issues(
        (shapes, records) in arb_records(),
        threshold in arb_threshold(),
    ) {
        let policy = AggregationPolicy::new("dataset", threshold);
        let good: Vec<RawRecord> = shapes
            .iter()
            .zip(&records)
            .filter(|(s, _)| !matches!(s, Shape::Mismatched | Shape::Garbage))
            .map(|(_, r)| r.clone())
            .collect();
        let bad_count = records.len() - good.len();

        let with_bad = aggregate(&records, &policy);
        let without_bad = aggregate(&good, &policy);
        prop_assert_eq!(with_bad.total_usage.to_bits(), without_bad.total_usage.to_bits());
        prop_assert_eq!(&with_bad.datasets, &without_bad.datasets);
        prop_assert_eq!(with_bad.issues.len(), bad_count);
        prop_assert!(without_bad.issues.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent(
        (_, records) in arb_records(),
        threshold in arb_threshold(),
    ) {
        let policy = AggregationPolicy::new("dataset", threshold);
        let a = aggregate(&records, &policy);
        let b = aggregate(&records, &policy);
        prop_assert_eq!(a.total_usage.to_bits(), b.total_usage.to_bits());
        prop_assert_eq!(a.exceeded_by.to_bits(), b.exceeded_by.to_bits());
        prop_assert_eq!(a.is_compliant, b.is_compliant);
        prop_assert_eq!(a.datasets, b.datasets);
    }
}
