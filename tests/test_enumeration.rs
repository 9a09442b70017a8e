use s1recon::core::{
    annotations_from_audit, audit_date_pairs, parse_enumeration, reconcile, DatePair,
};
use s1recon::types::ProductRecord;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};

fn record(hit: Value) -> ProductRecord {
    ProductRecord::from_hit(&hit).expect("readable hit")
}

fn audit(id: &str, reference: &str, secondary: &str, reason: &str, comment: &str) -> ProductRecord {
    record(json!({
        "_id": id,
        "_source": {
            "id": id,
            "metadata": {
                "reference_date": reference,
                "secondary_date": secondary,
                "failure_reason": reason,
                "comment": comment
            }
        }
    }))
}

#[test]
fn test_date_pair_direction_normalization() {
    let forward = DatePair::parse("20200101-20200115").expect("parse");
    let reverse = DatePair::parse("20200115-20200101").expect("parse");
    assert_eq!(forward.as_str(), "20200115-20200101");
    assert_eq!(forward, reverse);
}

#[test]
fn test_malformed_tokens_skipped_without_failing() {
    let pairs = parse_enumeration("20200115-20200101, not-a-date, 20200120_20200105,");
    let tokens: Vec<&str> = pairs.iter().map(DatePair::as_str).collect();
    assert_eq!(tokens, vec!["20200115-20200101", "20200120-20200105"]);
}

#[test]
fn test_reconciliation_surfaces_both_discrepancies() {
    let expected: BTreeSet<DatePair> =
        [DatePair::parse("20200115-20200101").expect("parse")].into();
    let observed: BTreeSet<DatePair> =
        [DatePair::parse("20200120-20200105").expect("parse")].into();

    let rows = reconcile(&expected, &observed, &HashMap::new());
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(
            row.in_expected != row.in_observed,
            "{} flagged in both sets",
            row.date_pair
        );
    }
}

#[test]
fn test_shared_pairs_flagged_in_both_sets() {
    let pair = DatePair::parse("20200115-20200101").expect("parse");
    let expected: BTreeSet<DatePair> = [pair.clone()].into();
    let observed: BTreeSet<DatePair> = [pair].into();

    let rows = reconcile(&expected, &observed, &HashMap::new());
    assert_eq!(rows.len(), 1);
    assert!(rows[0].in_expected && rows[0].in_observed);
}

#[test]
fn test_annotations_resolve_by_pair_then_reference_date() {
    let records = vec![audit(
        "audit-1",
        "2020-01-15",
        "2020-01-01",
        "baseline too short",
        "operator note",
    )];
    let annotations = annotations_from_audit(&records);

    let expected: BTreeSet<DatePair> =
        [DatePair::parse("20200115-20200101").expect("parse")].into();
    let rows = reconcile(&expected, &BTreeSet::new(), &annotations);
    assert_eq!(rows[0].skip_reason, "baseline too short");
    assert_eq!(rows[0].comment, "operator note");

    // no exact pair entry for 20200115-20200109, the reference date matches
    let fallback: BTreeSet<DatePair> =
        [DatePair::parse("20200115-20200109").expect("parse")].into();
    let rows = reconcile(&fallback, &BTreeSet::new(), &annotations);
    assert_eq!(rows[0].skip_reason, "baseline too short");
}

#[test]
fn test_audit_derived_enumeration() {
    let records = vec![
        audit("audit-1", "2020-01-15", "2020-01-01", "", ""),
        // secondary recorded after reference; direction still normalizes
        audit("audit-2", "2020-01-05", "2020-01-20", "", ""),
    ];
    let pairs = audit_date_pairs(&records);
    let tokens: Vec<&str> = pairs.iter().map(DatePair::as_str).collect();
    assert_eq!(tokens, vec!["20200115-20200101", "20200120-20200105"]);
}

#[test]
fn test_date_pair_from_record_extent() {
    let pair_record = record(json!({
        "_id": "acq-list-1",
        "_source": {
            "id": "acq-list-1",
            "starttime": "2020-01-01T17:08:15",
            "endtime": "2020-01-15T17:08:42"
        }
    }));
    let pair = DatePair::from_record(&pair_record).expect("date pair");
    assert_eq!(pair.as_str(), "20200115-20200101");
    assert_eq!(pair.reference_date(), "20200115");
}
