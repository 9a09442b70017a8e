use crate::types::{parse_time, ProductRecord, ReconError, ReconResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};

/// Canonical date-pair token `YYYYMMDD-YYYYMMDD`, chronologically later
/// date first. Direction is normalized at construction so externally
/// supplied and catalog-derived pairs compare without false mismatches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatePair(String);

impl DatePair {
    /// Parses an arbitrary `D1-D2` token, normalizing direction
    pub fn parse(token: &str) -> ReconResult<Self> {
        let parts: Vec<&str> = token.split('-').collect();
        if parts.len() != 2 {
            return Err(ReconError::MalformedDatePair(token.to_string()));
        }
        let first = parse_day(parts[0])?;
        let second = parse_day(parts[1])?;
        Ok(Self::from_dates(first, second))
    }

    /// Builds the canonical pair from two dates in either order
    pub fn from_dates(a: NaiveDate, b: NaiveDate) -> Self {
        let (later, earlier) = if a >= b { (a, b) } else { (b, a) };
        DatePair(format!(
            "{}-{}",
            later.format("%Y%m%d"),
            earlier.format("%Y%m%d")
        ))
    }

    /// Date pair of a temporal extent (end date first)
    pub fn from_times(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::from_dates(start.date_naive(), end.date_naive())
    }

    /// Date pair of a record's temporal extent
    pub fn from_record(record: &ProductRecord) -> ReconResult<Self> {
        match (record.start_time, record.end_time) {
            (Some(start), Some(end)) => Ok(Self::from_times(start, end)),
            _ => Err(ReconError::MalformedRecord(format!(
                "{}: no temporal extent",
                record.object_id
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The later (reference) date token
    pub fn reference_date(&self) -> &str {
        &self.0[..8]
    }
}

impl std::fmt::Display for DatePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn parse_day(raw: &str) -> ReconResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|_| ReconError::MalformedDatePair(raw.to_string()))
}

/// Splits an externally supplied comma-separated enumeration into date
/// pairs, tolerating spaces and `_` separators. Malformed tokens are
/// skipped with a warning; the remainder proceeds.
pub fn parse_enumeration(raw: &str) -> Vec<DatePair> {
    let cleaned = raw.replace(' ', "").replace('_', "-");
    let mut pairs = Vec::new();
    for token in cleaned.split(',').filter(|t| !t.is_empty()) {
        match DatePair::parse(token) {
            Ok(pair) => pairs.push(pair),
            Err(e) => log::warn!("skipping enumeration token: {}", e),
        }
    }
    pairs
}

/// Free-text notes attached to a date pair by an audit record
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub skip_reason: Option<String>,
    pub comment: Option<String>,
}

/// One row of the enumeration comparison
#[derive(Debug, Clone)]
pub struct ReconciliationRow {
    pub date_pair: DatePair,
    pub in_expected: bool,
    pub in_observed: bool,
    pub skip_reason: String,
    pub comment: String,
}

/// Builds the annotation map from audit-trail records, keyed by the
/// record's date pair and, as a fallback, by its reference date alone.
/// The first non-empty value wins per key.
pub fn annotations_from_audit(records: &[ProductRecord]) -> HashMap<String, Annotation> {
    let mut annotations: HashMap<String, Annotation> = HashMap::new();
    for record in records {
        let Some(pair) = audit_date_pair(record) else {
            log::debug!(
                "audit record {} has no reference/secondary dates",
                record.object_id
            );
            continue;
        };
        let skip_reason = non_empty(record.metadata_str("failure_reason"));
        let comment = non_empty(record.metadata_str("comment"));
        for key in [pair.as_str().to_string(), pair.reference_date().to_string()] {
            let entry = annotations.entry(key).or_default();
            if entry.skip_reason.is_none() {
                entry.skip_reason = skip_reason.clone();
            }
            if entry.comment.is_none() {
                entry.comment = comment.clone();
            }
        }
    }
    annotations
}

/// The audit-derived enumeration: every date pair an audit record names
pub fn audit_date_pairs(records: &[ProductRecord]) -> BTreeSet<DatePair> {
    records.iter().filter_map(audit_date_pair).collect()
}

fn audit_date_pair(record: &ProductRecord) -> Option<DatePair> {
    let reference = record.metadata_str("reference_date").and_then(parse_audit_date)?;
    let secondary = record.metadata_str("secondary_date").and_then(parse_audit_date)?;
    Some(DatePair::from_dates(reference, secondary))
}

fn parse_audit_date(raw: &str) -> Option<NaiveDate> {
    if let Some(dt) = parse_time(raw) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Enumerates the union of expected and observed date pairs, flagging each
/// row with its membership per source set and resolving annotations (exact
/// pair match, else reference-date fallback). A pair present in exactly one
/// set is a discrepancy and is surfaced, never dropped.
pub fn reconcile(
    expected: &BTreeSet<DatePair>,
    observed: &BTreeSet<DatePair>,
    annotations: &HashMap<String, Annotation>,
) -> Vec<ReconciliationRow> {
    expected
        .union(observed)
        .map(|pair| {
            let annotation = annotations
                .get(pair.as_str())
                .or_else(|| annotations.get(pair.reference_date()));
            ReconciliationRow {
                date_pair: pair.clone(),
                in_expected: expected.contains(pair),
                in_observed: observed.contains(pair),
                skip_reason: annotation
                    .and_then(|a| a.skip_reason.clone())
                    .unwrap_or_default(),
                comment: annotation.and_then(|a| a.comment.clone()).unwrap_or_default(),
            }
        })
        .collect()
}
