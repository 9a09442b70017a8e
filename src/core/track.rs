use crate::core::index::group_by;
use crate::types::{ProductRecord, ReconError, ReconResult, TrackId};
use serde_json::Value;
use std::collections::HashMap;

/// Candidate track fields, in the order the catalog has historically
/// spelled them
const TRACK_FIELDS: [&str; 4] = ["track_number", "track", "trackNumber", "track_Number"];

/// Reads the track of a record. Candidates are checked at the record's top
/// level first, then inside the metadata bag; the first present truthy
/// value wins.
pub fn track_of(record: &ProductRecord) -> ReconResult<TrackId> {
    for bag in [&record.fields, &record.metadata] {
        for field in TRACK_FIELDS {
            if let Some(track) = truthy_track(bag.get(field)) {
                return Ok(track);
            }
        }
    }
    Err(ReconError::TrackNotFound(record.object_id.clone()))
}

/// Renders a truthy track value to a canonical decimal string so numeric
/// and string spellings of the same track land in one partition
fn truthy_track(value: Option<&Value>) -> Option<TrackId> {
    match value? {
        Value::Number(n) => {
            let track = n.as_i64()?;
            (track != 0).then(|| track.to_string())
        }
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Groups a record batch by track. A record with no recognizable track
/// field is excluded with a warning and returned in the exclusion list;
/// partitioning of the rest of the batch proceeds.
pub fn partition_by_track(
    records: Vec<ProductRecord>,
) -> (HashMap<TrackId, Vec<ProductRecord>>, Vec<String>) {
    let mut excluded = Vec::new();
    let groups = group_by(records, |record| match track_of(record) {
        Ok(track) => Some(track),
        Err(e) => {
            log::warn!("excluding from partition: {}", e);
            excluded.push(record.object_id.clone());
            None
        }
    });
    (groups, excluded)
}
