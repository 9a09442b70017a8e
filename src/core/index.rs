use crate::core::normalize::{scene_identity, IdHint};
use crate::core::pair_key::record_pair_key;
use crate::types::{PairKey, ProductRecord, SceneIdentity};
use std::collections::HashMap;
use std::hash::Hash;

/// Indexes a record batch under the keys produced by `key_fn`.
///
/// On key collision the record with the greater creation time is retained;
/// a record lacking a parseable creation time is never preferred, and ties
/// keep the first-encountered record. Records for which `key_fn` yields no
/// key are skipped. O(n) over the batch, no iteration-order guarantee.
pub fn index_by<F>(records: &[ProductRecord], mut key_fn: F) -> HashMap<String, ProductRecord>
where
    F: FnMut(&ProductRecord) -> Option<String>,
{
    let mut index: HashMap<String, ProductRecord> = HashMap::with_capacity(records.len());
    for record in records {
        let Some(key) = key_fn(record) else {
            continue;
        };
        match index.get(&key) {
            Some(existing) if !more_recent(record, existing) => {}
            _ => {
                index.insert(key, record.clone());
            }
        }
    }
    index
}

fn more_recent(candidate: &ProductRecord, incumbent: &ProductRecord) -> bool {
    match (candidate.creation_time, incumbent.creation_time) {
        (Some(c), Some(i)) => c > i,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Direct-lookup view keyed by catalog object id
pub fn index_by_object_id(records: &[ProductRecord]) -> HashMap<String, ProductRecord> {
    index_by(records, |record| Some(record.object_id.clone()))
}

/// Join view keyed by scene-pair key.
/// Records whose key cannot be derived are skipped with a warning.
pub fn index_by_pair_key(records: &[ProductRecord]) -> HashMap<PairKey, ProductRecord> {
    index_by(records, |record| match record_pair_key(record) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("cannot key {}: {}", record.object_id, e);
            None
        }
    })
}

/// Localized-scene view keyed by normalized scene identity
pub fn index_by_scene_identity(slcs: &[ProductRecord]) -> HashMap<SceneIdentity, ProductRecord> {
    index_by(slcs, |record| {
        match scene_identity(&record.object_id, IdHint::Localized) {
            Ok(identity) => Some(identity),
            Err(e) => {
                log::warn!("cannot key {}: {}", record.object_id, e);
                None
            }
        }
    })
}

/// Maps a normalized scene identity back to the acquisition that would
/// produce it, read from the acquisition's `title`/`identifier` metadata
pub fn index_scene_owners(
    acquisitions: &[ProductRecord],
) -> HashMap<SceneIdentity, ProductRecord> {
    index_by(acquisitions, |record| {
        let scene = record
            .metadata_str("title")
            .or_else(|| record.metadata_str("identifier"))?;
        match scene_identity(scene, IdHint::Catalog) {
            Ok(identity) => Some(identity),
            Err(e) => {
                log::debug!("acquisition {} has no scene identity: {}", record.object_id, e);
                None
            }
        }
    })
}

/// Maps derived-product ids to the aggregate product that lists them
pub fn index_derived_to_aggregate(aggregates: &[ProductRecord]) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for record in aggregates {
        let Some(derived_ids) = record.metadata.get("s1-gunw-ids").and_then(|v| v.as_array())
        else {
            continue;
        };
        for derived_id in derived_ids.iter().filter_map(|v| v.as_str()) {
            mapping.insert(derived_id.to_string(), record.object_id.clone());
        }
    }
    mapping
}

/// Groups records into a multimap under the keys produced by `key_fn`.
/// Records for which `key_fn` yields no key are dropped.
pub fn group_by<K, F>(records: Vec<ProductRecord>, mut key_fn: F) -> HashMap<K, Vec<ProductRecord>>
where
    K: Eq + Hash,
    F: FnMut(&ProductRecord) -> Option<K>,
{
    let mut groups: HashMap<K, Vec<ProductRecord>> = HashMap::new();
    for record in records {
        if let Some(key) = key_fn(&record) {
            groups.entry(key).or_default().push(record);
        }
    }
    groups
}
