use crate::core::normalize::{scene_identity, IdHint};
use crate::types::{PairKey, ProductRecord, ReconError, ReconResult};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Derives the deterministic join key for a scene pair.
///
/// Each collection is normalized, sorted, and space-joined; the two joined
/// strings are serialized as a canonical two-element JSON array and
/// digested. Order within a collection is irrelevant, but reference and
/// secondary are not interchangeable: direction matters to the pipeline.
/// Every stage that joins on a scene pair goes through this one function.
pub fn pair_key(reference: &[String], secondary: &[String]) -> ReconResult<PairKey> {
    let reference_str = canonical_set(reference)?;
    let secondary_str = canonical_set(secondary)?;
    let encoded = serde_json::to_string(&[&reference_str, &secondary_str])
        .map_err(|e| ReconError::MalformedRecord(format!("pair key encoding: {}", e)))?;
    Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
}

/// Pair key of a pair-bearing product record
pub fn record_pair_key(record: &ProductRecord) -> ReconResult<PairKey> {
    let reference = record.reference_scenes()?;
    let secondary = record.secondary_scenes()?;
    pair_key(&reference, &secondary)
}

/// Normalized, sorted, space-joined form of one scene collection.
/// Raw identifiers are never hashed directly; two stages may spell the
/// same scene differently and would otherwise fail to join.
fn canonical_set(scenes: &[String]) -> ReconResult<String> {
    let mut identities = scenes
        .iter()
        .map(|scene| scene_identity(scene, IdHint::Catalog))
        .collect::<ReconResult<Vec<_>>>()?;
    identities.sort();
    Ok(identities.join(" "))
}

/// Retains the records whose pair key falls in the allowed set.
/// Records without a derivable key are dropped with a warning.
pub fn filter_by_pair_key(
    records: Vec<ProductRecord>,
    allowed: &HashSet<PairKey>,
) -> Vec<ProductRecord> {
    records
        .into_iter()
        .filter(|record| match record_pair_key(record) {
            Ok(key) => allowed.contains(&key),
            Err(e) => {
                log::warn!("excluding {}: {}", record.object_id, e);
                false
            }
        })
        .collect()
}
