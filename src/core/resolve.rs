use crate::core::normalize::{scene_identity, IdHint};
use crate::types::{PairKey, ProductRecord, ReconError, ReconResult, SceneIdentity};
use std::collections::{BTreeSet, HashMap};

/// Per-stage indexes for one track, already materialized in memory
#[derive(Debug)]
pub struct StageIndexes<'a> {
    /// Scene-pair products by pair key
    pub pairs: &'a HashMap<PairKey, ProductRecord>,
    /// Localized scenes by normalized scene identity
    pub localized: &'a HashMap<SceneIdentity, ProductRecord>,
    /// Pipeline configurations by pair key
    pub configs: &'a HashMap<PairKey, ProductRecord>,
    /// Derived products by pair key
    pub derived: &'a HashMap<PairKey, ProductRecord>,
    /// Scene identity to the acquisition that would produce it
    pub scene_owners: &'a HashMap<SceneIdentity, ProductRecord>,
}

/// A scene the localization stage has not produced yet
#[derive(Debug, Clone)]
pub struct MissingScene {
    pub scene: SceneIdentity,
    /// Owning acquisition id, `None` when unresolvable
    pub acquisition_id: Option<String>,
}

/// Completion state of the downstream stages for one scene pair
#[derive(Debug, Clone)]
pub struct StageStatus {
    pub pair_key: PairKey,
    /// Object id of the scene-pair product itself
    pub pair_id: String,
    pub config_id: Option<String>,
    pub derived_id: Option<String>,
    /// True when every scene in the union of both sets is localized
    pub localized_complete: bool,
    pub missing_scenes: Vec<MissingScene>,
}

/// Determines which downstream stage products exist under a pair key and
/// which upstream scenes are missing.
///
/// Pure lookup and set difference over the indexes; missing-scene
/// resolution is best effort and an unresolved owning acquisition never
/// fails the overall resolution.
pub fn resolve(pair_key: &str, indexes: &StageIndexes) -> ReconResult<StageStatus> {
    let pair = indexes.pairs.get(pair_key).ok_or_else(|| {
        ReconError::MalformedRecord(format!("no scene-pair product under key {}", pair_key))
    })?;

    let reference = pair.reference_scenes()?;
    let secondary = pair.secondary_scenes()?;

    // Union of both sets; sorted so missing scenes report deterministically.
    // A token that cannot be normalized is carried verbatim and surfaces as
    // missing/unresolved below.
    let mut scenes = BTreeSet::new();
    for token in reference.iter().chain(secondary.iter()) {
        let identity = scene_identity(token, IdHint::Catalog).unwrap_or_else(|_| token.clone());
        scenes.insert(identity);
    }

    let mut missing_scenes = Vec::new();
    for scene in &scenes {
        if indexes.localized.contains_key(scene) {
            continue;
        }
        let acquisition_id = indexes
            .scene_owners
            .get(scene)
            .map(|acq| acq.object_id.clone());
        missing_scenes.push(MissingScene {
            scene: scene.clone(),
            acquisition_id,
        });
    }

    Ok(StageStatus {
        pair_key: pair_key.to_string(),
        pair_id: pair.object_id.clone(),
        config_id: indexes.configs.get(pair_key).map(|r| r.object_id.clone()),
        derived_id: indexes.derived.get(pair_key).map(|r| r.object_id.clone()),
        localized_complete: missing_scenes.is_empty(),
        missing_scenes,
    })
}
