use s1recon::core::{
    index_by_pair_key, index_by_scene_identity, index_scene_owners, record_pair_key, resolve,
    StageIndexes,
};
use s1recon::types::ProductRecord;
use serde_json::{json, Value};

fn record(hit: Value) -> ProductRecord {
    ProductRecord::from_hit(&hit).expect("readable hit")
}

fn scene_pair(id: &str, reference: &[&str], secondary: &[&str]) -> ProductRecord {
    record(json!({
        "_id": id,
        "_source": {
            "id": id,
            "metadata": {"master_scenes": reference, "slave_scenes": secondary}
        }
    }))
}

fn slc(id: &str) -> ProductRecord {
    record(json!({"_id": id, "_source": {"id": id}}))
}

fn acquisition(id: &str, scene: &str) -> ProductRecord {
    record(json!({
        "_id": id,
        "_source": {"id": id, "metadata": {"title": scene}}
    }))
}

#[test]
fn test_partial_localization_reports_missing_scene() {
    let pair = scene_pair("acq-list-1", &["S1A_X"], &["S1A_Y"]);
    let key = record_pair_key(&pair).expect("pair key");

    let pairs = index_by_pair_key(&[pair]);
    // only X is localized; Y's owning acquisition is known
    let localized = index_by_scene_identity(&[slc("S1A_X-local")]);
    let owners = index_scene_owners(&[acquisition("acq-y", "S1A_Y")]);
    let configs = index_by_pair_key(&[]);
    let derived = index_by_pair_key(&[]);

    let status = resolve(
        &key,
        &StageIndexes {
            pairs: &pairs,
            localized: &localized,
            configs: &configs,
            derived: &derived,
            scene_owners: &owners,
        },
    )
    .expect("resolution");

    assert!(!status.localized_complete);
    assert_eq!(status.missing_scenes.len(), 1);
    assert_eq!(status.missing_scenes[0].scene, "S1A_Y");
    assert_eq!(
        status.missing_scenes[0].acquisition_id.as_deref(),
        Some("acq-y")
    );
    assert!(status.config_id.is_none());
    assert!(status.derived_id.is_none());
}

#[test]
fn test_unresolvable_acquisition_never_fails_resolution() {
    let pair = scene_pair("acq-list-1", &["S1A_X"], &["S1A_Y"]);
    let key = record_pair_key(&pair).expect("pair key");

    let pairs = index_by_pair_key(&[pair]);
    let localized = index_by_scene_identity(&[slc("S1A_X-local")]);
    // no acquisitions indexed at all
    let owners = index_scene_owners(&[]);
    let configs = index_by_pair_key(&[]);
    let derived = index_by_pair_key(&[]);

    let status = resolve(
        &key,
        &StageIndexes {
            pairs: &pairs,
            localized: &localized,
            configs: &configs,
            derived: &derived,
            scene_owners: &owners,
        },
    )
    .expect("resolution");

    assert_eq!(status.missing_scenes.len(), 1);
    assert_eq!(status.missing_scenes[0].scene, "S1A_Y");
    assert!(status.missing_scenes[0].acquisition_id.is_none());
}

#[test]
fn test_fully_covered_pair_reports_downstream_ids() {
    let pair = scene_pair("acq-list-1", &["S1A_X"], &["S1A_Y"]);
    let config = scene_pair("ifg-cfg-1", &["S1A_X"], &["S1A_Y"]);
    let ifg = scene_pair("ifg-1", &["S1A_X"], &["S1A_Y"]);
    let key = record_pair_key(&pair).expect("pair key");

    let pairs = index_by_pair_key(&[pair]);
    let localized = index_by_scene_identity(&[slc("S1A_X-local"), slc("S1A_Y-local")]);
    let owners = index_scene_owners(&[]);
    let configs = index_by_pair_key(&[config]);
    let derived = index_by_pair_key(&[ifg]);

    let status = resolve(
        &key,
        &StageIndexes {
            pairs: &pairs,
            localized: &localized,
            configs: &configs,
            derived: &derived,
            scene_owners: &owners,
        },
    )
    .expect("resolution");

    assert!(status.localized_complete);
    assert!(status.missing_scenes.is_empty());
    assert_eq!(status.config_id.as_deref(), Some("ifg-cfg-1"));
    assert_eq!(status.derived_id.as_deref(), Some("ifg-1"));
}
