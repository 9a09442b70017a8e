use s1recon::core::{filter_by_pair_key, pair_key, record_pair_key};
use s1recon::types::ProductRecord;
use serde_json::json;
use std::collections::HashSet;

fn scenes(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn test_pair_key_symmetry_under_spelling() {
    // raw catalog ids and their localized spellings must join
    let raw = pair_key(&scenes(&["S1A_20200101"]), &scenes(&["S1A_20200115"]))
        .expect("raw ids hash");
    let localized = pair_key(
        &scenes(&["S1A_20200101-local"]),
        &scenes(&["S1A_20200115-local"]),
    )
    .expect("localized ids hash");
    assert_eq!(raw, localized);
}

#[test]
fn test_pair_key_asymmetry_under_direction() {
    let forward = pair_key(&scenes(&["S1A_20200101"]), &scenes(&["S1A_20200115"]))
        .expect("forward hash");
    let reverse = pair_key(&scenes(&["S1A_20200115"]), &scenes(&["S1A_20200101"]))
        .expect("reverse hash");
    assert_ne!(forward, reverse, "direction of a pair matters");
}

#[test]
fn test_pair_key_order_independence_within_set() {
    let one = pair_key(&scenes(&["a", "b"]), &scenes(&["c"])).expect("hash");
    let two = pair_key(&scenes(&["b", "a"]), &scenes(&["c"])).expect("hash");
    assert_eq!(one, two);
}

#[test]
fn test_record_pair_key_across_stages() {
    // an acquisition-list using the historical field names and localized
    // spellings, and an interferogram using the newer names
    let acq_list = ProductRecord::from_hit(&json!({
        "_id": "acq-list-1",
        "_source": {
            "id": "acq-list-1",
            "metadata": {
                "master_scenes": ["S1A_A-local", "S1A_B-local"],
                "slave_scenes": ["S1A_C-local"]
            }
        }
    }))
    .expect("acq list record");
    let ifg = ProductRecord::from_hit(&json!({
        "_id": "ifg-1",
        "_source": {
            "id": "ifg-1",
            "metadata": {
                "reference_scenes": ["S1A_B", "S1A_A"],
                "secondary_scenes": ["S1A_C"]
            }
        }
    }))
    .expect("ifg record");

    let key_a = record_pair_key(&acq_list).expect("acq list key");
    let key_b = record_pair_key(&ifg).expect("ifg key");
    assert_eq!(key_a, key_b, "stages describing the same pair must join");
}

#[test]
fn test_legacy_tuple_elements_reduce_to_first_component() {
    let record = ProductRecord::from_hit(&json!({
        "_id": "acq-list-2",
        "_source": {
            "id": "acq-list-2",
            "metadata": {
                "master_scenes": [["S1A_A", "extra"]],
                "slave_scenes": ["S1A_C"]
            }
        }
    }))
    .expect("record");

    let plain = pair_key(&scenes(&["S1A_A"]), &scenes(&["S1A_C"])).expect("hash");
    assert_eq!(record_pair_key(&record).expect("tuple key"), plain);
}

#[test]
fn test_filter_by_pair_key_gates_records() {
    let keyed = ProductRecord::from_hit(&json!({
        "_id": "p1",
        "_source": {
            "id": "p1",
            "metadata": {"master_scenes": ["S1A_A"], "slave_scenes": ["S1A_C"]}
        }
    }))
    .expect("record");
    let other = ProductRecord::from_hit(&json!({
        "_id": "p2",
        "_source": {
            "id": "p2",
            "metadata": {"master_scenes": ["S1A_X"], "slave_scenes": ["S1A_Y"]}
        }
    }))
    .expect("record");

    let mut allowed = HashSet::new();
    allowed.insert(record_pair_key(&keyed).expect("key"));

    let kept = filter_by_pair_key(vec![keyed, other], &allowed);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].object_id, "p1");
}
