//! Core reconciliation modules

pub mod engine;
pub mod index;
pub mod normalize;
pub mod pair_key;
pub mod reconcile;
pub mod resolve;
pub mod track;

// Re-export main types
pub use engine::OpsReportEngine;
pub use index::{
    group_by, index_by, index_by_object_id, index_by_pair_key, index_by_scene_identity,
    index_derived_to_aggregate, index_scene_owners,
};
pub use normalize::{scene_identity, IdHint};
pub use pair_key::{filter_by_pair_key, pair_key, record_pair_key};
pub use reconcile::{
    annotations_from_audit, audit_date_pairs, parse_enumeration, reconcile, Annotation, DatePair,
    ReconciliationRow,
};
pub use resolve::{resolve, MissingScene, StageIndexes, StageStatus};
pub use track::{partition_by_track, track_of};
