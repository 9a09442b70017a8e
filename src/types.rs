use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical identity of one physical acquisition, independent of which
/// naming scheme a record used to reference it
pub type SceneIdentity = String;

/// Hex digest joining the products of one scene pair across pipeline stages
pub type PairKey = String;

/// Orbital-pass partition key (decimal string form)
pub type TrackId = String;

/// Catalog product families handled by the reconciliation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    /// Raw sensor capture referencing one physical pass
    Acquisition,
    /// Localized scene (SLC), addressable by its own catalog id
    Slc,
    /// Scene-pair product declaring reference/secondary scene sets
    AcquisitionList,
    /// Pipeline configuration generated for a scene pair
    IfgConfig,
    /// Derived interferogram keyed by the same scene pair
    Interferogram,
    /// Audit record of pipeline decisions (skip reasons, comments)
    AuditTrail,
    /// Aggregate product mapping interferogram ids to an AOI-track id
    TrackAggregate,
}

impl ProductKind {
    /// Search index pattern for this product family
    pub fn index_pattern(&self) -> &'static str {
        match self {
            ProductKind::Acquisition => "grq_*_acquisition-s1-iw_slc",
            ProductKind::Slc => "grq_*_s1-iw_slc-local",
            ProductKind::AcquisitionList => "grq_*_s1-gunw-acq-list",
            ProductKind::IfgConfig => "grq_*_s1-gunw-ifg-cfg",
            ProductKind::Interferogram => "grq_*_s1-gunw",
            ProductKind::AuditTrail => "grq_*_s1-gunw-acqlist-audit_trail",
            ProductKind::TrackAggregate => "grq_*_s1-gunw-aoi_track",
        }
    }

    /// Metadata field carrying the track number for this family.
    /// SLC products historically used camel case.
    pub fn track_field(&self) -> &'static str {
        match self {
            ProductKind::Slc => "trackNumber",
            _ => "track_number",
        }
    }

    /// Audit-trail and aggregate products are scoped by an entity tag
    /// instead of a spatial/temporal window
    pub fn is_tag_scoped(&self) -> bool {
        matches!(self, ProductKind::AuditTrail | ProductKind::TrackAggregate)
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProductKind::Acquisition => "acquisition",
            ProductKind::Slc => "slc",
            ProductKind::AcquisitionList => "acq-list",
            ProductKind::IfgConfig => "ifg-cfg",
            ProductKind::Interferogram => "ifg",
            ProductKind::AuditTrail => "audit-trail",
            ProductKind::TrackAggregate => "aoi-track",
        };
        write!(f, "{}", name)
    }
}

/// Error types for catalog reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("no scene identity in '{0}'")]
    IdentityNotFound(String),

    #[error("no track field on product '{0}'")]
    TrackNotFound(String),

    #[error("malformed date pair '{0}'")]
    MalformedDatePair(String),

    #[error("malformed product record: {0}")]
    MalformedRecord(String),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("no catalog entry for entity '{0}'")]
    NoDataForEntity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;

/// One catalog product document.
///
/// Promotes the handful of fields every component reads into typed members
/// and keeps the rest of the source document in `fields`/`metadata` so that
/// family-specific lookups stay possible without a schema per product kind.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    /// Stage-unique catalog id
    pub object_id: String,
    /// Ingest time; unparseable values are kept as `None`
    pub creation_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Remaining top-level source fields
    pub fields: Map<String, Value>,
    /// Free-form metadata bag
    pub metadata: Map<String, Value>,
}

impl ProductRecord {
    /// Build a record from one search hit (`{"_id": .., "_source": {..}}`)
    pub fn from_hit(hit: &Value) -> ReconResult<Self> {
        let source = hit
            .get("_source")
            .and_then(Value::as_object)
            .ok_or_else(|| ReconError::MalformedRecord("hit carries no _source".to_string()))?;

        let object_id = source
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| hit.get("_id").and_then(Value::as_str))
            .ok_or_else(|| ReconError::MalformedRecord("hit carries no id".to_string()))?
            .to_string();

        let time_of = |name: &str| source.get(name).and_then(Value::as_str).and_then(parse_time);
        let creation_time = time_of("creation_timestamp");
        let start_time = time_of("starttime");
        let end_time = time_of("endtime");

        let metadata = source
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let mut fields = source.clone();
        fields.remove("metadata");

        Ok(ProductRecord {
            object_id,
            creation_time,
            start_time,
            end_time,
            fields,
            metadata,
        })
    }

    /// String-valued metadata lookup
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Reference scene identifiers, raw (not normalized)
    pub fn reference_scenes(&self) -> ReconResult<Vec<String>> {
        self.scene_set(&["master_scenes", "reference_scenes"], "reference")
    }

    /// Secondary scene identifiers, raw (not normalized)
    pub fn secondary_scenes(&self) -> ReconResult<Vec<String>> {
        self.scene_set(&["slave_scenes", "secondary_scenes"], "secondary")
    }

    /// Reads a scene set from the metadata bag under its historical name
    /// variants. First present, non-empty variant wins. An element that is
    /// itself an array (legacy dual representation) is reduced to its first
    /// string component.
    fn scene_set(&self, names: &[&str], label: &str) -> ReconResult<Vec<String>> {
        for name in names {
            let Some(Value::Array(items)) = self.metadata.get(*name) else {
                continue;
            };
            if items.is_empty() {
                continue;
            }
            let scenes: Vec<String> = items.iter().filter_map(scene_token).collect();
            if scenes.len() < items.len() {
                log::warn!(
                    "{}: dropped {} unreadable entries from {}",
                    self.object_id,
                    items.len() - scenes.len(),
                    name
                );
            }
            if !scenes.is_empty() {
                return Ok(scenes);
            }
        }
        Err(ReconError::MalformedRecord(format!(
            "{}: no {} scene set in metadata",
            self.object_id, label
        )))
    }
}

fn scene_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Lenient timestamp parsing across the formats the catalog uses
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y%m%dT%H%M%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}
