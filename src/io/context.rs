use crate::types::{ReconError, ReconResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Static configuration bounding one reconciliation run
#[derive(Debug, Clone, Deserialize)]
pub struct RunContext {
    /// Area-of-interest (entity) id in the catalog
    pub aoi_id: String,
    /// Catalog index holding the entity record
    pub aoi_index: String,
    /// Externally supplied comma-separated list of expected date pairs.
    /// When absent, the expected enumeration is derived from the audit
    /// trail.
    #[serde(default)]
    pub enumeration: Option<String>,
    /// Catalog endpoint override
    #[serde(default)]
    pub catalog_url: Option<String>,
}

impl RunContext {
    /// Loads the run configuration from a `_context.json` style file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ReconResult<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| ReconError::MalformedRecord(format!("unreadable run context: {}", e)))
    }
}
