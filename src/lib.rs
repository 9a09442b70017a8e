//! s1recon: A Modular Reconciliation Engine for Sentinel-1 Interferogram
//! Pipeline Catalogs
//!
//! Reconciles a distributed catalog of Sentinel-1 processing products (raw
//! acquisitions, localized scenes, scene-pair configurations, and derived
//! interferograms) against the enumeration of scene pairs that should
//! exist, answering per track: which pipeline stages have completed, and
//! which are missing?

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use crate::types::{
    PairKey, ProductKind, ProductRecord, ReconError, ReconResult, SceneIdentity, TrackId,
};

pub use crate::core::{DatePair, OpsReportEngine};

pub use crate::io::{CatalogQuery, HttpCatalog, MemorySink, ReportSink, RunContext, StaticCatalog};
