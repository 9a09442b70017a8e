use crate::core::index::{
    index_by_object_id, index_by_pair_key, index_by_scene_identity, index_derived_to_aggregate,
    index_scene_owners,
};
use crate::core::pair_key::filter_by_pair_key;
use crate::core::reconcile::{
    annotations_from_audit, audit_date_pairs, parse_enumeration, reconcile, DatePair,
    ReconciliationRow,
};
use crate::core::resolve::{resolve, StageIndexes, StageStatus};
use crate::core::track::partition_by_track;
use crate::io::catalog::{CatalogQuery, SearchWindow};
use crate::io::context::RunContext;
use crate::io::report::{ReportSink, Table};
use crate::types::{
    PairKey, ProductKind, ProductRecord, ReconError, ReconResult, SceneIdentity, TrackId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const MISSING: &str = "MISSING";

/// Drives one reconciliation run.
///
/// The engine owns an explicit catalog client and processes one track to
/// completion before moving to the next; all computation between catalog
/// calls is pure and in-memory.
pub struct OpsReportEngine<C: CatalogQuery> {
    catalog: C,
}

impl<C: CatalogQuery> OpsReportEngine<C> {
    pub fn new(catalog: C) -> Self {
        OpsReportEngine { catalog }
    }

    /// Reconciles every track covered by the run context, emitting the
    /// per-track tables into the sink.
    ///
    /// A missing entity aborts the whole run; an unavailable catalog
    /// abandons only the affected track.
    pub fn run(&self, ctx: &RunContext, sink: &mut dyn ReportSink) -> ReconResult<()> {
        let entity = self.catalog.fetch_entity(&ctx.aoi_id, &ctx.aoi_index)?;
        let window = SearchWindow::from_entity(&entity)?;

        let pairs = self
            .catalog
            .query(ProductKind::AcquisitionList, &window, None, None)?;
        let (by_track, excluded) = partition_by_track(pairs);
        if !excluded.is_empty() {
            log::warn!(
                "{} scene-pair records carried no track and were excluded",
                excluded.len()
            );
        }

        let mut tracks: Vec<TrackId> = by_track.keys().cloned().collect();
        tracks.sort();
        for track in tracks {
            log::info!("reconciling {} track {}", ctx.aoi_id, track);
            match self.run_track(ctx, &window, &track, sink) {
                Ok(()) => log::info!("generated report tables for track {}", track),
                Err(ReconError::CatalogUnavailable(reason)) => {
                    log::error!("abandoning track {}: {}", track, reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn run_track(
        &self,
        ctx: &RunContext,
        window: &SearchWindow,
        track: &TrackId,
        sink: &mut dyn ReportSink,
    ) -> ReconResult<()> {
        let track_arg = Some(track.as_str());
        let catalog = &self.catalog;

        let acquisitions = catalog.query(ProductKind::Acquisition, window, track_arg, None)?;
        let slcs = catalog.query(ProductKind::Slc, window, track_arg, None)?;
        let audit_trail = catalog.query(
            ProductKind::AuditTrail,
            window,
            track_arg,
            Some(ctx.aoi_id.as_str()),
        )?;
        if audit_trail.is_empty() {
            log::warn!("no audit trail products found for track {}, skipping", track);
            return Ok(());
        }
        let pairs = catalog.query(ProductKind::AcquisitionList, window, track_arg, None)?;
        let configs = catalog.query(ProductKind::IfgConfig, window, track_arg, None)?;
        let derived = catalog.query(ProductKind::Interferogram, window, track_arg, None)?;
        let aggregates = catalog.query(
            ProductKind::TrackAggregate,
            window,
            track_arg,
            Some(ctx.aoi_id.as_str()),
        )?;

        // only scene pairs the audit trail has seen take part
        let allowed: HashSet<PairKey> = index_by_pair_key(&audit_trail).into_keys().collect();
        let pairs = filter_by_pair_key(pairs, &allowed);
        let configs = filter_by_pair_key(configs, &allowed);
        let derived = filter_by_pair_key(derived, &allowed);

        let acquisition_index = index_by_object_id(&acquisitions);
        let scene_owners = index_scene_owners(&acquisitions);
        let localized = index_by_scene_identity(&slcs);
        let pair_index = index_by_pair_key(&pairs);
        let config_index = index_by_pair_key(&configs);
        let derived_index = index_by_pair_key(&derived);
        let aggregate_of = index_derived_to_aggregate(&aggregates);

        let indexes = StageIndexes {
            pairs: &pair_index,
            localized: &localized,
            configs: &config_index,
            derived: &derived_index,
            scene_owners: &scene_owners,
        };

        let mut statuses = Vec::with_capacity(pair_index.len());
        for key in ordered_pair_keys(&pair_index) {
            match resolve(&key, &indexes) {
                Ok(status) => statuses.push(status),
                Err(e) => log::warn!("cannot resolve pair {}: {}", key, e),
            }
        }

        sink.emit(track, current_status_table(&statuses, &pair_index, &aggregate_of))?;
        sink.emit(track, slc_table(&localized))?;
        sink.emit(track, missing_slc_table(&statuses, &acquisition_index))?;
        sink.emit(track, acquisition_table(&acquisition_index))?;
        sink.emit(track, pair_table(&pair_index))?;
        sink.emit(track, config_table(&config_index))?;
        sink.emit(track, derived_table(&derived_index))?;

        let observed: BTreeSet<DatePair> = pair_index
            .values()
            .filter_map(|record| match DatePair::from_record(record) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    log::warn!("no date pair for {}: {}", record.object_id, e);
                    None
                }
            })
            .collect();
        let expected: BTreeSet<DatePair> = match &ctx.enumeration {
            Some(raw) => parse_enumeration(raw).into_iter().collect(),
            None => audit_date_pairs(&audit_trail),
        };
        let annotations = annotations_from_audit(&audit_trail);
        let rows = reconcile(&expected, &observed, &annotations);
        sink.emit(track, comparison_table(&rows))?;

        Ok(())
    }
}

/// Pair keys ordered by the owning record's end time, newest first,
/// ties broken by key
fn ordered_pair_keys(pairs: &HashMap<PairKey, ProductRecord>) -> Vec<PairKey> {
    let mut keys: Vec<PairKey> = pairs.keys().cloned().collect();
    keys.sort_by(|a, b| {
        let ta = pairs.get(a).and_then(|r| r.end_time);
        let tb = pairs.get(b).and_then(|r| r.end_time);
        tb.cmp(&ta).then_with(|| a.cmp(b))
    });
    keys
}

fn current_status_table(
    statuses: &[StageStatus],
    pairs: &HashMap<PairKey, ProductRecord>,
    aggregate_of: &HashMap<String, String>,
) -> Table {
    let mut table = Table::new(
        "Current Product Status",
        &[
            "date pair",
            "acquisition-list",
            "ifg-cfg",
            "ifg",
            "pair key",
            "missing slc ids",
            "missing acq ids",
            "aoi track",
        ],
    );
    for status in statuses {
        let date_pair = pairs
            .get(&status.pair_key)
            .and_then(|record| DatePair::from_record(record).ok())
            .map(|pair| pair.to_string())
            .unwrap_or_else(|| MISSING.to_string());
        let aggregate = status
            .derived_id
            .as_ref()
            .and_then(|id| aggregate_of.get(id))
            .cloned()
            .unwrap_or_else(|| MISSING.to_string());
        let missing_slcs: Vec<String> =
            status.missing_scenes.iter().map(|m| m.scene.clone()).collect();
        let missing_acqs: Vec<String> = status
            .missing_scenes
            .iter()
            .filter_map(|m| m.acquisition_id.clone())
            .collect();
        table.push(vec![
            date_pair,
            status.pair_id.clone(),
            status.config_id.clone().unwrap_or_else(|| MISSING.to_string()),
            status.derived_id.clone().unwrap_or_else(|| MISSING.to_string()),
            status.pair_key.clone(),
            missing_slcs.join(", "),
            missing_acqs.join(", "),
            aggregate,
        ]);
    }
    table
}

fn slc_table(localized: &HashMap<SceneIdentity, ProductRecord>) -> Table {
    let mut table = Table::new("SLCs", &["slc id", "starttime", "endtime"]);
    for record in sorted_by_id(localized) {
        table.push(vec![
            record.object_id.clone(),
            fmt_time(record.start_time),
            fmt_time(record.end_time),
        ]);
    }
    table
}

fn missing_slc_table(
    statuses: &[StageStatus],
    acquisitions: &HashMap<String, ProductRecord>,
) -> Table {
    let mut table = Table::new(
        "Missing SLCs",
        &["slc id", "acquisition id", "starttime", "endtime"],
    );

    // dedup across scene pairs, preferring a resolved owning acquisition
    let mut missing: BTreeMap<SceneIdentity, Option<String>> = BTreeMap::new();
    for status in statuses {
        for scene in &status.missing_scenes {
            let entry = missing.entry(scene.scene.clone()).or_default();
            if entry.is_none() {
                *entry = scene.acquisition_id.clone();
            }
        }
    }

    for (scene, acquisition_id) in missing {
        let acquisition = acquisition_id.as_ref().and_then(|id| acquisitions.get(id));
        table.push(vec![
            scene,
            acquisition_id.unwrap_or_else(|| MISSING.to_string()),
            fmt_time(acquisition.and_then(|a| a.start_time)),
            fmt_time(acquisition.and_then(|a| a.end_time)),
        ]);
    }
    table
}

fn acquisition_table(acquisitions: &HashMap<String, ProductRecord>) -> Table {
    let mut table = Table::new(
        "Acquisitions",
        &["acq id", "slc id", "starttime", "endtime", "ipf version"],
    );
    for record in sorted_by_id(acquisitions) {
        let slc_id = record
            .metadata_str("title")
            .or_else(|| record.metadata_str("identifier"))
            .unwrap_or(MISSING);
        let ipf = record.metadata_str("processing_version").unwrap_or(MISSING);
        table.push(vec![
            record.object_id.clone(),
            slc_id.to_string(),
            fmt_time(record.start_time),
            fmt_time(record.end_time),
            ipf.to_string(),
        ]);
    }
    table
}

fn pair_table(pairs: &HashMap<PairKey, ProductRecord>) -> Table {
    let mut table = Table::new(
        "Acquisition-Lists",
        &[
            "acq-list id",
            "date pair",
            "reference scenes",
            "secondary scenes",
            "pair key",
        ],
    );
    let mut entries: Vec<(&PairKey, &ProductRecord)> = pairs.iter().collect();
    entries.sort_by(|a, b| a.1.object_id.cmp(&b.1.object_id));
    for (key, record) in entries {
        let date_pair = DatePair::from_record(record)
            .map(|pair| pair.to_string())
            .unwrap_or_else(|_| MISSING.to_string());
        table.push(vec![
            record.object_id.clone(),
            date_pair,
            record.reference_scenes().map(|s| s.join(", ")).unwrap_or_default(),
            record.secondary_scenes().map(|s| s.join(", ")).unwrap_or_default(),
            key.clone(),
        ]);
    }
    table
}

fn config_table(configs: &HashMap<PairKey, ProductRecord>) -> Table {
    keyed_product_table("IFG-CFGs", "ifg-cfg id", configs)
}

fn derived_table(derived: &HashMap<PairKey, ProductRecord>) -> Table {
    keyed_product_table("IFGs", "ifg id", derived)
}

fn keyed_product_table(
    name: &str,
    id_header: &str,
    products: &HashMap<PairKey, ProductRecord>,
) -> Table {
    let mut table = Table::new(name, &[id_header, "pair key", "starttime", "endtime"]);
    let mut entries: Vec<(&PairKey, &ProductRecord)> = products.iter().collect();
    entries.sort_by(|a, b| a.1.object_id.cmp(&b.1.object_id));
    for (key, record) in entries {
        table.push(vec![
            record.object_id.clone(),
            key.clone(),
            fmt_time(record.start_time),
            fmt_time(record.end_time),
        ]);
    }
    table
}

fn comparison_table(rows: &[ReconciliationRow]) -> Table {
    let mut table = Table::new(
        "Enumeration Comparison",
        &[
            "date pair",
            "in expected enumeration",
            "in catalog enumeration",
            "skip reason",
            "comment",
        ],
    );
    for row in rows {
        table.push(vec![
            row.date_pair.to_string(),
            row.in_expected.to_string(),
            row.in_observed.to_string(),
            row.skip_reason.clone(),
            row.comment.clone(),
        ]);
    }
    table
}

fn sorted_by_id<K>(index: &HashMap<K, ProductRecord>) -> Vec<&ProductRecord> {
    let mut records: Vec<&ProductRecord> = index.values().collect();
    records.sort_by(|a, b| a.object_id.cmp(&b.object_id));
    records
}

fn fmt_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
}
