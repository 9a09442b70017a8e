use crate::core::track::track_of;
use crate::types::{parse_time, ProductKind, ProductRecord, ReconError, ReconResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Spatial/temporal bounds of one reconciliation run
#[derive(Debug, Clone)]
pub struct SearchWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// GeoJSON geometry of the area of interest
    pub location: Option<Value>,
}

impl SearchWindow {
    /// Derives the window from the entity record: the extent of its
    /// enumeration list when present, else its own temporal extent
    pub fn from_entity(entity: &ProductRecord) -> ReconResult<Self> {
        let location = entity
            .fields
            .get("polygon_geojson")
            .or_else(|| entity.fields.get("location"))
            .cloned();

        if let Some(Value::Array(enumerations)) = entity.fields.get("enumeration_list") {
            let mut start: Option<DateTime<Utc>> = None;
            let mut end: Option<DateTime<Utc>> = None;
            for enumeration in enumerations {
                let time_of = |name: &str| {
                    enumeration.get(name).and_then(Value::as_str).and_then(parse_time)
                };
                if let Some(t) = time_of("reference_start_time") {
                    start = Some(start.map_or(t, |s| s.min(t)));
                }
                if let Some(t) = time_of("reference_end_time") {
                    end = Some(end.map_or(t, |e| e.max(t)));
                }
            }
            if let (Some(start_time), Some(end_time)) = (start, end) {
                return Ok(SearchWindow {
                    start_time,
                    end_time,
                    location,
                });
            }
        }

        match (entity.start_time, entity.end_time) {
            (Some(start_time), Some(end_time)) => Ok(SearchWindow {
                start_time,
                end_time,
                location,
            }),
            _ => Err(ReconError::MalformedRecord(format!(
                "{}: entity carries no temporal extent",
                entity.object_id
            ))),
        }
    }
}

/// Read-only, idempotent access to the product catalog.
///
/// The engine owns a client through this trait so tests can substitute an
/// in-memory catalog. Results are treated as total and order-independent.
pub trait CatalogQuery {
    /// Fetches the entity (AOI/request) record bounding a run
    fn fetch_entity(&self, entity_id: &str, index: &str) -> ReconResult<ProductRecord>;

    /// Returns every product of the given kind matching the window, the
    /// optional track, and (for tag-scoped kinds) the entity tag
    fn query(
        &self,
        kind: ProductKind,
        window: &SearchWindow,
        track: Option<&str>,
        tag: Option<&str>,
    ) -> ReconResult<Vec<ProductRecord>>;
}

/// Blocking HTTP client for an Elasticsearch-style product catalog.
/// Queries page sequentially with from/size and return the union of pages.
pub struct HttpCatalog {
    base_url: String,
    client: reqwest::blocking::Client,
    page_size: usize,
}

impl HttpCatalog {
    /// Create a client against the catalog endpoint.
    /// Catalog deployments run self-signed certificates.
    pub fn new(base_url: &str) -> ReconResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| {
                ReconError::CatalogUnavailable(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(HttpCatalog {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            page_size: 1000,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Runs one search, iterating from/size pages until the reported total
    /// has been returned. Unreadable hits are skipped with a warning.
    fn search(&self, index: &str, mut query: Value) -> ReconResult<Vec<ProductRecord>> {
        let url = format!("{}/es/{}/_search", self.base_url, index);
        query["size"] = json!(self.page_size);

        let mut records = Vec::new();
        let mut from = 0usize;
        loop {
            query["from"] = json!(from);
            log::debug!("querying {} from {}", url, from);
            let response = self
                .client
                .post(&url)
                .json(&query)
                .send()
                .map_err(|e| {
                    ReconError::CatalogUnavailable(format!("search on {} failed: {}", index, e))
                })?;
            if !response.status().is_success() {
                return Err(ReconError::CatalogUnavailable(format!(
                    "search on {} returned {}",
                    index,
                    response.status()
                )));
            }
            let page: EsResponse = response.json().map_err(|e| {
                ReconError::CatalogUnavailable(format!(
                    "unreadable response from {}: {}",
                    index, e
                ))
            })?;

            let total = page.hits.total.count() as usize;
            let page_len = page.hits.hits.len();
            for hit in &page.hits.hits {
                match ProductRecord::from_hit(hit) {
                    Ok(record) => records.push(record),
                    Err(e) => log::warn!("skipping unreadable hit from {}: {}", index, e),
                }
            }

            from += self.page_size;
            if from >= total || page_len == 0 {
                break;
            }
        }
        Ok(records)
    }

    fn window_query(
        &self,
        kind: ProductKind,
        window: &SearchWindow,
        track: Option<&str>,
    ) -> Value {
        // products overlap the window when they end after it starts and
        // start before it ends
        let mut must = vec![
            json!({"range": {"endtime": {"gte": window.start_time.to_rfc3339()}}}),
            json!({"range": {"starttime": {"lte": window.end_time.to_rfc3339()}}}),
        ];
        if let Some(track) = track {
            must.push(term(format!("metadata.{}", kind.track_field()), track));
        }

        match &window.location {
            Some(location) => json!({
                "query": {
                    "filtered": {
                        "query": {"geo_shape": {"location": {"shape": location}}},
                        "filter": {"bool": {"must": must}}
                    }
                }
            }),
            None => json!({"query": {"bool": {"must": must}}}),
        }
    }

    fn tag_query(&self, kind: ProductKind, tag: &str, track: Option<&str>) -> Value {
        let mut must = vec![term("metadata.tags.raw".to_string(), tag)];
        if let Some(track) = track {
            must.push(term(format!("metadata.{}", kind.track_field()), track));
        }
        json!({"query": {"bool": {"must": must}}})
    }
}

/// Builds a term filter with a runtime field name
fn term(field: String, value: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(field, Value::String(value.to_string()));
    json!({"term": Value::Object(map)})
}

impl CatalogQuery for HttpCatalog {
    fn fetch_entity(&self, entity_id: &str, index: &str) -> ReconResult<ProductRecord> {
        let query = json!({"query": {"bool": {"must": [{"term": {"id.raw": entity_id}}]}}});
        let results = self.search(index, query)?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ReconError::NoDataForEntity(entity_id.to_string()))
    }

    fn query(
        &self,
        kind: ProductKind,
        window: &SearchWindow,
        track: Option<&str>,
        tag: Option<&str>,
    ) -> ReconResult<Vec<ProductRecord>> {
        let query = match tag {
            Some(tag) if kind.is_tag_scoped() => self.tag_query(kind, tag, track),
            _ => self.window_query(kind, window, track),
        };
        log::debug!("querying {} products", kind);
        self.search(kind.index_pattern(), query)
    }
}

/// In-memory catalog for tests and offline runs
#[derive(Debug, Default)]
pub struct StaticCatalog {
    entities: HashMap<String, ProductRecord>,
    products: HashMap<ProductKind, Vec<ProductRecord>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, record: ProductRecord) -> Self {
        self.entities.insert(record.object_id.clone(), record);
        self
    }

    pub fn with_products(mut self, kind: ProductKind, records: Vec<ProductRecord>) -> Self {
        self.products.entry(kind).or_default().extend(records);
        self
    }
}

impl CatalogQuery for StaticCatalog {
    fn fetch_entity(&self, entity_id: &str, _index: &str) -> ReconResult<ProductRecord> {
        self.entities
            .get(entity_id)
            .cloned()
            .ok_or_else(|| ReconError::NoDataForEntity(entity_id.to_string()))
    }

    fn query(
        &self,
        kind: ProductKind,
        _window: &SearchWindow,
        track: Option<&str>,
        _tag: Option<&str>,
    ) -> ReconResult<Vec<ProductRecord>> {
        let mut records = self.products.get(&kind).cloned().unwrap_or_default();
        if let Some(track) = track {
            records.retain(|record| {
                track_of(record).map(|t| t == track).unwrap_or(false)
            });
        }
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct EsResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    #[serde(default)]
    total: TotalCount,
    #[serde(default)]
    hits: Vec<Value>,
}

/// Hit totals appear as a bare count or as an object, depending on the
/// catalog version
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalCount {
    Plain(u64),
    Object { value: u64 },
}

impl Default for TotalCount {
    fn default() -> Self {
        TotalCount::Plain(0)
    }
}

impl TotalCount {
    fn count(&self) -> u64 {
        match self {
            TotalCount::Plain(n) => *n,
            TotalCount::Object { value } => *value,
        }
    }
}
