use crate::types::{ReconResult, TrackId};
use std::fs;
use std::path::{Path, PathBuf};

/// A named table of string rows handed to a report sink
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Table {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Receives the per-track tables. Rendering (spreadsheets, HTML, email)
/// is entirely the sink's concern.
pub trait ReportSink {
    fn emit(&mut self, track: &TrackId, table: Table) -> ReconResult<()>;
}

/// Collects emitted tables in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tables: Vec<(TrackId, Table)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds an emitted table by track and name
    pub fn table(&self, track: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|(t, table)| t == track && table.name == name)
            .map(|(_, table)| table)
    }
}

impl ReportSink for MemorySink {
    fn emit(&mut self, track: &TrackId, table: Table) -> ReconResult<()> {
        self.tables.push((track.clone(), table));
        Ok(())
    }
}

/// Writes one CSV file per table under an output directory
#[derive(Debug)]
pub struct CsvSink {
    directory: PathBuf,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        CsvSink {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

impl ReportSink for CsvSink {
    fn emit(&mut self, track: &TrackId, table: Table) -> ReconResult<()> {
        fs::create_dir_all(&self.directory)?;
        let path = self
            .directory
            .join(format!("{}_T{}.csv", sanitize(&table.name), track));

        let mut out = String::new();
        out.push_str(&csv_row(&table.header));
        for row in &table.rows {
            out.push_str(&csv_row(row));
        }
        fs::write(&path, out)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

fn csv_row(cells: &[String]) -> String {
    let mut line = cells
        .iter()
        .map(|cell| csv_cell(cell))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn csv_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
