//! Output formatting and persistence for analysis results.
//!
//! Supports pretty-printing, CSV tables, the JSON bundle, the text report and
//! the (optionally gzipped) causal export.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::causal_export::ExportTable;
use crate::analyzers::types::ResultBundle;

/// Logs the bundle using Rust's debug pretty-print format.
pub fn print_pretty(bundle: &ResultBundle) {
    debug!("{:#?}", bundle);
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

/// Writes `records` as a CSV file with a header row, replacing any existing file.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = records.len(), "Wrote CSV");
    Ok(())
}

/// Writes the bundle as pretty-printed JSON.
pub fn write_json(path: &Path, bundle: &ResultBundle) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(bundle)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote result bundle");
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_export_to<W: Write>(writer: W, export: &ExportTable) -> Result<W> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(&export.headers)?;
    for row in &export.rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    csv_writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing export: {}", e.error()))
}

/// Writes the causal export as CSV, gzip-compressed when `gzip` is set.
pub fn write_export(path: &Path, export: &ExportTable, gzip: bool) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    if gzip {
        let encoder = GzEncoder::new(file, Compression::default());
        write_export_to(encoder, export)?.finish()?;
    } else {
        write_export_to(file, export)?;
    }

    info!(path = %path.display(), rows = export.len(), gzip, "Wrote causal export");
    Ok(())
}
