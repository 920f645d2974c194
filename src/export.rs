//! Snapshot import/export and record listings.
//!
//! Snapshot files use the same JSON shape as the stored state. Listings
//! come in text, CSV and JSON for piping into other tools.

use crate::models::{Snapshot, ValuationRecord};
use crate::store::{decode_snapshot, encode_snapshot};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Listing format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Csv,
    Json,
}

/// Default snapshot file name for a given day.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("stock-tracker-{}.json", date.format("%Y-%m-%d"))
}

/// Write a snapshot as pretty JSON. Returns the path written.
pub async fn write_snapshot_file(snapshot: &Snapshot, path: &Path) -> Result<PathBuf> {
    let json = encode_snapshot(snapshot).context("Failed to serialize snapshot")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Read and decode a snapshot file.
pub async fn read_snapshot_file(path: &Path) -> Result<Snapshot> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    decode_snapshot(&content).with_context(|| {
        format!("Failed to load JSON from {}; check the file format", path.display())
    })
}

/// Render records in the specified format.
pub fn export_records(records: &[&ValuationRecord], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(export_text(records)),
        ExportFormat::Csv => Ok(export_csv(records)),
        ExportFormat::Json => export_json(records),
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{}", v)).unwrap_or_default()
}

/// Export as plain text (screen reader friendly).
fn export_text(records: &[&ValuationRecord]) -> String {
    let mut output = String::new();

    output.push_str("STONKLOG RECORDS\n");
    output.push_str("================\n\n");

    if records.is_empty() {
        output.push_str("No records yet.\n");
        return output;
    }

    for record in records {
        output.push_str(&format!("Id: {}\n", record.id));
        output.push_str(&format!("Date: {}\n", record.date));
        output.push_str(&format!("Ticker: {}\n", record.ticker));
        output.push_str(&format!("Price: {}\n", record.price));
        output.push_str(&format!("EPS ({}): {}\n", record.eps_mode, or_na(record.eps_used)));
        output.push_str(&format!("PER: {}\n", or_na(record.per)));
        if record.bps.is_some() {
            output.push_str(&format!("BPS: {}\n", or_na(record.bps)));
            output.push_str(&format!("PBR: {}\n", or_na(record.pbr)));
        }
        if !record.memo.is_empty() {
            output.push_str(&format!("Memo: {}\n", record.memo));
        }
        output.push('\n');
    }

    output
}

fn or_na(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "N/A".to_string())
}

fn csv_field(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Export as CSV (comma-separated values).
fn export_csv(records: &[&ValuationRecord]) -> String {
    let mut output = String::new();

    output.push_str("Id,Date,Ticker,Price,EpsMode,EpsUsed,PER,BPS,PBR,Memo\n");

    for record in records {
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            csv_field(&record.id),
            record.date,
            csv_field(&record.ticker),
            record.price,
            record.eps_mode,
            opt(record.eps_used),
            opt(record.per),
            opt(record.bps),
            opt(record.pbr),
            csv_field(&record.memo),
        ));
    }

    output
}

/// Export as JSON.
fn export_json(records: &[&ValuationRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize records")
}
