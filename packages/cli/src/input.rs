//! Loading raw incident rows from CSV and JSON exports.

use std::path::Path;

use fire_response_format::rows_from_json;
use fire_response_incident_models::{RawRow, RawValue};

use crate::CliError;

/// On-disk layout of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// A JSON array of objects
    Json,
}

impl InputFormat {
    /// Guesses the layout from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads every row of the export at `path`.
///
/// # Errors
///
/// Returns [`CliError`] if the file can't be read, its layout can't be
/// determined, or it isn't valid CSV/JSON.
pub fn load_rows(path: &Path, format: Option<InputFormat>) -> Result<Vec<RawRow>, CliError> {
    let format = format
        .or_else(|| InputFormat::from_path(path))
        .ok_or_else(|| CliError::UnknownInputFormat {
            path: path.display().to_string(),
        })?;

    let bytes = std::fs::read(path).map_err(|e| CliError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let rows = match format {
        InputFormat::Csv => rows_from_csv(&bytes)?,
        InputFormat::Json => {
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            rows_from_json(&value)?
        }
    };

    log::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parses CSV with a header row. Every cell is text; short records leave
/// trailing columns blank.
///
/// # Errors
///
/// Returns [`CliError::Csv`] on malformed CSV, or
/// [`CliError::EmptyInput`] when there is no header row.
pub fn rows_from_csv(bytes: &[u8]) -> Result<Vec<RawRow>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if headers.iter().all(String::is_empty) {
        return Err(CliError::EmptyInput);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or("");
                (header.clone(), RawValue::from(cell))
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
