#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Source format detection and field canonicalization.
//!
//! [`normalize`] is the entry point: it detects which CAD/RMS convention a
//! batch of raw rows follows, then maps every row onto the canonical
//! incident schema shaped for the requested [`TargetSchema`]. Vendor column
//! vocabularies live in embedded TOML tables (see [`registry`]), so
//! supporting a new export is a data change.

pub mod canonicalize;
pub mod coerce;
pub mod detect;
pub mod format_def;
pub mod ids;
pub mod registry;
pub mod target;

use std::str::FromStr as _;

use fire_response_incident_models::{
    CanonicalIncident, RawRow, RawRowError, TargetSchema, json_kind, raw_row_from_json,
};

pub use canonicalize::canonicalize;
pub use detect::detect_format;
pub use ids::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};

/// Errors that fail a whole normalization call.
///
/// Malformed individual values are never errors; they become absent fields.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The batch violates the input contract (not a list of key/value rows).
    #[error("Invalid batch input: {message}")]
    InvalidBatch {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// The requested target schema is not one of the known identifiers.
    #[error("Unknown target schema '{requested}' (expected one of: {expected})")]
    UnknownTargetSchema {
        /// The identifier the caller asked for.
        requested: String,
        /// Comma-separated list of valid identifiers.
        expected: String,
    },
}

/// Resolves a target schema identifier.
///
/// # Errors
///
/// Returns [`NormalizeError::UnknownTargetSchema`] for unrecognized
/// identifiers.
pub fn parse_target_schema(id: &str) -> Result<TargetSchema, NormalizeError> {
    TargetSchema::from_str(id.trim()).map_err(|_| NormalizeError::UnknownTargetSchema {
        requested: id.to_string(),
        expected: TargetSchema::all()
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(", "),
    })
}

/// Detects the batch's source format and canonicalizes every row for
/// `target_schema`.
///
/// Synthesized incident IDs carry random suffixes; use [`normalize_with`]
/// for reproducible output.
///
/// # Errors
///
/// Returns [`NormalizeError::UnknownTargetSchema`] if `target_schema` is
/// not recognized.
pub fn normalize(
    rows: &[RawRow],
    target_schema: &str,
) -> Result<Vec<CanonicalIncident>, NormalizeError> {
    normalize_with(rows, target_schema, &mut RandomIdGenerator)
}

/// Like [`normalize`], drawing synthesized ID suffixes from `ids`.
///
/// # Errors
///
/// Returns [`NormalizeError::UnknownTargetSchema`] if `target_schema` is
/// not recognized.
pub fn normalize_with(
    rows: &[RawRow],
    target_schema: &str,
    ids: &mut dyn IdGenerator,
) -> Result<Vec<CanonicalIncident>, NormalizeError> {
    let schema = parse_target_schema(target_schema)?;
    let format = detect_format(rows);
    Ok(canonicalize(rows, format, schema, ids))
}

/// Reads a loosely-typed JSON batch into raw rows.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidBatch`] if `value` is not an array, or
/// any element is not an object of scalar values.
pub fn rows_from_json(value: &serde_json::Value) -> Result<Vec<RawRow>, NormalizeError> {
    let serde_json::Value::Array(items) = value else {
        return Err(NormalizeError::InvalidBatch {
            message: format!("expected a list of rows, found {}", json_kind(value)),
        });
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            raw_row_from_json(item).map_err(|e: RawRowError| NormalizeError::InvalidBatch {
                message: format!("row {index}: {e}"),
            })
        })
        .collect()
}

/// [`normalize`] over a loosely-typed JSON batch.
///
/// # Errors
///
/// Returns [`NormalizeError::UnknownTargetSchema`] for an unrecognized
/// schema, or [`NormalizeError::InvalidBatch`] if the JSON is not a list of
/// scalar-valued objects.
pub fn normalize_json(
    value: &serde_json::Value,
    target_schema: &str,
) -> Result<Vec<CanonicalIncident>, NormalizeError> {
    let schema = parse_target_schema(target_schema)?;
    let rows = rows_from_json(value)?;
    let format = detect_format(&rows);
    Ok(canonicalize(&rows, format, schema, &mut RandomIdGenerator))
}
