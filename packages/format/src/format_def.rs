//! Config-driven source format definitions.
//!
//! A [`FormatDefinition`] captures everything unique about a CAD/RMS export
//! convention: the columns that identify it and the ordered
//! `(raw column, canonical field, coercion)` triples that map it onto
//! [`CanonicalIncident`](fire_response_incident_models::CanonicalIncident).
//! Definitions are plain data loaded from TOML, so a single generic
//! canonicalizer handles every vendor.

use std::collections::BTreeSet;

use fire_response_incident_models::{CanonicalField, FieldKind, SourceFormat};
use serde::Deserialize;

use crate::detect::normalize_column_name;

/// Errors found while loading a format definition.
#[derive(Debug, thiserror::Error)]
pub enum FormatDefinitionError {
    /// The TOML could not be parsed into a definition.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A vendor format has no signature columns to detect it by.
    #[error("format {format} has no signature columns")]
    MissingSignature {
        /// Offending format.
        format: SourceFormat,
    },

    /// The definition maps no fields at all.
    #[error("format {format} maps no fields")]
    NoFields {
        /// Offending format.
        format: SourceFormat,
    },

    /// A coercion was paired with a field of the wrong kind.
    #[error("column '{raw}' uses coercion {coercion:?}, which cannot produce {field}")]
    IncompatibleCoercion {
        /// Raw column name.
        raw: String,
        /// Target canonical field.
        field: CanonicalField,
        /// Requested coercion.
        coercion: Coercion,
    },
}

/// A complete, config-driven source format definition.
#[derive(Debug, Deserialize)]
pub struct FormatDefinition {
    /// Format tag this definition describes.
    pub format: SourceFormat,
    /// Human-readable name (e.g., `"Tyler New World CAD"`).
    pub name: String,
    /// Detection order; lower ranks are tried first.
    pub rank: u32,
    /// Columns that identify this format. `None` only for the generic
    /// fallback, which is never matched by signature.
    #[serde(default)]
    pub signature: Option<Signature>,
    /// Ordered field mappings. When several raw columns map to the same
    /// canonical field, the first non-empty one wins.
    pub fields: Vec<FieldRule>,
}

/// Column names that identify a vendor format.
#[derive(Debug, Deserialize)]
pub struct Signature {
    /// Vendor-specific primary-key columns; any one present is a full match.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Characteristic columns; more than half present is a majority match.
    #[serde(default)]
    pub columns: Vec<String>,
}

/// How strongly a batch's columns matched a [`Signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMatch {
    /// A vendor primary-key column is present.
    PrimaryKey,
    /// Every signature column is present.
    Full,
    /// More than half of the signature columns are present.
    Majority,
}

/// One `(raw column, canonical field, coercion)` mapping.
#[derive(Debug, Deserialize)]
pub struct FieldRule {
    /// Raw column name as the vendor writes it.
    pub raw: String,
    /// Canonical field it feeds.
    pub field: CanonicalField,
    /// Value coercion. Defaults to the natural coercion for the field kind.
    #[serde(default)]
    pub coercion: Option<Coercion>,
    /// Normalized form of [`Self::raw`], filled in at load time.
    #[serde(skip)]
    pub key: String,
}

/// How a raw cell is converted into a canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Trimmed text; empty becomes absent.
    Text,
    /// Decimal degrees; `NaN` and out-of-range values become absent.
    Coordinate,
    /// Date text, or a spreadsheet serial day number.
    Date,
    /// Time or date-time text, or a number: an `HHMM` time, a compact
    /// `YYYYMMDDHHMMSS` value, or a spreadsheet serial date-time.
    Timestamp,
    /// Epoch milliseconds, rendered as an ISO date-time (UTC wall clock).
    EpochMillis,
}

impl Coercion {
    /// Returns the coercion used when a mapping doesn't name one.
    #[must_use]
    pub const fn default_for(field: CanonicalField) -> Self {
        match field.kind() {
            FieldKind::Text => Self::Text,
            FieldKind::Date => Self::Date,
            FieldKind::Timestamp => Self::Timestamp,
            FieldKind::Coordinate => Self::Coordinate,
        }
    }

    /// Returns `true` if this coercion can produce values for `field`.
    #[must_use]
    pub const fn supports(self, field: CanonicalField) -> bool {
        matches!(
            (self, field.kind()),
            (Self::Text, FieldKind::Text)
                | (Self::Coordinate, FieldKind::Coordinate)
                | (Self::Date, FieldKind::Date)
                | (
                    Self::Timestamp | Self::EpochMillis,
                    FieldKind::Date | FieldKind::Timestamp
                )
        )
    }
}

impl FieldRule {
    /// Returns the effective coercion for this mapping.
    #[must_use]
    pub fn coercion(&self) -> Coercion {
        self.coercion
            .unwrap_or_else(|| Coercion::default_for(self.field))
    }
}

impl Signature {
    /// Matches this signature against a set of normalized column names.
    #[must_use]
    pub fn matches(&self, columns: &BTreeSet<String>) -> Option<SignatureMatch> {
        let present = |name: &String| columns.contains(&normalize_column_name(name));

        if self.primary_key.iter().any(present) {
            return Some(SignatureMatch::PrimaryKey);
        }
        if self.columns.is_empty() {
            return None;
        }

        let hits = self.columns.iter().filter(|c| present(c)).count();
        if hits == self.columns.len() {
            Some(SignatureMatch::Full)
        } else if hits * 2 > self.columns.len() {
            Some(SignatureMatch::Majority)
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        self.primary_key.is_empty() && self.columns.is_empty()
    }
}

impl FormatDefinition {
    /// Checks the definition for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`FormatDefinitionError`] if a vendor format lacks a
    /// signature, no fields are mapped, or a coercion doesn't fit its field.
    pub fn validate(&self) -> Result<(), FormatDefinitionError> {
        if self.format != SourceFormat::Generic
            && self.signature.as_ref().is_none_or(Signature::is_empty)
        {
            return Err(FormatDefinitionError::MissingSignature {
                format: self.format,
            });
        }
        if self.fields.is_empty() {
            return Err(FormatDefinitionError::NoFields {
                format: self.format,
            });
        }
        for rule in &self.fields {
            let coercion = rule.coercion();
            if !coercion.supports(rule.field) {
                return Err(FormatDefinitionError::IncompatibleCoercion {
                    raw: rule.raw.clone(),
                    field: rule.field,
                    coercion,
                });
            }
        }
        Ok(())
    }
}

/// Parses and validates a [`FormatDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`FormatDefinitionError`] if the TOML is malformed or the
/// definition is inconsistent.
pub fn parse_format_toml(toml_str: &str) -> Result<FormatDefinition, FormatDefinitionError> {
    let mut def: FormatDefinition = toml::de::from_str(toml_str)?;
    def.validate()?;
    for rule in &mut def.fields {
        rule.key = normalize_column_name(&rule.raw);
    }
    Ok(def)
}
