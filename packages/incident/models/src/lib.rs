#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw row, source format, and canonical incident types.
//!
//! Every CAD/RMS export and ad-hoc spreadsheet is handed to the pipeline as
//! a list of [`RawRow`]s. The format crate maps those rows onto
//! [`CanonicalIncident`], the fixed-shape record all analytics are written
//! against, regardless of which vendor produced the data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A single loosely-typed cell value from a source export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Explicit null or empty cell.
    Null,
    /// Boolean cell (some JSON exports use these for flags).
    Bool(bool),
    /// Numeric cell (spreadsheet numbers, epoch values, coordinates).
    Number(f64),
    /// Text cell.
    Text(String),
}

impl RawValue {
    /// Returns `true` for nulls and whitespace-only text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }

    /// Returns the trimmed text content, if this is a non-blank text cell.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Returns a numeric reading of this cell.
    ///
    /// Text cells are parsed as `f64`; `NaN` is never returned.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Null | Self::Bool(_) => return None,
        };
        (!value.is_nan()).then_some(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One row of a source export, keyed by vendor-specific column name.
pub type RawRow = BTreeMap<String, RawValue>;

/// Why a loosely-typed JSON value could not be read as a [`RawRow`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RawRowError {
    /// The row itself is not a key/value object.
    #[error("expected a key/value object, found {kind}")]
    NotAnObject {
        /// JSON kind that was found instead.
        kind: &'static str,
    },

    /// A column holds a nested array or object instead of a scalar.
    #[error("column '{column}' holds a nested {kind}, expected a scalar")]
    NonScalar {
        /// Offending column name.
        column: String,
        /// JSON kind that was found.
        kind: &'static str,
    },
}

/// Returns a short name for the JSON kind of `value`, for error messages.
#[must_use]
pub const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Converts a JSON object into a [`RawRow`].
///
/// # Errors
///
/// Returns [`RawRowError`] if `value` is not an object or any column holds
/// a nested array/object.
pub fn raw_row_from_json(value: &serde_json::Value) -> Result<RawRow, RawRowError> {
    let serde_json::Value::Object(map) = value else {
        return Err(RawRowError::NotAnObject {
            kind: json_kind(value),
        });
    };

    map.iter()
        .map(|(column, cell)| {
            let raw = match cell {
                serde_json::Value::Null => RawValue::Null,
                serde_json::Value::Bool(b) => RawValue::Bool(*b),
                serde_json::Value::Number(n) => n.as_f64().map_or(RawValue::Null, RawValue::Number),
                serde_json::Value::String(s) => RawValue::Text(s.clone()),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(RawRowError::NonScalar {
                        column: column.clone(),
                        kind: json_kind(cell),
                    });
                }
            };
            Ok((column.clone(), raw))
        })
        .collect()
}

/// The vendor convention a batch of raw rows follows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceFormat {
    /// Tyler Technologies New World CAD export
    TylerNewWorld,
    /// `CentralSquare` (TriTech / Inform) CAD export
    CentralSquare,
    /// Hexagon (Intergraph) I/CAD export
    HexagonIntergraph,
    /// Motorola `PremierOne` CAD export
    MotorolaPremierOne,
    /// `ImageTrend` Elite fire/EMS RMS export
    ImageTrend,
    /// Unrecognized source; mapped with the common column vocabulary
    Generic,
}

impl SourceFormat {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TylerNewWorld,
            Self::CentralSquare,
            Self::HexagonIntergraph,
            Self::MotorolaPremierOne,
            Self::ImageTrend,
            Self::Generic,
        ]
    }
}

/// How a canonical field's value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free or categorical text.
    Text,
    /// Calendar date string.
    Date,
    /// Time or date-time string, parsed later by the timestamp normalizer.
    Timestamp,
    /// WGS84 decimal degrees.
    Coordinate,
}

/// A field of the canonical incident schema.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalField {
    // ── Identity ─────────────────────────────────────────
    /// Incident or call number
    IncidentId,

    // ── Temporal ────────────────────────────────────────
    /// Calendar date of the incident
    IncidentDate,
    /// Call received / alarm time
    IncidentTime,
    /// Unit dispatched
    DispatchTime,
    /// Unit en route
    EnRouteTime,
    /// Unit on scene
    ArrivalTime,
    /// Unit cleared / available
    ClearTime,

    // ── Location ────────────────────────────────────────
    /// WGS84 latitude
    Latitude,
    /// WGS84 longitude
    Longitude,
    /// Street address
    Address,
    /// City name
    City,
    /// State abbreviation
    State,

    // ── Classification ──────────────────────────────────
    /// Call or incident type (e.g. "STRUCTURE FIRE", "MEDICAL")
    IncidentType,
    /// Dispatch priority
    Priority,
    /// Responding unit identifier
    RespondingUnit,

    // ── Free text ───────────────────────────────────────
    /// Narrative or comments
    Narrative,
}

impl CanonicalField {
    /// Returns the storage kind of this field.
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::IncidentDate => FieldKind::Date,
            Self::IncidentTime
            | Self::DispatchTime
            | Self::EnRouteTime
            | Self::ArrivalTime
            | Self::ClearTime => FieldKind::Timestamp,
            Self::Latitude | Self::Longitude => FieldKind::Coordinate,
            Self::IncidentId
            | Self::Address
            | Self::City
            | Self::State
            | Self::IncidentType
            | Self::Priority
            | Self::RespondingUnit
            | Self::Narrative => FieldKind::Text,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::IncidentId,
            Self::IncidentDate,
            Self::IncidentTime,
            Self::DispatchTime,
            Self::EnRouteTime,
            Self::ArrivalTime,
            Self::ClearTime,
            Self::Latitude,
            Self::Longitude,
            Self::Address,
            Self::City,
            Self::State,
            Self::IncidentType,
            Self::Priority,
            Self::RespondingUnit,
            Self::Narrative,
        ]
    }
}

/// The downstream consumer canonical rows are destined for.
///
/// Each consumer needs a different subset of canonical fields and a
/// different set of derivations for fields the source lacks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TargetSchema {
    /// Response-time analysis (NFPA 1710 style interval reporting)
    ResponseTimes,
    /// Per-unit workload and utilization analysis
    UnitWorkload,
    /// Geospatial call-density mapping
    CallMapping,
    /// Every canonical field, for tabular export
    FullExport,
}

impl TargetSchema {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ResponseTimes,
            Self::UnitWorkload,
            Self::CallMapping,
            Self::FullExport,
        ]
    }
}

/// A fire/EMS incident mapped to the canonical schema.
///
/// Fields missing from the source are `None`, never placeholder strings.
/// Temporal fields keep the source's text; they are parsed on demand by the
/// timestamp normalizer since many are only meaningful together with
/// [`Self::incident_date`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalIncident {
    /// Incident or call number.
    pub incident_id: Option<String>,
    /// Calendar date of the incident.
    pub incident_date: Option<String>,
    /// Call received / alarm time.
    pub incident_time: Option<String>,
    /// Unit dispatched.
    pub dispatch_time: Option<String>,
    /// Unit en route.
    pub en_route_time: Option<String>,
    /// Unit on scene.
    pub arrival_time: Option<String>,
    /// Unit cleared.
    pub clear_time: Option<String>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Street address.
    pub address: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// State abbreviation.
    pub state: Option<String>,
    /// Call or incident type.
    pub incident_type: Option<String>,
    /// Dispatch priority.
    pub priority: Option<String>,
    /// Responding unit identifier.
    pub responding_unit: Option<String>,
    /// Narrative or comments.
    pub narrative: Option<String>,
}

impl CanonicalIncident {
    /// Returns `true` when every field is absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the value of a text, date, or timestamp field.
    ///
    /// Coordinate fields always return `None`; use [`Self::coordinate`].
    #[must_use]
    pub fn text(&self, field: CanonicalField) -> Option<&str> {
        let slot = match field {
            CanonicalField::IncidentId => &self.incident_id,
            CanonicalField::IncidentDate => &self.incident_date,
            CanonicalField::IncidentTime => &self.incident_time,
            CanonicalField::DispatchTime => &self.dispatch_time,
            CanonicalField::EnRouteTime => &self.en_route_time,
            CanonicalField::ArrivalTime => &self.arrival_time,
            CanonicalField::ClearTime => &self.clear_time,
            CanonicalField::Address => &self.address,
            CanonicalField::City => &self.city,
            CanonicalField::State => &self.state,
            CanonicalField::IncidentType => &self.incident_type,
            CanonicalField::Priority => &self.priority,
            CanonicalField::RespondingUnit => &self.responding_unit,
            CanonicalField::Narrative => &self.narrative,
            CanonicalField::Latitude | CanonicalField::Longitude => return None,
        };
        slot.as_deref()
    }

    /// Returns the value of a coordinate field.
    #[must_use]
    pub const fn coordinate(&self, field: CanonicalField) -> Option<f64> {
        match field {
            CanonicalField::Latitude => self.latitude,
            CanonicalField::Longitude => self.longitude,
            _ => None,
        }
    }

    /// Returns `true` if `field` holds a value.
    #[must_use]
    pub fn has(&self, field: CanonicalField) -> bool {
        match field.kind() {
            FieldKind::Coordinate => self.coordinate(field).is_some(),
            FieldKind::Text | FieldKind::Date | FieldKind::Timestamp => {
                self.text(field).is_some()
            }
        }
    }

    /// Sets a text, date, or timestamp field. Ignored for coordinates.
    pub fn set_text(&mut self, field: CanonicalField, value: Option<String>) {
        let slot = match field {
            CanonicalField::IncidentId => &mut self.incident_id,
            CanonicalField::IncidentDate => &mut self.incident_date,
            CanonicalField::IncidentTime => &mut self.incident_time,
            CanonicalField::DispatchTime => &mut self.dispatch_time,
            CanonicalField::EnRouteTime => &mut self.en_route_time,
            CanonicalField::ArrivalTime => &mut self.arrival_time,
            CanonicalField::ClearTime => &mut self.clear_time,
            CanonicalField::Address => &mut self.address,
            CanonicalField::City => &mut self.city,
            CanonicalField::State => &mut self.state,
            CanonicalField::IncidentType => &mut self.incident_type,
            CanonicalField::Priority => &mut self.priority,
            CanonicalField::RespondingUnit => &mut self.responding_unit,
            CanonicalField::Narrative => &mut self.narrative,
            CanonicalField::Latitude | CanonicalField::Longitude => return,
        };
        *slot = value;
    }

    /// Sets a coordinate field. Ignored for non-coordinate fields.
    pub const fn set_coordinate(&mut self, field: CanonicalField, value: Option<f64>) {
        match field {
            CanonicalField::Latitude => self.latitude = value,
            CanonicalField::Longitude => self.longitude = value,
            _ => {}
        }
    }

    /// Clears `field`, whatever its kind.
    pub fn clear(&mut self, field: CanonicalField) {
        match field.kind() {
            FieldKind::Coordinate => self.set_coordinate(field, None),
            FieldKind::Text | FieldKind::Date | FieldKind::Timestamp => {
                self.set_text(field, None);
            }
        }
    }
}
