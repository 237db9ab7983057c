//! Target schema definitions and field derivations.
//!
//! Each downstream consumer keeps a subset of the canonical fields and
//! fills some fields the source lacks through an ordered list of
//! [`Derivation`]s.

use chrono::NaiveDateTime;
use fire_response_incident_models::{CanonicalField, CanonicalIncident, TargetSchema};
use fire_response_timestamp::normalize_timestamp;

use crate::ids::IdGenerator;

/// Timestamp fields in incident order, used to find a representative
/// instant for a record.
const TIMESTAMP_FIELDS: &[CanonicalField] = &[
    CanonicalField::IncidentTime,
    CanonicalField::DispatchTime,
    CanonicalField::EnRouteTime,
    CanonicalField::ArrivalTime,
    CanonicalField::ClearTime,
];

/// A rule that fills a canonical field from other fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// When `incident_date` carries a time of day, keep only the date and
    /// move the time into `incident_time` if that is absent.
    SplitDateTime,
    /// When `incident_date` is absent, take it from the first timestamp
    /// that parses as a full date-time.
    DateFromTimestamp,
    /// When `incident_id` is absent, synthesize `INC-<timestamp>-<suffix>`.
    SynthesizeId,
}

/// What a target schema keeps and derives.
#[derive(Debug)]
pub struct TargetSchemaDefinition {
    /// Schema identifier.
    pub schema: TargetSchema,
    /// Human-readable description of the consumer.
    pub description: &'static str,
    /// Canonical fields retained; everything else is cleared.
    pub fields: &'static [CanonicalField],
    /// Derivations applied in order before fields are filtered.
    pub derivations: &'static [Derivation],
}

static RESPONSE_TIMES: TargetSchemaDefinition = TargetSchemaDefinition {
    schema: TargetSchema::ResponseTimes,
    description: "Response-time interval analysis",
    fields: &[
        CanonicalField::IncidentId,
        CanonicalField::IncidentDate,
        CanonicalField::IncidentTime,
        CanonicalField::DispatchTime,
        CanonicalField::EnRouteTime,
        CanonicalField::ArrivalTime,
        CanonicalField::ClearTime,
        CanonicalField::Address,
        CanonicalField::City,
        CanonicalField::State,
        CanonicalField::IncidentType,
        CanonicalField::Priority,
        CanonicalField::RespondingUnit,
    ],
    derivations: &[
        Derivation::SplitDateTime,
        Derivation::DateFromTimestamp,
        Derivation::SynthesizeId,
    ],
};

static UNIT_WORKLOAD: TargetSchemaDefinition = TargetSchemaDefinition {
    schema: TargetSchema::UnitWorkload,
    description: "Per-unit workload and utilization",
    fields: &[
        CanonicalField::IncidentId,
        CanonicalField::IncidentDate,
        CanonicalField::IncidentTime,
        CanonicalField::DispatchTime,
        CanonicalField::EnRouteTime,
        CanonicalField::ArrivalTime,
        CanonicalField::ClearTime,
        CanonicalField::IncidentType,
        CanonicalField::Priority,
        CanonicalField::RespondingUnit,
    ],
    derivations: &[
        Derivation::SplitDateTime,
        Derivation::DateFromTimestamp,
        Derivation::SynthesizeId,
    ],
};

static CALL_MAPPING: TargetSchemaDefinition = TargetSchemaDefinition {
    schema: TargetSchema::CallMapping,
    description: "Geospatial call-density mapping",
    fields: &[
        CanonicalField::IncidentId,
        CanonicalField::IncidentDate,
        CanonicalField::IncidentTime,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::Address,
        CanonicalField::City,
        CanonicalField::State,
        CanonicalField::IncidentType,
        CanonicalField::Priority,
    ],
    derivations: &[
        Derivation::SplitDateTime,
        Derivation::DateFromTimestamp,
        Derivation::SynthesizeId,
    ],
};

// Exports mirror the source; IDs are never invented here.
static FULL_EXPORT: TargetSchemaDefinition = TargetSchemaDefinition {
    schema: TargetSchema::FullExport,
    description: "Every canonical field, for tabular export",
    fields: CanonicalField::all(),
    derivations: &[Derivation::SplitDateTime, Derivation::DateFromTimestamp],
};

impl TargetSchemaDefinition {
    /// Returns the definition for `schema`.
    #[must_use]
    pub fn of(schema: TargetSchema) -> &'static Self {
        match schema {
            TargetSchema::ResponseTimes => &RESPONSE_TIMES,
            TargetSchema::UnitWorkload => &UNIT_WORKLOAD,
            TargetSchema::CallMapping => &CALL_MAPPING,
            TargetSchema::FullExport => &FULL_EXPORT,
        }
    }

    /// Whether `incident` has a value in any field this schema keeps.
    #[must_use]
    pub fn keeps_any(&self, incident: &CanonicalIncident) -> bool {
        self.fields.iter().any(|field| incident.has(*field))
    }

    /// Applies derivations, then clears fields this schema doesn't keep.
    pub fn apply(&self, incident: &mut CanonicalIncident, ids: &mut dyn IdGenerator) {
        for derivation in self.derivations {
            derivation.apply(incident, ids);
        }
        for field in CanonicalField::all() {
            if !self.fields.contains(field) {
                incident.clear(*field);
            }
        }
    }
}

impl Derivation {
    /// Applies this derivation to `incident` in place.
    pub fn apply(self, incident: &mut CanonicalIncident, ids: &mut dyn IdGenerator) {
        match self {
            Self::SplitDateTime => split_date_time(incident),
            Self::DateFromTimestamp => date_from_timestamp(incident),
            Self::SynthesizeId => synthesize_id(incident, ids),
        }
    }
}

fn split_date_time(incident: &mut CanonicalIncident) {
    let Some(raw) = incident.incident_date.as_deref() else {
        return;
    };
    if !raw.contains(':') {
        return;
    }
    let Some(dt) = normalize_timestamp(Some(raw), "") else {
        return;
    };

    incident.incident_date = Some(dt.date().format("%Y-%m-%d").to_string());
    if incident.incident_time.is_none() {
        incident.incident_time = Some(dt.time().format("%H:%M:%S%.f").to_string());
    }
}

fn date_from_timestamp(incident: &mut CanonicalIncident) {
    if incident.incident_date.is_some() {
        return;
    }
    // No base date: only values carrying their own date can qualify.
    if let Some(dt) = first_instant(incident, "") {
        incident.incident_date = Some(dt.date().format("%Y-%m-%d").to_string());
    }
}

fn synthesize_id(incident: &mut CanonicalIncident, ids: &mut dyn IdGenerator) {
    if incident.incident_id.is_some() {
        return;
    }
    let base_date = incident.incident_date.clone().unwrap_or_default();
    let suffix = ids.next_suffix();
    let id = match first_instant(incident, &base_date) {
        Some(dt) => format!("INC-{}-{suffix}", dt.format("%Y%m%d%H%M%S")),
        None => format!("INC-{suffix}"),
    };
    log::trace!("Synthesized incident id {id}");
    incident.incident_id = Some(id);
}

/// Returns the first timestamp field of `incident` that parses.
fn first_instant(incident: &CanonicalIncident, base_date: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FIELDS
        .iter()
        .find_map(|field| normalize_timestamp(incident.text(*field), base_date))
}

#[cfg(test)]
mod tests {
    use crate::ids::SequentialIdGenerator;

    use super::*;

    #[test]
    fn splits_combined_date_time() {
        let mut incident = CanonicalIncident {
            incident_date: Some("01/05/2024 08:00:15 PM".to_string()),
            ..CanonicalIncident::default()
        };
        split_date_time(&mut incident);
        assert_eq!(incident.incident_date.as_deref(), Some("2024-01-05"));
        assert_eq!(incident.incident_time.as_deref(), Some("20:00:15"));
    }

    #[test]
    fn split_keeps_existing_incident_time() {
        let mut incident = CanonicalIncident {
            incident_date: Some("2024-01-05 00:00:00".to_string()),
            incident_time: Some("08:00:00".to_string()),
            ..CanonicalIncident::default()
        };
        split_date_time(&mut incident);
        assert_eq!(incident.incident_date.as_deref(), Some("2024-01-05"));
        assert_eq!(incident.incident_time.as_deref(), Some("08:00:00"));
    }

    #[test]
    fn split_leaves_plain_dates_alone() {
        let mut incident = CanonicalIncident {
            incident_date: Some("01/05/2024".to_string()),
            ..CanonicalIncident::default()
        };
        split_date_time(&mut incident);
        assert_eq!(incident.incident_date.as_deref(), Some("01/05/2024"));
        assert_eq!(incident.incident_time, None);
    }

    #[test]
    fn derives_date_from_first_full_timestamp() {
        let mut incident = CanonicalIncident {
            incident_time: Some("08:00:00".to_string()),
            dispatch_time: Some("2024-02-29T08:01:00".to_string()),
            ..CanonicalIncident::default()
        };
        date_from_timestamp(&mut incident);
        assert_eq!(incident.incident_date.as_deref(), Some("2024-02-29"));
    }

    #[test]
    fn synthesizes_id_from_first_timestamp() {
        let mut incident = CanonicalIncident {
            incident_date: Some("2024-01-01".to_string()),
            incident_time: Some("08:00:00".to_string()),
            ..CanonicalIncident::default()
        };
        let mut ids = SequentialIdGenerator::starting_at(1);
        synthesize_id(&mut incident, &mut ids);
        assert_eq!(
            incident.incident_id.as_deref(),
            Some("INC-20240101080000-00000001")
        );
    }

    #[test]
    fn synthesizes_id_without_timestamp() {
        let mut incident = CanonicalIncident {
            address: Some("100 MAIN ST".to_string()),
            ..CanonicalIncident::default()
        };
        let mut ids = SequentialIdGenerator::default();
        synthesize_id(&mut incident, &mut ids);
        assert_eq!(incident.incident_id.as_deref(), Some("INC-00000000"));
    }

    #[test]
    fn schema_filters_fields_it_does_not_keep() {
        let mut incident = CanonicalIncident {
            incident_id: Some("F1".to_string()),
            latitude: Some(41.0),
            narrative: Some("SMOKE SHOWING".to_string()),
            responding_unit: Some("E1".to_string()),
            ..CanonicalIncident::default()
        };
        let mut ids = SequentialIdGenerator::default();
        TargetSchemaDefinition::of(TargetSchema::ResponseTimes).apply(&mut incident, &mut ids);
        assert_eq!(incident.latitude, None);
        assert_eq!(incident.narrative, None);
        assert_eq!(incident.responding_unit.as_deref(), Some("E1"));
    }

    #[test]
    fn full_export_never_invents_ids() {
        let mut incident = CanonicalIncident {
            incident_time: Some("2024-01-01 08:00:00".to_string()),
            ..CanonicalIncident::default()
        };
        let mut ids = SequentialIdGenerator::default();
        TargetSchemaDefinition::of(TargetSchema::FullExport).apply(&mut incident, &mut ids);
        assert_eq!(incident.incident_id, None);
        assert_eq!(incident.incident_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn every_schema_keeps_incident_date() {
        for schema in TargetSchema::all() {
            let def = TargetSchemaDefinition::of(*schema);
            assert_eq!(def.schema, *schema);
            assert!(def.fields.contains(&CanonicalField::IncidentDate));
        }
    }
}
