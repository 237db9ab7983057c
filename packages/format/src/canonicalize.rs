//! Field canonicalization.
//!
//! Maps raw rows onto [`CanonicalIncident`] using the detected format's
//! mapping table, then shapes the result for the requested target schema.
//! A row with nothing the target schema keeps is emitted with every field
//! absent; one bad row never fails the batch.

use std::collections::BTreeMap;

use fire_response_incident_models::{
    CanonicalIncident, RawRow, RawValue, SourceFormat, TargetSchema,
};

use crate::coerce::{CoercedValue, coerce};
use crate::detect::normalize_column_name;
use crate::format_def::FormatDefinition;
use crate::ids::IdGenerator;
use crate::registry::definition_for;
use crate::target::TargetSchemaDefinition;

/// Canonicalizes a batch, preserving length and order.
#[must_use]
pub fn canonicalize(
    rows: &[RawRow],
    format: SourceFormat,
    schema: TargetSchema,
    ids: &mut dyn IdGenerator,
) -> Vec<CanonicalIncident> {
    let Some(def) = definition_for(format) else {
        log::warn!("No mapping table registered for {format}, emitting empty incidents");
        return vec![CanonicalIncident::default(); rows.len()];
    };
    let target = TargetSchemaDefinition::of(schema);

    let incidents: Vec<CanonicalIncident> = rows
        .iter()
        .map(|row| canonicalize_row(row, def, target, ids))
        .collect();

    let empty = incidents.iter().filter(|i| i.is_empty()).count();
    log::debug!(
        "Canonicalized {} {format} rows for {schema} ({empty} with no identifiable fields)",
        incidents.len()
    );

    incidents
}

/// Canonicalizes a single row.
#[must_use]
pub fn canonicalize_row(
    row: &RawRow,
    def: &FormatDefinition,
    target: &TargetSchemaDefinition,
    ids: &mut dyn IdGenerator,
) -> CanonicalIncident {
    let mut incident = map_fields(row, def);
    if !target.keeps_any(&incident) {
        return CanonicalIncident::default();
    }
    target.apply(&mut incident, ids);
    incident
}

/// Applies the format's mapping table without any target-specific shaping.
#[must_use]
pub fn map_fields(row: &RawRow, def: &FormatDefinition) -> CanonicalIncident {
    let cells = index_row(row);
    let mut incident = CanonicalIncident::default();

    for rule in &def.fields {
        if incident.has(rule.field) {
            continue;
        }
        let Some(value) = cells.get(rule.key.as_str()) else {
            continue;
        };
        match coerce(value, rule.coercion(), rule.field) {
            Some(CoercedValue::Text(text)) => incident.set_text(rule.field, Some(text)),
            Some(CoercedValue::Coordinate(c)) => incident.set_coordinate(rule.field, Some(c)),
            None => {}
        }
    }

    incident
}

/// Keys a row by normalized column name. When two columns normalize to the
/// same key, the first non-blank one is kept.
fn index_row(row: &RawRow) -> BTreeMap<String, &RawValue> {
    let mut cells: BTreeMap<String, &RawValue> = BTreeMap::new();
    for (column, value) in row {
        let key = normalize_column_name(column);
        match cells.get(key.as_str()) {
            Some(existing) if !existing.is_blank() => {}
            _ => {
                cells.insert(key, value);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use crate::ids::SequentialIdGenerator;

    use super::*;

    fn row(cells: &[(&str, RawValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn run(rows: &[RawRow], format: SourceFormat, schema: TargetSchema) -> Vec<CanonicalIncident> {
        canonicalize(rows, format, schema, &mut SequentialIdGenerator::default())
    }

    #[test]
    fn maps_central_square_export() {
        let rows = vec![row(&[
            ("Master_Incident_Number", "F24-000123".into()),
            ("Response_Date", "2024-01-01 08:00:00".into()),
            ("Time_PhonePickUp", "2024-01-01 08:00:00".into()),
            ("Time_First_Unit_Assigned", "2024-01-01 08:01:30".into()),
            ("Time_First_Unit_Enroute", "2024-01-01 08:02:45".into()),
            ("Time_First_Unit_Arrived", "2024-01-01 08:07:15".into()),
            ("Latitude", RawValue::Number(41.8781)),
            ("Longitude", "-87.6298".into()),
            ("Problem", "STRUCTURE FIRE".into()),
            ("Priority_Number", RawValue::Number(1.0)),
            ("Radio_Name", "E12".into()),
            ("Unused Column", "ignored".into()),
        ])];

        let incidents = run(&rows, SourceFormat::CentralSquare, TargetSchema::FullExport);
        let incident = &incidents[0];
        assert_eq!(incident.incident_id.as_deref(), Some("F24-000123"));
        assert_eq!(incident.incident_date.as_deref(), Some("2024-01-01"));
        assert_eq!(incident.incident_time.as_deref(), Some("2024-01-01 08:00:00"));
        assert_eq!(incident.arrival_time.as_deref(), Some("2024-01-01 08:07:15"));
        assert_eq!(incident.latitude, Some(41.8781));
        assert_eq!(incident.longitude, Some(-87.6298));
        assert_eq!(incident.incident_type.as_deref(), Some("STRUCTURE FIRE"));
        assert_eq!(incident.priority.as_deref(), Some("1"));
        assert_eq!(incident.responding_unit.as_deref(), Some("E12"));
        assert_eq!(incident.clear_time, None);
    }

    #[test]
    fn first_non_empty_column_wins() {
        let rows = vec![row(&[
            ("Incident Number", "".into()),
            ("Call Number", "C-77".into()),
            ("Event Number", "E-88".into()),
        ])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::FullExport);
        assert_eq!(incidents[0].incident_id.as_deref(), Some("C-77"));
    }

    #[test]
    fn out_of_range_coordinates_are_absent() {
        let rows = vec![row(&[
            ("Incident ID", "1".into()),
            ("Latitude", "123.4".into()),
            ("Longitude", "NaN".into()),
        ])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::CallMapping);
        assert_eq!(incidents[0].latitude, None);
        assert_eq!(incidents[0].longitude, None);
    }

    #[test]
    fn unidentifiable_rows_stay_empty() {
        let rows = vec![
            row(&[("foo", "1".into()), ("bar", "2".into())]),
            row(&[("Incident ID", "  ".into())]),
        ];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::ResponseTimes);
        assert_eq!(incidents.len(), 2);
        assert!(incidents.iter().all(CanonicalIncident::is_empty));
    }

    #[test]
    fn rows_with_only_dropped_fields_stay_empty() {
        let rows = vec![row(&[("Narrative", "SMOKE IN BASEMENT".into())])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::CallMapping);
        assert!(incidents[0].is_empty());

        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::FullExport);
        assert_eq!(incidents[0].narrative.as_deref(), Some("SMOKE IN BASEMENT"));
        assert_eq!(incidents[0].incident_id, None);
    }

    #[test]
    fn numeric_time_cells_read_as_hhmm() {
        let rows = vec![row(&[
            ("Date", "2024-01-01".into()),
            ("Alarm Time", RawValue::Number(830.0)),
            ("Arrived", RawValue::Number(845.0)),
            ("Cleared", RawValue::Number(846.0)),
        ])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::FullExport);
        assert_eq!(incidents[0].incident_time.as_deref(), Some("08:30:00"));
        assert_eq!(incidents[0].arrival_time.as_deref(), Some("08:45:00"));
        assert_eq!(incidents[0].clear_time.as_deref(), Some("08:46:00"));
    }

    #[test]
    fn synthesizes_missing_ids_for_response_times() {
        let rows = vec![row(&[
            ("Date", "2024-01-01".into()),
            ("Alarm Time", "08:00:00".into()),
            ("Arrived", "08:20:00".into()),
        ])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::ResponseTimes);
        assert_eq!(
            incidents[0].incident_id.as_deref(),
            Some("INC-20240101080000-00000000")
        );
    }

    #[test]
    fn converts_spreadsheet_serial_dates() {
        let rows = vec![row(&[
            ("Incident ID", RawValue::Number(17.0)),
            ("Date", RawValue::Number(45_292.0)),
            ("Dispatch Time", RawValue::Number(0.5)),
        ])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::ResponseTimes);
        assert_eq!(incidents[0].incident_id.as_deref(), Some("17"));
        assert_eq!(incidents[0].incident_date.as_deref(), Some("2024-01-01"));
        assert_eq!(incidents[0].dispatch_time.as_deref(), Some("12:00:00"));
    }

    #[test]
    fn maps_premier_one_epoch_times() {
        let rows = vec![row(&[
            ("Agency_Event_Number", "P1-5".into()),
            ("Event_Create_Time", RawValue::Number(1_704_096_000_000.0)),
            ("Unit_Arrive_Time", RawValue::Number(1_704_096_435_000.0)),
        ])];
        let incidents = run(&rows, SourceFormat::MotorolaPremierOne, TargetSchema::ResponseTimes);
        assert_eq!(incidents[0].incident_date.as_deref(), Some("2024-01-01"));
        assert_eq!(incidents[0].incident_time.as_deref(), Some("2024-01-01T08:00:00"));
        assert_eq!(incidents[0].arrival_time.as_deref(), Some("2024-01-01T08:07:15"));
    }

    #[test]
    fn duplicate_normalized_columns_prefer_non_blank() {
        let rows = vec![row(&[
            ("INCIDENT ID", "".into()),
            ("incident_id", "X-1".into()),
        ])];
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::FullExport);
        assert_eq!(incidents[0].incident_id.as_deref(), Some("X-1"));
    }

    #[test]
    fn preserves_row_order() {
        let rows: Vec<RawRow> = (0..5)
            .map(|i| row(&[("Incident ID", RawValue::Number(f64::from(i)))]))
            .collect();
        let incidents = run(&rows, SourceFormat::Generic, TargetSchema::FullExport);
        let ids: Vec<&str> = incidents
            .iter()
            .filter_map(|i| i.incident_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }
}
