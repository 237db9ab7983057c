//! Per-field value coercion.
//!
//! Malformed values are never errors: anything that can't be coerced is
//! simply absent from the canonical record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use fire_response_incident_models::{CanonicalField, RawValue};

use crate::format_def::Coercion;

/// Smallest spreadsheet serial accepted (1970-01-01). Earlier serials are
/// almost always something else, such as HHMM times that lost their
/// leading zero.
const MIN_SERIAL_DAY: f64 = 25_569.0;

/// Largest spreadsheet serial accepted (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Largest whole number read as an `HHMM` time of day.
const MAX_HHMM: f64 = 2359.0;

/// Bounds of 14-digit `YYYYMMDDHHMMSS` numbers.
const COMPACT_DATETIME_RANGE: std::ops::Range<f64> = 1e13..1e14;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A coerced canonical value.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    /// Text, date, or timestamp string.
    Text(String),
    /// Decimal-degree coordinate.
    Coordinate(f64),
}

/// Coerces a raw cell for `field`.
///
/// Returns `None` when the cell is blank or malformed.
#[must_use]
pub fn coerce(value: &RawValue, coercion: Coercion, field: CanonicalField) -> Option<CoercedValue> {
    if value.is_blank() {
        return None;
    }
    let coerced = match coercion {
        Coercion::Text => coerce_text(value).map(CoercedValue::Text),
        Coercion::Coordinate => coerce_coordinate(value, field).map(CoercedValue::Coordinate),
        Coercion::Date => coerce_date(value).map(CoercedValue::Text),
        Coercion::Timestamp => coerce_timestamp(value).map(CoercedValue::Text),
        Coercion::EpochMillis => coerce_epoch_millis(value).map(CoercedValue::Text),
    };
    if coerced.is_none() {
        log::trace!("Dropping malformed {field} value {value:?}");
    }
    coerced
}

fn coerce_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Text(_) => value.as_text().map(String::from),
        RawValue::Number(n) => format_number(*n),
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Null => None,
    }
}

fn coerce_coordinate(value: &RawValue, field: CanonicalField) -> Option<f64> {
    let degrees = value.as_f64()?;
    let limit = match field {
        CanonicalField::Latitude => 90.0,
        CanonicalField::Longitude => 180.0,
        _ => return None,
    };
    (degrees.is_finite() && (-limit..=limit).contains(&degrees)).then_some(degrees)
}

fn coerce_date(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Number(n) => {
            serial_to_datetime(*n).map(|dt| dt.date().format("%Y-%m-%d").to_string())
        }
        _ => coerce_text(value),
    }
}

fn coerce_timestamp(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Number(n) => numeric_timestamp(*n),
        _ => coerce_text(value),
    }
}

/// Reads a numeric time cell. Fractions below 1 are spreadsheet times of
/// day, whole numbers up to 2359 are `HHMM` times, 14-digit whole numbers
/// are compact `YYYYMMDDHHMMSS` values, and anything else must be a
/// spreadsheet serial date-time.
fn numeric_timestamp(n: f64) -> Option<String> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    if n < 1.0 {
        return serial_to_time(n).map(|t| t.format("%H:%M:%S").to_string());
    }
    if n.fract() == 0.0 {
        if n <= MAX_HHMM {
            return hhmm_time(n);
        }
        if COMPACT_DATETIME_RANGE.contains(&n) {
            return format_number(n);
        }
    }
    serial_to_datetime(n).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Renders a whole `HHMM` number (`830`, `1745`) as `HH:MM:00`.
fn hhmm_time(n: f64) -> Option<String> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = n as u32;
    let (hour, minute) = (whole / 100, whole % 100);
    (hour < 24 && minute < 60).then(|| format!("{hour:02}:{minute:02}:00"))
}

fn coerce_epoch_millis(value: &RawValue) -> Option<String> {
    let Some(ms) = value.as_f64() else {
        return coerce_text(value);
    };
    if !ms.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let dt = DateTime::from_timestamp_millis(ms.round() as i64)?;
    Some(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Renders a number the way a spreadsheet shows it: integral values without
/// a trailing `.0`.
fn format_number(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        return Some(whole.to_string());
    }
    Some(n.to_string())
}

/// Converts a spreadsheet serial (days since 1899-12-30, fraction = time of
/// day) to a date-time. Serials before 1970 are rejected.
#[must_use]
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(MIN_SERIAL_DAY..=MAX_SERIAL_DAY).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;

    #[allow(clippy::cast_possible_truncation)]
    let mut days = serial.trunc() as i64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut seconds = (serial.fract() * SECONDS_PER_DAY).round() as u32;
    if seconds >= 86_400 {
        days += 1;
        seconds = 0;
    }

    let date = epoch.checked_add_signed(TimeDelta::try_days(days)?)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(date.and_time(time))
}

fn serial_to_time(fraction: f64) -> Option<NaiveTime> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let seconds = (fraction * SECONDS_PER_DAY).round() as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds % 86_400, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: RawValue, coercion: Coercion, field: CanonicalField) -> Option<String> {
        match coerce(&value, coercion, field)? {
            CoercedValue::Text(s) => Some(s),
            CoercedValue::Coordinate(_) => None,
        }
    }

    fn coordinate(value: RawValue, field: CanonicalField) -> Option<f64> {
        match coerce(&value, Coercion::Coordinate, field)? {
            CoercedValue::Coordinate(c) => Some(c),
            CoercedValue::Text(_) => None,
        }
    }

    #[test]
    fn text_is_trimmed_and_blank_is_absent() {
        assert_eq!(
            text(" ENGINE 7 ".into(), Coercion::Text, CanonicalField::RespondingUnit),
            Some("ENGINE 7".to_string())
        );
        assert_eq!(
            text("  ".into(), Coercion::Text, CanonicalField::RespondingUnit),
            None
        );
        assert_eq!(
            text(RawValue::Null, Coercion::Text, CanonicalField::Address),
            None
        );
    }

    #[test]
    fn numeric_text_drops_trailing_zero_fraction() {
        assert_eq!(
            text(RawValue::Number(240_117.0), Coercion::Text, CanonicalField::IncidentId),
            Some("240117".to_string())
        );
        assert_eq!(
            text(RawValue::Number(1.5), Coercion::Text, CanonicalField::Priority),
            Some("1.5".to_string())
        );
    }

    #[test]
    fn coordinates_reject_nan_and_out_of_range() {
        assert_eq!(
            coordinate(RawValue::from("41.8781"), CanonicalField::Latitude),
            Some(41.8781)
        );
        assert_eq!(
            coordinate(RawValue::Number(-87.6298), CanonicalField::Longitude),
            Some(-87.6298)
        );
        assert_eq!(coordinate(RawValue::from("NaN"), CanonicalField::Latitude), None);
        assert_eq!(coordinate(RawValue::Number(f64::NAN), CanonicalField::Latitude), None);
        assert_eq!(coordinate(RawValue::Number(91.0), CanonicalField::Latitude), None);
        assert_eq!(
            coordinate(RawValue::Number(-180.5), CanonicalField::Longitude),
            None
        );
        assert_eq!(
            coordinate(RawValue::Number(120.0), CanonicalField::Longitude),
            Some(120.0)
        );
        assert_eq!(coordinate(RawValue::from("north"), CanonicalField::Latitude), None);
    }

    #[test]
    fn spreadsheet_serial_dates() {
        assert_eq!(
            text(RawValue::Number(45_292.0), Coercion::Date, CanonicalField::IncidentDate),
            Some("2024-01-01".to_string())
        );
        assert_eq!(
            text(
                RawValue::Number(45_292.5),
                Coercion::Timestamp,
                CanonicalField::DispatchTime
            ),
            Some("2024-01-01 12:00:00".to_string())
        );
        assert_eq!(
            text(RawValue::Number(0.25), Coercion::Timestamp, CanonicalField::IncidentTime),
            Some("06:00:00".to_string())
        );
        assert_eq!(
            text(RawValue::Number(-3.0), Coercion::Date, CanonicalField::IncidentDate),
            None
        );
    }

    #[test]
    fn date_text_passes_through() {
        assert_eq!(
            text("01/05/2024".into(), Coercion::Date, CanonicalField::IncidentDate),
            Some("01/05/2024".to_string())
        );
    }

    #[test]
    fn epoch_millis_render_as_iso() {
        assert_eq!(
            text(
                RawValue::Number(1_704_096_000_000.0),
                Coercion::EpochMillis,
                CanonicalField::IncidentTime
            ),
            Some("2024-01-01T08:00:00".to_string())
        );
        assert_eq!(
            text(
                "1704096090000".into(),
                Coercion::EpochMillis,
                CanonicalField::DispatchTime
            ),
            Some("2024-01-01T08:01:30".to_string())
        );
        assert_eq!(
            text(
                "2024-01-01 08:00:00".into(),
                Coercion::EpochMillis,
                CanonicalField::IncidentTime
            ),
            Some("2024-01-01 08:00:00".to_string())
        );
    }

    #[test]
    fn whole_numbers_in_time_fields_are_hhmm() {
        let time = |n: f64| {
            text(RawValue::Number(n), Coercion::Timestamp, CanonicalField::ArrivalTime)
        };
        assert_eq!(time(830.0), Some("08:30:00".to_string()));
        assert_eq!(time(1745.0), Some("17:45:00".to_string()));
        assert_eq!(time(5.0), Some("00:05:00".to_string()));
        assert_eq!(time(1.0), Some("00:01:00".to_string()));
        assert_eq!(time(2359.0), Some("23:59:00".to_string()));
        assert_eq!(time(875.0), None);
    }

    #[test]
    fn pre_1970_serials_are_absent() {
        let time = |n: f64| {
            text(RawValue::Number(n), Coercion::Timestamp, CanonicalField::ClearTime)
        };
        assert_eq!(time(2360.0), None);
        assert_eq!(time(12_345.5), None);
        assert_eq!(
            text(RawValue::Number(830.0), Coercion::Date, CanonicalField::IncidentDate),
            None
        );
        assert_eq!(serial_to_datetime(25_568.0), None);
        assert!(serial_to_datetime(25_569.0).is_some());
    }

    #[test]
    fn compact_datetime_numbers_render_as_digits() {
        assert_eq!(
            text(
                RawValue::Number(20_240_101_080_715.0),
                Coercion::Timestamp,
                CanonicalField::ArrivalTime
            ),
            Some("20240101080715".to_string())
        );
    }

    #[test]
    fn serial_rounding_rolls_into_next_day() {
        let dt = serial_to_datetime(45_292.999_999_9).unwrap();
        assert_eq!(dt.to_string(), "2024-01-02 00:00:00");
    }
}
