#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Timestamp normalization for fire/EMS incident exports.
//!
//! CAD exports and hand-maintained spreadsheets carry timestamps in many
//! shapes: bare `HH:MM:SS` times that only make sense next to the incident
//! date, US slash dates with AM/PM suffixes, and outright corrupted values
//! produced by botched spreadsheet concatenation. [`normalize_timestamp`]
//! runs a fixed chain of [`RepairRule`]s and then [`ParseRule`]s, returning
//! the first successful parse as a local wall-clock [`NaiveDateTime`].
//!
//! An unparseable value is an expected outcome for dirty data and is
//! reported as `None`, never as an error.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::{Captures, Regex};

/// `YYYY HH:MM[:SS]-MM-DD`, left behind when a date column and a time column
/// were concatenated in the wrong order.
static SCRAMBLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})\s+(\d{1,2}:\d{2}(?::\d{2})?)-(\d{1,2})-(\d{1,2})$").expect("valid regex")
});

/// Any `M/D/YYYY` occurrence.
static SLASH_DATE_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{2,4}").expect("valid regex"));

/// `M/D/YYYY` with an optional time and AM/PM marker.
static SLASH_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})(?:[\sT]+(\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?\s*([AaPp][Mm])?)?$",
    )
    .expect("valid regex")
});

/// `YYYY-MM-DD HH:MM[:SS[.fff]]` with an optional AM/PM marker.
static DASH_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})\s+(\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?\s*([AaPp][Mm])?$",
    )
    .expect("valid regex")
});

/// `YYYYMMDDHHMMSS`, as written by some CAD audit tables, optionally
/// followed by a two-letter zone code (`ES`, `ED`) that is ignored.
static COMPACT_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})(?:[A-Za-z]{2})?$")
        .expect("valid regex")
});

/// Leading calendar date of a base-date string.
static ISO_DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid regex"));

/// Leading slash date of a base-date string.
static SLASH_DATE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})").expect("valid regex"));

/// Date-time formats tried by the general fallback rule.
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%b %d, %Y %I:%M:%S %p",
];

/// Date-only formats tried by the general fallback rule (midnight).
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%Y%m%d"];

/// Bare-time formats combined with the base date.
const BARE_TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M%p", "%I:%M %p"];

/// A rewrite applied to known malformation patterns before parsing.
#[derive(Debug, Clone, Copy)]
pub struct RepairRule {
    /// Short rule name, used in trace logging.
    pub name: &'static str,
    /// Whether the rule is worth attempting for this input.
    pub applies: fn(&str) -> bool,
    /// Produces the repaired string, or `None` if the pattern isn't present.
    pub repair: fn(&str) -> Option<String>,
}

/// One step of the ordered parse chain.
#[derive(Debug, Clone, Copy)]
pub struct ParseRule {
    /// Short rule name, used in trace logging.
    pub name: &'static str,
    /// Whether the input has the shape this rule handles.
    pub applies: fn(&str) -> bool,
    /// Parses the input, given the already-parsed base date (if any).
    pub parse: fn(&str, Option<NaiveDate>) -> Option<NaiveDateTime>,
}

/// Repairs, tried in order; the first one that produces output wins.
pub const REPAIR_RULES: &[RepairRule] = &[
    RepairRule {
        name: "duplicated_datetime",
        applies: has_datetime_separator,
        repair: repair_duplicated_datetime,
    },
    RepairRule {
        name: "scrambled_year_time_month_day",
        applies: has_datetime_separator,
        repair: repair_scrambled_datetime,
    },
];

/// Parsers, tried in order; the first one that succeeds wins.
pub const PARSE_RULES: &[ParseRule] = &[
    ParseRule {
        name: "bare_time",
        applies: is_bare_time,
        parse: parse_bare_time,
    },
    ParseRule {
        name: "military_time",
        applies: is_military_time,
        parse: parse_military_time,
    },
    ParseRule {
        name: "slash_date",
        applies: has_slash_date,
        parse: parse_slash_datetime,
    },
    ParseRule {
        name: "dash_date_space_time",
        applies: has_dash_date_and_time,
        parse: parse_dash_datetime,
    },
    ParseRule {
        name: "general",
        applies: always,
        parse: parse_general,
    },
];

/// Normalizes a raw timestamp into a local wall-clock instant.
///
/// `base_date` is the incident's date and is only consulted for inputs that
/// carry a time without a date. Returns `None` for missing, blank, or
/// unparseable input.
#[must_use]
pub fn normalize_timestamp(raw: Option<&str>, base_date: &str) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let repaired = apply_repairs(raw);
    let input = repaired.as_deref().unwrap_or(raw);
    let base = parse_calendar_date(base_date);

    for rule in PARSE_RULES {
        if !(rule.applies)(input) {
            continue;
        }
        if let Some(parsed) = (rule.parse)(input, base) {
            log::trace!("Parsed timestamp '{raw}' with rule {}", rule.name);
            return Some(parsed);
        }
    }

    log::trace!("Timestamp '{raw}' is unparseable");
    None
}

/// Parses a timestamp that carries an explicit UTC offset (RFC 3339).
#[must_use]
pub fn parse_offset_timestamp(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw?.trim()).ok()
}

/// Time elapsed from `start` to `end`.
///
/// When both endpoints carry a UTC offset they are compared as absolute
/// instants; otherwise both are normalized to wall-clock time with
/// [`normalize_timestamp`] against `base_date`.
#[must_use]
pub fn elapsed(start: Option<&str>, end: Option<&str>, base_date: &str) -> Option<TimeDelta> {
    if let (Some(start), Some(end)) = (parse_offset_timestamp(start), parse_offset_timestamp(end))
    {
        return Some(end - start);
    }
    Some(normalize_timestamp(end, base_date)? - normalize_timestamp(start, base_date)?)
}

/// Runs the repair chain, returning the first repaired string.
#[must_use]
pub fn apply_repairs(raw: &str) -> Option<String> {
    REPAIR_RULES.iter().find_map(|rule| {
        if !(rule.applies)(raw) {
            return None;
        }
        let repaired = (rule.repair)(raw)?;
        log::trace!("Repaired timestamp '{raw}' -> '{repaired}' ({})", rule.name);
        Some(repaired)
    })
}

/// Parses the calendar date out of a base-date string.
///
/// Accepts `YYYY-MM-DD` and `M/D/YYYY` prefixes (so full date-time strings
/// work too), then falls back to the general parse chain.
#[must_use]
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE_PREFIX_RE.captures(raw) {
        return NaiveDate::from_ymd_opt(
            capture_num(&caps, 1)?,
            capture_num(&caps, 2)?,
            capture_num(&caps, 3)?,
        );
    }
    if let Some(caps) = SLASH_DATE_PREFIX_RE.captures(raw) {
        return slash_date(&caps);
    }

    let repaired = apply_repairs(raw);
    let input = repaired.as_deref().unwrap_or(raw);
    PARSE_RULES
        .iter()
        .filter(|rule| (rule.applies)(input))
        .find_map(|rule| (rule.parse)(input, None))
        .map(|dt| dt.date())
}

// ── Predicates ───────────────────────────────────────────────────────────

fn has_datetime_separator(s: &str) -> bool {
    s.contains('T')
}

fn is_bare_time(s: &str) -> bool {
    s.len() <= 8 && s.contains(':') && !s.contains('/') && !s.contains('-')
}

fn is_military_time(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn has_slash_date(s: &str) -> bool {
    s.contains('/')
}

fn has_dash_date_and_time(s: &str) -> bool {
    s.contains('-') && s.contains(' ') && s.contains(':')
}

const fn always(_: &str) -> bool {
    true
}

// ── Repairs ──────────────────────────────────────────────────────────────

/// `"2020 12:30:28-04-28T04/28/2020 12:30:28"` keeps the well-formed slash
/// date-time that follows the separator.
fn repair_duplicated_datetime(s: &str) -> Option<String> {
    let (_, after) = s.split_once('T')?;
    let after = after.trim();
    SLASH_DATE_FRAGMENT_RE
        .is_match(after)
        .then(|| after.to_string())
}

/// `"2020 12:30:28-04-28T..."` is reassembled into `"2020-04-28 12:30:28"`.
fn repair_scrambled_datetime(s: &str) -> Option<String> {
    let (before, _) = s.split_once('T')?;
    let caps = SCRAMBLED_RE.captures(before.trim())?;
    Some(format!(
        "{}-{}-{} {}",
        &caps[1], &caps[3], &caps[4], &caps[2]
    ))
}

// ── Parsers ──────────────────────────────────────────────────────────────

fn parse_bare_time(s: &str, base: Option<NaiveDate>) -> Option<NaiveDateTime> {
    let date = base?;
    BARE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .map(|time| date.and_time(time))
}

/// `"0830"` style HHMM times, combined with the base date.
fn parse_military_time(s: &str, base: Option<NaiveDate>) -> Option<NaiveDateTime> {
    let date = base?;
    let hour = s[..2].parse::<u32>().ok()?;
    let min = s[2..].parse::<u32>().ok()?;
    let time = NaiveTime::from_hms_opt(hour, min, 0)?;
    Some(date.and_time(time))
}

fn parse_slash_datetime(s: &str, _base: Option<NaiveDate>) -> Option<NaiveDateTime> {
    let caps = SLASH_DATETIME_RE.captures(s)?;
    let date = slash_date(&caps)?;
    let time = captured_time(&caps, 4)?;
    Some(date.and_time(time))
}

fn parse_dash_datetime(s: &str, _base: Option<NaiveDate>) -> Option<NaiveDateTime> {
    let caps = DASH_DATETIME_RE.captures(s)?;
    let date = NaiveDate::from_ymd_opt(
        capture_num(&caps, 1)?,
        capture_num(&caps, 2)?,
        capture_num(&caps, 3)?,
    )?;
    let time = captured_time(&caps, 4)?;
    Some(date.and_time(time))
}

fn parse_general(s: &str, _base: Option<NaiveDate>) -> Option<NaiveDateTime> {
    // Offsets are dropped here; see `elapsed` for offset-aware intervals.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(caps) = COMPACT_DATETIME_RE.captures(s) {
        let date = NaiveDate::from_ymd_opt(
            capture_num(&caps, 1)?,
            capture_num(&caps, 2)?,
            capture_num(&caps, 3)?,
        )?;
        let time = NaiveTime::from_hms_opt(
            capture_num(&caps, 4)?,
            capture_num(&caps, 5)?,
            capture_num(&caps, 6)?,
        )?;
        return Some(date.and_time(time));
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

// ── Capture helpers ──────────────────────────────────────────────────────

fn capture_num<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

/// Builds a date from `(month, day, year)` captures 1–3. Two-digit years
/// are taken to be in the 2000s.
fn slash_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let month = capture_num(caps, 1)?;
    let day = capture_num(caps, 2)?;
    let year_str = caps.get(3)?.as_str();
    let mut year: i32 = year_str.parse().ok()?;
    if year_str.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Builds a time from `hour, minute, second, fraction, meridiem` captures
/// starting at `first`. A missing hour means midnight.
fn captured_time(caps: &Captures<'_>, first: usize) -> Option<NaiveTime> {
    let Some(hour) = caps.get(first) else {
        return Some(NaiveTime::MIN);
    };
    let mut hour: u32 = hour.as_str().parse().ok()?;
    let min: u32 = capture_num(caps, first + 1)?;
    let sec: u32 = caps
        .get(first + 2)
        .map_or(Some(0), |m| m.as_str().parse().ok())?;
    let nanos = caps
        .get(first + 3)
        .map_or(Some(0), |m| fraction_nanos(m.as_str()))?;

    if let Some(meridiem) = caps.get(first + 4) {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) | (false, _) => hour,
            (true, _) => hour + 12,
        };
    }

    NaiveTime::from_hms_nano_opt(hour, min, sec, nanos)
}

/// Converts fractional-second digits (`"5"`, `"250"`, ...) to nanoseconds.
fn fraction_nanos(digits: &str) -> Option<u32> {
    let padded = format!("{digits:0<9}");
    padded.get(..9)?.parse().ok()
}
