//! Source format detection.
//!
//! Decides which vendor convention produced a batch by matching the first
//! row's column names against each registered [`Signature`] in rank order.
//! Unmatched batches are [`SourceFormat::Generic`]; detection never fails.
//!
//! [`Signature`]: crate::format_def::Signature

use std::collections::BTreeSet;

use fire_response_incident_models::{RawRow, SourceFormat};

use crate::registry::all_formats;

/// Normalizes a column name for comparison.
///
/// Lowercases, trims, and collapses every run of non-alphanumeric
/// characters into a single `_`, so `"Time_First_Unit_Enroute"`,
/// `"time first unit enroute"` and `"eTimes.03"` / `"etimes_03"` compare
/// equal.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Detects the source format of a batch from its first row's columns.
#[must_use]
pub fn detect_format(rows: &[RawRow]) -> SourceFormat {
    let Some(first) = rows.first() else {
        log::debug!("Empty batch, using generic format");
        return SourceFormat::Generic;
    };

    let columns: BTreeSet<String> = first.keys().map(|k| normalize_column_name(k)).collect();

    for def in all_formats() {
        let Some(signature) = &def.signature else {
            continue;
        };
        if let Some(strength) = signature.matches(&columns) {
            log::debug!(
                "Detected {} ({:?} signature match over {} columns)",
                def.format,
                strength,
                columns.len()
            );
            return def.format;
        }
    }

    log::debug!(
        "No vendor signature matched {} columns, using generic format",
        columns.len()
    );
    SourceFormat::Generic
}
