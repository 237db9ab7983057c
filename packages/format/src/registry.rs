//! Format registry: every vendor mapping table, embedded at compile time.
//!
//! Each `.toml` file in `packages/format/formats/` is baked into the binary
//! at compile time via [`include_str!`]. Supporting a new vendor export is a
//! new TOML file, an entry in the list below, and its [`SourceFormat`] tag.

use std::sync::LazyLock;

use fire_response_incident_models::SourceFormat;

use crate::format_def::{FormatDefinition, parse_format_toml};

/// TOML configs embedded at compile time.
const FORMAT_TOMLS: &[(&str, &str)] = &[
    // ── CAD exports ──────────────────────────────────────────────────
    ("central_square", include_str!("../formats/central_square.toml")),
    (
        "tyler_new_world",
        include_str!("../formats/tyler_new_world.toml"),
    ),
    (
        "hexagon_intergraph",
        include_str!("../formats/hexagon_intergraph.toml"),
    ),
    (
        "motorola_premier_one",
        include_str!("../formats/motorola_premier_one.toml"),
    ),
    // ── RMS exports ──────────────────────────────────────────────────
    ("image_trend", include_str!("../formats/image_trend.toml")),
    // ── Fallback ─────────────────────────────────────────────────────
    ("generic", include_str!("../formats/generic.toml")),
];

/// Parsed definitions, sorted by detection rank.
static FORMATS: LazyLock<Vec<FormatDefinition>> = LazyLock::new(|| {
    let mut formats: Vec<FormatDefinition> = FORMAT_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_format_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect();
    formats.sort_by_key(|def| def.rank);
    formats
});

/// Returns all configured format definitions in detection order.
///
/// # Panics
///
/// Panics on first use if any embedded TOML config is malformed (the
/// configs are compiled in, so this is caught by the registry tests).
#[must_use]
pub fn all_formats() -> &'static [FormatDefinition] {
    &FORMATS
}

/// Returns the definition for `format`.
#[must_use]
pub fn definition_for(format: SourceFormat) -> Option<&'static FormatDefinition> {
    all_formats().iter().find(|def| def.format == format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_formats() {
        assert_eq!(all_formats().len(), FORMAT_TOMLS.len());
    }

    #[test]
    fn every_source_format_has_exactly_one_definition() {
        for format in SourceFormat::all() {
            let count = all_formats()
                .iter()
                .filter(|def| def.format == *format)
                .count();
            assert_eq!(count, 1, "{format} has {count} definitions");
        }
    }

    #[test]
    fn toml_file_names_match_their_format_tag() {
        for (name, toml) in FORMAT_TOMLS {
            let def = parse_format_toml(toml).unwrap();
            assert_eq!(def.format.to_string(), *name);
        }
    }

    #[test]
    fn generic_is_ranked_last() {
        let last = all_formats().last().unwrap();
        assert_eq!(last.format, SourceFormat::Generic);
    }

    #[test]
    fn ranks_are_unique() {
        let mut ranks: Vec<u32> = all_formats().iter().map(|d| d.rank).collect();
        ranks.dedup();
        assert_eq!(ranks.len(), all_formats().len());
    }

    #[test]
    fn all_formats_have_required_fields() {
        for def in all_formats() {
            assert!(!def.name.is_empty(), "{}: name is empty", def.format);
            assert!(
                def.fields.iter().any(|f| f.field
                    == fire_response_incident_models::CanonicalField::IncidentId),
                "{}: no incident_id mapping",
                def.format
            );
            assert!(
                def.fields.iter().all(|f| !f.key.is_empty()),
                "{}: a raw column normalizes to nothing",
                def.format
            );
        }
    }
}
