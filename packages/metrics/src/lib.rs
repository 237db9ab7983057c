#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Response-time metrics and aggregate statistics.
//!
//! [`compute_metrics`] turns one canonical incident into six interval
//! durations, discarding implausible ones. [`compute_statistics`] then
//! summarizes a set of those per field. Both are pure functions over owned
//! values.

use std::collections::BTreeMap;

use fire_response_incident_models::{CanonicalField, CanonicalIncident};
use fire_response_timestamp::elapsed;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use fire_response_metrics_models::{
    MAX_INCIDENT_INTERVAL_SECONDS, MAX_RESPONSE_INTERVAL_SECONDS, MetricField,
    MetricSampleCounts, NFPA_1710_TRAVEL_SECONDS, NFPA_1710_TURNOUT_SECONDS,
    ResponseTimeMetrics, ResponseTimeStatistics,
};

/// Group key for incidents whose grouping field is absent.
pub const UNKNOWN_GROUP: &str = "UNKNOWN";

/// Incident attribute used to break statistics down.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatisticsGroup {
    /// Group by dispatch priority
    Priority,
    /// Group by incident type / nature code
    IncidentType,
    /// Group by responding unit
    RespondingUnit,
}

impl StatisticsGroup {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Priority, Self::IncidentType, Self::RespondingUnit]
    }

    /// The canonical field holding this group's key.
    #[must_use]
    pub const fn field(self) -> CanonicalField {
        match self {
            Self::Priority => CanonicalField::Priority,
            Self::IncidentType => CanonicalField::IncidentType,
            Self::RespondingUnit => CanonicalField::RespondingUnit,
        }
    }
}

/// Computes the interval durations for one incident.
///
/// Endpoints that both carry a UTC offset are compared as instants; all
/// others are normalized with the incident's date as the base (empty when
/// absent). An interval is kept only when both endpoints parse and the
/// duration is non-negative and strictly below its ceiling.
#[must_use]
pub fn compute_metrics(incident: &CanonicalIncident) -> ResponseTimeMetrics {
    let base_date = incident.incident_date.as_deref().unwrap_or_default();
    let mut metrics = ResponseTimeMetrics::default();

    for field in MetricField::all() {
        let (start, end) = field.endpoints();
        let Some(delta) = elapsed(incident.text(start), incident.text(end), base_date) else {
            continue;
        };

        #[allow(clippy::cast_precision_loss)]
        let seconds = delta.num_milliseconds() as f64 / 1000.0;
        if field.accepts(seconds) {
            metrics.set(*field, Some(seconds));
        } else {
            log::trace!(
                "Discarding implausible {field} of {seconds}s for incident {:?}",
                incident.incident_id
            );
        }
    }

    metrics
}

/// Summarizes interval durations field by field.
///
/// Fields with no samples are absent from every aggregate. `count` is the
/// number of entries with at least one interval present.
#[must_use]
pub fn compute_statistics(metrics: &[ResponseTimeMetrics]) -> ResponseTimeStatistics {
    let mut stats = ResponseTimeStatistics {
        count: metrics.iter().filter(|m| !m.is_empty()).count(),
        ..ResponseTimeStatistics::default()
    };

    for field in MetricField::all() {
        let mut values: Vec<f64> = metrics.iter().filter_map(|m| m.get(*field)).collect();
        stats.sample_counts.set(*field, values.len());
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);

        let mean = mean(&values);
        stats.mean.set(*field, Some(mean));
        stats.median.set(*field, Some(median(&values)));
        stats.percentile_90.set(*field, Some(percentile(&values, 90)));
        stats.std_dev.set(*field, Some(std_dev(&values, mean)));
        stats.min.set(*field, values.first().copied());
        stats.max.set(*field, values.last().copied());
    }

    log::debug!(
        "Computed statistics over {} incidents ({} with valid intervals)",
        metrics.len(),
        stats.count
    );

    stats
}

/// Computes metrics and statistics per group of incidents.
///
/// Incidents lacking the grouping field fall into [`UNKNOWN_GROUP`].
#[must_use]
pub fn compute_statistics_by(
    incidents: &[CanonicalIncident],
    group: StatisticsGroup,
) -> BTreeMap<String, ResponseTimeStatistics> {
    let mut grouped: BTreeMap<String, Vec<ResponseTimeMetrics>> = BTreeMap::new();
    for incident in incidents {
        let key = incident.text(group.field()).unwrap_or(UNKNOWN_GROUP);
        grouped
            .entry(key.to_string())
            .or_default()
            .push(compute_metrics(incident));
    }

    grouped
        .into_iter()
        .map(|(key, metrics)| (key, compute_statistics(&metrics)))
        .collect()
}

/// Fraction of present `field` values at or below `threshold_seconds`.
///
/// Returns `None` when no entry has `field`.
#[must_use]
pub fn compliance_rate(
    metrics: &[ResponseTimeMetrics],
    field: MetricField,
    threshold_seconds: f64,
) -> Option<f64> {
    let (within, total) = metrics
        .iter()
        .filter_map(|m| m.get(field))
        .fold((0_usize, 0_usize), |(within, total), v| {
            (within + usize::from(v <= threshold_seconds), total + 1)
        });
    if total == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(within as f64 / total as f64)
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a sorted, non-empty slice.
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Nearest-rank percentile of a sorted, non-empty slice:
/// index `ceil(p/100 * n) - 1`, clamped to the slice.
fn percentile(sorted: &[f64], p: usize) -> f64 {
    let n = sorted.len();
    let rank = (p.min(100) * n).div_ceil(100);
    sorted[rank.saturating_sub(1).min(n - 1)]
}

/// Population standard deviation.
#[allow(clippy::cast_precision_loss)]
fn std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
