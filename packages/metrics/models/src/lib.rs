#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Response-time metric and aggregate statistics types.
//!
//! A [`ResponseTimeMetrics`] holds the six interval durations derived from
//! one canonical incident; a [`ResponseTimeStatistics`] summarizes many of
//! them field by field. All durations are in seconds.

use fire_response_incident_models::CanonicalField;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Upper bound (exclusive) for the dispatch, turnout, travel, and total
/// response intervals: 24 hours.
pub const MAX_RESPONSE_INTERVAL_SECONDS: f64 = 86_400.0;

/// Upper bound (exclusive) for the scene and total incident intervals:
/// 72 hours.
pub const MAX_INCIDENT_INTERVAL_SECONDS: f64 = 259_200.0;

/// NFPA 1710 turnout benchmark for fire suppression responses.
pub const NFPA_1710_TURNOUT_SECONDS: f64 = 80.0;

/// NFPA 1710 travel benchmark for the first arriving engine.
pub const NFPA_1710_TRAVEL_SECONDS: f64 = 240.0;

/// One response-time interval.
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
pub enum MetricField {
    /// Incident received to unit dispatched
    DispatchTime,
    /// Unit dispatched to unit en route
    TurnoutTime,
    /// Unit en route to unit on scene
    TravelTime,
    /// Incident received to unit on scene
    TotalResponseTime,
    /// Unit on scene to unit cleared
    SceneTime,
    /// Incident received to unit cleared
    TotalIncidentTime,
}

impl MetricField {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DispatchTime,
            Self::TurnoutTime,
            Self::TravelTime,
            Self::TotalResponseTime,
            Self::SceneTime,
            Self::TotalIncidentTime,
        ]
    }

    /// The canonical timestamps this interval runs between, start first.
    #[must_use]
    pub const fn endpoints(self) -> (CanonicalField, CanonicalField) {
        match self {
            Self::DispatchTime => (CanonicalField::IncidentTime, CanonicalField::DispatchTime),
            Self::TurnoutTime => (CanonicalField::DispatchTime, CanonicalField::EnRouteTime),
            Self::TravelTime => (CanonicalField::EnRouteTime, CanonicalField::ArrivalTime),
            Self::TotalResponseTime => {
                (CanonicalField::IncidentTime, CanonicalField::ArrivalTime)
            }
            Self::SceneTime => (CanonicalField::ArrivalTime, CanonicalField::ClearTime),
            Self::TotalIncidentTime => (CanonicalField::IncidentTime, CanonicalField::ClearTime),
        }
    }

    /// Exclusive upper bound on a plausible value, in seconds.
    #[must_use]
    pub const fn ceiling_seconds(self) -> f64 {
        match self {
            Self::DispatchTime
            | Self::TurnoutTime
            | Self::TravelTime
            | Self::TotalResponseTime => MAX_RESPONSE_INTERVAL_SECONDS,
            Self::SceneTime | Self::TotalIncidentTime => MAX_INCIDENT_INTERVAL_SECONDS,
        }
    }

    /// Whether `seconds` is a plausible value for this interval.
    #[must_use]
    pub fn accepts(self, seconds: f64) -> bool {
        seconds >= 0.0 && seconds < self.ceiling_seconds()
    }
}

/// Interval durations for a single incident, in seconds.
///
/// A field is present only when both endpoints parsed and the duration is
/// plausible for that interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeMetrics {
    /// Incident received to unit dispatched.
    pub dispatch_time: Option<f64>,
    /// Unit dispatched to unit en route.
    pub turnout_time: Option<f64>,
    /// Unit en route to unit on scene.
    pub travel_time: Option<f64>,
    /// Incident received to unit on scene.
    pub total_response_time: Option<f64>,
    /// Unit on scene to unit cleared.
    pub scene_time: Option<f64>,
    /// Incident received to unit cleared.
    pub total_incident_time: Option<f64>,
}

impl ResponseTimeMetrics {
    /// Returns the value of `field`.
    #[must_use]
    pub const fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::DispatchTime => self.dispatch_time,
            MetricField::TurnoutTime => self.turnout_time,
            MetricField::TravelTime => self.travel_time,
            MetricField::TotalResponseTime => self.total_response_time,
            MetricField::SceneTime => self.scene_time,
            MetricField::TotalIncidentTime => self.total_incident_time,
        }
    }

    /// Sets the value of `field`.
    pub const fn set(&mut self, field: MetricField, value: Option<f64>) {
        let slot = match field {
            MetricField::DispatchTime => &mut self.dispatch_time,
            MetricField::TurnoutTime => &mut self.turnout_time,
            MetricField::TravelTime => &mut self.travel_time,
            MetricField::TotalResponseTime => &mut self.total_response_time,
            MetricField::SceneTime => &mut self.scene_time,
            MetricField::TotalIncidentTime => &mut self.total_incident_time,
        };
        *slot = value;
    }

    /// Whether no interval is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        MetricField::all().iter().all(|f| self.get(*f).is_none())
    }
}

/// Number of values that contributed to each field's statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSampleCounts {
    /// Samples for [`MetricField::DispatchTime`].
    pub dispatch_time: usize,
    /// Samples for [`MetricField::TurnoutTime`].
    pub turnout_time: usize,
    /// Samples for [`MetricField::TravelTime`].
    pub travel_time: usize,
    /// Samples for [`MetricField::TotalResponseTime`].
    pub total_response_time: usize,
    /// Samples for [`MetricField::SceneTime`].
    pub scene_time: usize,
    /// Samples for [`MetricField::TotalIncidentTime`].
    pub total_incident_time: usize,
}

impl MetricSampleCounts {
    /// Returns the sample count for `field`.
    #[must_use]
    pub const fn get(&self, field: MetricField) -> usize {
        match field {
            MetricField::DispatchTime => self.dispatch_time,
            MetricField::TurnoutTime => self.turnout_time,
            MetricField::TravelTime => self.travel_time,
            MetricField::TotalResponseTime => self.total_response_time,
            MetricField::SceneTime => self.scene_time,
            MetricField::TotalIncidentTime => self.total_incident_time,
        }
    }

    /// Sets the sample count for `field`.
    pub const fn set(&mut self, field: MetricField, count: usize) {
        let slot = match field {
            MetricField::DispatchTime => &mut self.dispatch_time,
            MetricField::TurnoutTime => &mut self.turnout_time,
            MetricField::TravelTime => &mut self.travel_time,
            MetricField::TotalResponseTime => &mut self.total_response_time,
            MetricField::SceneTime => &mut self.scene_time,
            MetricField::TotalIncidentTime => &mut self.total_incident_time,
        };
        *slot = count;
    }
}

/// Descriptive statistics over a set of [`ResponseTimeMetrics`], computed
/// independently per field.
///
/// A field with no samples is absent from every aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeStatistics {
    /// Arithmetic mean.
    pub mean: ResponseTimeMetrics,
    /// Median; the average of the middle pair for even sample counts.
    pub median: ResponseTimeMetrics,
    /// 90th percentile by ceiling-indexed selection.
    pub percentile_90: ResponseTimeMetrics,
    /// Population standard deviation.
    pub std_dev: ResponseTimeMetrics,
    /// Smallest value.
    pub min: ResponseTimeMetrics,
    /// Largest value.
    pub max: ResponseTimeMetrics,
    /// Incidents contributing at least one valid interval.
    pub count: usize,
    /// Values contributing to each field.
    pub sample_counts: MetricSampleCounts,
}
