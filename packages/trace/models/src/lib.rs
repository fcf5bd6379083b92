#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trace modes, sign classification, and status report types.
//!
//! These types are shared by the trace engine, the positivity statistics,
//! and the report consumers (CLI output, drop-in CSV export).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sewershed_network_models::ManholeId;
use strum_macros::{AsRefStr, Display, EnumString};

/// How measurements are interpreted when tracing.
///
/// The three composite modes are nested in severity: a detected manhole
/// was sampled, and a sampled manhole is monitored.
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
pub enum TraceMode {
    /// Only positive samples seed the trace; negative samples are barriers.
    Detection,
    /// Every manhole on the sheet counts as active, sampled or not.
    Monitoring,
    /// Every manhole sampled that day counts as active.
    Sampling,
    /// Traces from the paused manholes themselves.
    PausedMonitoring,
}

impl TraceMode {
    /// Modes combined by the composite status classification.
    pub const COMPOSITE: [Self; 3] = [Self::Detection, Self::Monitoring, Self::Sampling];

    /// Every mode, composite modes first.
    pub const ALL: [Self; 4] = [
        Self::Detection,
        Self::Monitoring,
        Self::Sampling,
        Self::PausedMonitoring,
    ];

    /// Whether this mode can turn a manhole into a traversal barrier.
    #[must_use]
    pub const fn yields_barriers(self) -> bool {
        matches!(self, Self::Detection)
    }
}

/// Three-valued classification of a manhole for one (date, mode) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    /// Seeds the trace (+1).
    Positive,
    /// Stops traversal (-1). Only produced in [`TraceMode::Detection`].
    Barrier,
    /// Neither seed nor barrier (0).
    Neutral,
}

impl Sign {
    /// The numeric encoding (+1, -1, 0).
    #[must_use]
    pub const fn value(self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Barrier => -1,
            Self::Neutral => 0,
        }
    }
}

/// Signs for every manhole on the sheet for one date and mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayClassification {
    /// The classified date.
    pub date: NaiveDate,
    /// The mode used.
    pub mode: TraceMode,
    /// Sign per manhole.
    pub signs: BTreeMap<ManholeId, Sign>,
}

impl DayClassification {
    /// Manholes classified [`Sign::Positive`].
    #[must_use]
    pub fn positive_seeds(&self) -> BTreeSet<ManholeId> {
        self.with_sign(Sign::Positive)
    }

    /// Manholes classified [`Sign::Barrier`].
    #[must_use]
    pub fn barriers(&self) -> BTreeSet<ManholeId> {
        self.with_sign(Sign::Barrier)
    }

    /// Sign of a single manhole, if it is on the sheet.
    #[must_use]
    pub fn sign(&self, manhole_id: &str) -> Option<Sign> {
        self.signs.get(manhole_id).copied()
    }

    fn with_sign(&self, sign: Sign) -> BTreeSet<ManholeId> {
        self.signs
            .iter()
            .filter(|(_, s)| **s == sign)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Composite monitoring status of a manhole.
///
/// The first four variants are ordinal levels 0-3, determined by how many
/// of the [`TraceMode::COMPOSITE`] modes affect the manhole.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ManholeStatus {
    /// Level 0.
    #[strum(serialize = "Not Currently Monitored")]
    NotMonitored,
    /// Level 1.
    #[strum(serialize = "Currently Monitored + Not Sampled")]
    MonitoredNotSampled,
    /// Level 2.
    #[strum(serialize = "Currently Monitored + Sampled + Not Detected")]
    SampledNotDetected,
    /// Level 3.
    #[strum(serialize = "Currently Monitored + Sampled + Detected")]
    Detected,
    /// Not affected by any mode while its manhole is seasonally paused.
    #[strum(serialize = "Monitoring Paused")]
    Paused,
}

impl ManholeStatus {
    /// Maps an affected-mode count to its level.
    ///
    /// Returns `None` for counts above 3.
    #[must_use]
    pub const fn from_count(count: u8) -> Option<Self> {
        match count {
            0 => Some(Self::NotMonitored),
            1 => Some(Self::MonitoredNotSampled),
            2 => Some(Self::SampledNotDetected),
            3 => Some(Self::Detected),
            _ => None,
        }
    }

    /// The ordinal level, or `None` for [`ManholeStatus::Paused`].
    #[must_use]
    pub const fn level(self) -> Option<u8> {
        match self {
            Self::NotMonitored => Some(0),
            Self::MonitoredNotSampled => Some(1),
            Self::SampledNotDetected => Some(2),
            Self::Detected => Some(3),
            Self::Paused => None,
        }
    }
}

/// Reports carry the status label, e.g. `"Monitoring Paused"`.
impl Serialize for ManholeStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ManholeStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// One row of the composite status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Manhole identifier.
    pub manhole_id: ManholeId,
    /// Composite status after overrides.
    pub status: ManholeStatus,
    /// Number of composite modes the manhole was affected in (0-3).
    pub affected_modes: u8,
    /// Raw measurement recorded for the date, empty when absent.
    pub measurement: String,
}

/// A list of affected IDs, or the error that prevented computing it.
///
/// This is the shape report consumers receive: on error the list is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedReport {
    /// Error message, if the trace failed.
    pub error: Option<String>,
    /// Affected building or manhole IDs, sorted.
    pub ids: Vec<String>,
}

/// Error returned when a date is not present in the measurement source, or
/// cannot be read as a date at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDateError {
    /// The date as requested.
    pub date: String,
}

impl InvalidDateError {
    /// Creates an error for the given date label.
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self { date: date.into() }
    }
}

impl std::fmt::Display for InvalidDateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid date '{}', please choose a date that exists in the wastewater sheet",
            self.date
        )
    }
}

impl std::error::Error for InvalidDateError {}
