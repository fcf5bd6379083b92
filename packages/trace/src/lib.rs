#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Mode classification and barrier-limited exposure tracing.
//!
//! [`classify::ModeClassifier`] turns one date column of the sampling sheet
//! into signed seeds and barriers. [`engine::TraceEngine`] combines those
//! with the sewer network to answer which buildings and manholes a positive
//! sample may have come from, and to build the composite per-manhole status
//! report. [`dropin`] flattens that report into the lab's CSV format.

pub mod classify;
pub mod dropin;
pub mod engine;

use std::collections::BTreeSet;

use serde::Deserialize;
use sewershed_measurement::MeasurementError;
use sewershed_network::TopologyError;
use sewershed_network_models::ManholeId;
use thiserror::Error;

pub use classify::ModeClassifier;
pub use engine::TraceEngine;
pub use sewershed_trace_models::{
    AffectedReport, DayClassification, InvalidDateError, ManholeStatus, Sign, StatusRecord,
    TraceMode,
};

/// Errors that can occur while tracing.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The date is not in the sheet, or has no measurements at all.
    #[error(transparent)]
    InvalidDate(#[from] InvalidDateError),

    /// The measurement source could not be read.
    #[error("Upstream fetch failure: {0}")]
    UpstreamFetch(#[from] MeasurementError),

    /// The network topology is malformed.
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Writing an export failed.
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
}

/// Static tracing configuration, loaded once per engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Manholes whose sampling is suspended (e.g. for the summer quarter).
    /// They act as barriers in every composite mode.
    pub paused: BTreeSet<ManholeId>,
    /// Manholes always reported as monitored-but-not-sampled.
    pub excluded: BTreeSet<ManholeId>,
    /// `chrono` format used to render and parse date labels. Not read from
    /// config files; it always follows the sheet layout.
    #[serde(skip)]
    pub date_format: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            paused: BTreeSet::new(),
            excluded: BTreeSet::new(),
            date_format: "%-m/%-d/%y".to_string(),
        }
    }
}
