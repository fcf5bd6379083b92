#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Measurement sources for the wastewater sampling sheet.
//!
//! The core engines only see the [`MeasurementSource`] trait. Two
//! implementations are provided: [`sheet::MeasurementSheet`], an in-memory
//! parsed CSV export, and [`remote::RemoteSheetSource`], which downloads the
//! published sheet on every request.

pub mod remote;
pub mod sheet;

use chrono::NaiveDate;
use sewershed_measurement_models::{DayMeasurements, SampleInfo};

pub use sewershed_measurement_models::{MeasurementCell, SheetLayout};

/// Errors that can occur while reading measurements.
///
/// Any of these means the source could not be read at all, as opposed to a
/// date simply being absent from it.
#[derive(Debug, thiserror::Error)]
pub enum MeasurementError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The sheet has fewer rows than the configured header offset.
    #[error("Sheet has no header at row {row}")]
    MissingHeader {
        /// Configured zero-based header row.
        row: usize,
    },

    /// A required column is not present in the header row.
    #[error("Sheet is missing required column '{column}'")]
    MissingColumn {
        /// The missing header.
        column: String,
    },
}

/// Trait that every measurement provider implements.
///
/// `day` distinguishes a date that is absent from the source (`Ok(None)`)
/// from a source that cannot be read (`Err`).
pub trait MeasurementSource: Send + Sync {
    /// Human-readable label used in log messages.
    fn label(&self) -> &str;

    /// Returns every manhole row for `date`, or `None` when the source has
    /// no column for that date.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] if the source is unreachable or
    /// unreadable.
    fn day(&self, date: NaiveDate) -> Result<Option<DayMeasurements>, MeasurementError>;

    /// Sample bookkeeping rows, used to annotate drop-in exports.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] if the source is unreachable or
    /// unreadable.
    fn sample_info(&self) -> Result<Vec<SampleInfo>, MeasurementError> {
        Ok(Vec::new())
    }
}
