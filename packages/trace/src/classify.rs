//! Per-date sign classification of sheet measurements.
//!
//! Truth table for one manhole cell:
//!
//! | cell                  | detection | monitoring | sampling |
//! |-----------------------|-----------|------------|----------|
//! | numeric `v > 0`       | Positive  | Positive   | Positive |
//! | numeric `v <= 0`      | Barrier   | Positive   | Positive |
//! | missing / non-numeric | Neutral   | Positive   | Neutral  |
//!
//! [`TraceMode::PausedMonitoring`] classifies like sampling. Only detection
//! ever produces barriers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sewershed_measurement_models::DayMeasurements;
use sewershed_trace_models::{DayClassification, InvalidDateError, Sign, TraceMode};

/// Sign of a single cell under `mode`.
#[must_use]
pub fn sign_for(value: Option<f64>, mode: TraceMode) -> Sign {
    match value {
        Some(v) if v > 0.0 => Sign::Positive,
        Some(_) if mode.yields_barriers() => Sign::Barrier,
        Some(_) => Sign::Positive,
        None if mode == TraceMode::Monitoring => Sign::Positive,
        None => Sign::Neutral,
    }
}

/// Converts date columns into [`DayClassification`]s and renders date
/// labels in the sheet's format.
#[derive(Debug, Clone)]
pub struct ModeClassifier {
    date_format: String,
}

impl ModeClassifier {
    /// Creates a classifier whose error messages use `date_format`.
    #[must_use]
    pub fn new(date_format: &str) -> Self {
        Self {
            date_format: date_format.to_string(),
        }
    }

    /// Renders a date the way the sheet headers spell it.
    #[must_use]
    pub fn label(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Parses a user-supplied date label.
    ///
    /// ISO dates (`2021-06-07`) are accepted as well as the sheet format.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateError`] if the label is not a real calendar date
    /// in either format (e.g. `2/30/21`).
    pub fn parse_label(&self, label: &str) -> Result<NaiveDate, InvalidDateError> {
        let label = label.trim();
        NaiveDate::parse_from_str(label, &self.date_format)
            .or_else(|_| NaiveDate::parse_from_str(label, "%Y-%m-%d"))
            .map_err(|_| InvalidDateError::new(label))
    }

    /// Classifies every row of one date column.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateError`] if no row has a numeric measurement,
    /// meaning the date was never actually sampled.
    pub fn classify(
        &self,
        day: &DayMeasurements,
        mode: TraceMode,
    ) -> Result<DayClassification, InvalidDateError> {
        if day.is_all_missing() {
            return Err(InvalidDateError::new(self.label(day.date)));
        }

        let mut signs = BTreeMap::new();
        for cell in day.iter() {
            signs.insert(cell.manhole_id.clone(), sign_for(cell.value(), mode));
        }

        log::trace!(
            "Classified {} manholes for {} in {mode} mode",
            signs.len(),
            self.label(day.date)
        );

        Ok(DayClassification {
            date: day.date,
            mode,
            signs,
        })
    }
}
