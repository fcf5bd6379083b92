#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-date manhole measurement types.
//!
//! A [`DayMeasurements`] is one date column of the sampling sheet: every
//! manhole row with whatever was entered in that cell. Cells are kept raw
//! so the original text (the "CQ" value) can be reported back unchanged;
//! numeric interpretation happens through [`MeasurementCell::value`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sewershed_network_models::{BuildingId, ManholeId};

/// One manhole's cell for a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementCell {
    /// Manhole the row belongs to.
    pub manhole_id: ManholeId,
    /// Raw cell text, `None` when the cell is blank.
    pub raw: Option<String>,
}

impl MeasurementCell {
    /// Creates a cell, treating blank text as missing.
    #[must_use]
    pub fn new(manhole_id: impl Into<ManholeId>, raw: Option<&str>) -> Self {
        Self {
            manhole_id: manhole_id.into(),
            raw: raw
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    /// The numeric measurement, if the cell holds one.
    ///
    /// Non-numeric entries (`"pending"`, `"n/a"`, ...) count as missing.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.raw.as_deref().and_then(|s| s.parse::<f64>().ok())
    }
}

/// All manhole cells of the sheet for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMeasurements {
    /// The sampling date.
    pub date: NaiveDate,
    /// One entry per sheet row, in sheet order.
    pub cells: Vec<MeasurementCell>,
}

impl DayMeasurements {
    /// Creates a day from its cells.
    #[must_use]
    pub const fn new(date: NaiveDate, cells: Vec<MeasurementCell>) -> Self {
        Self { date, cells }
    }

    /// Iterates cells in sheet order.
    pub fn iter(&self) -> impl Iterator<Item = &MeasurementCell> {
        self.cells.iter()
    }

    /// Raw text recorded for a manhole. When the sheet repeats a manhole,
    /// the last row wins.
    #[must_use]
    pub fn raw_value(&self, manhole_id: &str) -> Option<&str> {
        self.cells
            .iter()
            .rev()
            .find(|c| c.manhole_id == manhole_id)
            .and_then(|c| c.raw.as_deref())
    }

    /// Whether no row has a numeric measurement on this date.
    #[must_use]
    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(|c| c.value().is_none())
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the sheet has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Sample bookkeeping columns of a sheet row, used to annotate exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInfo {
    /// Sample identifier assigned by the lab.
    pub sample_id: String,
    /// Manhole the sample was taken at.
    pub manhole_id: ManholeId,
    /// Free-text list of buildings the sheet associates with the sample.
    pub buildings: String,
}

impl SampleInfo {
    /// Splits the sheet's building list into individual building codes.
    #[must_use]
    pub fn building_ids(&self) -> Vec<BuildingId> {
        self.buildings
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Column layout of the wastewater sampling sheet.
///
/// Every header that parses as a date with [`SheetLayout::date_format`]
/// is a measurement column; the named bookkeeping columns are read for
/// exports and everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Header of the manhole ID column.
    pub id_column: String,
    /// Header of the sample ID column.
    pub sample_id_column: String,
    /// Header of the free-text building list column.
    pub buildings_column: String,
    /// Zero-based row holding the headers. Rows above it are skipped.
    pub header_row: usize,
    /// `chrono` format of date headers (e.g. `%-m/%-d/%y` for `6/7/21`).
    pub date_format: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            id_column: "ManholeID".to_string(),
            sample_id_column: "SampleID".to_string(),
            buildings_column: "Building(s)".to_string(),
            header_row: 0,
            date_format: "%-m/%-d/%y".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 7).unwrap()
    }

    #[test]
    fn blank_cells_are_missing() {
        let cell = MeasurementCell::new("MH-1", Some("   "));
        assert_eq!(cell.raw, None);
        assert_eq!(cell.value(), None);
    }

    #[test]
    fn non_numeric_cells_keep_raw_text() {
        let cell = MeasurementCell::new("MH-1", Some("pending"));
        assert_eq!(cell.raw.as_deref(), Some("pending"));
        assert_eq!(cell.value(), None);
    }

    #[test]
    fn parses_numeric_cells() {
        assert_eq!(MeasurementCell::new("MH-1", Some(" 32.5 ")).value(), Some(32.5));
        assert_eq!(MeasurementCell::new("MH-1", Some("0")).value(), Some(0.0));
    }

    #[test]
    fn last_duplicate_row_wins() {
        let day = DayMeasurements::new(
            date(),
            vec![
                MeasurementCell::new("MH-1", Some("1")),
                MeasurementCell::new("MH-1", Some("2")),
            ],
        );
        assert_eq!(day.raw_value("MH-1"), Some("2"));
        assert_eq!(day.raw_value("MH-2"), None);
    }

    #[test]
    fn detects_all_missing_day() {
        let day = DayMeasurements::new(
            date(),
            vec![
                MeasurementCell::new("MH-1", None),
                MeasurementCell::new("MH-2", Some("tbd")),
            ],
        );
        assert!(day.is_all_missing());
    }

    #[test]
    fn splits_building_list() {
        let info = SampleInfo {
            sample_id: "S-1".to_string(),
            manhole_id: "MH-1".to_string(),
            buildings: "1104, 1105;1106".to_string(),
        };
        assert_eq!(info.building_ids(), vec!["1104", "1105", "1106"]);
    }
}
