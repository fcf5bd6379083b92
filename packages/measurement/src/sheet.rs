//! In-memory sampling sheet parsed from a CSV export.
//!
//! The sheet is wide: one row per manhole, one column per sampling date.
//! Header cells that parse as dates become measurement columns.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use sewershed_measurement_models::{
    DayMeasurements, MeasurementCell, SampleInfo, SheetLayout,
};

use crate::{MeasurementError, MeasurementSource};

/// A parsed sampling sheet.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSheet {
    label: String,
    manholes: Vec<String>,
    columns: BTreeMap<NaiveDate, Vec<Option<String>>>,
    samples: Vec<SampleInfo>,
}

impl MeasurementSheet {
    /// Parses a sheet from any CSV reader.
    ///
    /// Rows with a blank manhole ID are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] if the CSV is malformed, the header row
    /// is missing, or the manhole ID column is absent.
    pub fn from_reader<R: Read>(
        reader: R,
        layout: &SheetLayout,
        label: &str,
    ) -> Result<Self, MeasurementError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = csv_reader.records().skip(layout.header_row);

        let headers: Vec<String> = records
            .next()
            .ok_or(MeasurementError::MissingHeader {
                row: layout.header_row,
            })??
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let column_index = |name: &str| headers.iter().position(|h| h == name);

        let id_idx = column_index(&layout.id_column).ok_or_else(|| {
            MeasurementError::MissingColumn {
                column: layout.id_column.clone(),
            }
        })?;
        let sample_idx = column_index(&layout.sample_id_column);
        let buildings_idx = column_index(&layout.buildings_column);

        let mut date_columns: Vec<(usize, NaiveDate)> = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            let Ok(date) = NaiveDate::parse_from_str(header, &layout.date_format) else {
                continue;
            };
            if date_columns.iter().any(|(_, d)| *d == date) {
                log::warn!("[{label}] Ignoring repeated date column '{header}'");
                continue;
            }
            date_columns.push((i, date));
        }

        let mut manholes = Vec::new();
        let mut columns: BTreeMap<NaiveDate, Vec<Option<String>>> = date_columns
            .iter()
            .map(|(_, date)| (*date, Vec::new()))
            .collect();
        let mut samples = Vec::new();

        for record in records {
            let record = record?;
            let manhole_id = record.get(id_idx).unwrap_or("").trim();
            if manhole_id.is_empty() {
                continue;
            }

            for (i, date) in &date_columns {
                let cell = MeasurementCell::new(manhole_id, record.get(*i));
                if let Some(column) = columns.get_mut(date) {
                    column.push(cell.raw);
                }
            }

            if let Some(sample_id) = sample_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
            {
                samples.push(SampleInfo {
                    sample_id: sample_id.to_string(),
                    manhole_id: manhole_id.to_string(),
                    buildings: buildings_idx
                        .and_then(|i| record.get(i))
                        .unwrap_or("")
                        .trim()
                        .to_string(),
                });
            }

            manholes.push(manhole_id.to_string());
        }

        log::info!(
            "[{label}] Parsed sheet: {} manholes, {} date columns",
            manholes.len(),
            columns.len()
        );

        Ok(Self {
            label: label.to_string(),
            manholes,
            columns,
            samples,
        })
    }

    /// Reads a sheet from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] if the file cannot be opened or parsed.
    pub fn from_path(path: &Path, layout: &SheetLayout) -> Result<Self, MeasurementError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, layout, &path.display().to_string())
    }

    /// Dates that have a column in the sheet, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.columns.keys().copied()
    }

    /// Manhole IDs in sheet order.
    #[must_use]
    pub fn manholes(&self) -> &[String] {
        &self.manholes
    }

    /// Extracts one date column.
    #[must_use]
    pub fn column(&self, date: NaiveDate) -> Option<DayMeasurements> {
        let column = self.columns.get(&date)?;
        let cells = self
            .manholes
            .iter()
            .zip(column)
            .map(|(id, raw)| MeasurementCell {
                manhole_id: id.clone(),
                raw: raw.clone(),
            })
            .collect();
        Some(DayMeasurements::new(date, cells))
    }
}

impl MeasurementSource for MeasurementSheet {
    fn label(&self) -> &str {
        &self.label
    }

    fn day(&self, date: NaiveDate) -> Result<Option<DayMeasurements>, MeasurementError> {
        Ok(self.column(date))
    }

    fn sample_info(&self) -> Result<Vec<SampleInfo>, MeasurementError> {
        Ok(self.samples.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SHEET: &str = "\
SampleID,ManholeID,Building(s),6/6/21,6/7/21,notes
S-1,MH-1,1104,0,35.1,
S-2,MH-2,\"2210, 2211\",,0,
,MH-3,,pending,,ok
,,,,9,orphan
";

    #[test]
    fn parses_date_columns() {
        let sheet = MeasurementSheet::from_reader(SHEET.as_bytes(), &SheetLayout::default(), "test")
            .unwrap();

        assert_eq!(sheet.dates().collect::<Vec<_>>(), vec![ymd(2021, 6, 6), ymd(2021, 6, 7)]);
        assert_eq!(sheet.manholes(), ["MH-1", "MH-2", "MH-3"]);

        let day = sheet.day(ymd(2021, 6, 7)).unwrap().unwrap();
        assert_eq!(day.len(), 3);
        assert_eq!(day.raw_value("MH-1"), Some("35.1"));
        assert_eq!(day.raw_value("MH-2"), Some("0"));
        assert_eq!(day.raw_value("MH-3"), None);
    }

    #[test]
    fn absent_date_is_none() {
        let sheet = MeasurementSheet::from_reader(SHEET.as_bytes(), &SheetLayout::default(), "test")
            .unwrap();
        assert!(sheet.day(ymd(2021, 6, 8)).unwrap().is_none());
    }

    #[test]
    fn collects_sample_rows() {
        let sheet = MeasurementSheet::from_reader(SHEET.as_bytes(), &SheetLayout::default(), "test")
            .unwrap();
        let samples = sheet.sample_info().unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].manhole_id, "MH-2");
        assert_eq!(samples[1].building_ids(), vec!["2210", "2211"]);
    }

    #[test]
    fn honours_header_row_offset() {
        let csv = "Results,,\nupdated weekly,,\nManholeID,SampleID,6/7/21\nMH-1,S-1,3\n";
        let layout = SheetLayout {
            header_row: 2,
            ..SheetLayout::default()
        };
        let sheet = MeasurementSheet::from_reader(csv.as_bytes(), &layout, "test").unwrap();

        let day = sheet.day(ymd(2021, 6, 7)).unwrap().unwrap();
        assert_eq!(day.raw_value("MH-1"), Some("3"));
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let csv = "Site,6/7/21\nMH-1,3\n";
        let err = MeasurementSheet::from_reader(csv.as_bytes(), &SheetLayout::default(), "test")
            .unwrap_err();
        assert!(matches!(err, MeasurementError::MissingColumn { .. }));
    }

    #[test]
    fn missing_header_row_is_an_error() {
        let layout = SheetLayout {
            header_row: 5,
            ..SheetLayout::default()
        };
        let err = MeasurementSheet::from_reader("ManholeID\n".as_bytes(), &layout, "test")
            .unwrap_err();
        assert!(matches!(err, MeasurementError::MissingHeader { row: 5 }));
    }
}
