//! Drop-in CSV export of the composite status report.
//!
//! The lab's dashboard ingests a flat CSV per test date: one row per
//! (manhole, sample) pair with the composite status and the raw CQ value.
//! Manholes without a sample row still get a single row with blank sample
//! columns.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;
use sewershed_measurement_models::SampleInfo;
use sewershed_trace_models::StatusRecord;

use crate::TraceError;
use crate::engine::TraceEngine;

/// One row of the drop-in export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DropInRow {
    /// Manhole identifier.
    pub manhole_id: String,
    /// Composite status label.
    pub status: String,
    /// Raw measurement for the test date.
    pub cq: String,
    /// Test date as spelled in the sheet.
    pub test_date: String,
    /// Sample ID from the sheet, blank if none.
    pub sample_id: String,
    /// Building list from the sheet, blank if none.
    pub building: String,
}

/// Left-joins status records with sample rows on manhole ID.
#[must_use]
pub fn join_samples(
    records: &[StatusRecord],
    samples: &[SampleInfo],
    test_date: &str,
) -> Vec<DropInRow> {
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let row = |sample_id: &str, building: &str| DropInRow {
            manhole_id: record.manhole_id.clone(),
            status: record.status.to_string(),
            cq: record.measurement.clone(),
            test_date: test_date.to_string(),
            sample_id: sample_id.to_string(),
            building: building.to_string(),
        };

        let matching: Vec<&SampleInfo> = samples
            .iter()
            .filter(|s| s.manhole_id == record.manhole_id)
            .collect();

        if matching.is_empty() {
            rows.push(row("", ""));
        } else {
            rows.extend(matching.iter().map(|s| row(&s.sample_id, &s.buildings)));
        }
    }

    rows
}

/// Writes drop-in rows as CSV with a header.
///
/// # Errors
///
/// Returns [`TraceError::Export`] if serialization or the writer fails.
pub fn write_drop_in<W: Write>(rows: &[DropInRow], writer: W) -> Result<(), TraceError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

impl TraceEngine {
    /// Builds the drop-in rows for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the composite trace or the sample lookup
    /// fails.
    pub fn drop_in(&self, date: NaiveDate) -> Result<Vec<DropInRow>, TraceError> {
        let records = self.multi_trace(date)?;
        let samples = self.source().sample_info()?;
        let rows = join_samples(&records, &samples, &self.classifier().label(date));

        log::info!(
            "Drop-in for {}: {} rows from {} manholes",
            self.classifier().label(date),
            rows.len(),
            records.len()
        );

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sewershed_measurement::SheetLayout;
    use sewershed_measurement::sheet::MeasurementSheet;
    use sewershed_network_models::{ManholeNode, NetworkTopology};
    use sewershed_trace_models::ManholeStatus;

    use super::*;
    use crate::TraceConfig;

    fn record(id: &str, status: ManholeStatus, cq: &str) -> StatusRecord {
        StatusRecord {
            manhole_id: id.to_string(),
            status,
            affected_modes: status.level().unwrap_or(0),
            measurement: cq.to_string(),
        }
    }

    fn sample(sample_id: &str, manhole_id: &str, buildings: &str) -> SampleInfo {
        SampleInfo {
            sample_id: sample_id.to_string(),
            manhole_id: manhole_id.to_string(),
            buildings: buildings.to_string(),
        }
    }

    #[test]
    fn left_joins_on_manhole() {
        let records = [
            record("MH-1", ManholeStatus::Detected, "31.2"),
            record("MH-2", ManholeStatus::NotMonitored, ""),
        ];
        let samples = [sample("S-1", "MH-1", "1104"), sample("S-2", "MH-1", "1105")];

        let rows = join_samples(&records, &samples, "6/7/21");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sample_id, "S-1");
        assert_eq!(rows[1].building, "1105");
        assert_eq!(rows[2].manhole_id, "MH-2");
        assert_eq!(rows[2].sample_id, "");
        assert_eq!(rows[2].status, "Not Currently Monitored");
    }

    #[test]
    fn writes_header_and_rows() {
        let rows = join_samples(
            &[record("MH-1", ManholeStatus::Detected, "31.2")],
            &[sample("S-1", "MH-1", "1104, 1105")],
            "6/7/21",
        );
        let mut out = Vec::new();
        write_drop_in(&rows, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("MANHOLE_ID,STATUS,CQ,TEST_DATE,SAMPLE_ID,BUILDING")
        );
        assert_eq!(
            lines.next(),
            Some("MH-1,Currently Monitored + Sampled + Detected,31.2,6/7/21,S-1,\"1104, 1105\"")
        );
    }

    #[test]
    fn engine_builds_drop_in_for_date() {
        let sheet = "SampleID,ManholeID,Building(s),6/7/21\nS-1,A,1104,2.5\n";
        let sheet =
            MeasurementSheet::from_reader(sheet.as_bytes(), &SheetLayout::default(), "test")
                .unwrap();
        let topology = NetworkTopology::new(vec![
            ManholeNode {
                id: "A".to_string(),
                downstream: vec!["B".to_string()],
                buildings: vec![],
            },
            ManholeNode {
                id: "B".to_string(),
                downstream: vec![],
                buildings: vec!["1104".to_string()],
            },
        ]);
        let engine = TraceEngine::new(Arc::new(topology), Arc::new(sheet), TraceConfig::default());

        let date = NaiveDate::from_ymd_opt(2021, 6, 7).unwrap();
        let rows = engine.drop_in(date).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sample_id, "S-1");
        assert_eq!(rows[0].cq, "2.5");
        assert_eq!(rows[1].manhole_id, "B");
        assert_eq!(rows[1].status, "Currently Monitored + Sampled + Detected");
    }
}
