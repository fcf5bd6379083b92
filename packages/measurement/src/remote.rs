//! Published-sheet source fetched over HTTP.
//!
//! The sampling sheet is edited continuously by the lab, so the CSV export
//! is downloaded again for every request instead of being cached. Fetch
//! failures are surfaced to the caller immediately and never retried.

use std::time::Duration;

use chrono::NaiveDate;
use sewershed_measurement_models::{DayMeasurements, SampleInfo, SheetLayout};

use crate::sheet::MeasurementSheet;
use crate::{MeasurementError, MeasurementSource};

/// Per-request timeout for the sheet download.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A measurement source backed by a CSV export URL.
#[derive(Debug, Clone)]
pub struct RemoteSheetSource {
    url: String,
    layout: SheetLayout,
    client: reqwest::blocking::Client,
}

impl RemoteSheetSource {
    /// Creates a source for the CSV export at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError::Http`] if the HTTP client cannot be
    /// constructed.
    pub fn new(url: &str, layout: SheetLayout) -> Result<Self, MeasurementError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            url: url.to_string(),
            layout,
            client,
        })
    }

    /// Downloads and parses the current sheet.
    ///
    /// # Errors
    ///
    /// Returns [`MeasurementError`] if the download fails, the server
    /// answers with an error status, or the CSV cannot be parsed.
    pub fn fetch_sheet(&self) -> Result<MeasurementSheet, MeasurementError> {
        log::debug!("Downloading sampling sheet from {}", self.url);

        let body = self
            .client
            .get(&self.url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| {
                log::error!("Failed to download sampling sheet from {}: {e}", self.url);
                MeasurementError::Http(e)
            })?;

        log::debug!("Downloaded {} bytes from {}", body.len(), self.url);

        MeasurementSheet::from_reader(body.as_bytes(), &self.layout, &self.url)
    }
}

impl MeasurementSource for RemoteSheetSource {
    fn label(&self) -> &str {
        &self.url
    }

    fn day(&self, date: NaiveDate) -> Result<Option<DayMeasurements>, MeasurementError> {
        Ok(self.fetch_sheet()?.column(date))
    }

    fn sample_info(&self) -> Result<Vec<SampleInfo>, MeasurementError> {
        self.fetch_sheet()?.sample_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_an_upstream_error() {
        // Port 9 on localhost is discard; nothing listens there in CI.
        let source =
            RemoteSheetSource::new("http://127.0.0.1:9/sheet.csv", SheetLayout::default()).unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 6, 7).unwrap();

        assert!(matches!(source.day(date), Err(MeasurementError::Http(_))));
    }
}
