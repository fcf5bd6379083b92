#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Residential and non-residential positivity statistics.
//!
//! A manhole counts toward a day's total when its cell holds a number, and
//! as positive when that number is greater than zero. Manholes are bucketed
//! by whether they serve any residential building.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use sewershed_measurement::{MeasurementError, MeasurementSource};
use sewershed_network_models::BuildingMetadata;
use sewershed_stats_models::{BucketCounts, BucketRates, DailyCounts, PositivityReport};
use sewershed_trace::{InvalidDateError, ModeClassifier, Sign, TraceMode};
use thiserror::Error;

/// Most days the rolling average looks back before giving up.
pub const MAX_ROLLING_ATTEMPTS: u64 = 21;

/// Valid days pooled into the rolling average.
pub const ROLLING_WINDOW_DAYS: usize = 7;

/// Errors that can occur while computing statistics.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The date has no usable measurements.
    #[error(transparent)]
    InvalidDate(#[from] InvalidDateError),

    /// The measurement source could not be read.
    #[error("Upstream fetch failure: {0}")]
    UpstreamFetch(#[from] MeasurementError),
}

/// Computes daily and rolling positivity rates.
pub struct PositivityStatsEngine {
    source: Arc<dyn MeasurementSource>,
    metadata: Arc<BuildingMetadata>,
    classifier: ModeClassifier,
}

impl PositivityStatsEngine {
    /// Creates an engine over `source`, labelling dates with `date_format`.
    #[must_use]
    pub fn new(
        source: Arc<dyn MeasurementSource>,
        metadata: Arc<BuildingMetadata>,
        date_format: &str,
    ) -> Self {
        Self {
            source,
            metadata,
            classifier: ModeClassifier::new(date_format),
        }
    }

    /// Counts measured and positive manholes for one date.
    ///
    /// # Errors
    ///
    /// * [`StatsError::InvalidDate`] if the date is absent or has no numeric
    ///   measurement
    /// * [`StatsError::UpstreamFetch`] if the source cannot be read
    pub fn daily_counts(&self, date: NaiveDate) -> Result<DailyCounts, StatsError> {
        let day = self
            .source
            .day(date)?
            .ok_or_else(|| InvalidDateError::new(self.classifier.label(date)))?;
        let classification = self.classifier.classify(&day, TraceMode::Detection)?;

        let mut counts = DailyCounts {
            date,
            residential: BucketCounts::default(),
            non_residential: BucketCounts::default(),
        };

        for (manhole_id, sign) in &classification.signs {
            let positive = match sign {
                Sign::Positive => true,
                Sign::Barrier => false,
                Sign::Neutral => continue,
            };
            if self.metadata.is_residential_manhole(manhole_id) {
                counts.residential.record(positive);
            } else {
                counts.non_residential.record(positive);
            }
        }

        log::debug!(
            "{}: residential {}/{}, non-residential {}/{}",
            self.classifier.label(date),
            counts.residential.positive,
            counts.residential.total,
            counts.non_residential.positive,
            counts.non_residential.total
        );

        Ok(counts)
    }

    /// Single-day and trailing positivity rates as of `date`.
    ///
    /// Walks backward from `date`, skipping dates without data, until
    /// [`ROLLING_WINDOW_DAYS`] valid days are found or
    /// [`MAX_ROLLING_ATTEMPTS`] dates have been tried. Single-day rates come
    /// from the most recent valid day.
    ///
    /// # Errors
    ///
    /// * [`StatsError::InvalidDate`] for `date` if no valid day is found
    /// * [`StatsError::UpstreamFetch`] as soon as any fetch fails
    pub fn rolling_average(&self, date: NaiveDate) -> Result<PositivityReport, StatsError> {
        let mut window: Vec<DailyCounts> = Vec::with_capacity(ROLLING_WINDOW_DAYS);

        for offset in 0..MAX_ROLLING_ATTEMPTS {
            if window.len() == ROLLING_WINDOW_DAYS {
                break;
            }
            let Some(day) = date.checked_sub_days(Days::new(offset)) else {
                break;
            };
            match self.daily_counts(day) {
                Ok(counts) => window.push(counts),
                Err(StatsError::InvalidDate(e)) => {
                    log::debug!("Skipping {}: {e}", e.date);
                }
                Err(e) => return Err(e),
            }
        }

        let Some(latest) = window.first().copied() else {
            return Err(InvalidDateError::new(self.classifier.label(date)).into());
        };

        if window.len() < ROLLING_WINDOW_DAYS {
            log::warn!(
                "Only {} valid days within {MAX_ROLLING_ATTEMPTS} days of {}",
                window.len(),
                self.classifier.label(date)
            );
        }

        let mut residential = BucketCounts::default();
        let mut non_residential = BucketCounts::default();
        for counts in &window {
            residential += counts.residential;
            non_residential += counts.non_residential;
        }

        Ok(PositivityReport {
            requested_date: date,
            latest_valid_date: latest.date,
            days_used: window.iter().map(|c| c.date).collect(),
            residential: BucketRates {
                single_day: latest.residential.rate(),
                seven_day: residential.rate(),
            },
            non_residential: BucketRates {
                single_day: latest.non_residential.rate(),
                seven_day: non_residential.rate(),
            },
            total: BucketRates {
                single_day: latest.total().rate(),
                seven_day: (residential + non_residential).rate(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sewershed_measurement_models::{DayMeasurements, MeasurementCell};
    use sewershed_network_models::BuildingRecord;

    use super::*;

    struct FixedSource {
        days: BTreeMap<NaiveDate, Vec<(String, Option<String>)>>,
        failing: Option<NaiveDate>,
    }

    impl MeasurementSource for FixedSource {
        fn label(&self) -> &str {
            "fixed"
        }

        fn day(&self, date: NaiveDate) -> Result<Option<DayMeasurements>, MeasurementError> {
            if self.failing == Some(date) {
                return Err(MeasurementError::MissingHeader { row: 0 });
            }
            Ok(self.days.get(&date).map(|cells| {
                DayMeasurements::new(
                    date,
                    cells
                        .iter()
                        .map(|(id, raw)| MeasurementCell::new(id.as_str(), raw.as_deref()))
                        .collect(),
                )
            }))
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, day).unwrap()
    }

    /// `R0..R9` serve residential buildings, `N0..N4` do not.
    fn metadata() -> BuildingMetadata {
        let residential = (0..10).map(|i| BuildingRecord {
            building_id: format!("dorm{i}"),
            residential: true,
            manholes: vec![format!("R{i}")],
        });
        let other = (0..5).map(|i| BuildingRecord {
            building_id: format!("lab{i}"),
            residential: false,
            manholes: vec![format!("N{i}")],
        });
        BuildingMetadata::from_records(residential.chain(other))
    }

    /// 3 of 10 residential and 1 of 5 non-residential manholes positive.
    fn standard_day() -> Vec<(String, Option<String>)> {
        let mut cells = Vec::new();
        for i in 0..10 {
            let value = if i < 3 { "12.5" } else { "0" };
            cells.push((format!("R{i}"), Some(value.to_string())));
        }
        for i in 0..5 {
            let value = if i < 1 { "4" } else { "0" };
            cells.push((format!("N{i}"), Some(value.to_string())));
        }
        cells.push(("R-unsampled".to_string(), None));
        cells
    }

    fn engine(source: FixedSource) -> PositivityStatsEngine {
        PositivityStatsEngine::new(Arc::new(source), Arc::new(metadata()), "%-m/%-d/%y")
    }

    #[test]
    fn counts_by_occupancy() {
        let engine = engine(FixedSource {
            days: BTreeMap::from([(date(7), standard_day())]),
            failing: None,
        });

        let counts = engine.daily_counts(date(7)).unwrap();
        assert_eq!(counts.residential, BucketCounts { positive: 3, total: 10 });
        assert_eq!(counts.non_residential, BucketCounts { positive: 1, total: 5 });
        assert_eq!(counts.total(), BucketCounts { positive: 4, total: 15 });
    }

    #[test]
    fn single_day_rates() {
        let engine = engine(FixedSource {
            days: BTreeMap::from([(date(7), standard_day())]),
            failing: None,
        });

        let report = engine.rolling_average(date(7)).unwrap();
        assert_eq!(report.residential.single_day.to_string(), "30.00%");
        assert_eq!(report.non_residential.single_day.to_string(), "20.00%");
        assert_eq!(report.total.single_day.to_string(), "26.67%");
        assert_eq!(report.total.seven_day.to_string(), "26.67%");
        assert_eq!(report.days_used, vec![date(7)]);
    }

    #[test]
    fn skips_invalid_days_and_pools_counts() {
        let all_negative: Vec<_> = standard_day()
            .into_iter()
            .map(|(id, raw)| (id, raw.map(|_| "0".to_string())))
            .collect();
        let all_missing = vec![("R0".to_string(), None)];

        let engine = engine(FixedSource {
            days: BTreeMap::from([
                (date(7), all_missing),
                (date(6), standard_day()),
                (date(4), all_negative),
            ]),
            failing: None,
        });

        let report = engine.rolling_average(date(7)).unwrap();
        assert_eq!(report.latest_valid_date, date(6));
        assert_eq!(report.days_used, vec![date(6), date(4)]);
        assert_eq!(report.residential.single_day.to_string(), "30.00%");
        assert_eq!(report.residential.seven_day.to_string(), "15.00%");
        assert_eq!(report.non_residential.seven_day.to_string(), "10.00%");
    }

    #[test]
    fn stops_after_seven_valid_days() {
        let days = (1..=10).map(|d| (date(d), standard_day())).collect();
        let engine = engine(FixedSource {
            days,
            failing: None,
        });

        let report = engine.rolling_average(date(10)).unwrap();
        assert_eq!(report.days_used.len(), ROLLING_WINDOW_DAYS);
        assert_eq!(report.days_used.last(), Some(&date(4)));
    }

    #[test]
    fn no_valid_day_is_invalid_date() {
        let engine = engine(FixedSource {
            days: BTreeMap::new(),
            failing: None,
        });

        let err = engine.rolling_average(date(7)).unwrap_err();
        assert!(matches!(err, StatsError::InvalidDate(ref e) if e.date == "6/7/21"));
    }

    #[test]
    fn looks_back_at_most_twenty_one_days() {
        let within = engine(FixedSource {
            days: BTreeMap::from([(date(10), standard_day())]),
            failing: None,
        });
        let report = within.rolling_average(date(30)).unwrap();
        assert_eq!(report.days_used, vec![date(10)]);
        assert_eq!(report.latest_valid_date, date(10));

        let beyond = engine(FixedSource {
            days: BTreeMap::from([(date(9), standard_day())]),
            failing: None,
        });
        let err = beyond.rolling_average(date(30)).unwrap_err();
        assert!(matches!(err, StatsError::InvalidDate(ref e) if e.date == "6/30/21"));
    }

    #[test]
    fn upstream_failure_aborts() {
        let engine = engine(FixedSource {
            days: BTreeMap::from([(date(7), standard_day())]),
            failing: Some(date(5)),
        });

        let err = engine.rolling_average(date(7)).unwrap_err();
        assert!(matches!(err, StatsError::UpstreamFetch(_)));
    }

    #[test]
    fn empty_bucket_is_not_applicable() {
        let cells = vec![("R0".to_string(), Some("7".to_string()))];
        let engine = engine(FixedSource {
            days: BTreeMap::from([(date(7), cells)]),
            failing: None,
        });

        let report = engine.rolling_average(date(7)).unwrap();
        assert_eq!(report.residential.single_day.to_string(), "100.00%");
        assert_eq!(report.non_residential.single_day.to_string(), "N/A");
        assert_eq!(report.non_residential.seven_day.to_string(), "N/A");
    }
}
