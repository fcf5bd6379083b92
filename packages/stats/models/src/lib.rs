#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Positivity statistics types.
//!
//! Counts are split by whether a manhole serves residential buildings.
//! Rates are pooled ratios of positive to total measured manholes.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Positive and total measured manholes in one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCounts {
    /// Manholes with a measurement greater than zero.
    pub positive: u32,
    /// Manholes with any numeric measurement.
    pub total: u32,
}

impl BucketCounts {
    /// Records one measured manhole.
    pub const fn record(&mut self, positive: bool) {
        self.total += 1;
        if positive {
            self.positive += 1;
        }
    }

    /// The positivity rate of this bucket.
    #[must_use]
    pub fn rate(self) -> Rate {
        Rate::from_counts(self.positive, self.total)
    }
}

impl std::ops::Add for BucketCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            positive: self.positive + rhs.positive,
            total: self.total + rhs.total,
        }
    }
}

impl std::ops::AddAssign for BucketCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Counts for a single sampling date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCounts {
    /// The sampling date counted.
    pub date: NaiveDate,
    /// Manholes serving at least one residential building.
    pub residential: BucketCounts,
    /// Every other measured manhole, including ones missing from the metadata.
    pub non_residential: BucketCounts,
}

impl DailyCounts {
    /// Residential and non-residential combined.
    #[must_use]
    pub fn total(&self) -> BucketCounts {
        self.residential + self.non_residential
    }
}

/// A positivity rate, or `N/A` when nothing was measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// Percentage in `0.0..=100.0`.
    Percent(f64),
    /// No manhole in the bucket was measured. Displayed as `N/A`.
    NotApplicable,
}

impl Rate {
    /// Computes `positive / total` as a percentage.
    #[must_use]
    pub fn from_counts(positive: u32, total: u32) -> Self {
        if total == 0 {
            Self::NotApplicable
        } else {
            Self::Percent(f64::from(positive) / f64::from(total) * 100.0)
        }
    }

    /// The percentage, if any.
    #[must_use]
    pub const fn percent(self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(p),
            Self::NotApplicable => None,
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p:.2}%"),
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Single-day and rolling rates for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRates {
    /// Rate on the latest valid day.
    pub single_day: Rate,
    /// Rate pooled over every day in the rolling window.
    pub seven_day: Rate,
}

/// Positivity report for a requested date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositivityReport {
    /// The date that was asked for.
    pub requested_date: NaiveDate,
    /// Most recent valid sampling date at or before the requested date.
    /// Single-day rates come from this date.
    pub latest_valid_date: NaiveDate,
    /// Valid dates pooled into the rolling rates, newest first.
    pub days_used: Vec<NaiveDate>,
    /// Rates for residential manholes.
    pub residential: BucketRates,
    /// Rates for non-residential manholes.
    pub non_residential: BucketRates,
    /// Rates for both buckets combined.
    pub total: BucketRates,
}
