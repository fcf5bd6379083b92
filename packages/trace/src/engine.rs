//! Single-mode and composite exposure tracing.
//!
//! Every call is stateless: the date column is fetched, classified, and a
//! fresh [`NetworkGraph`] is built for the resulting barrier set. Only the
//! topology and [`TraceConfig`] are shared between calls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use sewershed_measurement::MeasurementSource;
use sewershed_measurement_models::DayMeasurements;
use sewershed_network::NetworkGraph;
use sewershed_network_models::{BuildingId, ManholeId, NetworkTopology};
use sewershed_trace_models::{
    AffectedReport, InvalidDateError, ManholeStatus, StatusRecord, TraceMode,
};

use crate::classify::ModeClassifier;
use crate::{TraceConfig, TraceError};

/// Seeds and the barrier-pruned graph for one (date, mode) query.
struct TracePlan {
    seeds: BTreeSet<ManholeId>,
    graph: NetworkGraph,
}

/// Orchestrates classification and graph traversal.
pub struct TraceEngine {
    topology: Arc<NetworkTopology>,
    source: Arc<dyn MeasurementSource>,
    config: TraceConfig,
    classifier: ModeClassifier,
}

impl TraceEngine {
    /// Creates an engine over shared, read-only inputs.
    #[must_use]
    pub fn new(
        topology: Arc<NetworkTopology>,
        source: Arc<dyn MeasurementSource>,
        config: TraceConfig,
    ) -> Self {
        let classifier = ModeClassifier::new(&config.date_format);
        Self {
            topology,
            source,
            config,
            classifier,
        }
    }

    /// The static tracing configuration.
    #[must_use]
    pub const fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// The classifier, for date label parsing and rendering.
    #[must_use]
    pub const fn classifier(&self) -> &ModeClassifier {
        &self.classifier
    }

    /// The measurement source queried by this engine.
    #[must_use]
    pub fn source(&self) -> &dyn MeasurementSource {
        self.source.as_ref()
    }

    /// Fetches the sheet column for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidDate`] if the sheet has no such column
    /// and [`TraceError::UpstreamFetch`] if the source cannot be read.
    pub fn fetch_day(&self, date: NaiveDate) -> Result<DayMeasurements, TraceError> {
        self.source
            .day(date)?
            .ok_or_else(|| InvalidDateError::new(self.classifier.label(date)).into())
    }

    /// Buildings that may have contributed to a positive sample.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the date is invalid, the source fails, or
    /// the topology is malformed.
    pub fn affected_buildings(
        &self,
        date: NaiveDate,
        mode: TraceMode,
    ) -> Result<BTreeSet<BuildingId>, TraceError> {
        let day = self.fetch_day(date)?;
        let plan = self.plan(&day, mode)?;

        let buildings: BTreeSet<BuildingId> = plan
            .seeds
            .iter()
            .filter_map(|seed| plan.graph.reachable_buildings(seed))
            .flatten()
            .cloned()
            .collect();

        log::info!(
            "{} mode on {}: {} seeds, {} affected buildings",
            mode,
            self.classifier.label(date),
            plan.seeds.len(),
            buildings.len()
        );

        Ok(buildings)
    }

    /// Manholes affected by the trace, including the seeds themselves.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the date is invalid, the source fails, or
    /// the topology is malformed.
    pub fn affected_manholes(
        &self,
        date: NaiveDate,
        mode: TraceMode,
    ) -> Result<BTreeSet<ManholeId>, TraceError> {
        let day = self.fetch_day(date)?;
        self.affected_manholes_in(&day, mode)
    }

    /// [`Self::affected_buildings`] for a date label, in report form.
    ///
    /// Any error, including an unparseable label, is reported alongside an
    /// empty list.
    #[must_use]
    pub fn affected_buildings_report(&self, label: &str, mode: TraceMode) -> AffectedReport {
        self.report(label, |date| self.affected_buildings(date, mode))
    }

    /// [`Self::affected_manholes`] for a date label, in report form.
    #[must_use]
    pub fn affected_manholes_report(&self, label: &str, mode: TraceMode) -> AffectedReport {
        self.report(label, |date| self.affected_manholes(date, mode))
    }

    /// Composite status of every manhole in the topology, in topology order.
    ///
    /// Runs detection, monitoring and sampling traces against the same
    /// snapshot of the sheet and counts how many affect each manhole.
    /// Excluded manholes are forced to
    /// [`ManholeStatus::MonitoredNotSampled`]; unaffected paused manholes
    /// are reported as [`ManholeStatus::Paused`].
    ///
    /// # Errors
    ///
    /// Returns the first [`TraceError`] raised by any of the three modes.
    pub fn multi_trace(&self, date: NaiveDate) -> Result<Vec<StatusRecord>, TraceError> {
        let day = self.fetch_day(date)?;

        let mut membership: BTreeMap<&str, [bool; 3]> = self
            .topology
            .manhole_ids()
            .map(|id| (id, [false; 3]))
            .collect();

        for (i, mode) in TraceMode::COMPOSITE.into_iter().enumerate() {
            let affected = self.affected_manholes_in(&day, mode)?;
            for (id, flags) in &mut membership {
                flags[i] = affected.contains(*id);
            }
        }

        let records: Vec<StatusRecord> = self
            .topology
            .manhole_ids()
            .map(|id| {
                let flags = membership.get(id).copied().unwrap_or_default();
                self.status_record(&day, id, flags)
            })
            .collect();

        let mut summary: BTreeMap<ManholeStatus, usize> = BTreeMap::new();
        for record in &records {
            *summary.entry(record.status).or_default() += 1;
        }
        log::info!(
            "Composite status for {}: {summary:?}",
            self.classifier.label(date)
        );

        Ok(records)
    }

    fn status_record(&self, day: &DayMeasurements, id: &str, flags: [bool; 3]) -> StatusRecord {
        let [detected, monitored, sampled] = flags;
        let count = u8::from(detected) + u8::from(monitored) + u8::from(sampled);

        if (detected && !sampled) || (sampled && !monitored) {
            log::debug!(
                "Manhole {id} has non-nested modes (detection={detected}, \
                 monitoring={monitored}, sampling={sampled})"
            );
        }

        let status = if self.config.excluded.contains(id) {
            ManholeStatus::MonitoredNotSampled
        } else if count == 0 && self.config.paused.contains(id) {
            ManholeStatus::Paused
        } else {
            // At most three composite modes, so the count always maps.
            ManholeStatus::from_count(count).unwrap_or(ManholeStatus::Detected)
        };

        StatusRecord {
            manhole_id: id.to_string(),
            status,
            affected_modes: count,
            measurement: day.raw_value(id).unwrap_or_default().to_string(),
        }
    }

    fn affected_manholes_in(
        &self,
        day: &DayMeasurements,
        mode: TraceMode,
    ) -> Result<BTreeSet<ManholeId>, TraceError> {
        let plan = self.plan(day, mode)?;

        let mut manholes: BTreeSet<ManholeId> = plan
            .seeds
            .iter()
            .filter_map(|seed| plan.graph.reachable_manholes(seed))
            .flatten()
            .cloned()
            .collect();
        manholes.extend(plan.seeds);

        log::debug!(
            "{} mode on {}: {} affected manholes",
            mode,
            self.classifier.label(day.date),
            manholes.len()
        );

        Ok(manholes)
    }

    /// Classifies the day and builds the graph pruned by this query's
    /// barriers.
    fn plan(&self, day: &DayMeasurements, mode: TraceMode) -> Result<TracePlan, TraceError> {
        let classification = self.classifier.classify(day, mode)?;

        let (seeds, barriers) = if mode == TraceMode::PausedMonitoring {
            (self.config.paused.clone(), classification.barriers())
        } else {
            let mut barriers = classification.barriers();
            barriers.extend(self.config.paused.iter().cloned());
            (classification.positive_seeds(), barriers)
        };

        let graph = NetworkGraph::build(&self.topology, &barriers)?;

        Ok(TracePlan { seeds, graph })
    }

    fn report(
        &self,
        label: &str,
        trace: impl FnOnce(NaiveDate) -> Result<BTreeSet<String>, TraceError>,
    ) -> AffectedReport {
        let result = self
            .classifier
            .parse_label(label)
            .map_err(TraceError::from)
            .and_then(trace);

        match result {
            Ok(ids) => AffectedReport {
                error: None,
                ids: ids.into_iter().collect(),
            },
            Err(e) => {
                log::warn!("Trace for '{label}' failed: {e}");
                AffectedReport {
                    error: Some(e.to_string()),
                    ids: Vec::new(),
                }
            }
        }
    }
}
