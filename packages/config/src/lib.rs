#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Application configuration.
//!
//! A single `sewershed.toml` names the measurement sheet, the network
//! topology, and the building metadata, plus the static paused and excluded
//! manhole lists:
//!
//! ```toml
//! [measurements]
//! type = "csv_url"
//! url = "https://docs.google.com/spreadsheets/d/.../export?format=csv"
//! header_row = 1
//!
//! [topology]
//! path = "topology.toml"
//!
//! [buildings]
//! path = "buildings.csv"
//!
//! [trace]
//! paused = ["MH-114"]
//! excluded = ["MH-031"]
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use sewershed_measurement::remote::RemoteSheetSource;
use sewershed_measurement::sheet::MeasurementSheet;
use sewershed_measurement::{MeasurementError, MeasurementSource};
use sewershed_measurement_models::SheetLayout;
use sewershed_network::metadata::load_metadata;
use sewershed_network::topology::load_topology;
use sewershed_network::{BuildingMetadata, MetadataError, NetworkTopology, TopologyError};
use sewershed_stats::PositivityStatsEngine;
use sewershed_trace::{TraceConfig, TraceEngine};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "SEWERSHED_CONFIG";

/// Config file used when neither a flag nor the environment names one.
pub const DEFAULT_CONFIG_FILE: &str = "sewershed.toml";

/// Errors that can occur while loading configuration or the inputs it
/// names.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The topology named by the config is missing or malformed.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// The building metadata named by the config is missing or malformed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The measurement sheet could not be opened.
    #[error(transparent)]
    Measurement(#[from] MeasurementError),
}

/// Where the sampling sheet comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SheetLocation {
    /// A CSV export on disk.
    CsvFile { path: PathBuf },
    /// A published CSV export downloaded on every request.
    CsvUrl { url: String },
}

/// `[measurements]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeasurementsConfig {
    #[serde(flatten)]
    pub location: SheetLocation,
    #[serde(flatten)]
    pub layout: SheetLayout,
}

/// A section holding a single file path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathConfig {
    pub path: PathBuf,
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub measurements: MeasurementsConfig,
    pub topology: PathConfig,
    pub buildings: PathConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Picks the config file: explicit path, then [`CONFIG_ENV_VAR`], then
/// [`DEFAULT_CONFIG_FILE`].
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(
        || {
            std::env::var_os(CONFIG_ENV_VAR)
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
        },
        Path::to_path_buf,
    )
}

impl AppConfig {
    /// Reads and parses a config file, resolving relative paths against
    /// its directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new(""));

        let config = Self::parse(&contents, base_dir)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses config text, resolving relative paths against `base_dir`.
    ///
    /// The trace date format always follows the sheet layout so that date
    /// labels are spelled the way the sheet headers are.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text does not match the schema.
    pub fn parse(contents: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents)?;

        if let SheetLocation::CsvFile { path } = &mut config.measurements.location {
            *path = base_dir.join(&*path);
        }
        config.topology.path = base_dir.join(&config.topology.path);
        config.buildings.path = base_dir.join(&config.buildings.path);
        config
            .trace
            .date_format
            .clone_from(&config.measurements.layout.date_format);

        Ok(config)
    }

    /// Loads the network topology.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Topology`] if the file is missing or malformed.
    pub fn load_topology(&self) -> Result<NetworkTopology, ConfigError> {
        Ok(load_topology(&self.topology.path)?)
    }

    /// Loads the building metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Metadata`] if the file is missing or malformed.
    pub fn load_metadata(&self) -> Result<BuildingMetadata, ConfigError> {
        Ok(load_metadata(&self.buildings.path)?)
    }

    /// Opens the configured measurement source.
    ///
    /// File sheets are parsed once here. URL sheets are fetched lazily on
    /// every request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Measurement`] if the sheet cannot be read or
    /// the HTTP client cannot be built.
    pub fn measurement_source(&self) -> Result<Arc<dyn MeasurementSource>, ConfigError> {
        let layout = self.measurements.layout.clone();
        let source: Arc<dyn MeasurementSource> = match &self.measurements.location {
            SheetLocation::CsvFile { path } => {
                Arc::new(MeasurementSheet::from_path(path, &layout)?)
            }
            SheetLocation::CsvUrl { url } => Arc::new(RemoteSheetSource::new(url, layout)?),
        };
        log::debug!("Using measurement source {}", source.label());
        Ok(source)
    }

    /// Builds a [`TraceEngine`] over the configured inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any input fails to load.
    pub fn trace_engine(&self) -> Result<TraceEngine, ConfigError> {
        self.trace_engine_with(self.measurement_source()?)
    }

    /// Builds a [`TraceEngine`] sharing an already opened source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Topology`] if the topology fails to load.
    pub fn trace_engine_with(
        &self,
        source: Arc<dyn MeasurementSource>,
    ) -> Result<TraceEngine, ConfigError> {
        let topology = Arc::new(self.load_topology()?);
        Ok(TraceEngine::new(topology, source, self.trace.clone()))
    }

    /// Builds a [`PositivityStatsEngine`] over the configured inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any input fails to load.
    pub fn stats_engine(&self) -> Result<PositivityStatsEngine, ConfigError> {
        self.stats_engine_with(self.measurement_source()?)
    }

    /// Builds a [`PositivityStatsEngine`] sharing an already opened source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Metadata`] if the metadata fails to load.
    pub fn stats_engine_with(
        &self,
        source: Arc<dyn MeasurementSource>,
    ) -> Result<PositivityStatsEngine, ConfigError> {
        let metadata = Arc::new(self.load_metadata()?);
        Ok(PositivityStatsEngine::new(
            source,
            metadata,
            &self.measurements.layout.date_format,
        ))
    }
}
