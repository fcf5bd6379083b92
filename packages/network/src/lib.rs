#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Barrier-limited reachability over the sewer network.
//!
//! [`graph::NetworkGraph`] turns the static [`NetworkTopology`] plus a
//! per-query barrier set into two reachability maps (manhole → manholes,
//! manhole → buildings). The [`topology`] and [`metadata`] modules load the
//! static inputs from disk once per engine instance.

pub mod graph;
pub mod metadata;
pub mod topology;

pub use graph::NetworkGraph;
pub use sewershed_network_models::{
    BuildingId, BuildingMetadata, BuildingRecord, ManholeId, ManholeNode, NetworkTopology,
};

use thiserror::Error;

/// Errors raised when the network topology is malformed.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// An edge points at a manhole that the topology never defines.
    #[error("Manhole '{from}' references undefined manhole '{to}'")]
    UndefinedNode {
        /// Manhole holding the dangling edge.
        from: ManholeId,
        /// The undefined target.
        to: ManholeId,
    },

    /// The same manhole ID is defined twice.
    #[error("Manhole '{id}' is defined more than once")]
    DuplicateNode {
        /// The repeated ID.
        id: ManholeId,
    },

    /// Reading the topology file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The topology file is not valid TOML for the expected schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while loading building metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Reading the metadata file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata CSV could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row held a value that could not be interpreted.
    #[error("Invalid metadata row {row}: {message}")]
    InvalidRow {
        /// 1-based data row number.
        row: usize,
        /// Description of what went wrong.
        message: String,
    },
}
