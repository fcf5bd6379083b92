#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sewer network topology and building metadata types.
//!
//! The topology is a static directed graph of manholes. Each manhole lists
//! the manholes directly downstream of it and the buildings (by CAAN code)
//! it services. Building metadata is kept separate from the topology since
//! it comes from a different provider (the campus GIS export).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Identifier of a manhole sampling site (e.g. `"MH-1041"`).
pub type ManholeId = String;

/// Identifier of a serviced building (CAAN building code).
pub type BuildingId = String;

/// A single manhole node in the sewer network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManholeNode {
    /// Manhole identifier as it appears in the measurement sheet.
    pub id: ManholeId,
    /// Manholes reachable from this one along a single sewer edge.
    #[serde(default)]
    pub downstream: Vec<ManholeId>,
    /// Buildings directly serviced by this manhole.
    #[serde(default)]
    pub buildings: Vec<BuildingId>,
}

/// The static sewer network definition.
///
/// Deserialized from a TOML file of `[[manhole]]` tables. Node order is
/// preserved and is the order in which status reports are emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTopology {
    /// All manhole nodes, in definition order.
    #[serde(default, rename = "manhole")]
    pub manholes: Vec<ManholeNode>,
}

impl NetworkTopology {
    /// Creates a topology from a list of nodes.
    #[must_use]
    pub const fn new(manholes: Vec<ManholeNode>) -> Self {
        Self { manholes }
    }

    /// Iterates manhole IDs in definition order.
    pub fn manhole_ids(&self) -> impl Iterator<Item = &str> {
        self.manholes.iter().map(|m| m.id.as_str())
    }

    /// Looks up a manhole node by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ManholeNode> {
        self.manholes.iter().find(|m| m.id == id)
    }

    /// Number of manholes defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manholes.len()
    }

    /// Whether the topology defines no manholes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manholes.is_empty()
    }
}

/// One row of building metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// CAAN building code.
    pub building_id: BuildingId,
    /// Whether the building is residential housing.
    pub residential: bool,
    /// Manholes that service this building.
    pub manholes: Vec<ManholeId>,
}

/// Read-only building metadata: residential flags and which buildings each
/// manhole serves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildingMetadata {
    residential: BTreeMap<BuildingId, bool>,
    served_by_manhole: BTreeMap<ManholeId, BTreeSet<BuildingId>>,
}

impl BuildingMetadata {
    /// Builds the lookup maps from metadata rows.
    ///
    /// A building listed more than once is residential if any row says so.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = BuildingRecord>) -> Self {
        let mut residential: BTreeMap<BuildingId, bool> = BTreeMap::new();
        let mut served_by_manhole: BTreeMap<ManholeId, BTreeSet<BuildingId>> = BTreeMap::new();

        for record in records {
            let flag = residential.entry(record.building_id.clone()).or_default();
            *flag |= record.residential;

            for manhole in record.manholes {
                served_by_manhole
                    .entry(manhole)
                    .or_default()
                    .insert(record.building_id.clone());
            }
        }

        Self {
            residential,
            served_by_manhole,
        }
    }

    /// Returns the residential flag for a building, if the building is known.
    #[must_use]
    pub fn is_residential_building(&self, building_id: &str) -> Option<bool> {
        self.residential.get(building_id).copied()
    }

    /// A manhole is residential when it serves at least one residential
    /// building. Unknown manholes are non-residential.
    #[must_use]
    pub fn is_residential_manhole(&self, manhole_id: &str) -> bool {
        self.served_by_manhole.get(manhole_id).is_some_and(|buildings| {
            buildings
                .iter()
                .any(|b| self.is_residential_building(b).unwrap_or(false))
        })
    }

    /// Number of distinct buildings known.
    #[must_use]
    pub fn building_count(&self) -> usize {
        self.residential.len()
    }

    /// Number of manholes with at least one served building.
    #[must_use]
    pub fn manhole_count(&self) -> usize {
        self.served_by_manhole.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, residential: bool, manholes: &[&str]) -> BuildingRecord {
        BuildingRecord {
            building_id: id.to_string(),
            residential,
            manholes: manholes.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn deserializes_topology_toml() {
        let topology: NetworkTopology = toml::from_str(
            r#"
            [[manhole]]
            id = "A"
            downstream = ["B"]

            [[manhole]]
            id = "B"
            buildings = ["1001"]
            "#,
        )
        .unwrap();

        assert_eq!(topology.len(), 2);
        assert_eq!(topology.manhole_ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(topology.get("A").unwrap().buildings.is_empty());
        assert_eq!(topology.get("B").unwrap().buildings, vec!["1001"]);
    }

    #[test]
    fn manhole_is_residential_if_any_building_is() {
        let metadata = BuildingMetadata::from_records([
            record("1001", false, &["MH-1", "MH-2"]),
            record("1002", true, &["MH-2"]),
        ]);

        assert!(!metadata.is_residential_manhole("MH-1"));
        assert!(metadata.is_residential_manhole("MH-2"));
        assert!(!metadata.is_residential_manhole("MH-unknown"));
        assert_eq!(metadata.building_count(), 2);
        assert_eq!(metadata.manhole_count(), 2);
    }

    #[test]
    fn duplicate_building_rows_merge_residential_flag() {
        let metadata = BuildingMetadata::from_records([
            record("1001", false, &["MH-1"]),
            record("1001", true, &["MH-3"]),
        ]);

        assert_eq!(metadata.is_residential_building("1001"), Some(true));
        assert!(metadata.is_residential_manhole("MH-1"));
        assert_eq!(metadata.building_count(), 1);
    }
}
