//! Reachability maps over the sewer network.
//!
//! The graph is rebuilt for every query because the barrier set changes
//! which edges may be followed, not the edges themselves. Building the
//! graph twice from the same topology and barriers yields identical maps.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use sewershed_network_models::{BuildingId, ManholeId, ManholeNode, NetworkTopology};

use crate::TopologyError;
use crate::topology::index_nodes;

/// Per-manhole reachability under a fixed barrier set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkGraph {
    manhole_graph: BTreeMap<ManholeId, BTreeSet<ManholeId>>,
    building_graph: BTreeMap<ManholeId, BTreeSet<BuildingId>>,
}

impl NetworkGraph {
    /// Computes, for every manhole in `topology`, the manholes and buildings
    /// reachable downstream without expanding past a barrier.
    ///
    /// A barrier reached along an edge is part of its predecessor's
    /// reachable manhole set, but neither its downstream edges nor its
    /// buildings are followed. A barrier used as a start node reaches
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] if the topology references an undefined
    /// manhole or defines one twice.
    pub fn build(
        topology: &NetworkTopology,
        barriers: &BTreeSet<ManholeId>,
    ) -> Result<Self, TopologyError> {
        let index = index_nodes(topology)?;

        let mut manhole_graph = BTreeMap::new();
        let mut building_graph = BTreeMap::new();

        for node in &topology.manholes {
            let (manholes, buildings) = reach_from(node, &index, barriers);
            manhole_graph.insert(node.id.clone(), manholes);
            building_graph.insert(node.id.clone(), buildings);
        }

        log::debug!(
            "Built network graph: {} manholes, {} barriers",
            manhole_graph.len(),
            barriers.len()
        );

        Ok(Self {
            manhole_graph,
            building_graph,
        })
    }

    /// Manholes reachable from `id`, or `None` if `id` is not in the
    /// topology.
    #[must_use]
    pub fn reachable_manholes(&self, id: &str) -> Option<&BTreeSet<ManholeId>> {
        self.manhole_graph.get(id)
    }

    /// Buildings reachable from `id`, or `None` if `id` is not in the
    /// topology.
    #[must_use]
    pub fn reachable_buildings(&self, id: &str) -> Option<&BTreeSet<BuildingId>> {
        self.building_graph.get(id)
    }
}

/// Breadth-first expansion from `start`. Buildings are collected from every
/// node that gets expanded.
fn reach_from(
    start: &ManholeNode,
    index: &BTreeMap<&str, &ManholeNode>,
    barriers: &BTreeSet<ManholeId>,
) -> (BTreeSet<ManholeId>, BTreeSet<BuildingId>) {
    let mut manholes = BTreeSet::new();
    let mut buildings = BTreeSet::new();

    if barriers.contains(&start.id) {
        return (manholes, buildings);
    }

    let mut visited: BTreeSet<&str> = BTreeSet::from([start.id.as_str()]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        buildings.extend(node.buildings.iter().cloned());

        for next in &node.downstream {
            manholes.insert(next.clone());

            if barriers.contains(next) || !visited.insert(next.as_str()) {
                continue;
            }

            if let Some(next_node) = index.get(next.as_str()) {
                queue.push_back(next_node);
            }
        }
    }

    (manholes, buildings)
}
