//! Topology loading and validation.
//!
//! The network is described in TOML:
//!
//! ```toml
//! [[manhole]]
//! id = "MH-1"
//! downstream = ["MH-2"]
//! buildings = ["1104"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use sewershed_network_models::{ManholeNode, NetworkTopology};

use crate::TopologyError;

/// Parses and validates a topology from TOML text.
///
/// # Errors
///
/// Returns [`TopologyError`] if the TOML is malformed or the topology
/// references an undefined manhole.
pub fn parse_topology(toml_str: &str) -> Result<NetworkTopology, TopologyError> {
    let topology: NetworkTopology = toml::from_str(toml_str)?;
    index_nodes(&topology)?;
    Ok(topology)
}

/// Reads, parses and validates a topology file.
///
/// # Errors
///
/// Returns [`TopologyError`] if the file cannot be read or is invalid.
pub fn load_topology(path: &Path) -> Result<NetworkTopology, TopologyError> {
    let contents = std::fs::read_to_string(path)?;
    let topology = parse_topology(&contents)?;

    let edge_count: usize = topology.manholes.iter().map(|m| m.downstream.len()).sum();
    log::info!(
        "Loaded topology from {}: {} manholes, {} edges",
        path.display(),
        topology.len(),
        edge_count
    );

    Ok(topology)
}

/// Indexes nodes by ID, checking that every edge target is defined and
/// that no ID repeats.
pub(crate) fn index_nodes(
    topology: &NetworkTopology,
) -> Result<BTreeMap<&str, &ManholeNode>, TopologyError> {
    let mut index = BTreeMap::new();

    for node in &topology.manholes {
        if index.insert(node.id.as_str(), node).is_some() {
            return Err(TopologyError::DuplicateNode {
                id: node.id.clone(),
            });
        }
    }

    for node in &topology.manholes {
        if let Some(missing) = node
            .downstream
            .iter()
            .find(|next| !index.contains_key(next.as_str()))
        {
            return Err(TopologyError::UndefinedNode {
                from: node.id.clone(),
                to: missing.clone(),
            });
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_topology() {
        let topology = parse_topology(
            r#"
            [[manhole]]
            id = "MH-1"
            downstream = ["MH-2"]

            [[manhole]]
            id = "MH-2"
            buildings = ["1104", "1105"]
            "#,
        )
        .unwrap();

        assert_eq!(topology.len(), 2);
    }

    #[test]
    fn rejects_dangling_edge() {
        let err = parse_topology(
            r#"
            [[manhole]]
            id = "MH-1"
            downstream = ["MH-9"]
            "#,
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Manhole 'MH-1' references undefined manhole 'MH-9'"
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = parse_topology(
            r#"
            [[manhole]]
            id = "MH-1"

            [[manhole]]
            id = "MH-1"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, TopologyError::DuplicateNode { .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_topology("[[manhole]]\nid = 42\n").unwrap_err();
        assert!(matches!(err, TopologyError::Toml(_)));
    }
}
