//! Building metadata loading.
//!
//! Metadata is a CSV export from the GIS building layer with one row per
//! building:
//!
//! ```text
//! building_id,residential,manholes
//! 1104,yes,MH-1;MH-2
//! 2210,no,MH-3
//! ```
//!
//! `manholes` lists the manholes servicing the building, separated by `;`.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use sewershed_network_models::{BuildingMetadata, BuildingRecord};

use crate::MetadataError;

/// Separator between manhole IDs in the `manholes` column.
const MANHOLE_SEPARATOR: char = ';';

#[derive(Debug, Deserialize)]
struct RawBuildingRow {
    building_id: String,
    residential: String,
    #[serde(default)]
    manholes: String,
}

/// Parses building metadata from any CSV reader.
///
/// # Errors
///
/// Returns [`MetadataError`] if the CSV is malformed or a residential flag
/// cannot be interpreted.
pub fn read_metadata<R: Read>(reader: R) -> Result<BuildingMetadata, MetadataError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (i, row) in csv_reader.deserialize::<RawBuildingRow>().enumerate() {
        let row = row?;
        let residential = parse_flag(&row.residential).ok_or_else(|| MetadataError::InvalidRow {
            row: i + 1,
            message: format!("unrecognized residential flag '{}'", row.residential),
        })?;

        records.push(BuildingRecord {
            building_id: row.building_id,
            residential,
            manholes: row
                .manholes
                .split(MANHOLE_SEPARATOR)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
        });
    }

    Ok(BuildingMetadata::from_records(records))
}

/// Loads building metadata from a CSV file.
///
/// # Errors
///
/// Returns [`MetadataError`] if the file cannot be opened or parsed.
pub fn load_metadata(path: &Path) -> Result<BuildingMetadata, MetadataError> {
    let file = std::fs::File::open(path)?;
    let metadata = read_metadata(file)?;

    log::info!(
        "Loaded building metadata from {}: {} buildings across {} manholes",
        path.display(),
        metadata.building_count(),
        metadata.manhole_count()
    );

    Ok(metadata)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_metadata_csv() {
        let csv = "building_id,residential,manholes\n\
                   1104,yes,MH-1; MH-2\n\
                   2210,no,MH-3\n\
                   3300,TRUE,\n";
        let metadata = read_metadata(csv.as_bytes()).unwrap();

        assert_eq!(metadata.building_count(), 3);
        assert!(metadata.is_residential_manhole("MH-1"));
        assert!(metadata.is_residential_manhole("MH-2"));
        assert!(!metadata.is_residential_manhole("MH-3"));
        assert_eq!(metadata.is_residential_building("3300"), Some(true));
    }

    #[test]
    fn rejects_unknown_flag() {
        let csv = "building_id,residential,manholes\n1104,maybe,MH-1\n";
        let err = read_metadata(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidRow { row: 1, .. }));
    }
}
