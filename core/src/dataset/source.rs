use crate::model::{GeoPoint, StationId, StationRecord};
use crate::prelude::DatasetError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Provider of the station collection, consulted once at initialization.
pub trait StationSource {
    fn load(&self) -> Result<Vec<StationRecord>, DatasetError>;
    fn describe(&self) -> String;
}

/// Station dataset stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StationSource for JsonFileSource {
    fn load(&self) -> Result<Vec<StationRecord>, DatasetError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| DatasetError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_dataset(&contents)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory collection, used by tests and the synthetic generator.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<StationRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<StationRecord>) -> Self {
        Self { records }
    }
}

impl StationSource for StaticSource {
    fn load(&self) -> Result<Vec<StationRecord>, DatasetError> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory stations", self.records.len())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetDocument {
    Compact(Vec<StationRecord>),
    OpenChargeMap(OcmExport),
}

/// Open Charge Map export wrapped in a `features` array.
#[derive(Deserialize)]
struct OcmExport {
    features: Vec<OcmStation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcmStation {
    #[serde(rename = "ID")]
    id: u64,
    address_info: OcmAddress,
    #[serde(default)]
    date_last_verified: Option<String>,
    #[serde(default, rename = "PowerKW")]
    power_kw: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcmAddress {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    town: Option<String>,
}

impl From<OcmStation> for StationRecord {
    fn from(station: OcmStation) -> Self {
        StationRecord {
            identifier: StationId(station.id),
            location: GeoPoint::new(station.address_info.latitude, station.address_info.longitude),
            title: station.address_info.title.unwrap_or_default(),
            town: station.address_info.town.unwrap_or_default(),
            last_verified: station.date_last_verified,
            power_kw: station.power_kw,
        }
    }
}

/// Parses either the compact record array or an Open Charge Map export.
pub fn parse_dataset(json: &str) -> Result<Vec<StationRecord>, DatasetError> {
    let document: DatasetDocument = serde_json::from_str(json)?;
    Ok(match document {
        DatasetDocument::Compact(records) => records,
        DatasetDocument::OpenChargeMap(export) => {
            export.features.into_iter().map(StationRecord::from).collect()
        }
    })
}
