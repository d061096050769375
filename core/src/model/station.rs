use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of a charging station within the loaded collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u64);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One charging station as consumed by the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub identifier: StationId,
    pub location: GeoPoint,
    pub title: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub last_verified: Option<String>,
    #[serde(default, rename = "powerKW")]
    pub power_kw: Option<f64>,
}

impl StationRecord {
    pub fn new(id: u64, latitude: f64, longitude: f64, title: &str, town: &str) -> Self {
        Self {
            identifier: StationId(id),
            location: GeoPoint::new(latitude, longitude),
            title: title.to_string(),
            town: town.to_string(),
            last_verified: None,
            power_kw: None,
        }
    }

    pub fn with_details(mut self, last_verified: Option<&str>, power_kw: Option<f64>) -> Self {
        self.last_verified = last_verified.map(str::to_string);
        self.power_kw = power_kw;
        self
    }
}
