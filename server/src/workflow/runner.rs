use crate::generator::dataset::build_stations;
use crate::workflow::config::ServerConfig;
use anyhow::Context;
use evmapcore::dataset::{JsonFileSource, StationCatalog, StationSource};
use serde::Serialize;
use std::collections::BTreeSet;

/// Aggregate figures printed by `--summary`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetSummary {
    pub stations: usize,
    pub towns: usize,
    pub with_power_rating: usize,
    pub max_power_kw: Option<f64>,
    pub bounds: Option<[f64; 4]>,
}

/// Builds the station catalog from the configured dataset, or from the
/// synthetic generator when no dataset is given.
pub fn load_catalog(config: &ServerConfig) -> anyhow::Result<StationCatalog> {
    let records = match (&config.dataset, &config.synthetic) {
        (Some(path), _) => {
            let source = JsonFileSource::new(path);
            source
                .load()
                .with_context(|| format!("loading stations from {}", source.describe()))?
        }
        (None, Some(generator)) => {
            build_stations(generator).context("generating synthetic stations")?
        }
        (None, None) => {
            log::warn!("no dataset configured, serving an empty station list");
            Vec::new()
        }
    };
    StationCatalog::new(records).context("indexing stations")
}

pub fn summarize(catalog: &StationCatalog) -> DatasetSummary {
    let towns: BTreeSet<&str> = catalog
        .iter()
        .map(|station| station.town.as_str())
        .filter(|town| !town.is_empty())
        .collect();
    let powers: Vec<f64> = catalog.iter().filter_map(|station| station.power_kw).collect();

    let bounds = catalog.iter().fold(None, |acc: Option<[f64; 4]>, station| {
        let (lat, lon) = (station.location.latitude, station.location.longitude);
        Some(match acc {
            None => [lon, lat, lon, lat],
            Some([min_lon, min_lat, max_lon, max_lat]) => [
                min_lon.min(lon),
                min_lat.min(lat),
                max_lon.max(lon),
                max_lat.max(lat),
            ],
        })
    });

    DatasetSummary {
        stations: catalog.len(),
        towns: towns.len(),
        with_power_rating: powers.len(),
        max_power_kw: powers.iter().cloned().reduce(f64::max),
        bounds,
    }
}
