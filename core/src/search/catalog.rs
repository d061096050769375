use crate::dataset::StationCatalog;
use crate::model::{SearchResult, StationRecord, ViewportHint};
use crate::prelude::SearchError;
use crate::search::LocationSearch;
use std::sync::Arc;

pub const SINGLE_MATCH_ZOOM: f64 = 14.0;
pub const AREA_MATCH_ZOOM: f64 = 10.0;

/// Offline geocoder that resolves queries against station titles and towns.
#[derive(Clone)]
pub struct CatalogSearch {
    catalog: Arc<StationCatalog>,
}

impl CatalogSearch {
    pub fn new(catalog: Arc<StationCatalog>) -> Self {
        Self { catalog }
    }

    fn matches<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a StationRecord> + 'a {
        self.catalog.iter().filter(move |station| {
            station.town.to_lowercase().contains(needle)
                || station.title.to_lowercase().contains(needle)
        })
    }
}

impl LocationSearch for CatalogSearch {
    fn search(&self, query: &str) -> Result<Option<SearchResult>, SearchError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let found: Vec<&StationRecord> = self.matches(&needle).collect();
        let Some(first) = found.first() else {
            return Ok(None);
        };

        let result = if found.len() == 1 {
            SearchResult::point(first.location.latitude, first.location.longitude).with_hint(
                ViewportHint {
                    latitude: first.location.latitude,
                    longitude: first.location.longitude,
                    zoom: Some(SINGLE_MATCH_ZOOM),
                },
            )
        } else {
            let points = found
                .iter()
                .map(|station| vec![station.location.longitude, station.location.latitude])
                .collect();
            let count = found.len() as f64;
            let latitude = found.iter().map(|s| s.location.latitude).sum::<f64>() / count;
            let longitude = found.iter().map(|s| s.location.longitude).sum::<f64>() / count;
            SearchResult::new(geojson::Geometry::new(geojson::Value::MultiPoint(points))).with_hint(
                ViewportHint {
                    latitude,
                    longitude,
                    zoom: Some(AREA_MATCH_ZOOM),
                },
            )
        };

        let place = if first.town.is_empty() {
            first.title.clone()
        } else {
            first.town.clone()
        };
        Ok(Some(SearchResult {
            place_name: Some(place),
            ..result
        }))
    }
}
