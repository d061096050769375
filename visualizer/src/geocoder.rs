//! Location search adapters backed by HTTP geocoders.

use evmapcore::math::projection::zoom_to_fit;
use evmapcore::model::{SearchResult, ViewportHint};
use evmapcore::prelude::SearchError;
use evmapcore::search::LocationSearch;
use reqwest::{blocking::Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const MAPBOX_GEOCODING_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places/";
const POINT_RESULT_ZOOM: f64 = 16.0;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn client() -> Result<Client, SearchError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SearchError::Unavailable(e.to_string()))
}

/// Mapbox forward geocoding. The access token is passed through untouched.
#[derive(Debug, Clone)]
pub struct MapboxGeocoder {
    access_token: String,
    surface_size: (f32, f32),
    max_zoom: f64,
}

impl MapboxGeocoder {
    pub fn new(access_token: String, surface_size: (f32, f32), max_zoom: f64) -> Self {
        Self {
            access_token,
            surface_size,
            max_zoom,
        }
    }

    fn url(&self, query: &str) -> Result<Url, SearchError> {
        let mut url =
            Url::parse(MAPBOX_GEOCODING_URL).map_err(|e| SearchError::Unavailable(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SearchError::Unavailable("geocoding url cannot take a path".into()))?
            .pop_if_empty()
            .push(&format!("{}.json", query));
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("limit", "1");
        Ok(url)
    }

    fn to_result(&self, feature: MapboxFeature) -> SearchResult {
        let [longitude, latitude] = feature.center;
        let zoom = match feature.bbox {
            Some(bbox) => zoom_to_fit(bbox, self.surface_size.0, self.surface_size.1, self.max_zoom),
            None => POINT_RESULT_ZOOM,
        };
        SearchResult {
            geometry: feature.geometry,
            viewport_hint: Some(ViewportHint {
                latitude,
                longitude,
                zoom: Some(zoom),
            }),
            place_name: feature.place_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapboxResponse {
    #[serde(default)]
    features: Vec<MapboxFeature>,
}

#[derive(Debug, Deserialize)]
struct MapboxFeature {
    geometry: geojson::Geometry,
    center: [f64; 2],
    #[serde(default)]
    place_name: Option<String>,
    #[serde(default)]
    bbox: Option<[f64; 4]>,
}

fn parse_mapbox(body: &str) -> Result<Option<MapboxFeature>, SearchError> {
    let response: MapboxResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Malformed(e.to_string()))?;
    Ok(response.features.into_iter().next())
}

impl LocationSearch for MapboxGeocoder {
    fn search(&self, query: &str) -> Result<Option<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let response = client()?
            .get(self.url(query)?)
            .send()
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SearchError::Unavailable(format!(
                "geocoder responded with {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;
        Ok(parse_mapbox(&body)?.map(|feature| self.to_result(feature)))
    }
}

/// Station-catalog search served by `station-server` at `/geocode`.
#[derive(Debug, Clone)]
pub struct ServerGeocoder {
    base_url: String,
}

impl ServerGeocoder {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

impl LocationSearch for ServerGeocoder {
    fn search(&self, query: &str) -> Result<Option<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let response = client()?
            .get(format!("{}/geocode", self.base_url))
            .query(&[("q", query)])
            .send()
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<SearchResult>()
                .map(Some)
                .map_err(|e| SearchError::Malformed(e.to_string())),
            status => Err(SearchError::Unavailable(format!(
                "station server responded with {}",
                status
            ))),
        }
    }
}
