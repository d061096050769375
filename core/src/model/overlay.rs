use geo::Centroid;
use serde::{Deserialize, Serialize};

/// Layer id the rendering surface uses for the search result.
pub const SEARCH_LAYER_ID: &str = "search-result";

/// Fixed styling of the search-result layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub fill_color: [u8; 4],
    pub radius_m: f64,
    pub point_radius_min_px: f32,
    pub point_radius_max_px: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill_color: [255, 0, 0, 128],
            radius_m: 1000.0,
            point_radius_min_px: 10.0,
            point_radius_max_px: 10.0,
        }
    }
}

impl OverlayStyle {
    /// On-screen radius of a point feature at the given ground resolution.
    pub fn point_radius_px(&self, meters_per_pixel: f64) -> f32 {
        let raw = if meters_per_pixel > 0.0 {
            (self.radius_m / meters_per_pixel) as f32
        } else {
            self.point_radius_max_px
        };
        raw.clamp(self.point_radius_min_px, self.point_radius_max_px)
    }
}

/// Camera position a geocoder suggests for its result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportHint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub zoom: Option<f64>,
}

/// Payload emitted by a location search widget on a successful geocode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub geometry: geojson::Geometry,
    #[serde(default)]
    pub viewport_hint: Option<ViewportHint>,
    #[serde(default)]
    pub place_name: Option<String>,
}

impl SearchResult {
    pub fn new(geometry: geojson::Geometry) -> Self {
        Self {
            geometry,
            viewport_hint: None,
            place_name: None,
        }
    }

    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self::new(geojson::Geometry::new(geojson::Value::Point(vec![
            longitude, latitude,
        ])))
    }

    pub fn with_hint(mut self, hint: ViewportHint) -> Self {
        self.viewport_hint = Some(hint);
        self
    }

    /// Location the camera should move to: the explicit hint when present,
    /// otherwise the centroid of the geometry.
    pub fn focus(&self) -> Option<ViewportHint> {
        if let Some(hint) = self.viewport_hint {
            return Some(hint);
        }
        let geometry: geo::Geometry<f64> = self.geometry.clone().try_into().ok()?;
        let centroid = geometry.centroid()?;
        Some(ViewportHint {
            latitude: centroid.y(),
            longitude: centroid.x(),
            zoom: None,
        })
    }
}

/// The single active search-result layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOverlay {
    pub id: &'static str,
    pub geometry: geojson::Geometry,
    pub style: OverlayStyle,
}

impl SearchOverlay {
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            id: SEARCH_LAYER_ID,
            geometry: result.geometry.clone(),
            style: OverlayStyle::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_radius_is_pinned_to_ten_pixels() {
        let style = OverlayStyle::default();
        assert_eq!(style.point_radius_px(1.0), 10.0);
        assert_eq!(style.point_radius_px(10_000.0), 10.0);
        assert_eq!(style.fill_color, [255, 0, 0, 128]);
    }

    #[test]
    fn focus_prefers_hint_over_centroid() {
        let result = SearchResult::point(1.0, 2.0).with_hint(ViewportHint {
            latitude: 5.0,
            longitude: 6.0,
            zoom: Some(9.0),
        });
        assert_eq!(result.focus().unwrap().latitude, 5.0);
    }

    #[test]
    fn focus_falls_back_to_geometry_centroid() {
        let square = geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![2.0, 0.0],
            vec![2.0, 2.0],
            vec![0.0, 2.0],
            vec![0.0, 0.0],
        ]]));
        let focus = SearchResult::new(square).focus().unwrap();
        assert!((focus.latitude - 1.0).abs() < 1e-9);
        assert!((focus.longitude - 1.0).abs() < 1e-9);
        assert_eq!(focus.zoom, None);
    }

    #[test]
    fn search_result_reads_geojson_payload() {
        let json = r#"{"geometry":{"type":"Point","coordinates":[-75.69,45.42]},"place_name":"Ottawa"}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.place_name.as_deref(), Some("Ottawa"));
        let focus = result.focus().unwrap();
        assert!((focus.latitude - 45.42).abs() < 1e-9);
    }
}
