use crate::prelude::{ViewError, ViewResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LATITUDE: f64 = 45.4211;
pub const DEFAULT_LONGITUDE: f64 = -75.6903;
pub const DEFAULT_ZOOM: f64 = 2.0;
pub const DEFAULT_WIDTH: f32 = 1024.0;
pub const DEFAULT_HEIGHT: f32 = 768.0;

/// Camera state of the map. Fields are private so every value in circulation
/// has passed the domain checks in [`Viewport::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ViewportFields")]
pub struct Viewport {
    latitude: f64,
    longitude: f64,
    zoom: f64,
    width: f32,
    height: f32,
}

#[derive(Deserialize)]
struct ViewportFields {
    latitude: f64,
    longitude: f64,
    zoom: f64,
    #[serde(default = "default_width")]
    width: f32,
    #[serde(default = "default_height")]
    height: f32,
}

fn default_width() -> f32 {
    DEFAULT_WIDTH
}

fn default_height() -> f32 {
    DEFAULT_HEIGHT
}

impl TryFrom<ViewportFields> for Viewport {
    type Error = ViewError;

    fn try_from(fields: ViewportFields) -> ViewResult<Self> {
        Viewport::new(fields.latitude, fields.longitude, fields.zoom)?
            .with_size(fields.width, fields.height)
    }
}

fn check(field: &'static str, value: f64, min: f64, max: f64) -> ViewResult<f64> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ViewError::OutOfDomain {
            field,
            value,
            min,
            max,
        })
    }
}

impl Viewport {
    /// Builds a viewport with the default surface size.
    ///
    /// Zoom is only checked against zero here; the upper bound belongs to the
    /// rendering surface and is applied by the controller.
    pub fn new(latitude: f64, longitude: f64, zoom: f64) -> ViewResult<Self> {
        Ok(Self {
            latitude: check("latitude", latitude, -90.0, 90.0)?,
            longitude: check("longitude", longitude, -180.0, 180.0)?,
            zoom: check("zoom", zoom, 0.0, f64::MAX)?,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        })
    }

    pub fn with_size(mut self, width: f32, height: f32) -> ViewResult<Self> {
        check("width", width as f64, f64::MIN_POSITIVE, f64::MAX)?;
        check("height", height as f64, f64::MIN_POSITIVE, f64::MAX)?;
        self.width = width;
        self.height = height;
        Ok(self)
    }

    /// Same surface size, new camera position.
    pub fn recentered(&self, latitude: f64, longitude: f64, zoom: f64) -> ViewResult<Self> {
        Viewport::new(latitude, longitude, zoom)?.with_size(self.width, self.height)
    }

    pub(crate) fn clamp_zoom(mut self, max_zoom: f64) -> Self {
        if self.zoom > max_zoom {
            self.zoom = max_zoom;
        }
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            zoom: DEFAULT_ZOOM,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_viewport_is_centered_on_ottawa() {
        let viewport = Viewport::default();
        assert_eq!(viewport.latitude(), 45.4211);
        assert_eq!(viewport.longitude(), -75.6903);
        assert_eq!(viewport.zoom(), 2.0);
    }

    #[test]
    fn out_of_domain_latitude_is_rejected() {
        let err = Viewport::new(91.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, ViewError::OutOfDomain { field: "latitude", .. }));
        assert!(Viewport::new(0.0, -180.5, 1.0).is_err());
        assert!(Viewport::new(0.0, 0.0, -1.0).is_err());
        assert!(Viewport::new(f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn deserialization_goes_through_domain_checks() {
        let ok: Viewport =
            serde_json::from_str(r#"{"latitude":10.0,"longitude":20.0,"zoom":3.0}"#).unwrap();
        assert_eq!(ok.width(), DEFAULT_WIDTH);
        assert_eq!(ok.longitude(), 20.0);

        let bad = serde_json::from_str::<Viewport>(r#"{"latitude":100.0,"longitude":0.0,"zoom":3.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(Viewport::default().with_size(0.0, 600.0).is_err());
    }
}
