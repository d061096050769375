//! Web Mercator helpers shared by rendering surfaces.
//!
//! World coordinates are pixels on a square of `TILE_SIZE * 2^zoom` with the
//! origin at the north-west corner, matching the vector-tile convention.

use crate::model::Viewport;
use crate::prelude::ViewResult;
use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 512.0;
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;
const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.685_578_49;

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Geographic position to world pixels at `zoom`.
pub fn project(latitude: f64, longitude: f64, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = latitude
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let x = (longitude + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

/// World pixels at `zoom` back to (latitude, longitude).
pub fn unproject(x: f64, y: f64, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let longitude = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let latitude = n.sinh().atan().to_degrees();
    (latitude, longitude)
}

/// Ground resolution at a latitude for a given zoom.
pub fn meters_per_pixel(latitude: f64, zoom: f64) -> f64 {
    EARTH_CIRCUMFERENCE_M * latitude.to_radians().cos() / world_size(zoom)
}

/// Highest zoom at which `[min_lon, min_lat, max_lon, max_lat]` fits inside a
/// `width` x `height` surface.
pub fn zoom_to_fit(bounds: [f64; 4], width: f32, height: f32, max_zoom: f64) -> f64 {
    let [min_lon, min_lat, max_lon, max_lat] = bounds;
    let (left, top) = project(max_lat, min_lon, 0.0);
    let (right, bottom) = project(min_lat, max_lon, 0.0);
    let span_x = (right - left).abs().max(1e-9);
    let span_y = (bottom - top).abs().max(1e-9);
    let zoom = (width as f64 / span_x).log2().min((height as f64 / span_y).log2());
    zoom.clamp(0.0, max_zoom)
}

fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Screen-space projection for one viewport; the viewport centre sits in the
/// middle of the surface.
#[derive(Debug, Clone, Copy)]
pub struct ViewportProjection {
    viewport: Viewport,
    center: (f64, f64),
}

impl ViewportProjection {
    pub fn new(viewport: &Viewport) -> Self {
        Self {
            viewport: *viewport,
            center: project(viewport.latitude(), viewport.longitude(), viewport.zoom()),
        }
    }

    pub fn to_screen(&self, latitude: f64, longitude: f64) -> (f32, f32) {
        let (x, y) = project(latitude, longitude, self.viewport.zoom());
        (
            (x - self.center.0 + self.viewport.width() as f64 / 2.0) as f32,
            (y - self.center.1 + self.viewport.height() as f64 / 2.0) as f32,
        )
    }

    pub fn to_geo(&self, x: f32, y: f32) -> (f64, f64) {
        let world_x = x as f64 - self.viewport.width() as f64 / 2.0 + self.center.0;
        let world_y = y as f64 - self.viewport.height() as f64 / 2.0 + self.center.1;
        unproject(world_x, world_y, self.viewport.zoom())
    }

    pub fn meters_per_pixel(&self) -> f64 {
        meters_per_pixel(self.viewport.latitude(), self.viewport.zoom())
    }

    /// Viewport after dragging the map by `(dx, dy)` screen pixels.
    pub fn panned(&self, dx: f32, dy: f32) -> ViewResult<Viewport> {
        let world_x = self.center.0 - dx as f64;
        let world_y = self.center.1 - dy as f64;
        let (latitude, longitude) = unproject(world_x, world_y, self.viewport.zoom());
        self.viewport.recentered(
            latitude.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE),
            wrap_longitude(longitude),
            self.viewport.zoom(),
        )
    }

    /// Viewport after zooming by `delta` levels while keeping the geographic
    /// point under `(x, y)` fixed on screen.
    pub fn zoomed_around(&self, x: f32, y: f32, delta: f64, max_zoom: f64) -> ViewResult<Viewport> {
        let zoom = (self.viewport.zoom() + delta).clamp(0.0, max_zoom);
        let (anchor_lat, anchor_lon) = self.to_geo(x, y);
        let (anchor_x, anchor_y) = project(anchor_lat, anchor_lon, zoom);
        let center_x = anchor_x - (x as f64 - self.viewport.width() as f64 / 2.0);
        let center_y = anchor_y - (y as f64 - self.viewport.height() as f64 / 2.0);
        let (latitude, longitude) = unproject(center_x, center_y, zoom);
        self.viewport.recentered(
            latitude.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE),
            wrap_longitude(longitude),
            zoom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_world_center() {
        let (x, y) = project(0.0, 0.0, 0.0);
        assert!((x - 256.0).abs() < 1e-9);
        assert!((y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn project_unproject_roundtrip() {
        let (x, y) = project(45.4211, -75.6903, 11.0);
        let (lat, lon) = unproject(x, y, 11.0);
        assert!((lat - 45.4211).abs() < 1e-9, "lat={}", lat);
        assert!((lon + 75.6903).abs() < 1e-9, "lon={}", lon);
    }

    #[test]
    fn viewport_center_maps_to_surface_middle() {
        let viewport = Viewport::new(45.0, -75.0, 8.0)
            .unwrap()
            .with_size(800.0, 600.0)
            .unwrap();
        let projection = ViewportProjection::new(&viewport);
        let (x, y) = projection.to_screen(45.0, -75.0);
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn panning_right_moves_camera_west() {
        let viewport = Viewport::new(0.0, 0.0, 4.0).unwrap();
        let panned = ViewportProjection::new(&viewport).panned(100.0, 0.0).unwrap();
        assert!(panned.longitude() < 0.0);
        assert_eq!(panned.zoom(), 4.0);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let viewport = Viewport::new(10.0, 10.0, 5.0).unwrap();
        let projection = ViewportProjection::new(&viewport);
        let anchor = projection.to_geo(100.0, 120.0);
        let zoomed = projection.zoomed_around(100.0, 120.0, 1.0, 22.0).unwrap();
        let after = ViewportProjection::new(&zoomed).to_geo(100.0, 120.0);
        assert!((anchor.0 - after.0).abs() < 1e-6);
        assert!((anchor.1 - after.1).abs() < 1e-6);
        assert_eq!(zoomed.zoom(), 6.0);
    }

    #[test]
    fn whole_world_fits_at_zoom_zero() {
        let world = [-180.0, -MAX_MERCATOR_LATITUDE, 180.0, MAX_MERCATOR_LATITUDE];
        assert!(zoom_to_fit(world, 512.0, 512.0, 22.0).abs() < 1e-6);
        assert_eq!(zoom_to_fit([1.0, 1.0, 1.0, 1.0], 512.0, 512.0, 18.0), 18.0);
    }

    #[test]
    fn longitude_wraps_across_antimeridian() {
        assert!((wrap_longitude(190.0) + 170.0).abs() < 1e-9);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
    }
}
