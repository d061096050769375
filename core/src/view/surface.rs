use crate::model::{SearchOverlay, StationId, StationRecord, Viewport};
use serde::Serialize;

/// Zoom ceiling used when a surface does not declare its own.
pub const DEFAULT_MAX_ZOOM: f64 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    pub id: StationId,
    pub latitude: f64,
    pub longitude: f64,
    pub selected: bool,
}

/// Station details shown in the popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupContent {
    pub title: String,
    pub town: String,
    pub last_verified: Option<String>,
    pub power_kw: Option<f64>,
}

impl PopupContent {
    pub fn from_station(station: &StationRecord) -> Self {
        Self {
            title: station.title.clone(),
            town: station.town.clone(),
            last_verified: station.last_verified.clone(),
            power_kw: station.power_kw,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            "Charging Station:".to_string(),
            self.title.clone(),
            self.town.clone(),
            format!(
                "Last Verified: {}",
                self.last_verified.as_deref().unwrap_or("unknown")
            ),
            match self.power_kw {
                Some(kw) => format!("Power: {kw} kW"),
                None => "Power: n/a".to_string(),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupDescriptor {
    pub station: StationId,
    pub latitude: f64,
    pub longitude: f64,
    pub content: PopupContent,
}

/// Everything a surface needs to draw one frame of the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub markers: Vec<MarkerDescriptor>,
    pub popup: Option<PopupDescriptor>,
    pub overlay: Option<SearchOverlay>,
}

/// Map rendering library adapter. Interaction comes back to the controller as
/// [`crate::ViewEvent`]s; surfaces never mutate controller state.
pub trait MapSurface {
    fn max_zoom(&self) -> f64 {
        DEFAULT_MAX_ZOOM
    }

    fn render(&mut self, frame: &RenderFrame);
}

/// Headless surface that keeps the latest frame.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    last: Option<RenderFrame>,
    renders: usize,
    max_zoom: Option<f64>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_zoom(max_zoom: f64) -> Self {
        Self {
            max_zoom: Some(max_zoom),
            ..Self::default()
        }
    }

    pub fn last_frame(&self) -> Option<&RenderFrame> {
        self.last.as_ref()
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl MapSurface for RecordingSurface {
    fn max_zoom(&self) -> f64 {
        self.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM)
    }

    fn render(&mut self, frame: &RenderFrame) {
        self.last = Some(frame.clone());
        self.renders += 1;
    }
}
