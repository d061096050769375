pub mod overlay;
pub mod station;
pub mod viewport;

pub use overlay::{OverlayStyle, SearchOverlay, SearchResult, ViewportHint, SEARCH_LAYER_ID};
pub use station::{GeoPoint, StationId, StationRecord};
pub use viewport::Viewport;
