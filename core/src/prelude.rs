use crate::model::{SearchResult, StationId, Viewport};
use crate::view::keys::Key;
use std::path::PathBuf;

/// Events reported by the rendering surface, the search widget and the key
/// listener. Each one maps onto exactly one controller handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    ViewportChanged(Viewport),
    MarkerClicked(StationId),
    PopupClosed,
    KeyPressed(Key),
    SearchResult(SearchResult),
}

/// Errors raised while mutating view state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("unknown station {0}")]
    UnknownStation(StationId),
    #[error("{field} {value} outside [{min}, {max}]")]
    OutOfDomain {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Errors raised while loading the station collection.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("reading dataset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate station identifier {0}")]
    DuplicateStation(StationId),
}

/// Errors raised by location search adapters.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("empty search query")]
    EmptyQuery,
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

pub type ViewResult<T> = Result<T, ViewError>;
