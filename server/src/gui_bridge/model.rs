use crate::workflow::config::ServerConfig;
use evmapcore::model::Viewport;
use serde::{Deserialize, Serialize};

/// Map settings the visualizer needs before it can render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapConfigPayload {
    pub access_token: Option<String>,
    pub map_style: String,
    pub initial_viewport: Viewport,
    pub max_zoom: f64,
}

impl From<&ServerConfig> for MapConfigPayload {
    fn from(config: &ServerConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            map_style: config.map_style.clone(),
            initial_viewport: config.initial_viewport,
            max_zoom: config.max_zoom,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeQuery {
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
