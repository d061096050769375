use crate::generator::dataset::GeneratorConfig;
use anyhow::Context;
use evmapcore::model::Viewport;
use evmapcore::view::DEFAULT_MAX_ZOOM;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/streets-v11";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub dataset: Option<PathBuf>,
    pub synthetic: Option<GeneratorConfig>,
    pub bind: SocketAddr,
    pub map_style: String,
    pub access_token: Option<String>,
    pub initial_viewport: Viewport,
    pub max_zoom: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            synthetic: None,
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            map_style: DEFAULT_MAP_STYLE.to_string(),
            access_token: None,
            initial_viewport: Viewport::default(),
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading server config {}", path_ref.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing server config {}", path_ref.display()))?;
        Ok(config)
    }

    /// The access token is opaque; an environment value wins over the file.
    pub fn apply_env(mut self) -> Self {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.access_token = Some(token);
            }
        }
        self
    }
}
