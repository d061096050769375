use crate::gui_bridge::model::{ErrorBody, GeocodeQuery, MapConfigPayload};
use anyhow::Context;
use evmapcore::dataset::StationCatalog;
use evmapcore::search::{CatalogSearch, LocationSearch};
use evmapcore::telemetry::{LogManager, MetricsRecorder};
use std::{net::SocketAddr, sync::Arc, thread};
use tokio::runtime::Builder;
use warp::{
    http::StatusCode,
    reply::{self, Response},
    Filter, Rejection, Reply,
};

/// Shared, read-only state behind the HTTP routes.
pub struct BridgeState {
    catalog: Arc<StationCatalog>,
    search: CatalogSearch,
    map_config: MapConfigPayload,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl BridgeState {
    pub fn new(catalog: StationCatalog, map_config: MapConfigPayload) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            search: CatalogSearch::new(catalog.clone()),
            catalog,
            map_config,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("bridge"),
        }
    }

    fn not_found(&self, message: String) -> Response {
        self.metrics.record_rejected();
        self.logger.trace(&message);
        reply::with_status(reply::json(&ErrorBody { error: message }), StatusCode::NOT_FOUND)
            .into_response()
    }

    fn stations(&self) -> Response {
        self.metrics.record_handled();
        reply::json(&self.catalog.records()).into_response()
    }

    fn station(&self, id: u64) -> Response {
        match self.catalog.get(evmapcore::model::StationId(id)) {
            Some(station) => {
                self.metrics.record_handled();
                reply::json(station).into_response()
            }
            None => self.not_found(format!("station {} not found", id)),
        }
    }

    fn geocode(&self, query: &GeocodeQuery) -> Response {
        match self.search.search(&query.q) {
            Ok(Some(result)) => {
                self.metrics.record_handled();
                reply::json(&result).into_response()
            }
            Ok(None) => self.not_found(format!("no match for {:?}", query.q)),
            Err(err) => {
                self.metrics.record_rejected();
                reply::with_status(
                    reply::json(&ErrorBody {
                        error: err.to_string(),
                    }),
                    StatusCode::BAD_REQUEST,
                )
                .into_response()
            }
        }
    }

    fn map_config(&self) -> Response {
        self.metrics.record_handled();
        reply::json(&self.map_config).into_response()
    }

    fn metrics(&self) -> Response {
        reply::json(&self.metrics.snapshot()).into_response()
    }
}

/// All routes served to the visualizer.
pub fn routes(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let stations = warp::path("stations")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: Arc<BridgeState>| state.stations());

    let station = warp::path!("stations" / u64)
        .and(warp::get())
        .and(state_filter.clone())
        .map(|id: u64, state: Arc<BridgeState>| state.station(id));

    let geocode = warp::path("geocode")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<GeocodeQuery>())
        .and(state_filter.clone())
        .map(|query: GeocodeQuery, state: Arc<BridgeState>| state.geocode(&query));

    let config = warp::path("config")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: Arc<BridgeState>| state.map_config());

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter)
        .map(|state: Arc<BridgeState>| state.metrics());

    stations
        .or(station)
        .unify()
        .or(geocode)
        .unify()
        .or(config)
        .unify()
        .or(metrics)
        .unify()
}

/// Bridge that hosts the HTTP endpoint on a background thread.
pub struct GuiBridge {
    state: Arc<BridgeState>,
    address: SocketAddr,
}

impl GuiBridge {
    pub fn start(state: BridgeState, address: SocketAddr) -> anyhow::Result<Self> {
        let state = Arc::new(state);
        let filter = routes(state.clone());
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building bridge runtime")?;

        // Bind on the caller's thread so an occupied port surfaces as an error.
        let (bound, server) = runtime
            .block_on(async move { warp::serve(filter).try_bind_ephemeral(address) })
            .with_context(|| format!("binding bridge to {}", address))?;

        thread::spawn(move || {
            runtime.block_on(server);
        });

        state.logger.record(&format!(
            "serving {} stations on http://{}",
            state.catalog.len(),
            bound
        ));
        Ok(Self {
            state,
            address: bound,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn publish_status(&self, message: &str) {
        self.state.logger.record(message);
    }
}
