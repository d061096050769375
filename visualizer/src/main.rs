use evmapcore::dataset::{JsonFileSource, StationCatalog};
use evmapcore::model::{SearchResult, StationRecord, Viewport};
use evmapcore::search::LocationSearch;
use evmapcore::view::{Key, KeyListenerRegistry, MountedView, Selection};
use evmapcore::{MapSurface, MapViewController, ViewEvent};
use geocoder::{MapboxGeocoder, ServerGeocoder};
use iced::{
    event, keyboard,
    widget::{button, column, row, scrollable, text, text_input, Canvas, Column, Container},
    Alignment, Element, Length, Subscription, Task, Theme,
};
use serde::Deserialize;
use std::sync::Arc;
use surface::CanvasSurface;

mod geocoder;
mod surface;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:9000";
const SERVER_URL_ENV: &str = "EVMAP_SERVER_URL";
const DATASET_ENV: &str = "EVMAP_DATASET";

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "EV Charging Stations".into()
}

/// Escape anywhere in the window closes the popup.
fn application_subscription(_: &Visualizer) -> Subscription<Message> {
    event::listen_with(|event, _status, _window| match event {
        iced::Event::Keyboard(keyboard::Event::KeyPressed {
            key: keyboard::Key::Named(keyboard::key::Named::Escape),
            ..
        }) => Some(Message::KeyPressed(Key::Escape)),
        _ => None,
    })
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

struct Visualizer {
    view: MountedView<CanvasSurface>,
    keys: KeyListenerRegistry,
    server_url: String,
    access_token: Option<String>,
    query: String,
    searching: bool,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Map(ViewEvent),
    MapEvents(Vec<ViewEvent>),
    KeyPressed(Key),
    ConfigFetched(Result<MapConfigPayload, String>),
    StationsFetched(Result<Vec<StationRecord>, String>),
    QueryChanged(String),
    SubmitSearch,
    SearchFinished(Result<SearchOutcome, String>),
}

/// A geocoder reply plus whether that geocoder already moved the camera.
#[derive(Debug, Clone)]
struct SearchOutcome {
    result: Option<SearchResult>,
    drives_viewport: bool,
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let server_url =
            std::env::var(SERVER_URL_ENV).unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let keys = KeyListenerRegistry::new();

        let local_dataset = std::env::var(DATASET_ENV).ok();
        let controller = match &local_dataset {
            Some(path) => MapViewController::initialize(&JsonFileSource::new(path), CanvasSurface::new()),
            None => MapViewController::with_catalog(StationCatalog::empty(), CanvasSurface::new()),
        };
        let view = controller.mount(&keys);

        let mut tasks = vec![Task::perform(
            fetch_config(server_url.clone()),
            Message::ConfigFetched,
        )];
        if local_dataset.is_none() {
            tasks.push(Task::perform(
                fetch_stations(server_url.clone()),
                Message::StationsFetched,
            ));
        }

        (
            Visualizer {
                view,
                keys,
                server_url,
                access_token: None,
                query: String::new(),
                searching: false,
                status: "Loading stations...".into(),
                history: Vec::new(),
            },
            Task::batch(tasks),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Map(event) => {
                state.apply_map_event(event);
                Task::none()
            }
            Message::MapEvents(events) => {
                for event in events {
                    state.apply_map_event(event);
                }
                Task::none()
            }
            Message::KeyPressed(key) => {
                state.keys.dispatch(key);
                if state.view.pump() > 0 {
                    state.push_history("Escape: selection cleared".into());
                }
                Task::none()
            }
            Message::ConfigFetched(Ok(config)) => {
                let controller = state.view.controller_mut();
                controller.surface_mut().set_max_zoom(config.max_zoom);
                let current = *controller.viewport();
                let initial = config
                    .initial_viewport
                    .with_size(current.width(), current.height())
                    .unwrap_or(config.initial_viewport);
                controller.on_viewport_change(initial);
                state.access_token = config.access_token;
                if state.access_token.is_none() {
                    state.push_history("No access token: searching station catalog".into());
                }
                Task::none()
            }
            Message::ConfigFetched(Err(err)) => {
                state.push_history(format!("Map config unavailable: {err}"));
                Task::none()
            }
            Message::StationsFetched(Ok(records)) => {
                match StationCatalog::new(records) {
                    Ok(catalog) => {
                        state.status = format!("{} charging stations", catalog.len());
                        state.view.controller_mut().replace_catalog(catalog);
                    }
                    Err(err) => state.status = format!("Station data rejected: {err}"),
                }
                Task::none()
            }
            Message::StationsFetched(Err(err)) => {
                state.status = format!("Station data unavailable ({err}); no markers shown");
                Task::none()
            }
            Message::QueryChanged(query) => {
                state.query = query;
                Task::none()
            }
            Message::SubmitSearch => {
                if state.searching || state.query.trim().is_empty() {
                    return Task::none();
                }
                state.searching = true;
                let geocoder = state.geocoder();
                let query = state.query.clone();
                Task::perform(run_search(geocoder, query), Message::SearchFinished)
            }
            Message::SearchFinished(result) => {
                state.searching = false;
                match result {
                    Ok(SearchOutcome {
                        result: Some(found),
                        drives_viewport,
                    }) => {
                        let name = found
                            .place_name
                            .clone()
                            .unwrap_or_else(|| state.query.clone());
                        state.status = format!("Showing {name}");
                        state.push_history(format!("Search: {name}"));
                        show_search_result(state.view.controller_mut(), drives_viewport, found);
                    }
                    Ok(SearchOutcome { result: None, .. }) => state.status = format!("No results for \"{}\"", state.query),
                    Err(err) => state.status = format!("Search failed: {err}"),
                }
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let controller = state.view.controller();

        let mut search_button = button("Search").padding(8);
        if !state.searching {
            search_button = search_button.on_press(Message::SubmitSearch);
        }

        let station_panel: Element<'_, Message> = match controller.selected_station() {
            Some(station) => column![
                text("Charging Station:").size(14),
                text(station.title.clone()).size(20),
                text(station.town.clone()).size(14),
                text(format!(
                    "Last Verified: {}",
                    station.last_verified.as_deref().unwrap_or("unknown")
                ))
                .size(13),
                text(match station.power_kw {
                    Some(kw) => format!("Power: {kw} kW"),
                    None => "Power: n/a".to_string(),
                })
                .size(13),
                button("Close")
                    .on_press(Message::Map(ViewEvent::PopupClosed))
                    .padding(6),
            ]
            .spacing(4)
            .into(),
            None => text("Click a marker to see station details.").size(13).into(),
        };

        let viewport = controller.viewport();
        let camera = text(format!(
            "Lat {:.4}  Lon {:.4}  Zoom {:.2}",
            viewport.latitude(),
            viewport.longitude(),
            viewport.zoom()
        ))
        .size(12);

        let selection = match controller.selection() {
            Selection::Empty => "Selection: none".to_string(),
            Selection::Selected(id) => format!("Selection: station {id}"),
        };

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let side_column = column![
            text("EV Stations").size(26),
            row![
                text_input("Search a place", &state.query)
                    .on_input(Message::QueryChanged)
                    .on_submit(Message::SubmitSearch)
                    .padding(6),
                search_button,
            ]
            .spacing(6),
            text(&state.status).size(14),
            camera,
            text(selection).size(12),
            Container::new(station_panel).padding(6),
            text("Drag to pan, scroll to zoom, Esc closes the popup.").size(12),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(160.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(320.0));

        let map: Element<'_, Message> = match controller.surface().canvas() {
            Some(program) => Canvas::new(program)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("Map unavailable").into(),
        };

        let layout = row![side_column, map]
            .spacing(12)
            .align_y(Alignment::Start)
            .height(Length::Fill);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn geocoder(&self) -> Arc<dyn LocationSearch + Send + Sync> {
        let controller = self.view.controller();
        let viewport = controller.viewport();
        match &self.access_token {
            Some(token) => Arc::new(MapboxGeocoder::new(
                token.clone(),
                (viewport.width(), viewport.height()),
                controller.surface().max_zoom(),
            )),
            None => Arc::new(ServerGeocoder::new(self.server_url.clone())),
        }
    }

    fn apply_map_event(&mut self, event: ViewEvent) {
        let label = match &event {
            ViewEvent::MarkerClicked(id) => Some(format!("Selected station {}", id)),
            ViewEvent::PopupClosed => Some("Popup closed".to_string()),
            _ => None,
        };
        match self.view.controller_mut().handle(event) {
            Ok(()) => {
                if let Some(label) = label {
                    self.push_history(label);
                }
            }
            Err(err) => self.status = format!("Ignored map event: {err}"),
        }
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

/// Geocoder adapters block on HTTP, so they run off the UI executor.
async fn run_search(
    geocoder: Arc<dyn LocationSearch + Send + Sync>,
    query: String,
) -> Result<SearchOutcome, String> {
    let drives_viewport = geocoder.drives_viewport();
    let result = tokio::task::spawn_blocking(move || geocoder.search(&query))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(SearchOutcome {
        result,
        drives_viewport,
    })
}

fn show_search_result<S: MapSurface>(
    controller: &mut MapViewController<S>,
    drives_viewport: bool,
    found: SearchResult,
) {
    controller.set_search_drives_viewport(drives_viewport);
    controller.on_search_result(found);
}

async fn fetch_config(server_url: String) -> Result<MapConfigPayload, String> {
    let response = reqwest::get(format!("{server_url}/config"))
        .await
        .map_err(|e| e.to_string())?;
    response
        .json::<MapConfigPayload>()
        .await
        .map_err(|e| e.to_string())
}

async fn fetch_stations(server_url: String) -> Result<Vec<StationRecord>, String> {
    let response = reqwest::get(format!("{server_url}/stations"))
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("station server responded with {}", response.status()));
    }
    response
        .json::<Vec<StationRecord>>()
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Deserialize)]
struct MapConfigPayload {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    initial_viewport: Viewport,
    #[serde(default = "default_max_zoom")]
    max_zoom: f64,
}

fn default_max_zoom() -> f64 {
    evmapcore::view::DEFAULT_MAX_ZOOM
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmapcore::prelude::SearchError;
    use evmapcore::view::RecordingSurface;

    struct FixedSearch {
        drives_viewport: bool,
    }

    impl LocationSearch for FixedSearch {
        fn search(&self, _query: &str) -> Result<Option<SearchResult>, SearchError> {
            Ok(Some(SearchResult::point(48.85, 2.35)))
        }

        fn drives_viewport(&self) -> bool {
            self.drives_viewport
        }
    }

    fn controller() -> MapViewController<RecordingSurface> {
        MapViewController::with_catalog(StationCatalog::empty(), RecordingSurface::new())
    }

    #[tokio::test]
    async fn search_outcome_carries_geocoder_camera_flag() {
        let outcome = run_search(Arc::new(FixedSearch { drives_viewport: true }), "paris".into())
            .await
            .unwrap();
        assert!(outcome.drives_viewport);
        assert!(outcome.result.is_some());

        let outcome = run_search(Arc::new(FixedSearch { drives_viewport: false }), "paris".into())
            .await
            .unwrap();
        assert!(!outcome.drives_viewport);
    }

    #[test]
    fn camera_follows_result_only_when_geocoder_does_not() {
        let mut view = controller();
        let before = *view.viewport();
        show_search_result(&mut view, true, SearchResult::point(48.85, 2.35));
        assert_eq!(*view.viewport(), before);
        assert!(view.overlay().is_some());

        show_search_result(&mut view, false, SearchResult::point(48.85, 2.35));
        assert_eq!(view.viewport().latitude(), 48.85);
    }
}
