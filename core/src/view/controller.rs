use crate::dataset::{StationCatalog, StationSource};
use crate::model::{SearchOverlay, SearchResult, StationId, StationRecord, Viewport};
use crate::prelude::{ViewError, ViewEvent, ViewResult};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::view::keys::{Key, KeyListener, KeyListenerRegistry};
use crate::view::selection::Selection;
use crate::view::surface::{MapSurface, MarkerDescriptor, PopupContent, PopupDescriptor, RenderFrame};

/// Zoom applied when a search result carries no zoom of its own.
pub const SEARCH_RESULT_ZOOM: f64 = 16.0;

/// Single owner of viewport, selection and search overlay.
///
/// Every handler runs to completion and re-renders the surface; collaborators
/// only ever see the resulting [`RenderFrame`].
pub struct MapViewController<S: MapSurface> {
    catalog: StationCatalog,
    viewport: Viewport,
    selection: Selection,
    overlay: Option<SearchOverlay>,
    search_drives_viewport: bool,
    surface: S,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<S: MapSurface> MapViewController<S> {
    /// Loads the station collection and renders the initial frame. A source
    /// that cannot be read leaves the view running with no markers.
    pub fn initialize(source: &dyn StationSource, surface: S) -> Self {
        let logger = LogManager::new("map-view");
        let catalog = match source.load().and_then(StationCatalog::new) {
            Ok(catalog) => {
                logger.record(&format!(
                    "loaded {} stations from {}",
                    catalog.len(),
                    source.describe()
                ));
                catalog
            }
            Err(err) => {
                logger.warn(&format!(
                    "station source {} unavailable, rendering without markers: {}",
                    source.describe(),
                    err
                ));
                StationCatalog::empty()
            }
        };
        Self::with_catalog(catalog, surface)
    }

    pub fn with_catalog(catalog: StationCatalog, surface: S) -> Self {
        let mut controller = Self {
            catalog,
            viewport: Viewport::default(),
            selection: Selection::Empty,
            overlay: None,
            search_drives_viewport: false,
            surface,
            logger: LogManager::new("map-view"),
            metrics: MetricsRecorder::new(),
        };
        controller.render();
        controller
    }

    /// Declares whether the search widget moves the camera itself. When it
    /// does not, search results also recentre the viewport.
    pub fn set_search_drives_viewport(&mut self, drives: bool) {
        self.search_drives_viewport = drives;
    }

    pub fn on_viewport_change(&mut self, viewport: Viewport) {
        self.metrics.record_handled();
        self.apply_viewport(viewport);
    }

    pub fn on_marker_click(&mut self, id: StationId) -> ViewResult<()> {
        if !self.catalog.contains(id) {
            self.metrics.record_rejected();
            self.logger
                .warn(&format!("marker click for unknown station {}", id));
            return Err(ViewError::UnknownStation(id));
        }
        self.selection.select(id);
        self.logger.trace(&format!("selected station {}", id));
        self.metrics.record_handled();
        self.render();
        Ok(())
    }

    pub fn on_popup_close(&mut self) {
        let was_selected = !self.selection.is_empty();
        self.selection.clear();
        self.metrics.record_handled();
        if was_selected {
            self.logger.trace("selection cleared");
            self.render();
        }
    }

    pub fn on_escape_key(&mut self) {
        self.on_popup_close();
    }

    /// Replaces the search overlay. The overlay stays until the next result.
    pub fn on_search_result(&mut self, result: SearchResult) {
        self.overlay = Some(SearchOverlay::from_result(&result));
        self.logger.record(&format!(
            "search result {}",
            result.place_name.as_deref().unwrap_or("(unnamed)")
        ));
        self.metrics.record_handled();

        if !self.search_drives_viewport {
            if let Some(focus) = result.focus() {
                let zoom = focus.zoom.unwrap_or(SEARCH_RESULT_ZOOM);
                match self.viewport.recentered(focus.latitude, focus.longitude, zoom) {
                    Ok(viewport) => {
                        self.apply_viewport(viewport);
                        return;
                    }
                    Err(err) => self
                        .logger
                        .warn(&format!("ignoring search viewport: {}", err)),
                }
            }
        }
        self.render();
    }

    /// Routes an event to its handler. Keys other than Escape are ignored.
    pub fn handle(&mut self, event: ViewEvent) -> ViewResult<()> {
        match event {
            ViewEvent::ViewportChanged(viewport) => self.on_viewport_change(viewport),
            ViewEvent::MarkerClicked(id) => self.on_marker_click(id)?,
            ViewEvent::PopupClosed => self.on_popup_close(),
            ViewEvent::KeyPressed(Key::Escape) => self.on_escape_key(),
            ViewEvent::KeyPressed(_) => {}
            ViewEvent::SearchResult(result) => self.on_search_result(result),
        }
        Ok(())
    }

    /// Swaps in a new station collection, dropping a selection whose station
    /// is gone.
    pub fn replace_catalog(&mut self, catalog: StationCatalog) {
        self.catalog = catalog;
        let catalog = &self.catalog;
        if self.selection.retain(|id| catalog.contains(id)) {
            self.logger.record("selected station no longer present, selection cleared");
        }
        self.render();
    }

    /// Registers the Escape listener for as long as the returned view lives.
    pub fn mount(self, keys: &KeyListenerRegistry) -> MountedView<S> {
        let escape = keys.subscribe(Key::Escape);
        self.logger.trace("view mounted");
        MountedView {
            controller: self,
            escape,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_station(&self) -> Option<&StationRecord> {
        self.selection.station().and_then(|id| self.catalog.get(id))
    }

    pub fn overlay(&self) -> Option<&SearchOverlay> {
        self.overlay.as_ref()
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn markers(&self) -> Vec<MarkerDescriptor> {
        let selected = self.selection.station();
        self.catalog
            .iter()
            .map(|station| MarkerDescriptor {
                id: station.identifier,
                latitude: station.location.latitude,
                longitude: station.location.longitude,
                selected: selected == Some(station.identifier),
            })
            .collect()
    }

    pub fn popup(&self) -> Option<PopupDescriptor> {
        self.selected_station().map(|station| PopupDescriptor {
            station: station.identifier,
            latitude: station.location.latitude,
            longitude: station.location.longitude,
            content: PopupContent::from_station(station),
        })
    }

    pub fn frame(&self) -> RenderFrame {
        RenderFrame {
            viewport: self.viewport,
            markers: self.markers(),
            popup: self.popup(),
            overlay: self.overlay.clone(),
        }
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport.clamp_zoom(self.surface.max_zoom());
        self.logger.trace(&format!(
            "viewport -> ({:.4}, {:.4}) z{:.2}",
            self.viewport.latitude(),
            self.viewport.longitude(),
            self.viewport.zoom()
        ));
        self.render();
    }

    fn render(&mut self) {
        let frame = self.frame();
        self.surface.render(&frame);
    }
}

/// A controller attached to the key listener registry. Dropping it (or calling
/// [`MountedView::unmount`]) removes the Escape listener.
pub struct MountedView<S: MapSurface> {
    controller: MapViewController<S>,
    escape: KeyListener,
}

impl<S: MapSurface> MountedView<S> {
    /// Applies queued Escape presses; returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(key) = self.escape.try_next() {
            if key == Key::Escape {
                self.controller.on_escape_key();
                handled += 1;
            }
        }
        handled
    }

    pub fn controller(&self) -> &MapViewController<S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MapViewController<S> {
        &mut self.controller
    }

    pub fn unmount(self) -> MapViewController<S> {
        let MountedView { controller, escape } = self;
        drop(escape);
        controller.logger.trace("view unmounted");
        controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{JsonFileSource, StaticSource};
    use crate::model::ViewportHint;
    use crate::view::surface::RecordingSurface;

    fn two_stations() -> StaticSource {
        StaticSource::new(vec![
            StationRecord::new(1, 45.42, -75.69, "City Hall", "Ottawa")
                .with_details(Some("2020-06-01"), Some(50.0)),
            StationRecord::new(2, 45.48, -75.70, "Museum", "Gatineau"),
        ])
    }

    fn controller() -> MapViewController<RecordingSurface> {
        MapViewController::initialize(&two_stations(), RecordingSurface::new())
    }

    fn overlay_point(lat: f64, lon: f64) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Point(vec![lon, lat]))
    }

    #[test]
    fn initialize_starts_empty_with_all_markers() {
        let view = controller();
        assert_eq!(view.selection(), Selection::Empty);
        assert_eq!(view.markers().len(), 2);
        assert!(view.overlay().is_none());
        assert_eq!(*view.viewport(), Viewport::default());
        assert_eq!(view.surface().render_count(), 1);
    }

    #[test]
    fn missing_source_renders_zero_markers() {
        let source = JsonFileSource::new("/nonexistent/evstations.json");
        let view = MapViewController::initialize(&source, RecordingSurface::new());
        assert!(view.markers().is_empty());
        assert_eq!(view.selection(), Selection::Empty);
    }

    #[test]
    fn duplicate_identifiers_degrade_to_empty_catalog() {
        let source = StaticSource::new(vec![
            StationRecord::new(1, 45.0, -75.0, "A", "X"),
            StationRecord::new(1, 46.0, -75.0, "B", "Y"),
        ]);
        let view = MapViewController::initialize(&source, RecordingSurface::new());
        assert!(view.catalog().is_empty());
    }

    #[test]
    fn marker_click_opens_popup_at_station() {
        let mut view = controller();
        view.on_marker_click(StationId(1)).unwrap();
        assert_eq!(view.selection(), Selection::Selected(StationId(1)));

        let popup = view.popup().unwrap();
        assert_eq!((popup.latitude, popup.longitude), (45.42, -75.69));
        assert_eq!(popup.content.title, "City Hall");

        let frame = view.surface().last_frame().unwrap();
        assert_eq!(frame.popup.as_ref().unwrap().station, StationId(1));
        assert!(frame.markers.iter().any(|m| m.id == StationId(1) && m.selected));
    }

    #[test]
    fn second_click_replaces_selection() {
        let mut view = controller();
        view.on_marker_click(StationId(1)).unwrap();
        view.on_marker_click(StationId(2)).unwrap();
        assert_eq!(view.selection(), Selection::Selected(StationId(2)));
        assert_eq!(view.markers().iter().filter(|m| m.selected).count(), 1);
    }

    #[test]
    fn click_sequence_ends_on_last_station() {
        let mut view = controller();
        for id in [1, 2, 2, 1, 2, 1, 1] {
            view.on_marker_click(StationId(id)).unwrap();
        }
        assert_eq!(view.selection(), Selection::Selected(StationId(1)));
    }

    #[test]
    fn unknown_marker_is_rejected_without_state_change() {
        let mut view = controller();
        view.on_marker_click(StationId(1)).unwrap();
        let err = view.on_marker_click(StationId(99)).unwrap_err();
        assert_eq!(err, ViewError::UnknownStation(StationId(99)));
        assert_eq!(view.selection(), Selection::Selected(StationId(1)));
        assert_eq!(view.metrics().snapshot().rejected, 1);
    }

    #[test]
    fn escape_clears_selection() {
        let mut view = controller();
        view.on_marker_click(StationId(1)).unwrap();
        view.on_escape_key();
        assert_eq!(view.selection(), Selection::Empty);
        assert!(view.popup().is_none());
    }

    #[test]
    fn close_and_escape_are_equivalent_and_idempotent() {
        let mut closed = controller();
        let mut escaped = controller();
        for view in [&mut closed, &mut escaped] {
            view.on_marker_click(StationId(2)).unwrap();
        }
        closed.on_popup_close();
        escaped.on_escape_key();
        assert_eq!(closed.frame(), escaped.frame());

        let once = closed.frame();
        closed.on_popup_close();
        assert_eq!(closed.frame(), once);
        assert_eq!(closed.selection(), Selection::Empty);
    }

    #[test]
    fn viewport_change_is_full_replacement() {
        let mut view = controller();
        let next = Viewport::new(10.5, 20.25, 7.5)
            .unwrap()
            .with_size(640.0, 480.0)
            .unwrap();
        view.on_viewport_change(next);
        assert_eq!(*view.viewport(), next);
        view.on_viewport_change(next);
        assert_eq!(*view.viewport(), next);
        assert_eq!(view.surface().last_frame().unwrap().viewport, next);
    }

    #[test]
    fn viewport_zoom_is_clamped_to_surface_max() {
        let mut view =
            MapViewController::initialize(&two_stations(), RecordingSurface::with_max_zoom(18.0));
        view.on_viewport_change(Viewport::new(0.0, 0.0, 25.0).unwrap());
        assert_eq!(view.viewport().zoom(), 18.0);
    }

    #[test]
    fn search_results_replace_overlay() {
        let mut view = controller();
        view.set_search_drives_viewport(true);
        let before = *view.viewport();
        view.on_search_result(SearchResult::new(overlay_point(1.0, 1.0)));
        view.on_search_result(SearchResult::new(overlay_point(2.0, 2.0)));
        let overlay = view.overlay().unwrap();
        assert_eq!(overlay.geometry, overlay_point(2.0, 2.0));
        assert_eq!(overlay.id, "search-result");
        assert_eq!(*view.viewport(), before);
    }

    #[test]
    fn search_result_recenters_when_widget_does_not() {
        let mut view = controller();
        view.on_search_result(SearchResult::point(48.85, 2.35).with_hint(ViewportHint {
            latitude: 48.85,
            longitude: 2.35,
            zoom: Some(12.0),
        }));
        assert_eq!(view.viewport().latitude(), 48.85);
        assert_eq!(view.viewport().zoom(), 12.0);

        view.on_search_result(SearchResult::point(10.0, 20.0));
        assert_eq!(view.viewport().longitude(), 20.0);
        assert_eq!(view.viewport().zoom(), SEARCH_RESULT_ZOOM);
    }

    #[test]
    fn recentring_search_counts_as_one_event() {
        let mut view = controller();
        view.on_search_result(SearchResult::point(10.0, 20.0));
        assert_eq!(view.viewport().latitude(), 10.0);
        assert_eq!(view.metrics().snapshot().handled, 1);
        assert_eq!(view.metrics().snapshot().rejected, 0);
    }

    #[test]
    fn search_does_not_touch_selection() {
        let mut view = controller();
        view.on_marker_click(StationId(1)).unwrap();
        view.on_search_result(SearchResult::point(10.0, 20.0));
        assert_eq!(view.selection(), Selection::Selected(StationId(1)));
    }

    #[test]
    fn handle_dispatches_events() {
        let mut view = controller();
        view.handle(ViewEvent::MarkerClicked(StationId(2))).unwrap();
        view.handle(ViewEvent::KeyPressed(Key::Enter)).unwrap();
        assert_eq!(view.selection(), Selection::Selected(StationId(2)));
        view.handle(ViewEvent::KeyPressed(Key::Escape)).unwrap();
        assert_eq!(view.selection(), Selection::Empty);
        assert!(view.handle(ViewEvent::MarkerClicked(StationId(3))).is_err());
    }

    #[test]
    fn replacing_catalog_invalidates_stale_selection() {
        let mut view = controller();
        view.on_marker_click(StationId(2)).unwrap();
        let smaller =
            StationCatalog::new(vec![StationRecord::new(1, 45.42, -75.69, "City Hall", "Ottawa")])
                .unwrap();
        view.replace_catalog(smaller);
        assert_eq!(view.selection(), Selection::Empty);
        assert_eq!(view.markers().len(), 1);
    }

    #[test]
    fn mounted_view_applies_escape_until_unmounted() {
        let keys = KeyListenerRegistry::new();
        let mut mounted = controller().mount(&keys);
        mounted.controller_mut().on_marker_click(StationId(1)).unwrap();

        assert_eq!(keys.dispatch(Key::Escape), 1);
        assert_eq!(keys.dispatch(Key::Enter), 0);
        assert_eq!(mounted.pump(), 1);
        assert_eq!(mounted.controller().selection(), Selection::Empty);

        let mut view = mounted.unmount();
        assert_eq!(keys.listener_count(), 0);
        view.on_marker_click(StationId(1)).unwrap();
        assert_eq!(keys.dispatch(Key::Escape), 0);
        assert_eq!(view.selection(), Selection::Selected(StationId(1)));
    }
}
