//! iced canvas adapter for the map rendering surface.

use crate::Message;
use evmapcore::math::ViewportProjection;
use evmapcore::model::{OverlayStyle, StationId, Viewport};
use evmapcore::view::{MapSurface, RenderFrame, DEFAULT_MAX_ZOOM};
use evmapcore::ViewEvent;
use iced::{
    mouse,
    widget::canvas::{self, Action, Frame, Geometry, Path, Stroke, Text},
    Color, Pixels, Point, Rectangle, Renderer, Size, Theme,
};

const MARKER_RADIUS: f32 = 5.0;
const SELECTED_MARKER_RADIUS: f32 = 8.0;
const CLICK_SLOP: f32 = 3.0;
const POPUP_WIDTH: f32 = 230.0;
const POPUP_LINE_HEIGHT: f32 = 17.0;

/// Keeps the latest frame from the controller for the canvas to draw.
#[derive(Debug, Default)]
pub struct CanvasSurface {
    frame: Option<RenderFrame>,
    max_zoom: Option<f64>,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_max_zoom(&mut self, max_zoom: f64) {
        self.max_zoom = Some(max_zoom);
    }

    pub fn canvas(&self) -> Option<MapCanvas> {
        self.frame.as_ref().map(|frame| MapCanvas {
            frame: frame.clone(),
            max_zoom: self.max_zoom(),
        })
    }
}

impl MapSurface for CanvasSurface {
    fn max_zoom(&self) -> f64 {
        self.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM)
    }

    fn render(&mut self, frame: &RenderFrame) {
        self.frame = Some(frame.clone());
    }
}

/// Pointer state between canvas events.
#[derive(Debug, Default)]
pub struct PointerState {
    pressed_at: Option<Point>,
    last: Option<Point>,
    dragging: bool,
}

/// What a single canvas event asks of the application.
#[derive(Debug, PartialEq)]
enum Reaction {
    Ignored,
    Captured,
    Emit(ViewEvent),
}

/// Events to publish for one canvas event, plus whether it is captured. A
/// pending resize goes first unless the event already carries a viewport
/// computed at the new size.
fn pending_events(resized: Option<Viewport>, reaction: Reaction) -> (Vec<ViewEvent>, bool) {
    let mut events: Vec<ViewEvent> = resized.map(ViewEvent::ViewportChanged).into_iter().collect();
    match reaction {
        Reaction::Ignored => (events, false),
        Reaction::Captured => (events, true),
        Reaction::Emit(event @ ViewEvent::ViewportChanged(_)) => (vec![event], true),
        Reaction::Emit(event) => {
            events.push(event);
            (events, true)
        }
    }
}

pub struct MapCanvas {
    frame: RenderFrame,
    max_zoom: f64,
}

impl MapCanvas {
    fn marker_at(&self, projection: &ViewportProjection, point: Point) -> Option<StationId> {
        self.frame
            .markers
            .iter()
            .rev()
            .map(|marker| {
                let (x, y) = projection.to_screen(marker.latitude, marker.longitude);
                (marker.id, point.distance(Point::new(x, y)))
            })
            .filter(|(_, distance)| *distance <= SELECTED_MARKER_RADIUS + CLICK_SLOP)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// The frame's viewport resized to the canvas, when the two disagree.
    fn resized_viewport(&self, size: Size) -> Option<Viewport> {
        let viewport = self.frame.viewport;
        if size.width <= 0.0
            || size.height <= 0.0
            || (size.width == viewport.width() && size.height == viewport.height())
        {
            return None;
        }
        viewport.with_size(size.width, size.height).ok()
    }

    fn react(
        &self,
        state: &mut PointerState,
        event: &canvas::Event,
        projection: &ViewportProjection,
        position: Option<Point>,
    ) -> Option<Reaction> {
        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let point = position?;
                state.pressed_at = Some(point);
                state.last = Some(point);
                state.dragging = false;
                Some(Reaction::Captured)
            }
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                let (point, last, pressed) = (position?, state.last?, state.pressed_at?);
                if !state.dragging && point.distance(pressed) < CLICK_SLOP {
                    return None;
                }
                state.dragging = true;
                state.last = Some(point);
                let panned = projection.panned(point.x - last.x, point.y - last.y).ok()?;
                Some(Reaction::Emit(ViewEvent::ViewportChanged(panned)))
            }
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let pressed = state.pressed_at.take();
                let was_dragging = std::mem::take(&mut state.dragging);
                state.last = None;
                if was_dragging {
                    return Some(Reaction::Captured);
                }
                let id = self.marker_at(projection, pressed?)?;
                Some(Reaction::Emit(ViewEvent::MarkerClicked(id)))
            }
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let point = position?;
                let levels = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => *y as f64 * 0.5,
                    mouse::ScrollDelta::Pixels { y, .. } => *y as f64 / 100.0,
                };
                let zoomed = projection
                    .zoomed_around(point.x, point.y, levels, self.max_zoom)
                    .ok()?;
                Some(Reaction::Emit(ViewEvent::ViewportChanged(zoomed)))
            }
            _ => None,
        }
    }

    fn draw_graticule(&self, frame: &mut Frame, projection: &ViewportProjection, bounds: Size) {
        let zoom = self.frame.viewport.zoom();
        let step = match zoom {
            z if z < 3.0 => 30.0,
            z if z < 5.0 => 10.0,
            z if z < 7.0 => 5.0,
            z if z < 9.0 => 1.0,
            _ => 0.25,
        };
        let stroke = Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgb(0.16, 0.18, 0.22));

        let mut lon = -180.0;
        while lon <= 180.0 {
            let (x, _) = projection.to_screen(0.0, lon);
            if (0.0..=bounds.width).contains(&x) {
                let line = Path::line(Point::new(x, 0.0), Point::new(x, bounds.height));
                frame.stroke(&line, stroke);
            }
            lon += step;
        }
        let mut lat = -80.0;
        while lat <= 80.0 {
            let (_, y) = projection.to_screen(lat, 0.0);
            if (0.0..=bounds.height).contains(&y) {
                let line = Path::line(Point::new(0.0, y), Point::new(bounds.width, y));
                frame.stroke(&line, stroke);
            }
            lat += step;
        }
    }

    fn draw_overlay(&self, frame: &mut Frame, projection: &ViewportProjection) {
        let Some(overlay) = &self.frame.overlay else {
            return;
        };
        let style: OverlayStyle = overlay.style;
        let [r, g, b, a] = style.fill_color;
        let fill = Color::from_rgba8(r, g, b, a as f32 / 255.0);
        let radius = style.point_radius_px(projection.meters_per_pixel());
        let to_point = |position: &Vec<f64>| {
            let (x, y) = projection.to_screen(position[1], position[0]);
            Point::new(x, y)
        };

        let mut points = Vec::new();
        let mut rings = Vec::new();
        let mut lines = Vec::new();
        collect_shapes(&overlay.geometry.value, &mut points, &mut rings, &mut lines);

        for position in points.iter().filter(|p| p.len() >= 2) {
            frame.fill(&Path::circle(to_point(position), radius), fill);
        }
        for ring in rings.iter().filter(|r| r.len() >= 3) {
            let path = Path::new(|builder| {
                builder.move_to(to_point(&ring[0]));
                for position in &ring[1..] {
                    builder.line_to(to_point(position));
                }
                builder.close();
            });
            frame.fill(&path, fill);
        }
        for line in lines.iter().filter(|l| l.len() >= 2) {
            let path = Path::new(|builder| {
                builder.move_to(to_point(&line[0]));
                for position in &line[1..] {
                    builder.line_to(to_point(position));
                }
            });
            frame.stroke(&path, Stroke::default().with_width(3.0).with_color(fill));
        }
    }

    fn draw_popup(&self, frame: &mut Frame, projection: &ViewportProjection) {
        let Some(popup) = &self.frame.popup else {
            return;
        };
        let (x, y) = projection.to_screen(popup.latitude, popup.longitude);
        let lines = popup.content.lines();
        let height = lines.len() as f32 * POPUP_LINE_HEIGHT + 12.0;
        let origin = Point::new(x - POPUP_WIDTH / 2.0, y - height - SELECTED_MARKER_RADIUS - 6.0);

        frame.fill_rectangle(
            origin,
            Size::new(POPUP_WIDTH, height),
            Color::from_rgb(0.95, 0.95, 0.93),
        );
        for (index, line) in lines.into_iter().enumerate() {
            frame.fill_text(Text {
                content: line,
                position: Point::new(
                    origin.x + 8.0,
                    origin.y + 6.0 + index as f32 * POPUP_LINE_HEIGHT,
                ),
                color: Color::from_rgb(0.1, 0.1, 0.12),
                size: Pixels(if index == 1 { 15.0 } else { 13.0 }),
                ..Text::default()
            });
        }
    }
}

type Position = Vec<f64>;

fn collect_shapes(
    value: &geojson::Value,
    points: &mut Vec<Position>,
    rings: &mut Vec<Vec<Position>>,
    lines: &mut Vec<Vec<Position>>,
) {
    match value {
        geojson::Value::Point(point) => points.push(point.clone()),
        geojson::Value::MultiPoint(many) => points.extend(many.iter().cloned()),
        geojson::Value::LineString(line) => lines.push(line.clone()),
        geojson::Value::MultiLineString(many) => lines.extend(many.iter().cloned()),
        geojson::Value::Polygon(polygon) => rings.extend(polygon.iter().take(1).cloned()),
        geojson::Value::MultiPolygon(many) => {
            for polygon in many {
                rings.extend(polygon.iter().take(1).cloned());
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_shapes(&geometry.value, points, rings, lines);
            }
        }
    }
}

impl canvas::Program<Message> for MapCanvas {
    type State = PointerState;

    fn update(
        &self,
        state: &mut Self::State,
        event: &canvas::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Message>> {
        let resized = self.resized_viewport(bounds.size());
        let projection = ViewportProjection::new(&resized.unwrap_or(self.frame.viewport));
        let reaction = self
            .react(state, event, &projection, cursor.position_in(bounds))
            .unwrap_or(Reaction::Ignored);

        let (events, capture) = pending_events(resized, reaction);
        let action = match events.len() {
            0 => return capture.then(Action::capture),
            1 => Action::publish(Message::Map(events.into_iter().next()?)),
            _ => Action::publish(Message::MapEvents(events)),
        };
        Some(if capture { action.and_capture() } else { action })
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.06, 0.07, 0.09),
        );

        let projection = ViewportProjection::new(&self.frame.viewport);
        self.draw_graticule(&mut frame, &projection, bounds.size());
        self.draw_overlay(&mut frame, &projection);

        for marker in &self.frame.markers {
            let (x, y) = projection.to_screen(marker.latitude, marker.longitude);
            if x < -SELECTED_MARKER_RADIUS
                || y < -SELECTED_MARKER_RADIUS
                || x > bounds.width + SELECTED_MARKER_RADIUS
                || y > bounds.height + SELECTED_MARKER_RADIUS
            {
                continue;
            }
            let (radius, color) = if marker.selected {
                (SELECTED_MARKER_RADIUS, Color::from_rgb(0.95, 0.55, 0.2))
            } else {
                (MARKER_RADIUS, Color::from_rgb(0.2, 0.85, 0.45))
            };
            frame.fill(&Path::circle(Point::new(x, y), radius), color);
        }

        self.draw_popup(&mut frame, &projection);
        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.dragging {
            return mouse::Interaction::Grabbing;
        }
        let projection = ViewportProjection::new(&self.frame.viewport);
        match cursor.position_in(bounds) {
            Some(point) if self.marker_at(&projection, point).is_some() => {
                mouse::Interaction::Pointer
            }
            Some(_) => mouse::Interaction::Grab,
            None => mouse::Interaction::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmapcore::dataset::StaticSource;
    use evmapcore::model::StationRecord;
    use evmapcore::MapViewController;

    #[test]
    fn canvas_surface_tracks_latest_frame() {
        let source = StaticSource::new(vec![StationRecord::new(1, 45.4, -75.7, "A", "Ottawa")]);
        let mut view = MapViewController::initialize(&source, CanvasSurface::new());
        view.on_marker_click(StationId(1)).unwrap();
        let canvas = view.surface().canvas().unwrap();
        assert!(canvas.frame.popup.is_some());
    }

    #[test]
    fn marker_hit_test_finds_nearest_marker() {
        let source = StaticSource::new(vec![
            StationRecord::new(1, 45.0, -75.0, "A", "X"),
            StationRecord::new(2, 45.001, -75.0, "B", "Y"),
        ]);
        let mut view = MapViewController::initialize(&source, CanvasSurface::new());
        view.on_viewport_change(Viewport::new(45.0, -75.0, 14.0).unwrap());
        let canvas = view.surface().canvas().unwrap();
        let projection = ViewportProjection::new(view.viewport());
        let (x, y) = projection.to_screen(45.0, -75.0);
        assert_eq!(canvas.marker_at(&projection, Point::new(x + 1.0, y)), Some(StationId(1)));
        assert_eq!(canvas.marker_at(&projection, Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn shapes_are_collected_from_collections() {
        let value = geojson::Value::GeometryCollection(vec![
            geojson::Geometry::new(geojson::Value::Point(vec![1.0, 2.0])),
            geojson::Geometry::new(geojson::Value::LineString(vec![
                vec![0.0, 0.0],
                vec![1.0, 1.0],
            ])),
        ]);
        let (mut points, mut rings, mut lines) = (Vec::new(), Vec::new(), Vec::new());
        collect_shapes(&value, &mut points, &mut rings, &mut lines);
        assert_eq!(points.len(), 1);
        assert_eq!(lines.len(), 1);
        assert!(rings.is_empty());
    }

    #[test]
    fn click_during_resize_still_selects_marker() {
        let source = StaticSource::new(vec![StationRecord::new(7, 45.0, -75.0, "A", "X")]);
        let mut view = MapViewController::initialize(&source, CanvasSurface::new());
        view.on_viewport_change(Viewport::new(45.0, -75.0, 14.0).unwrap());
        let canvas = view.surface().canvas().unwrap();

        let size = Size::new(800.0, 600.0);
        let resized = canvas.resized_viewport(size).unwrap();
        assert_eq!((resized.width(), resized.height()), (800.0, 600.0));
        let projection = ViewportProjection::new(&resized);
        let (x, y) = projection.to_screen(45.0, -75.0);
        let at_marker = Some(Point::new(x, y));

        let mut state = PointerState::default();
        let press = canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left));
        let reaction = canvas.react(&mut state, &press, &projection, at_marker);
        let (events, captured) = pending_events(Some(resized), reaction.unwrap());
        assert_eq!(events, vec![ViewEvent::ViewportChanged(resized)]);
        assert!(captured);

        let release = canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left));
        let reaction = canvas.react(&mut state, &release, &projection, at_marker);
        assert_eq!(reaction, Some(Reaction::Emit(ViewEvent::MarkerClicked(StationId(7)))));
    }

    #[test]
    fn pending_resize_precedes_other_events() {
        let resized = Viewport::default().with_size(640.0, 480.0).unwrap();

        let (events, captured) = pending_events(
            Some(resized),
            Reaction::Emit(ViewEvent::MarkerClicked(StationId(3))),
        );
        assert_eq!(
            events,
            vec![
                ViewEvent::ViewportChanged(resized),
                ViewEvent::MarkerClicked(StationId(3)),
            ]
        );
        assert!(captured);

        let (events, captured) = pending_events(Some(resized), Reaction::Ignored);
        assert_eq!(events, vec![ViewEvent::ViewportChanged(resized)]);
        assert!(!captured);

        let panned = resized.recentered(10.0, 10.0, 4.0).unwrap();
        let (events, _) = pending_events(
            Some(resized),
            Reaction::Emit(ViewEvent::ViewportChanged(panned)),
        );
        assert_eq!(events, vec![ViewEvent::ViewportChanged(panned)]);
    }

    #[test]
    fn matching_size_needs_no_resize() {
        let source = StaticSource::new(Vec::new());
        let mut view = MapViewController::initialize(&source, CanvasSurface::new());
        let sized = Viewport::default().with_size(640.0, 480.0).unwrap();
        view.on_viewport_change(sized);
        let canvas = view.surface().canvas().unwrap();
        assert_eq!(canvas.resized_viewport(Size::new(640.0, 480.0)), None);
        assert_eq!(canvas.resized_viewport(Size::new(0.0, 480.0)), None);
    }
}
