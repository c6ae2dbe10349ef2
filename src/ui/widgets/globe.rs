use crate::config::{
    GlobeConfig, MAX_CAMERA_DISTANCE, MAX_GRATICULE_STEP, MIN_CAMERA_DISTANCE, MIN_GRATICULE_STEP,
};
use crate::feeds::{EventId, FeedData, GlobalEvent};
use crate::geo::{lat_long_to_vector3, Vec3, GLOBE_RADIUS};
use crate::store::EventStore;
use crate::ui::widgets::{border_style, DashboardWidget, ACCENT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Points},
        Block, Borders,
    },
    Frame,
};
use std::collections::hash_map::DefaultHasher;
use std::f64::consts::{PI, TAU};
use std::hash::{Hash, Hasher};

pub const GLOBE_WIDGET_ID: &str = "globe";

const DEFAULT_CAMERA_DISTANCE: f64 = 5.0;
/// Empty space around the globe at the default camera distance.
const VIEW_MARGIN: f64 = 1.15;
const MARKER_RADIUS: f64 = 0.05;
const HOVERED_MARKER_RADIUS: f64 = 0.08;
const HOVER_BRIGHTEN: f64 = 1.3;
const PULSE_AMPLITUDE: f64 = 0.35;
/// Pulse angular frequency in radians per second.
const PULSE_RATE: f64 = 3.0;
const ZOOM_STEP: f64 = 0.5;
const ROTATE_STEP: f64 = PI / 18.0;
/// Sampling step along grid lines, in degrees.
const GRID_SAMPLE: f64 = 4.0;
const STAR_SEED: u64 = 0x6a1a;

const GRID_COLOR: Color = Color::Rgb(0x1e, 0x3a, 0x5f);
const STAR_COLOR: Color = Color::Rgb(0x64, 0x74, 0x8b);

/// Maps scene coordinates to terminal cells for a given drawing area.
///
/// Braille dots are roughly square, so the horizontal extent is stretched by
/// the cell aspect ratio to keep the globe round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    inner: Rect,
    half_width: f64,
    half_height: f64,
}

impl Viewport {
    pub fn new(inner: Rect, camera_distance: f64) -> Self {
        let zoom = DEFAULT_CAMERA_DISTANCE / camera_distance;
        let half_height = GLOBE_RADIUS * VIEW_MARGIN / zoom;
        let dots_wide = inner.width.max(1) as f64 * 2.0;
        let dots_high = inner.height.max(1) as f64 * 4.0;
        Self {
            inner,
            half_width: half_height * dots_wide / dots_high,
            half_height,
        }
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [-self.half_width, self.half_width]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        [-self.half_height, self.half_height]
    }

    /// Terminal cell under a scene point, if it is inside the area.
    pub fn to_cell(&self, x: f64, y: f64) -> Option<(u16, u16)> {
        let fx = (x + self.half_width) / (2.0 * self.half_width);
        let fy = (self.half_height - y) / (2.0 * self.half_height);
        if !(0.0..1.0).contains(&fx) || !(0.0..1.0).contains(&fy) {
            return None;
        }
        let col = self.inner.x + (fx * self.inner.width as f64) as u16;
        let row = self.inner.y + (fy * self.inner.height as f64) as u16;
        Some((col, row))
    }
}

/// A marker projected onto the screen plane.
#[derive(Debug, Clone)]
struct Projected<'a> {
    event: &'a GlobalEvent,
    point: Vec3,
}

pub struct GlobeWidget {
    title: String,
    store: EventStore,
    hovered: Option<EventId>,
    loading: bool,
    error: Option<String>,
    rotation: f64,
    rotation_speed: f64,
    paused: bool,
    camera_distance: f64,
    graticule_step: f64,
    /// Seconds since start, drives marker pulsing.
    clock: f64,
    /// Star positions as fractions of the viewport half extents.
    stars: Vec<(f64, f64)>,
}

impl GlobeWidget {
    /// Out-of-range config values are pulled back into range here too, so a
    /// `GlobeConfig` built in code cannot stall rendering.
    pub fn new(config: &GlobeConfig) -> Self {
        let defaults = GlobeConfig::default();
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };

        let mut rng = StdRng::seed_from_u64(STAR_SEED);
        let stars = (0..config.stars)
            .map(|_| (rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect();

        Self {
            title: "Planetary View".to_string(),
            store: EventStore::new(config.max_events),
            hovered: None,
            loading: true,
            error: None,
            rotation: 0.0,
            rotation_speed: finite_or(config.rotation_speed, defaults.rotation_speed),
            paused: false,
            camera_distance: finite_or(config.camera_distance, defaults.camera_distance)
                .clamp(MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE),
            graticule_step: finite_or(config.graticule_step, defaults.graticule_step)
                .clamp(MIN_GRATICULE_STEP, MAX_GRATICULE_STEP),
            clock: 0.0,
            stars,
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn clear_events(&mut self) {
        self.store.clear();
        self.hovered = None;
        self.loading = true;
    }

    pub fn hovered(&self) -> Option<&GlobalEvent> {
        self.hovered.as_ref().and_then(|id| self.store.get(id))
    }

    pub fn hovered_id(&self) -> Option<&EventId> {
        self.hovered.as_ref()
    }

    pub fn set_hovered(&mut self, id: Option<EventId>) {
        self.hovered = id.filter(|id| self.store.contains(id));
    }

    pub fn is_online(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn camera_distance(&self) -> f64 {
        self.camera_distance
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance the animation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.clock += dt;
        if !self.paused {
            self.rotation = (self.rotation + self.rotation_speed * dt).rem_euclid(TAU);
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn rotate_left(&mut self) {
        self.rotation = (self.rotation - ROTATE_STEP).rem_euclid(TAU);
    }

    pub fn rotate_right(&mut self) {
        self.rotation = (self.rotation + ROTATE_STEP).rem_euclid(TAU);
    }

    pub fn zoom_in(&mut self) {
        self.camera_distance = (self.camera_distance - ZOOM_STEP).max(MIN_CAMERA_DISTANCE);
    }

    pub fn zoom_out(&mut self) {
        self.camera_distance = (self.camera_distance + ZOOM_STEP).min(MAX_CAMERA_DISTANCE);
    }

    /// Turn the globe so the hovered marker faces the camera.
    pub fn face_hovered(&mut self) {
        if let Some(event) = self.hovered() {
            let p = lat_long_to_vector3(event.lat, event.lng, GLOBE_RADIUS);
            self.rotation = (-p.x).atan2(p.z).rem_euclid(TAU);
        }
    }

    fn world_point(&self, lat: f64, lng: f64, radius: f64) -> Vec3 {
        lat_long_to_vector3(lat, lng, radius).rotate_y(self.rotation)
    }

    fn pulse(&self, id: &EventId) -> f64 {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        let phase = (hasher.finish() % 628) as f64 / 100.0;
        1.0 + PULSE_AMPLITUDE * (self.clock * PULSE_RATE + phase).sin()
    }

    /// Markers on the camera-facing hemisphere, back to front.
    fn visible_markers(&self) -> Vec<Projected<'_>> {
        let mut markers: Vec<Projected<'_>> = self
            .store
            .iter()
            .map(|event| Projected {
                event,
                point: self.world_point(event.lat, event.lng, GLOBE_RADIUS),
            })
            .filter(|m| m.point.z >= 0.0)
            .collect();
        markers.sort_by(|a, b| a.point.z.total_cmp(&b.point.z));
        markers
    }

    /// Event whose marker sits at or right next to the given terminal cell.
    /// `area` is the full widget area including its border.
    pub fn marker_at(&self, area: Rect, column: u16, row: u16) -> Option<EventId> {
        let viewport = Viewport::new(Self::inner_area(area), self.camera_distance);

        self.visible_markers()
            .into_iter()
            .rev()
            .filter_map(|m| {
                let (col, r) = viewport.to_cell(m.point.x, m.point.y)?;
                let dx = col as f64 - column as f64;
                // Cells are about twice as tall as they are wide
                let dy = (r as f64 - row as f64) * 2.0;
                let dist = (dx * dx + dy * dy).sqrt();
                (dist <= 2.0).then_some((dist, m.event.id.clone()))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    pub(crate) fn inner_area(area: Rect) -> Rect {
        Block::default().borders(Borders::ALL).inner(area)
    }

    fn step_hover(&mut self, forward: bool) {
        let len = self.store.len();
        if len == 0 {
            self.hovered = None;
            return;
        }
        let next = match self.hovered.as_ref().and_then(|id| self.store.position(id)) {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.hovered = self.store.events().get(next).map(|e| e.id.clone());
        self.face_hovered();
    }

    fn paint_grid(&self, ctx: &mut Context<'_>) {
        let step = self.graticule_step;
        let mut segments = Vec::new();

        let mut lat = -90.0 + step;
        while lat < 90.0 {
            let mut lng = -180.0;
            while lng < 180.0 {
                segments.push(((lat, lng), (lat, lng + GRID_SAMPLE)));
                lng += GRID_SAMPLE;
            }
            lat += step;
        }

        let mut lng = -180.0;
        while lng < 180.0 {
            let mut lat = -90.0;
            while lat < 90.0 {
                segments.push(((lat, lng), (lat + GRID_SAMPLE, lng)));
                lat += GRID_SAMPLE;
            }
            lng += step;
        }

        for ((lat1, lng1), (lat2, lng2)) in segments {
            let a = self.world_point(lat1, lng1, GLOBE_RADIUS);
            let b = self.world_point(lat2, lng2, GLOBE_RADIUS);
            if a.z < 0.0 || b.z < 0.0 {
                continue;
            }
            ctx.draw(&CanvasLine {
                x1: a.x,
                y1: a.y,
                x2: b.x,
                y2: b.y,
                color: GRID_COLOR,
            });
        }

        ctx.draw(&Circle {
            x: 0.0,
            y: 0.0,
            radius: GLOBE_RADIUS,
            color: ACCENT,
        });
    }

    fn paint_stars(&self, ctx: &mut Context<'_>, viewport: &Viewport) {
        let [_, hw] = viewport.x_bounds();
        let [_, hh] = viewport.y_bounds();
        let coords: Vec<(f64, f64)> = self
            .stars
            .iter()
            .map(|(sx, sy)| (sx * hw, sy * hh))
            .filter(|(x, y)| x * x + y * y > GLOBE_RADIUS * GLOBE_RADIUS * 1.05)
            .collect();
        ctx.draw(&Points {
            coords: &coords,
            color: STAR_COLOR,
        });
    }

    fn paint_markers(&self, ctx: &mut Context<'_>) {
        for marker in self.visible_markers() {
            let event = marker.event;
            let is_hovered = self.hovered.as_ref() == Some(&event.id);
            let base = if is_hovered {
                HOVERED_MARKER_RADIUS
            } else {
                MARKER_RADIUS
            };
            let radius = base * self.pulse(&event.id);
            let rgb = event.sentiment.color();
            let color: Color = if is_hovered {
                rgb.brighten(HOVER_BRIGHTEN).into()
            } else {
                rgb.into()
            };
            let (x, y) = (marker.point.x, marker.point.y);

            ctx.draw(&Points {
                coords: &[(x, y)],
                color,
            });
            ctx.draw(&Circle {
                x,
                y,
                radius,
                color,
            });
            ctx.draw(&Circle {
                x,
                y,
                radius: radius * 0.5,
                color,
            });
            if event.is_live {
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: radius * 2.0,
                    color: Color::White,
                });
            }
        }

        if let Some(event) = self.hovered() {
            let p = self.world_point(event.lat, event.lng, GLOBE_RADIUS);
            if p.z >= 0.0 {
                ctx.print(
                    p.x + HOVERED_MARKER_RADIUS * 2.0,
                    p.y,
                    Line::from(Span::styled(
                        format!(" {} ", event.topic),
                        Style::default()
                            .fg(Color::White)
                            .bg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    )),
                );
            }
        }
    }
}

impl DashboardWidget for GlobeWidget {
    fn id(&self) -> &str {
        GLOBE_WIDGET_ID
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let status = if let Some(ref error) = self.error {
            Span::styled(format!(" signal lost: {} ", error), Style::default().fg(Color::Red))
        } else if self.loading && self.store.is_empty() {
            Span::styled(" acquiring signal... ", Style::default().fg(Color::Yellow))
        } else {
            Span::styled(
                format!(" {} events ", self.store.len()),
                Style::default().fg(Color::DarkGray),
            )
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(Line::from(vec![
                Span::styled(
                    format!(" {} ", self.title),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
                status,
            ]));

        let viewport = Viewport::new(block.inner(area), self.camera_distance);

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .background_color(Color::Black)
            .x_bounds(viewport.x_bounds())
            .y_bounds(viewport.y_bounds())
            .paint(|ctx| {
                self.paint_stars(ctx, &viewport);
                self.paint_grid(ctx);
                ctx.layer();
                self.paint_markers(ctx);
            });

        frame.render_widget(canvas, area);
    }

    fn update_data(&mut self, data: FeedData) {
        self.loading = false;
        match data {
            FeedData::Events(events) => {
                self.store.merge(events);
                self.error = None;
                if let Some(ref id) = self.hovered {
                    if !self.store.contains(id) {
                        self.hovered = None;
                    }
                }
            }
            FeedData::Error(e) => {
                self.error = Some(e);
            }
            FeedData::Loading => {
                self.loading = true;
            }
        }
    }

    fn scroll_up(&mut self) {
        self.step_hover(false);
    }

    fn scroll_down(&mut self) {
        self.step_hover(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::event;
    use ratatui::{backend::TestBackend, Terminal};

    fn make_widget() -> GlobeWidget {
        GlobeWidget::new(&GlobeConfig {
            rotation_speed: 0.5,
            stars: 10,
            ..GlobeConfig::default()
        })
    }

    fn located(id: &str, lat: f64, lng: f64) -> GlobalEvent {
        let mut e = event(id, "joy");
        e.lat = lat;
        e.lng = lng;
        e
    }

    #[test]
    fn test_widget_initial_state() {
        let widget = make_widget();
        assert_eq!(widget.id(), "globe");
        assert!(widget.loading);
        assert!(widget.store().is_empty());
        assert!(widget.hovered().is_none());
        assert_eq!(widget.camera_distance(), 5.0);
    }

    #[test]
    fn test_update_data_with_events() {
        let mut widget = make_widget();
        widget.update_data(FeedData::Events(vec![event("a", "fear"), event("b", "joy")]));
        assert!(!widget.loading);
        assert_eq!(widget.store().len(), 2);
        assert!(widget.is_online());
    }

    #[test]
    fn test_update_data_error_keeps_stale_events() {
        let mut widget = make_widget();
        widget.update_data(FeedData::Events(vec![event("a", "fear")]));
        widget.update_data(FeedData::Error("connection refused".to_string()));
        assert_eq!(widget.store().len(), 1);
        assert!(!widget.is_online());
        assert_eq!(widget.error(), Some("connection refused"));

        widget.update_data(FeedData::Events(vec![]));
        assert!(widget.is_online());
    }

    #[test]
    fn test_hover_cycles_through_events() {
        let mut widget = make_widget();
        widget.update_data(FeedData::Events(vec![
            event("a", "fear"),
            event("b", "joy"),
            event("c", "anger"),
        ]));

        widget.scroll_down();
        assert_eq!(widget.hovered_id(), Some(&EventId::from("a")));
        widget.scroll_down();
        widget.scroll_down();
        assert_eq!(widget.hovered_id(), Some(&EventId::from("c")));
        widget.scroll_down();
        assert_eq!(widget.hovered_id(), Some(&EventId::from("a")));
        widget.scroll_up();
        assert_eq!(widget.hovered_id(), Some(&EventId::from("c")));
    }

    #[test]
    fn test_hover_cleared_when_event_leaves_window() {
        let mut widget = GlobeWidget::new(&GlobeConfig {
            max_events: 2,
            ..GlobeConfig::default()
        });
        widget.update_data(FeedData::Events(vec![event("a", "fear")]));
        widget.set_hovered(Some(EventId::from("a")));
        assert!(widget.hovered().is_some());

        widget.update_data(FeedData::Events(vec![event("b", "joy"), event("c", "joy")]));
        assert!(widget.hovered_id().is_none());
    }

    #[test]
    fn test_set_hovered_ignores_unknown_ids() {
        let mut widget = make_widget();
        widget.set_hovered(Some(EventId::from("ghost")));
        assert!(widget.hovered_id().is_none());
    }

    #[test]
    fn test_face_hovered_brings_marker_front() {
        let mut widget = make_widget();
        widget.update_data(FeedData::Events(vec![located("tokyo", 35.6762, 139.6503)]));
        widget.set_hovered(Some(EventId::from("tokyo")));
        widget.face_hovered();

        let p = widget.world_point(35.6762, 139.6503, GLOBE_RADIUS);
        assert!(p.x.abs() < 1e-9);
        assert!(p.z > 0.0);
    }

    #[test]
    fn test_tick_rotates_unless_paused() {
        let mut widget = make_widget();
        widget.tick(1.0);
        assert!((widget.rotation() - 0.5).abs() < 1e-9);

        widget.toggle_pause();
        widget.tick(1.0);
        assert!((widget.rotation() - 0.5).abs() < 1e-9);
        assert!(widget.is_paused());
    }

    #[test]
    fn test_unusable_config_values_are_sanitised() {
        let mut widget = GlobeWidget::new(&GlobeConfig {
            rotation_speed: f64::INFINITY,
            camera_distance: f64::NAN,
            graticule_step: 1e-20,
            stars: 0,
            ..GlobeConfig::default()
        });
        assert_eq!(widget.graticule_step, MIN_GRATICULE_STEP);
        assert_eq!(widget.camera_distance(), 5.0);

        widget.tick(1.0);
        assert!(widget.rotation().is_finite());

        widget.update_data(FeedData::Events(vec![located("front", 0.0, -90.0)]));
        assert_eq!(widget.visible_markers().len(), 1);

        let backend = TestBackend::new(40, 16);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| widget.render(f, f.area(), false))
            .unwrap();
    }

    #[test]
    fn test_loading_keeps_events() {
        let mut widget = make_widget();
        widget.update_data(FeedData::Events(vec![event("a", "joy")]));
        assert!(!widget.loading);

        widget.update_data(FeedData::Loading);
        assert!(widget.loading);
        assert_eq!(widget.store().len(), 1);

        widget.update_data(FeedData::Events(Vec::new()));
        assert!(!widget.loading);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut widget = make_widget();
        for _ in 0..20 {
            widget.zoom_in();
        }
        assert_eq!(widget.camera_distance(), MIN_CAMERA_DISTANCE);
        for _ in 0..40 {
            widget.zoom_out();
        }
        assert_eq!(widget.camera_distance(), MAX_CAMERA_DISTANCE);
    }

    #[test]
    fn test_viewport_maps_center_to_middle_cell() {
        let inner = Rect::new(1, 1, 80, 40);
        let viewport = Viewport::new(inner, 5.0);
        assert_eq!(viewport.to_cell(0.0, 0.0), Some((41, 21)));
        assert!(viewport.to_cell(100.0, 0.0).is_none());

        let [x0, x1] = viewport.x_bounds();
        let [y0, y1] = viewport.y_bounds();
        // 80 cols x 40 rows is 160 x 160 braille dots
        assert!((x1 - y1).abs() < 1e-9);
        assert!((x0 + x1).abs() < 1e-9 && (y0 + y1).abs() < 1e-9);
    }

    #[test]
    fn test_marker_hit_testing() {
        let mut widget = make_widget();
        // lng -90 sits straight in front of the camera at rotation 0
        widget.update_data(FeedData::Events(vec![
            located("front", 0.0, -90.0),
            located("back", 0.0, 90.0),
        ]));

        let area = Rect::new(0, 0, 82, 42);
        let viewport = Viewport::new(GlobeWidget::inner_area(area), widget.camera_distance());
        let front = widget.world_point(0.0, -90.0, GLOBE_RADIUS);
        let (col, row) = viewport.to_cell(front.x, front.y).unwrap();

        assert_eq!(widget.marker_at(area, col, row), Some(EventId::from("front")));
        assert_eq!(widget.marker_at(area, col + 1, row), Some(EventId::from("front")));
        assert_eq!(widget.marker_at(area, 1, 1), None);
    }

    #[test]
    fn test_render_does_not_panic() {
        let mut widget = make_widget();
        widget.update_data(FeedData::Events(vec![
            located("front", 0.0, -90.0),
            located("north", 60.0, -45.0),
        ]));
        widget.set_hovered(Some(EventId::from("front")));

        let backend = TestBackend::new(60, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| widget.render(f, f.area(), true))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let rendered: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(rendered.contains("Planetary View"));
        assert!(rendered.contains("Global Sentiment"));
    }
}
