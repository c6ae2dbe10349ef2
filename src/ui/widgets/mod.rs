pub mod broadcast;
pub mod event_details;
pub mod globe;
pub mod mission_control;

use crate::feeds::FeedData;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    Frame,
};

pub use broadcast::{BroadcastStatus, BroadcastTerminal};
pub use event_details::EventDetails;
pub use globe::GlobeWidget;
pub use mission_control::MissionControl;

/// A panel on the dashboard.
pub trait DashboardWidget {
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool);

    /// Feed results routed to this widget. Most panels take no feed data.
    fn update_data(&mut self, _data: FeedData) {}

    fn scroll_up(&mut self) {}

    fn scroll_down(&mut self) {}
}

pub(crate) fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Accent colour used for panel titles, teal-400.
pub(crate) const ACCENT: Color = Color::Rgb(0x2d, 0xd4, 0xbf);
