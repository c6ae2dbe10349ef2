pub mod widgets;

use crate::app::{App, Focus};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use widgets::{DashboardWidget, ACCENT};

const DETAILS_WIDTH: u16 = 38;
const BOTTOM_HEIGHT: u16 = 8;

/// Screen regions of the dashboard. Rendering and mouse hit-testing both go
/// through this so they always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLayout {
    pub header: Rect,
    pub globe: Rect,
    pub details: Option<Rect>,
    pub mission: Rect,
    pub broadcast: Rect,
    pub footer: Rect,
}

impl DashboardLayout {
    pub fn new(area: Rect, details_open: bool) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(8),
                Constraint::Length(BOTTOM_HEIGHT),
                Constraint::Length(1),
            ])
            .split(area);

        let (globe, details) = if details_open {
            let main = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(20), Constraint::Length(DETAILS_WIDTH)])
                .split(rows[1]);
            (main[0], Some(main[1]))
        } else {
            (rows[1], None)
        };

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[2]);

        Self {
            header: rows[0],
            globe,
            details,
            mission: bottom[0],
            broadcast: bottom[1],
            footer: rows[3],
        }
    }
}

pub fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

pub fn render(frame: &mut Frame, app: &App) {
    let layout = DashboardLayout::new(frame.area(), app.details().is_open());
    let focus = app.focus();

    render_header(frame, app, layout.header);
    app.globe()
        .render(frame, layout.globe, focus == Focus::Globe);
    if let Some(area) = layout.details {
        app.details().render(frame, area, false);
    }
    app.mission()
        .render(frame, layout.mission, focus == Focus::MissionControl);
    app.broadcast()
        .render(frame, layout.broadcast, focus == Focus::Broadcast);
    render_footer(frame, app, layout.footer);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let status = if app.globe().is_online() {
        Span::styled(
            "ONLINE",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::SLOW_BLINK),
        )
    } else {
        Span::styled("OFFLINE", Style::default().fg(Color::Red))
    };

    let lines = vec![
        Line::from(Span::styled(
            " G A I A",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                " PLANETARY NERVOUS SYSTEM // ",
                Style::default().fg(Color::Gray),
            ),
            status,
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let hints = match app.focus() {
        Focus::Globe => {
            "Tab: focus | j/k: hover | Enter: inspect | ←/→: rotate | +/-: zoom | Space: pause | 1/2: scenario | b: broadcast | r: refresh | q: quit"
        }
        Focus::MissionControl => "Tab: focus | ↑/↓: choose | Enter: run scenario | q: quit",
        Focus::Broadcast => "Type a message | Enter: broadcast | Ctrl+U: clear | Esc: back to globe",
    };
    let paragraph = Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray)))
        .alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_without_details() {
        let layout = DashboardLayout::new(Rect::new(0, 0, 120, 40), false);
        assert!(layout.details.is_none());
        assert_eq!(layout.header.height, 2);
        assert_eq!(layout.footer.height, 1);
        assert_eq!(layout.globe.width, 120);
        assert_eq!(layout.mission.y, layout.broadcast.y);
        assert_eq!(layout.mission.height, BOTTOM_HEIGHT);
    }

    #[test]
    fn test_layout_with_details() {
        let layout = DashboardLayout::new(Rect::new(0, 0, 120, 40), true);
        let details = layout.details.unwrap();
        assert_eq!(details.width, DETAILS_WIDTH);
        assert_eq!(layout.globe.width + details.width, 120);
        assert_eq!(details.y, layout.globe.y);
    }

    #[test]
    fn test_contains() {
        let area = Rect::new(10, 5, 4, 2);
        assert!(contains(area, 10, 5));
        assert!(contains(area, 13, 6));
        assert!(!contains(area, 14, 6));
        assert!(!contains(area, 9, 5));
        assert!(!contains(area, 10, 7));
    }
}
