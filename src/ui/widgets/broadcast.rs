use crate::client::BroadcastRequest;
use crate::location::{resolve_coordinates, Coordinates};
use crate::ui::widgets::{border_style, DashboardWidget, ACCENT};
use rand::Rng;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::time::{Duration, Instant};

pub const BROADCAST_ID: &str = "broadcast";

/// How long the "SENT" badge stays up before the form returns to idle.
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastStatus {
    Idle,
    Transmitting,
    Success,
    Error,
}

/// Message uplink form.
#[derive(Debug)]
pub struct BroadcastTerminal {
    text: String,
    status: BroadcastStatus,
    sent_at: Option<Instant>,
    last_error: Option<String>,
    location: Option<Coordinates>,
    lang: String,
}

impl BroadcastTerminal {
    pub fn new(location: Option<Coordinates>, lang: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            status: BroadcastStatus::Idle,
            sent_at: None,
            last_error: None,
            location,
            lang: lang.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> BroadcastStatus {
        self.status
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn accepts_input(&self) -> bool {
        self.status != BroadcastStatus::Transmitting
    }

    pub fn add_char(&mut self, c: char) {
        if self.accepts_input() {
            self.text.push(c);
        }
    }

    pub fn delete_char(&mut self) {
        if self.accepts_input() {
            self.text.pop();
        }
    }

    pub fn clear(&mut self) {
        if self.accepts_input() {
            self.text.clear();
        }
    }

    /// Build the request for the current text and switch to transmitting.
    ///
    /// Returns `None` for blank text or while a previous submission is in
    /// flight. Without a known location a random position is used.
    pub fn submit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<BroadcastRequest> {
        if self.text.trim().is_empty() || self.status == BroadcastStatus::Transmitting {
            return None;
        }

        let at = resolve_coordinates(self.location, rng);
        self.status = BroadcastStatus::Transmitting;
        self.last_error = None;
        Some(BroadcastRequest::new(self.text.clone(), at, self.lang.clone()))
    }

    /// Record the backend's answer to the last submission.
    pub fn complete(&mut self, result: Result<(), String>, now: Instant) {
        match result {
            Ok(()) => {
                self.status = BroadcastStatus::Success;
                self.text.clear();
                self.sent_at = Some(now);
            }
            Err(e) => {
                self.status = BroadcastStatus::Error;
                self.last_error = Some(e);
            }
        }
    }

    /// Return to idle once the success badge has been shown long enough.
    pub fn tick(&mut self, now: Instant) {
        if self.status != BroadcastStatus::Success {
            return;
        }
        if let Some(sent_at) = self.sent_at {
            if now.saturating_duration_since(sent_at) >= SUCCESS_DISPLAY {
                self.status = BroadcastStatus::Idle;
                self.sent_at = None;
            }
        }
    }
}

impl DashboardWidget for BroadcastTerminal {
    fn id(&self) -> &str {
        BROADCAST_ID
    }

    fn title(&self) -> &str {
        "Global Uplink"
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let badge = match self.status {
            BroadcastStatus::Idle => Span::raw(""),
            BroadcastStatus::Transmitting => Span::styled(
                " SENDING... ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            BroadcastStatus::Success => Span::styled(" SENT ", Style::default().fg(Color::Green)),
            BroadcastStatus::Error => Span::styled(" FAILED ", Style::default().fg(Color::Red)),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(Line::from(vec![
                Span::styled(
                    format!(" 📡 {} ", self.title().to_uppercase()),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
                badge,
            ]));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(2), Constraint::Length(1)])
            .split(inner);

        let input = if self.text.is_empty() && !focused {
            Paragraph::new(Span::styled(
                "Type message to analyze...",
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            let cursor = if focused && self.accepts_input() {
                "█"
            } else {
                ""
            };
            Paragraph::new(Line::from(vec![
                Span::styled(self.text.as_str(), Style::default().fg(Color::White)),
                Span::styled(cursor, Style::default().fg(ACCENT)),
            ]))
            .wrap(Wrap { trim: false })
        };
        frame.render_widget(input, chunks[0]);

        let location = match self.location {
            Some(coords) => format!("LOC: {}", coords),
            None => "LOC: UPLINKING...".to_string(),
        };
        let hint = if let (BroadcastStatus::Error, Some(e)) = (self.status, &self.last_error) {
            Span::styled(format!("  {}", e), Style::default().fg(Color::Red))
        } else if focused {
            Span::styled(
                "  Enter: broadcast | Esc: leave",
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Span::raw("")
        };
        let footer = Paragraph::new(Line::from(vec![
            Span::styled(location, Style::default().fg(Color::DarkGray)),
            hint,
        ]));
        frame.render_widget(footer, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn type_text(form: &mut BroadcastTerminal, text: &str) {
        for c in text.chars() {
            form.add_char(c);
        }
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut form = BroadcastTerminal::new(None, "en");
        assert!(form.submit(&mut rng).is_none());

        type_text(&mut form, "   ");
        assert!(form.submit(&mut rng).is_none());
        assert_eq!(form.status(), BroadcastStatus::Idle);
    }

    #[test]
    fn test_submit_uses_known_location() {
        let mut rng = StdRng::seed_from_u64(7);
        let home = Coordinates::new(35.6762, 139.6503);
        let mut form = BroadcastTerminal::new(Some(home), "ja");
        type_text(&mut form, "hello");

        let request = form.submit(&mut rng).unwrap();
        assert_eq!(request.text, "hello");
        assert_eq!(request.lat, home.lat);
        assert_eq!(request.lng, home.lng);
        assert_eq!(request.lang, "ja");
        assert_eq!(form.status(), BroadcastStatus::Transmitting);
    }

    #[test]
    fn test_submit_falls_back_to_random_location() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut form = BroadcastTerminal::new(None, "en");
        type_text(&mut form, "anyone out there?");

        let request = form.submit(&mut rng).unwrap();
        assert!((-80.0..=80.0).contains(&request.lat));
        assert!((-180.0..=180.0).contains(&request.lng));
    }

    #[test]
    fn test_no_double_submit_or_edit_while_transmitting() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut form = BroadcastTerminal::new(None, "en");
        type_text(&mut form, "hi");
        assert!(form.submit(&mut rng).is_some());
        assert!(form.submit(&mut rng).is_none());

        form.add_char('!');
        form.delete_char();
        assert_eq!(form.text(), "hi");
    }

    #[test]
    fn test_success_clears_and_returns_to_idle() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut form = BroadcastTerminal::new(None, "en");
        type_text(&mut form, "hi");
        form.submit(&mut rng).unwrap();

        let now = Instant::now();
        form.complete(Ok(()), now);
        assert_eq!(form.status(), BroadcastStatus::Success);
        assert_eq!(form.text(), "");

        form.tick(now + Duration::from_millis(1999));
        assert_eq!(form.status(), BroadcastStatus::Success);
        form.tick(now + SUCCESS_DISPLAY);
        assert_eq!(form.status(), BroadcastStatus::Idle);
    }

    #[test]
    fn test_error_keeps_text() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut form = BroadcastTerminal::new(None, "en");
        type_text(&mut form, "hi");
        form.submit(&mut rng).unwrap();

        let now = Instant::now();
        form.complete(Err("HTTP 500".to_string()), now);
        assert_eq!(form.status(), BroadcastStatus::Error);
        assert_eq!(form.text(), "hi");
        assert_eq!(form.last_error(), Some("HTTP 500"));

        // Errors stay until the next attempt
        form.tick(now + Duration::from_secs(10));
        assert_eq!(form.status(), BroadcastStatus::Error);
        assert!(form.submit(&mut rng).is_some());
        assert!(form.last_error().is_none());
    }
}
