use crate::feeds::GlobalEvent;
use crate::geo::{Sentiment, ANTICIPATION_COLOR, JOY_COLOR};
use crate::ui::widgets::{border_style, DashboardWidget, ACCENT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph},
    Frame,
};

pub const EVENT_DETAILS_ID: &str = "event_details";

/// Side panel for the selected event. It keeps its own copy so it stays open
/// after the event scrolls out of the recency window.
#[derive(Debug, Default)]
pub struct EventDetails {
    event: Option<GlobalEvent>,
    scroll: u16,
}

impl EventDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, event: GlobalEvent) {
        self.event = Some(event);
        self.scroll = 0;
    }

    pub fn close(&mut self) {
        self.event = None;
        self.scroll = 0;
    }

    pub fn is_open(&self) -> bool {
        self.event.is_some()
    }

    pub fn event(&self) -> Option<&GlobalEvent> {
        self.event.as_ref()
    }
}

/// Headline colour for a sentiment. Only the three strongest signals get
/// their own colour here; everything else reads as blue.
fn headline_color(sentiment: &Sentiment) -> Color {
    match sentiment {
        Sentiment::Fear | Sentiment::Joy | Sentiment::Anger => sentiment.color().into(),
        _ => ANTICIPATION_COLOR.into(),
    }
}

fn confidence_bar_color(sentiment: &Sentiment) -> Color {
    match sentiment {
        Sentiment::Fear => sentiment.color().into(),
        _ => JOY_COLOR.into(),
    }
}

fn label(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_uppercase(),
        Style::default().fg(Color::DarkGray),
    ))
}

impl DashboardWidget for EventDetails {
    fn id(&self) -> &str {
        EVENT_DETAILS_ID
    }

    fn title(&self) -> &str {
        "Data Intercept"
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let Some(event) = &self.event else {
            return;
        };

        frame.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(Span::styled(
                format!(" {} ", self.title().to_uppercase()),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(" Esc: close ").right_aligned());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(1)])
            .split(inner);

        let wrap_width = inner.width.saturating_sub(2).max(10) as usize;
        let mut lines = vec![
            label("Topic"),
            Line::from(Span::styled(
                event.topic.clone(),
                Style::default().fg(Color::White),
            )),
            Line::from(""),
            label("Detected Language"),
            Line::from(Span::styled(
                event.lang.to_uppercase(),
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            label("Full Message"),
        ];

        let quoted = format!("\"{}\"", event.text);
        for chunk in textwrap::wrap(&quoted, wrap_width) {
            lines.push(Line::from(Span::styled(
                chunk.into_owned(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        lines.push(Line::from(""));
        lines.push(label("AI Analysis"));
        lines.push(Line::from(Span::styled(
            event.sentiment.as_str().to_uppercase(),
            Style::default()
                .fg(headline_color(&event.sentiment))
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("Confidence: {}", event.confidence_label()),
            Style::default().fg(Color::DarkGray),
        )));

        if let Some(received) = event.received_at() {
            lines.push(Line::from(""));
            lines.push(label("Received"));
            lines.push(Line::from(Span::styled(
                received.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                Style::default().fg(Color::Gray),
            )));
        }
        if event.is_live {
            lines.push(Line::from(Span::styled(
                "● LIVE BROADCAST",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )));
        }

        frame.render_widget(Paragraph::new(lines).scroll((self.scroll, 0)), chunks[0]);

        let gauge = Gauge::default()
            .gauge_style(
                Style::default()
                    .fg(confidence_bar_color(&event.sentiment))
                    .bg(Color::Rgb(0x11, 0x18, 0x27)),
            )
            .label("")
            .ratio(if event.score.is_finite() {
                event.score.clamp(0.0, 1.0)
            } else {
                0.0
            });
        frame.render_widget(gauge, chunks[1]);
    }

    fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    fn scroll_down(&mut self) {
        if self.event.is_some() {
            self.scroll = self.scroll.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{ANGER_COLOR, FEAR_COLOR};
    use crate::store::tests::event;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_show_and_close() {
        let mut panel = EventDetails::new();
        assert!(!panel.is_open());

        panel.show(event("a", "fear"));
        assert!(panel.is_open());
        assert_eq!(panel.event().unwrap().id.to_string(), "a");

        panel.close();
        assert!(!panel.is_open());
    }

    #[test]
    fn test_colors() {
        assert_eq!(headline_color(&Sentiment::Fear), Color::from(FEAR_COLOR));
        assert_eq!(headline_color(&Sentiment::Anger), Color::from(ANGER_COLOR));
        assert_eq!(
            headline_color(&Sentiment::Sadness),
            Color::from(ANTICIPATION_COLOR)
        );
        assert_eq!(confidence_bar_color(&Sentiment::Fear), Color::from(FEAR_COLOR));
        assert_eq!(confidence_bar_color(&Sentiment::Anger), Color::from(JOY_COLOR));
    }

    #[test]
    fn test_scroll_only_when_open() {
        let mut panel = EventDetails::new();
        panel.scroll_down();
        assert_eq!(panel.scroll, 0);

        panel.show(event("a", "joy"));
        panel.scroll_down();
        panel.scroll_down();
        assert_eq!(panel.scroll, 2);
        panel.scroll_up();
        assert_eq!(panel.scroll, 1);

        panel.show(event("b", "joy"));
        assert_eq!(panel.scroll, 0);
    }

    #[test]
    fn test_render_shows_fields() {
        let mut e = event("a", "fear");
        e.lang = "es".to_string();
        e.text = "El miedo a la IA paraliza las inversiones".to_string();
        e.score = 0.8766;

        let mut panel = EventDetails::new();
        panel.show(e);

        let backend = TestBackend::new(40, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| panel.render(f, f.area(), false)).unwrap();

        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(rendered.contains("DATA INTERCEPT"));
        assert!(rendered.contains("Global Sentiment"));
        assert!(rendered.contains("ES"));
        assert!(rendered.contains("FEAR"));
        assert!(rendered.contains("Confidence: 87.7%"));
    }
}
