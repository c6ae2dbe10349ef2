use crate::client::Scenario;
use crate::ui::widgets::{border_style, DashboardWidget, ACCENT};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub const MISSION_CONTROL_ID: &str = "mission_control";

/// Scenario switcher. The active scenario is set optimistically as soon as it
/// is triggered; the backend answer only decides whether the globe refreshes.
pub struct MissionControl {
    title: String,
    active: Scenario,
    cursor: usize,
    pending: Option<Scenario>,
    node: String,
}

impl MissionControl {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            title: "Scenario Simulation".to_string(),
            active: Scenario::default(),
            cursor: 0,
            pending: None,
            node: node.into(),
        }
    }

    pub fn active(&self) -> Scenario {
        self.active
    }

    pub fn cursor_scenario(&self) -> Scenario {
        Scenario::ALL[self.cursor]
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Mark `scenario` active and waiting for the backend.
    pub fn activate(&mut self, scenario: Scenario) {
        self.active = scenario;
        self.pending = Some(scenario);
        if let Some(i) = Scenario::ALL.iter().position(|s| *s == scenario) {
            self.cursor = i;
        }
    }

    pub fn finish(&mut self, scenario: Scenario) {
        if self.pending == Some(scenario) {
            self.pending = None;
        }
    }

    /// Scenario listed on terminal row `row`, given the widget's full area.
    pub fn scenario_at(&self, area: Rect, row: u16) -> Option<Scenario> {
        let first = area.y + 1;
        row.checked_sub(first)
            .and_then(|offset| Scenario::ALL.get(offset as usize).copied())
    }
}

fn scenario_color(scenario: Scenario) -> Color {
    match scenario {
        Scenario::AiPanic => Color::Rgb(0xf8, 0x71, 0x71),
        Scenario::MarsColony => Color::Rgb(0x4a, 0xde, 0x80),
    }
}

impl DashboardWidget for MissionControl {
    fn id(&self) -> &str {
        MISSION_CONTROL_ID
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(Span::styled(
                format!(" {} ", self.title.to_uppercase()),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ));

        let mut lines: Vec<Line> = Scenario::ALL
            .iter()
            .enumerate()
            .map(|(i, scenario)| {
                let is_active = *scenario == self.active;
                let marker = if is_active { "▌" } else { " " };
                let style = if is_active {
                    Style::default()
                        .fg(scenario_color(*scenario))
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let style = if focused && i == self.cursor {
                    style.add_modifier(Modifier::REVERSED)
                } else {
                    style
                };
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(scenario_color(*scenario))),
                    Span::styled(format!(" {}", scenario.label()), style),
                ])
            })
            .collect();

        let status = if self.pending.is_some() {
            Span::styled("SWITCHING...", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("RUNNING", Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("STATUS: ", Style::default().fg(Color::DarkGray)),
            status,
        ]));
        lines.push(Line::from(Span::styled(
            format!("NODE: {}", self.node.to_uppercase()),
            Style::default().fg(Color::DarkGray),
        )));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn scroll_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn scroll_down(&mut self) {
        if self.cursor + 1 < Scenario::ALL.len() {
            self.cursor += 1;
        }
    }
}
