use crate::client::{GaiaClient, Scenario, ScenarioAck};
use crate::config::Config;
use crate::feeds::events::EventsFetcher;
use crate::feeds::{spawn_poller, FeedMessage, GlobalEvent};
use crate::location::Coordinates;
use crate::ui::widgets::globe::GLOBE_WIDGET_ID;
use crate::ui::widgets::{
    BroadcastTerminal, DashboardWidget, EventDetails, GlobeWidget, MissionControl,
};
use crate::ui::{self, DashboardLayout};
use anyhow::Result;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Globe,
    MissionControl,
    Broadcast,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Globe => Focus::MissionControl,
            Focus::MissionControl => Focus::Broadcast,
            Focus::Broadcast => Focus::Globe,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Globe => Focus::Broadcast,
            Focus::MissionControl => Focus::Globe,
            Focus::Broadcast => Focus::MissionControl,
        }
    }
}

/// Outcome of a one-shot request started from the UI.
#[derive(Debug)]
pub enum ActionResult {
    Broadcast(Result<Option<GlobalEvent>, String>),
    Scenario {
        scenario: Scenario,
        result: Result<ScenarioAck, String>,
    },
}

pub struct App {
    config: Config,
    client: GaiaClient,
    globe: GlobeWidget,
    mission: MissionControl,
    details: EventDetails,
    broadcast: BroadcastTerminal,
    focus: Focus,
    refresh: Arc<Notify>,
    /// Bumped whenever the store is wiped, so polls started earlier are ignored.
    generation: Arc<AtomicU64>,
    feed_tx: mpsc::UnboundedSender<FeedMessage>,
    feed_rx: mpsc::UnboundedReceiver<FeedMessage>,
    action_tx: mpsc::UnboundedSender<ActionResult>,
    action_rx: mpsc::UnboundedReceiver<ActionResult>,
    poller: Option<JoinHandle<()>>,
    last_area: Rect,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, location: Option<Coordinates>, lang: String) -> Result<Self> {
        let client = GaiaClient::new(&config.api)?;
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Ok(Self {
            globe: GlobeWidget::new(&config.globe),
            mission: MissionControl::new(client.node()),
            details: EventDetails::new(),
            broadcast: BroadcastTerminal::new(location, lang),
            focus: Focus::Globe,
            refresh: Arc::new(Notify::new()),
            generation: Arc::new(AtomicU64::new(0)),
            feed_tx,
            feed_rx,
            action_tx,
            action_rx,
            poller: None,
            last_area: Rect::default(),
            should_quit: false,
            config,
            client,
        })
    }

    pub fn globe(&self) -> &GlobeWidget {
        &self.globe
    }

    pub fn mission(&self) -> &MissionControl {
        &self.mission
    }

    pub fn details(&self) -> &EventDetails {
        &self.details
    }

    pub fn broadcast(&self) -> &BroadcastTerminal {
        &self.broadcast
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Start the background poller for `/api/events`.
    pub fn start_polling(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let fetcher = Arc::new(EventsFetcher::new(self.client.clone()));
        self.poller = Some(spawn_poller(
            fetcher,
            GLOBE_WIDGET_ID.to_string(),
            self.config.api.poll_interval(),
            self.feed_tx.clone(),
            self.refresh.clone(),
            self.generation.clone(),
        ));
        tracing::info!(
            base_url = %self.client.base_url(),
            interval_secs = self.config.api.poll_interval_secs,
            "polling started"
        );
    }

    pub fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }

    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub async fn run(&mut self) -> Result<()> {
        if !io::stdout().is_terminal() {
            return Err(anyhow::anyhow!(
                "GAIA needs an interactive terminal. Use `gaia events` for scripted access."
            ));
        }

        enable_raw_mode()
            .map_err(|e| anyhow::anyhow!("Failed to enable raw mode: {}", e))?;
        let mut terminal = match setup_terminal() {
            Ok(terminal) => terminal,
            Err(e) => {
                if let Err(restore) = restore_terminal(&mut io::stdout()) {
                    tracing::error!("failed to restore terminal: {}", restore);
                }
                return Err(e);
            }
        };

        self.start_polling();
        let result = self.run_loop(&mut terminal).await;
        self.stop_polling();

        restore_terminal(terminal.backend_mut())?;
        result
    }

    async fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let tick_rate = self.config.ui.tick_rate();
        let mut last_tick = Instant::now();

        loop {
            self.drain_channels(Instant::now());

            let mut area = self.last_area;
            terminal.draw(|f| {
                area = f.area();
                ui::render(f, self);
            })?;
            self.last_area = area;

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            let elapsed = last_tick.elapsed();
            if elapsed >= tick_rate {
                self.tick(elapsed.as_secs_f64(), Instant::now());
                last_tick = Instant::now();
            }

            if self.should_quit {
                break;
            }

            // Let spawned requests make progress between frames
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    pub fn tick(&mut self, dt: f64, now: Instant) {
        self.globe.tick(dt);
        self.broadcast.tick(now);
    }

    pub fn drain_channels(&mut self, now: Instant) {
        while let Ok(message) = self.feed_rx.try_recv() {
            self.handle_feed(message);
        }
        while let Ok(result) = self.action_rx.try_recv() {
            self.handle_action(result, now);
        }
    }

    pub fn handle_feed(&mut self, message: FeedMessage) {
        let current = self.generation.load(Ordering::Acquire);
        if message.generation < current {
            tracing::debug!(
                generation = message.generation,
                current,
                "dropping feed result from before the last reset"
            );
            return;
        }

        if message.widget_id == self.globe.id() {
            self.globe.update_data(message.data);
        } else {
            tracing::debug!(widget = %message.widget_id, "feed message for unknown widget");
        }
    }

    pub fn handle_action(&mut self, result: ActionResult, now: Instant) {
        match result {
            ActionResult::Broadcast(Ok(echoed)) => {
                if let Some(event) = echoed {
                    tracing::debug!(id = %event.id, sentiment = %event.sentiment, "broadcast analysed");
                }
                self.broadcast.complete(Ok(()), now);
                self.request_refresh();
            }
            ActionResult::Broadcast(Err(e)) => {
                tracing::warn!("broadcast failed: {}", e);
                self.broadcast.complete(Err(e), now);
            }
            ActionResult::Scenario {
                scenario,
                result: Ok(ack),
            } => {
                self.mission.finish(scenario);
                if ack.success {
                    self.generation.fetch_add(1, Ordering::AcqRel);
                    self.globe.clear_events();
                } else {
                    tracing::warn!(
                        scenario = %scenario,
                        current = %ack.current_scenario,
                        "backend rejected scenario"
                    );
                }
                self.details.close();
                self.request_refresh();
            }
            ActionResult::Scenario {
                scenario,
                result: Err(e),
            } => {
                self.mission.finish(scenario);
                tracing::error!(scenario = %scenario, "scenario switch failed: {}", e);
            }
        }
    }

    pub fn trigger_scenario(&mut self, scenario: Scenario) {
        self.mission.activate(scenario);

        let client = self.client.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = client
                .set_scenario(scenario)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(ActionResult::Scenario { scenario, result });
        });
    }

    pub fn submit_broadcast(&mut self) {
        let Some(request) = self.broadcast.submit(&mut rand::thread_rng()) else {
            return;
        };
        tracing::info!(lat = request.lat, lng = request.lng, "transmitting broadcast");

        let client = self.client.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = client.broadcast(&request).await.map_err(|e| e.to_string());
            let _ = tx.send(ActionResult::Broadcast(result));
        });
    }

    /// Open the detail panel for the hovered marker.
    pub fn inspect_hovered(&mut self) {
        if let Some(event) = self.globe.hovered().cloned() {
            self.details.show(event);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.focus == Focus::Broadcast {
            self.handle_broadcast_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char('b') | KeyCode::Char('i') => self.focus = Focus::Broadcast,
            KeyCode::Char('1') => self.trigger_scenario(Scenario::AiPanic),
            KeyCode::Char('2') => self.trigger_scenario(Scenario::MarsColony),
            KeyCode::Char('r') => self.request_refresh(),
            KeyCode::Esc => self.details.close(),
            KeyCode::PageUp => self.details.scroll_up(),
            KeyCode::PageDown => self.details.scroll_down(),
            _ => match self.focus {
                Focus::Globe => self.handle_globe_key(key),
                Focus::MissionControl => self.handle_mission_key(key),
                Focus::Broadcast => {}
            },
        }
    }

    fn handle_globe_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.globe.rotate_left(),
            KeyCode::Right | KeyCode::Char('l') => self.globe.rotate_right(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.globe.zoom_in(),
            KeyCode::Char('-') => self.globe.zoom_out(),
            KeyCode::Char(' ') => self.globe.toggle_pause(),
            KeyCode::Up | KeyCode::Char('k') => self.globe.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.globe.scroll_down(),
            KeyCode::Enter => self.inspect_hovered(),
            _ => {}
        }
    }

    fn handle_mission_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.mission.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.mission.scroll_down(),
            KeyCode::Enter => {
                let scenario = self.mission.cursor_scenario();
                self.trigger_scenario(scenario);
            }
            _ => {}
        }
    }

    fn handle_broadcast_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.focus = Focus::Globe,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Enter => self.submit_broadcast(),
            KeyCode::Backspace => self.broadcast.delete_char(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.broadcast.clear()
            }
            KeyCode::Char(c) => self.broadcast.add_char(c),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let layout = DashboardLayout::new(self.last_area, self.details.is_open());
        let (column, row) = (mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::Moved => {
                let hit = if ui::contains(layout.globe, column, row) {
                    self.globe.marker_at(layout.globe, column, row)
                } else {
                    None
                };
                self.globe.set_hovered(hit);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if ui::contains(layout.globe, column, row) {
                    self.focus = Focus::Globe;
                    if let Some(id) = self.globe.marker_at(layout.globe, column, row) {
                        self.globe.set_hovered(Some(id));
                        self.inspect_hovered();
                    }
                } else if ui::contains(layout.mission, column, row) {
                    self.focus = Focus::MissionControl;
                    if let Some(scenario) = self.mission.scenario_at(layout.mission, row) {
                        self.trigger_scenario(scenario);
                    }
                } else if ui::contains(layout.broadcast, column, row) {
                    self.focus = Focus::Broadcast;
                }
            }
            MouseEventKind::ScrollUp => {
                if layout.details.is_some_and(|d| ui::contains(d, column, row)) {
                    self.details.scroll_up();
                } else if ui::contains(layout.globe, column, row) {
                    self.globe.zoom_in();
                }
            }
            MouseEventKind::ScrollDown => {
                if layout.details.is_some_and(|d| ui::contains(d, column, row)) {
                    self.details.scroll_down();
                } else if ui::contains(layout.globe, column, row) {
                    self.globe.zoom_out();
                }
            }
            _ => {}
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|e| anyhow::anyhow!("Failed to setup terminal: {}", e))?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Leave raw mode and undo everything `setup_terminal` switched on. Safe to
/// call after a partial setup.
fn restore_terminal<W: Write>(out: &mut W) -> io::Result<()> {
    disable_raw_mode()?;
    write_teardown(out)
}

fn write_teardown<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, LeaveAlternateScreen, DisableMouseCapture, cursor::Show)
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
