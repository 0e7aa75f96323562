use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{debug, info, warn};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use crate::command::{Command, CommandBus, CommandSender};
use crate::sequencer::{
    LookaheadScheduler, Pattern, Tempo, TransportEvent, TransportPhase, PRESETS,
};
use crate::ui::{render_beats, render_help, render_transport, GridState, PlayheadView, Theme};

/// Redraw interval when the scheduler is idle (~60fps)
const FRAME: Duration = Duration::from_millis(16);

const BPM_STEP: i32 = 5;

/// What the scheduler's listeners forward to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Step(Option<usize>),
    Event(TransportEvent),
}

/// Hand a notification to the UI (non-blocking, drops if buffer full)
fn forward(tx: &Sender<Notification>, notification: Notification) -> bool {
    match tx.try_send(notification) {
        Ok(()) => true,
        Err(TrySendError::Full(notification)) => {
            warn!("Notification buffer full, dropping: {:?}", notification);
            false
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

/// Application state
pub struct App {
    theme: Theme,
    scheduler: LookaheadScheduler,
    command_bus: CommandBus,
    command_sender: CommandSender,
    notifications: Receiver<Notification>,
    /// Pattern being edited; handed to the scheduler on start
    pattern: Pattern,
    tempo: Tempo,
    count_in: bool,
    preset_index: usize,
    /// Pattern was edited since the preset was loaded
    modified: bool,
    /// Latest step reported by the scheduler
    display_step: Option<usize>,
    /// The running session was started with R
    record_session: bool,
    grid_state: GridState,
    show_help: bool,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(
        theme: Theme,
        mut scheduler: LookaheadScheduler,
        tempo: Tempo,
        preset_index: usize,
        count_in: bool,
    ) -> Self {
        let (tx, notifications) = bounded(1024);
        let step_tx = tx.clone();
        scheduler.on_step(move |step| {
            forward(&step_tx, Notification::Step(step));
        });
        scheduler.on_event(move |event| {
            forward(&tx, Notification::Event(event));
        });

        let preset_index = preset_index.min(PRESETS.len() - 1);
        let pattern = PRESETS[preset_index].pattern;
        scheduler.set_pattern(pattern);
        if let Err(e) = scheduler.set_tempo(tempo.bpm()) {
            debug!("Initial tempo not applied: {}", e);
        }

        let command_bus = CommandBus::new();
        let command_sender = command_bus.sender();

        Self {
            theme,
            scheduler,
            command_bus,
            command_sender,
            notifications,
            pattern,
            tempo,
            count_in,
            preset_index,
            modified: false,
            display_step: None,
            record_session: false,
            grid_state: GridState::new(),
            show_help: false,
            should_quit: false,
            status_message: None,
        }
    }

    /// Start from a custom pattern instead of the preset's
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.modified = pattern != PRESETS[self.preset_index].pattern;
        self.pattern = pattern;
        self.scheduler.set_pattern(pattern);
        self
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = Self::setup_terminal()?;

        let result = self.main_loop(&mut terminal);

        self.scheduler.stop();
        self.drain_notifications();

        Self::restore_terminal(&mut terminal)?;

        result
    }

    /// Setup the terminal for TUI
    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    /// Restore terminal to normal state
    fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Main event loop. Input polling doubles as the scheduler's timer.
    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;

            let timeout = self
                .scheduler
                .time_until_poll(Instant::now())
                .map_or(FRAME, |due| due.min(FRAME));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            self.update(Instant::now());

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply queued commands, give the scheduler its tick, then collect what it reported
    pub fn update(&mut self, now: Instant) {
        for cmd in self.command_bus.drain() {
            self.apply(cmd);
        }
        self.scheduler.poll(now);
        self.drain_notifications();
    }

    fn drain_notifications(&mut self) {
        let pending: Vec<Notification> = self.notifications.try_iter().collect();
        for notification in pending {
            match notification {
                Notification::Step(step) => self.display_step = step,
                Notification::Event(event) => self.on_transport_event(event),
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CountInComplete { recording: true } => {
                self.set_status("Recording".to_string());
            }
            TransportEvent::CountInComplete { recording: false } => {}
            TransportEvent::RecordingFinished(take) => {
                info!("Take saved: {}", take.path.display());
                self.set_status(format!(
                    "Saved: {} ({:.1}s)",
                    take.path.display(),
                    take.duration_secs
                ));
            }
            TransportEvent::RecordingFailed(reason) => {
                self.set_status(format!("Recording failed: {}", reason));
            }
        }
    }

    /// Dispatch a command through the command bus
    fn dispatch(&mut self, cmd: Command) {
        debug!("UI command: {}", cmd.description());
        self.command_sender.send(cmd);
    }

    fn apply(&mut self, cmd: Command) {
        if cmd.requires_stopped() && self.scheduler.is_playing() {
            self.set_status(format!("{}: stop the transport first", cmd.description()));
            return;
        }

        match cmd {
            Command::TogglePlay => {
                if self.record_session {
                    self.set_status("Recording: press R or S to stop".to_string());
                } else if self.scheduler.is_playing() {
                    self.stop();
                } else {
                    self.start(false);
                }
            }
            Command::Stop => self.stop(),
            Command::Record => {
                if self.record_session {
                    self.stop();
                } else if self.scheduler.is_playing() {
                    self.set_status("Stop playback before recording".to_string());
                } else {
                    self.start(true);
                }
            }
            Command::SetBpm(bpm) => match self.scheduler.set_tempo(bpm) {
                Ok(tempo) => {
                    self.tempo = tempo;
                    self.set_status(format!("Tempo: {}", tempo));
                }
                Err(e) => self.set_status(e.to_string()),
            },
            Command::CycleStep(step) => {
                self.pattern = self.scheduler.cycle_step(step);
                self.modified = true;
                self.set_status(format!("Step {}: {}", step + 1, self.pattern.get(step)));
            }
            Command::LoadPreset(index) => {
                if let Some(preset) = PRESETS.get(index) {
                    self.pattern = preset.pattern;
                    self.scheduler.set_pattern(self.pattern);
                    self.preset_index = index;
                    self.modified = false;
                    self.set_status(format!("Preset: {}", preset.name));
                }
            }
        }
    }

    fn start(&mut self, record: bool) {
        match self
            .scheduler
            .start(self.pattern, self.tempo, self.count_in, record)
        {
            Ok(()) => {
                self.record_session = record;
                if !self.scheduler.output_available() {
                    self.set_status("No audio output: running silent".to_string());
                }
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn stop(&mut self) {
        self.scheduler.stop();
        self.record_session = false;
    }

    /// Set a temporary status message shown in the footer
    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Handle key press events
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                _ => self.show_help = false,
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,

            KeyCode::Left | KeyCode::Char('h') => self.grid_state.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.grid_state.move_cursor(1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.dispatch(Command::CycleStep(self.grid_state.cursor_step));
            }

            KeyCode::Char('p') => self.dispatch(Command::TogglePlay),
            KeyCode::Char('r') => self.dispatch(Command::Record),
            KeyCode::Char('s') => self.dispatch(Command::Stop),

            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.dispatch(Command::SetBpm(self.tempo.offset(BPM_STEP).bpm()));
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                self.dispatch(Command::SetBpm(self.tempo.offset(-BPM_STEP).bpm()));
            }
            KeyCode::Char(',') | KeyCode::Char('<') => {
                let index = (self.preset_index + PRESETS.len() - 1) % PRESETS.len();
                self.dispatch(Command::LoadPreset(index));
            }
            KeyCode::Char('.') | KeyCode::Char('>') => {
                let index = (self.preset_index + 1) % PRESETS.len();
                self.dispatch(Command::LoadPreset(index));
            }
            _ => {}
        }
    }

    fn playhead(&self) -> PlayheadView {
        PlayheadView {
            phase: self.scheduler.phase(),
            step: self.display_step,
            count_in_beat: self.scheduler.count_in_beat(),
        }
    }

    fn preset_label(&self) -> String {
        let name = PRESETS[self.preset_index].name;
        if self.modified {
            format!("{}*", name)
        } else {
            name.to_string()
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Clear with background color
        let bg_block = Block::default().style(Style::default().bg(self.theme.bg));
        frame.render_widget(bg_block, area);

        // Layout: header, transport, beats, footer
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Transport
                Constraint::Min(4),    // Beats
                Constraint::Length(3), // Footer
            ])
            .split(area);

        let view = self.playhead();

        self.render_header(frame, chunks[0]);
        render_transport(
            frame,
            chunks[1],
            view,
            self.tempo.bpm(),
            &self.preset_label(),
            &self.theme,
        );
        render_beats(
            frame,
            chunks[2],
            &self.pattern,
            &self.grid_state,
            view,
            &self.theme,
        );
        self.render_footer(frame, chunks[3]);

        if self.show_help {
            render_help(frame, area, &self.theme);
        }
    }

    /// Render the header
    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let output = if self.scheduler.output_available() {
            ""
        } else {
            " [NO AUDIO]"
        };
        let title = format!(" METRONOXIDE v{}{} ", env!("CARGO_PKG_VERSION"), output);
        let header = Paragraph::new(title)
            .style(
                Style::default()
                    .fg(self.theme.beat_accent)
                    .bg(self.theme.bg)
                    .bold(),
            )
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(header, area);
    }

    /// Render the footer with help or status message
    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        // Show status message if recent (within 3 seconds)
        let text = match self.status_message {
            Some((ref msg, instant)) if instant.elapsed().as_secs() < 3 => msg.clone(),
            _ => self.footer_help(),
        };

        let footer = Paragraph::new(text)
            .style(Style::default().fg(self.theme.dimmed).bg(self.theme.bg))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(footer, area);
    }

    fn footer_help(&self) -> String {
        match self.scheduler.phase() {
            TransportPhase::Stopped => format!(
                "SPACE:Cycle | P:Play | R:Record | +/-:BPM | ,/.:Preset | ?:Help | Q:Quit | {}",
                self.theme.name
            ),
            TransportPhase::CountingIn | TransportPhase::Playing => format!(
                "SPACE:Cycle | P:Stop | S:Stop | ?:Help | Q:Quit | {}",
                self.theme.name
            ),
            TransportPhase::Recording => format!(
                "R:Finish take | S:Stop | ?:Help | Q:Quit | {}",
                self.theme.name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{capture_context, FakeRecorder, ManualClock, RecorderLog};
    use crate::config::SchedulerConfig;
    use crate::sequencer::{BeatState, DEFAULT_BPM};
    use crossterm::event::KeyModifiers;

    fn app() -> (App, ManualClock) {
        let clock = ManualClock::new();
        let (context, _audio) = capture_context(clock.clone());
        let scheduler = LookaheadScheduler::new(context, SchedulerConfig::default());
        (App::new(Theme::default(), scheduler, Tempo::default(), 2, true), clock)
    }

    fn recording_app() -> (App, ManualClock, RecorderLog) {
        let clock = ManualClock::new();
        let (context, _audio) = capture_context(clock.clone());
        let (recorder, log) = FakeRecorder::new();
        let scheduler = LookaheadScheduler::new(context, SchedulerConfig::default())
            .with_recorder(Box::new(recorder));
        (
            App::new(Theme::default(), scheduler, Tempo::default(), 2, true),
            clock,
            log,
        )
    }

    fn press(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        app.update(Instant::now());
    }

    fn status(app: &App) -> Option<&str> {
        app.status_message.as_ref().map(|(msg, _)| msg.as_str())
    }

    #[test]
    fn space_cycles_the_cursor_step() {
        let (mut app, _clock) = app();
        press(&mut app, 'l');
        assert_eq!(app.pattern.get(1), BeatState::Normal);
        press(&mut app, ' ');
        assert_eq!(app.pattern.get(1), BeatState::Accent);
        assert_eq!(app.scheduler.pattern().get(1), BeatState::Accent);
        assert!(app.preset_label().ends_with('*'));
    }

    #[test]
    fn play_toggles_and_locks_configuration() {
        let (mut app, _clock) = app();
        press(&mut app, 'p');
        assert_eq!(app.scheduler.phase(), TransportPhase::CountingIn);

        press(&mut app, '+');
        assert_eq!(app.tempo.bpm(), DEFAULT_BPM);
        assert!(status(&app).is_some_and(|s| s.contains("stop the transport first")));

        press(&mut app, '.');
        assert_eq!(app.preset_index, 2);

        press(&mut app, 'p');
        assert_eq!(app.scheduler.phase(), TransportPhase::Stopped);
        assert_eq!(app.display_step, None);

        press(&mut app, '+');
        assert_eq!(app.tempo.bpm(), DEFAULT_BPM + 5);
        assert_eq!(app.scheduler.tempo().bpm(), DEFAULT_BPM + 5);
    }

    #[test]
    fn presets_wrap_in_both_directions() {
        let (mut app, _clock) = app();
        press(&mut app, ',');
        press(&mut app, ',');
        press(&mut app, ',');
        assert_eq!(app.preset_index, PRESETS.len() - 1);
        assert_eq!(app.pattern, PRESETS[PRESETS.len() - 1].pattern);
        press(&mut app, '.');
        assert_eq!(app.preset_index, 0);
        assert!(!app.pattern.has_content());
    }

    #[test]
    fn steps_reach_the_display() {
        let clock = ManualClock::new();
        let (context, _audio) = capture_context(clock.clone());
        let scheduler = LookaheadScheduler::new(context, SchedulerConfig::default());
        let mut app = App::new(Theme::default(), scheduler, Tempo::default(), 2, false);

        press(&mut app, 'p');
        assert_eq!(app.scheduler.phase(), TransportPhase::Playing);
        clock.set(0.05);
        app.update(Instant::now() + Duration::from_millis(30));
        assert_eq!(app.display_step, Some(0));
        assert_eq!(app.playhead().highlighted_step(), Some(0));
    }

    #[test]
    fn record_key_arms_and_finishes_the_take() {
        let (mut app, _clock, log) = recording_app();
        press(&mut app, 'r');
        assert_eq!(log.armed(), 1);
        assert_eq!(app.scheduler.phase(), TransportPhase::CountingIn);

        // Play toggle is ignored while a take is in progress
        press(&mut app, 'p');
        assert!(app.scheduler.is_playing());

        press(&mut app, 'r');
        assert!(!app.scheduler.is_playing());
        assert_eq!(log.disarms(), 1);
        assert!(!app.record_session);
    }

    #[test]
    fn record_without_recorder_reports() {
        let (mut app, _clock) = app();
        press(&mut app, 'r');
        assert!(!app.scheduler.is_playing());
        assert!(status(&app).is_some());
    }

    #[test]
    fn custom_pattern_replaces_the_preset() {
        let mut custom = Pattern::new();
        custom.set(3, BeatState::Accent);
        let (edited, _clock) = app();
        let edited = edited.with_pattern(custom);
        assert_eq!(edited.scheduler.pattern().get(3), BeatState::Accent);
        assert!(edited.preset_label().ends_with('*'));

        let (same, _clock) = app();
        let same = same.with_pattern(PRESETS[2].pattern);
        assert!(!same.preset_label().ends_with('*'));
    }

    #[test]
    fn cycled_step_is_reported() {
        let (mut app, _clock) = app();
        press(&mut app, ' ');
        assert_eq!(status(&app), Some("Step 1: Off"));
    }

    #[test]
    fn full_notification_buffer_drops() {
        let (tx, rx) = bounded(1);
        assert!(forward(&tx, Notification::Step(Some(0))));
        assert!(!forward(&tx, Notification::Step(Some(1))));
        assert_eq!(rx.try_recv(), Ok(Notification::Step(Some(0))));
        drop(rx);
        assert!(!forward(&tx, Notification::Step(None)));
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let (mut app, _clock) = app();
        press(&mut app, '?');
        assert!(app.show_help);
        press(&mut app, 'p');
        assert!(!app.show_help);
        assert!(!app.scheduler.is_playing());
        press(&mut app, 'q');
        assert!(app.should_quit);
    }
}
