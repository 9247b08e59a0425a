use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use crossterm::{
    cursor,
    event::{self, Event},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::PredictionClient;
use crate::config::Cli;
use crate::input::{map_key, Action};
use crate::model::{History, PredictionRecord, View};
use crate::poll::{spawn_fetch, FetchOrigin, FetchOutcome, Poller, SeqCounter};
use crate::render;
use crate::report;

pub(crate) const VALIDATION_EMPTY: &str = "Please enter a location name";

const MAX_LOCATION_LEN: usize = 100;

pub(crate) struct AppState {
    pub(crate) view: View,
    pub(crate) input: String,
    pub(crate) busy: bool,
    pub(crate) error: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) record: Option<PredictionRecord>,
    pub(crate) history: History,
    pub(crate) target: Option<String>,
    pub(crate) polling: bool,
    pub(crate) last_fetch_at: Option<String>,
    pub(crate) mono: bool,
    last_applied_seq: u64,
}

impl AppState {
    pub(crate) fn new(mono: bool) -> Self {
        Self {
            view: View::Input,
            input: String::new(),
            busy: false,
            error: None,
            notice: None,
            record: None,
            history: History::default(),
            target: None,
            polling: false,
            last_fetch_at: None,
            mono,
            last_applied_seq: 0,
        }
    }

    /// Validates the entry buffer; on success flips the busy flag and
    /// returns the trimmed location to fetch. No request happens for
    /// empty-after-trim input.
    pub(crate) fn begin_submit(&mut self) -> Option<String> {
        if self.busy {
            return None;
        }
        let location = self.input.trim().to_string();
        if location.is_empty() {
            self.error = Some(VALIDATION_EMPTY.to_string());
            return None;
        }
        self.busy = true;
        self.error = None;
        self.notice = None;
        Some(location)
    }

    /// Re-fetches the current target through the manual path.
    pub(crate) fn begin_refresh(&mut self) -> Option<String> {
        if self.busy {
            return None;
        }
        let location = self.target.clone()?;
        self.busy = true;
        self.error = None;
        Some(location)
    }

    /// Applies one fetch outcome. Returns the location to (re)arm polling
    /// for when a manual fetch succeeded.
    pub(crate) fn apply_outcome(&mut self, outcome: FetchOutcome) -> Option<String> {
        let manual = outcome.origin == FetchOrigin::Manual;
        if manual {
            // Guaranteed release, even when the outcome is discarded below.
            self.busy = false;
        }

        if outcome.seq < self.last_applied_seq {
            debug!(
                seq = outcome.seq,
                last = self.last_applied_seq,
                "discarding stale response"
            );
            return None;
        }

        match outcome.result {
            Ok(record) => {
                self.last_applied_seq = outcome.seq;
                let sample = record.sample(&outcome.at);
                if manual {
                    self.history.reset(sample);
                    self.target = Some(outcome.location.clone());
                    self.polling = true;
                    self.view = View::Predictions;
                } else {
                    self.history.push(sample);
                }
                self.last_fetch_at = Some(outcome.at.format("%H:%M:%S").to_string());
                self.record = Some(record);
                if manual {
                    return Some(outcome.location);
                }
            }
            Err(err) => {
                if manual {
                    // Stale data next to an error is worse than no data.
                    self.error = Some(err.to_string());
                    self.record = None;
                } else {
                    // Silent degrade: keep showing the previous record.
                    warn!(location = %outcome.location, error = %err, "background refresh failed");
                }
            }
        }
        None
    }

    pub(crate) fn stop_polling(&mut self) {
        self.polling = false;
    }
}

struct App {
    client: PredictionClient,
    poller: Poller,
    counter: SeqCounter,
    tx: mpsc::Sender<FetchOutcome>,
    rx: mpsc::Receiver<FetchOutcome>,
    state: AppState,
    should_quit: bool,
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let client = PredictionClient::new(cli.base_url.clone())?;
    let counter = SeqCounter::default();
    let poller = Poller::new(
        Duration::from_secs(cli.refresh_secs.max(1)),
        counter.clone(),
    );
    let (tx, rx) = mpsc::channel::<FetchOutcome>(16);

    let mut app = App {
        client,
        poller,
        counter,
        tx,
        rx,
        state: AppState::new(cli.mono),
        should_quit: false,
    };

    let mut terminal = setup_terminal()?;
    let res = app.event_loop(&mut terminal).await;
    restore_terminal(&mut terminal)?;
    res
}

impl App {
    async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        info!("dashboard started");
        while !self.should_quit {
            // Drain outcomes from manual fetch tasks and the poll loop.
            while let Ok(outcome) = self.rx.try_recv() {
                if let Some(location) = self.state.apply_outcome(outcome) {
                    self.poller
                        .arm(&location, self.client.clone(), self.tx.clone());
                }
            }

            terminal.draw(|f| render::draw(f, &self.state))?;

            if event::poll(Duration::from_millis(33))? {
                if let Event::Key(key) = event::read()? {
                    if let Some(action) = map_key(self.state.view, key) {
                        self.handle_action(action);
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SetView(v) => self.state.view = v,
            Action::NextView => self.state.view = cycle(self.state.view, 1),
            Action::PrevView => self.state.view = cycle(self.state.view, -1),
            Action::InputChar(ch) => {
                if self.state.input.len() < MAX_LOCATION_LEN {
                    self.state.input.push(ch);
                }
            }
            Action::InputBackspace => {
                self.state.input.pop();
            }
            Action::Submit => {
                if let Some(location) = self.state.begin_submit() {
                    spawn_fetch(
                        self.client.clone(),
                        location,
                        FetchOrigin::Manual,
                        self.counter.next(),
                        self.tx.clone(),
                    );
                }
            }
            Action::Refresh => {
                if let Some(location) = self.state.begin_refresh() {
                    spawn_fetch(
                        self.client.clone(),
                        location,
                        FetchOrigin::Manual,
                        self.counter.next(),
                        self.tx.clone(),
                    );
                }
            }
            Action::StopPolling => {
                if self.poller.is_armed() {
                    self.poller.disarm();
                    self.state.stop_polling();
                    info!("background polling stopped");
                }
            }
            Action::ExportReport => self.export_report(),
            Action::ClearMessage => {
                self.state.error = None;
                self.state.notice = None;
            }
        }
    }

    fn export_report(&mut self) {
        let Some(record) = self.state.record.as_ref() else {
            self.state.error = Some("No prediction to report yet".to_string());
            return;
        };
        let Some(location) = self.state.target.clone() else {
            self.state.error = Some("No prediction to report yet".to_string());
            return;
        };
        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match report::save_report(&dir, record, &location, Local::now()) {
            Ok(path) => {
                self.state.notice = Some(format!("Report saved to {}", path.display()));
                self.state.error = None;
            }
            Err(err) => {
                self.state.error = Some(err.to_string());
            }
        }
    }
}

fn cycle(view: View, delta: i32) -> View {
    let views = View::all();
    let i = views.iter().position(|v| *v == view).unwrap_or(0) as i32;
    let n = views.len() as i32;
    views[(((i + delta) % n + n) % n) as usize]
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode()?;
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, cursor::Hide)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(term: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut out = io::stdout();
    execute!(out, cursor::Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    term.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, BACKEND_UNAVAILABLE};

    fn record() -> PredictionRecord {
        PredictionRecord {
            predicted_load: Some(120.0),
            predicted_solar: Some(80.0),
            predicted_wind: Some(48.0),
            solar_used: Some(80.0),
            wind_used: Some(40.0),
            grid_import: Some(0.0),
            grid_export: Some(8.0),
            ..PredictionRecord::default()
        }
    }

    fn outcome(
        seq: u64,
        origin: FetchOrigin,
        result: Result<PredictionRecord, ApiError>,
    ) -> FetchOutcome {
        FetchOutcome {
            seq,
            origin,
            location: "Kishtwar".to_string(),
            result,
            at: Local::now(),
        }
    }

    #[test]
    fn whitespace_only_submit_is_rejected_without_a_request() {
        let mut state = AppState::new(false);
        state.input = "   ".to_string();
        assert_eq!(state.begin_submit(), None);
        assert_eq!(state.error.as_deref(), Some(VALIDATION_EMPTY));
        assert!(!state.busy);
    }

    #[test]
    fn submit_trims_and_flips_the_busy_flag() {
        let mut state = AppState::new(false);
        state.input = "  Kishtwar  ".to_string();
        assert_eq!(state.begin_submit(), Some("Kishtwar".to_string()));
        assert!(state.busy);
        // A second submit while in flight is ignored.
        assert_eq!(state.begin_submit(), None);
    }

    #[test]
    fn manual_success_navigates_and_restarts_the_series() {
        let mut state = AppState::new(false);
        state.input = "Kishtwar".to_string();
        state.begin_submit().unwrap();

        let arm = state.apply_outcome(outcome(1, FetchOrigin::Manual, Ok(record())));
        assert_eq!(arm, Some("Kishtwar".to_string()));
        assert_eq!(state.view, View::Predictions);
        assert!(!state.busy);
        assert!(state.polling);
        assert_eq!(state.target.as_deref(), Some("Kishtwar"));

        let samples = state.history.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].demand, Some(120.0));
        assert_eq!(samples[0].solar, Some(80.0));
        assert_eq!(samples[0].wind, Some(48.0));
    }

    #[test]
    fn manual_failure_clears_the_record_and_surfaces_the_error() {
        let mut state = AppState::new(false);
        state.record = Some(record());
        state.busy = true;

        let arm = state.apply_outcome(outcome(
            1,
            FetchOrigin::Manual,
            Err(ApiError::Server("City not found".to_string())),
        ));
        assert_eq!(arm, None);
        assert!(!state.busy);
        assert_eq!(state.record, None);
        assert_eq!(state.error.as_deref(), Some("City not found"));
    }

    #[test]
    fn manual_failure_surfaces_the_fixed_unreachable_text() {
        let mut state = AppState::new(false);
        state.busy = true;
        state.apply_outcome(outcome(1, FetchOrigin::Manual, Err(ApiError::Unreachable)));
        assert_eq!(state.error.as_deref(), Some(BACKEND_UNAVAILABLE));
    }

    #[test]
    fn poll_success_appends_without_navigating() {
        let mut state = AppState::new(false);
        state.input = "Kishtwar".to_string();
        state.begin_submit().unwrap();
        state.apply_outcome(outcome(1, FetchOrigin::Manual, Ok(record())));
        state.view = View::Statistics;

        state.apply_outcome(outcome(2, FetchOrigin::Poll, Ok(record())));
        assert_eq!(state.view, View::Statistics);
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn poll_failure_keeps_the_previous_record_quietly() {
        let mut state = AppState::new(false);
        state.record = Some(record());

        state.apply_outcome(outcome(
            1,
            FetchOrigin::Poll,
            Err(ApiError::Server("flaky".to_string())),
        ));
        assert!(state.record.is_some());
        assert_eq!(state.error, None);
    }

    #[test]
    fn stale_responses_are_discarded_but_still_release_busy() {
        let mut state = AppState::new(false);
        state.apply_outcome(outcome(5, FetchOrigin::Poll, Ok(record())));
        assert_eq!(state.history.len(), 1);

        // An older in-flight manual response lands afterwards.
        state.busy = true;
        let mut old = record();
        old.predicted_load = Some(1.0);
        let arm = state.apply_outcome(outcome(3, FetchOrigin::Manual, Ok(old)));
        assert_eq!(arm, None);
        assert!(!state.busy);
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            state.record.as_ref().and_then(|r| r.predicted_load),
            Some(120.0)
        );
    }

    #[test]
    fn refresh_reuses_the_target_location() {
        let mut state = AppState::new(false);
        assert_eq!(state.begin_refresh(), None);
        state.target = Some("Kishtwar".to_string());
        assert_eq!(state.begin_refresh(), Some("Kishtwar".to_string()));
        assert!(state.busy);
    }

    #[test]
    fn view_cycling_wraps_both_ways() {
        assert_eq!(cycle(View::Input, 1), View::Predictions);
        assert_eq!(cycle(View::Statistics, 1), View::Input);
        assert_eq!(cycle(View::Input, -1), View::Statistics);
    }
}
