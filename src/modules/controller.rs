use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::errors::{CustomResult, Error};
use crate::modules::clock_alerts::{AlertCue, AlertSchedule, AlertSink, LogAlertSink, Ticker};
use crate::modules::helpers::config::Settings;
use crate::modules::helpers::tiles::{TileAccounting, TileInputMode, TileWarning};
use crate::modules::helpers::time_format::TimeFormat;
use crate::modules::models::log::{ActionContext, Advisory, LogAction};
use crate::modules::models::roster::Roster;
use crate::modules::models::run::{Competition, EvacuationPoint, Referee, ReviewField, ReviewValue, Run};
use crate::modules::models::submission::{
    HistorySummary, LastSubmitStatus, RunHistory, ScoreExport, SubmissionGate, SubmissionRecord, SubmitStatus,
};
use crate::modules::models::time::{SystemTimeSource, TimeSource};
use crate::modules::store::{get_json, set_json, FileStore, Store, LS_CURRENT_SCREEN, LS_DATA, LS_RUN_HISTORY};
use crate::modules::submission_manager::{PendingSubmission, RetryReport, SubmissionManager};
use crate::modules::submit_api::{check_login, HttpTransport, Transport};

const VIDEO_VICTIMS_ROUND: &str = "Video Victims";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubmitConfig {
    pub host: String,
    pub path: String,
}

impl SubmitConfig {
    pub fn url(&self) -> String {
        format!("{}{}", self.host, self.path)
    }
}

/// The application data blob.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppData {
    pub referee: Referee,
    pub submit_config: SubmitConfig,
    pub last_submit_status: LastSubmitStatus,
    pub competition: Competition,
    pub event: String,
    pub arena: String,
    pub round: String,
    pub current_run: Option<Run>,
}

impl Default for AppData {
    fn default() -> Self {
        AppData::seeded(&Settings::default())
    }
}

impl AppData {
    pub fn seeded(settings: &Settings) -> AppData {
        AppData {
            referee: Referee::default(),
            submit_config: SubmitConfig {
                host: settings.submit_host.clone(),
                path: settings.submit_path.clone(),
            },
            last_submit_status: LastSubmitStatus::default(),
            competition: Competition::Line,
            event: settings.event.clone(),
            arena: String::new(),
            round: String::new(),
            current_run: None,
        }
    }
}

/// The screens of the referee flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Setup = 1,
    TeamSelection = 2,
    PreRun = 3,
    Scoring = 4,
    Tiles = 5,
    Review = 6,
    SubmitResult = 7,
    Settings = 8,
}

impl Screen {
    pub fn from_number(number: u8) -> Option<Screen> {
        match number {
            1 => Some(Screen::Setup),
            2 => Some(Screen::TeamSelection),
            3 => Some(Screen::PreRun),
            4 => Some(Screen::Scoring),
            5 => Some(Screen::Tiles),
            6 => Some(Screen::Review),
            7 => Some(Screen::SubmitResult),
            8 => Some(Screen::Settings),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn requires_run(&self) -> bool {
        matches!(self, Screen::PreRun | Screen::Scoring | Screen::Tiles | Screen::Review)
    }
}

/// Clock readout produced by a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickUpdate {
    pub elapsed: f64,
    pub time: String,
    pub remaining: String,
    pub cues: Vec<AlertCue>,
}

/// Owner of the application data, the run history and every collaborator.
///
/// Every mutation is flushed to the store before the call returns.
pub struct RefereeController {
    settings: Settings,
    data: AppData,
    history: RunHistory,
    screen: Screen,
    store: Box<dyn Store>,
    clock: Box<dyn TimeSource>,
    roster: Roster,
    submissions: SubmissionManager,
    alerts: AlertSchedule,
    alert_sink: Arc<dyn AlertSink>,
    ticker: Ticker,
    tick_sender: UnboundedSender<()>,
    tick_receiver: Option<UnboundedReceiver<()>>,
    tile_mode: TileInputMode,
}

impl RefereeController {
    /// # open the controller
    /// load the persisted state, seeding the application data from the
    /// settings when nothing was stored yet
    ///
    /// ## Arguments
    /// * `settings` - The configured defaults
    /// * `store` - The persistence backend
    /// * `transport` - The network backend
    /// * `clock` - The wall clock
    /// * `roster` - The competition roster
    pub fn open(
        settings: Settings,
        store: Box<dyn Store>,
        transport: Arc<dyn Transport>,
        clock: Box<dyn TimeSource>,
        roster: Roster,
    ) -> CustomResult<RefereeController> {
        let data = match get_json::<AppData>(store.as_ref(), LS_DATA)? {
            Some(data) => data,
            None => {
                info!(target: "controller:open", "no application data stored, seeding from settings");
                AppData::seeded(&settings)
            }
        };
        let history = get_json::<RunHistory>(store.as_ref(), LS_RUN_HISTORY)?.unwrap_or_default();
        let stored_screen = get_json::<u8>(store.as_ref(), LS_CURRENT_SCREEN)?;

        let (tick_sender, tick_receiver) = mpsc::unbounded_channel();
        let mut controller = RefereeController {
            settings,
            data,
            history,
            screen: Screen::Setup,
            store,
            clock,
            roster,
            submissions: SubmissionManager::new(transport),
            alerts: AlertSchedule::default(),
            alert_sink: Arc::new(LogAlertSink {}),
            ticker: Ticker::default(),
            tick_sender,
            tick_receiver: Some(tick_receiver),
            tile_mode: TileInputMode::TileIds,
        };

        let mut screen = stored_screen.and_then(Screen::from_number).unwrap_or(Screen::Setup);
        if screen.requires_run() && controller.data.current_run.is_none() {
            debug!(target: "controller:open", "screen {} needs a run, falling back", screen.number());
            screen = Screen::Setup;
        }
        controller.screen = screen;

        // a run stored with its clock running keeps ticking after the restart
        if controller.current_run().map_or(false, |run| run.time.is_running()) {
            info!(target: "controller:open", "clock of the stored run is running, resuming ticks");
            controller.ticker.start(controller.tick_sender.clone());
        }

        controller.flush_data()?;
        controller.flush_screen()?;
        info!(
            target: "controller:open",
            "opened with {} runs in history, screen {}",
            controller.history.len(),
            controller.screen.number()
        );
        Ok(controller)
    }

    /// # open from settings
    /// file store in the data dir, http transport and the system clock.
    /// a missing roster file leaves the roster empty
    pub fn from_settings(settings: Settings) -> CustomResult<RefereeController> {
        let store = FileStore::open(&settings.data_dir)?;
        let transport = HttpTransport::new(settings.submit_timeout)?;
        let roster = match Roster::from_file(&settings.competitions_file) {
            Ok(roster) => roster,
            Err(error) => {
                warn!(target: "controller:from_settings", "continuing without roster: {}", error);
                Roster::default()
            }
        };

        RefereeController::open(
            settings,
            Box::new(store),
            Arc::new(transport),
            Box::new(SystemTimeSource {}),
            roster,
        )
    }

    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> RefereeController {
        self.alert_sink = sink;
        self
    }

    /************ STATE ACCESS ************/

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    pub fn current_run(&self) -> Option<&Run> {
        self.data.current_run.as_ref()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn alerts(&self) -> &AlertSchedule {
        &self.alerts
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_active()
    }

    /// the receiving end of the clock ticks, `on_tick` should be called for each
    pub fn take_tick_receiver(&mut self) -> Option<UnboundedReceiver<()>> {
        self.tick_receiver.take()
    }

    fn run_ref(&self) -> CustomResult<&Run> {
        self.data.current_run.as_ref().ok_or(Error::NoActiveRunError)
    }

    fn run_mut(&mut self) -> CustomResult<&mut Run> {
        self.data.current_run.as_mut().ok_or(Error::NoActiveRunError)
    }

    /************ PERSISTENCE ************/

    fn flush_data(&mut self) -> CustomResult<()> {
        set_json(self.store.as_mut(), LS_DATA, &self.data)
    }

    fn flush_history(&mut self) -> CustomResult<()> {
        set_json(self.store.as_mut(), LS_RUN_HISTORY, &self.history)
    }

    fn flush_screen(&mut self) -> CustomResult<()> {
        set_json(self.store.as_mut(), LS_CURRENT_SCREEN, &self.screen.number())
    }

    /************ SETTINGS ************/

    pub fn set_referee(&mut self, name: &str, auth: &str) -> CustomResult<()> {
        self.data.referee = Referee {
            name: name.to_string(),
            auth: auth.to_string(),
        };
        if let Some(run) = self.data.current_run.as_mut() {
            run.referee = self.data.referee.clone();
        }
        self.flush_data()
    }

    /// # set credentials from a token
    ///
    /// ## Arguments
    /// * `token` - base64 of `name:password`
    pub fn set_credentials_token(&mut self, token: &str) -> CustomResult<()> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(token.trim())
            .map_err(|_| Error::InvalidCredentialsError)?;
        let decoded = String::from_utf8(decoded).map_err(|_| Error::InvalidCredentialsError)?;
        let (name, auth) = decoded.split_once(':').ok_or(Error::InvalidCredentialsError)?;
        info!(target: "controller:set_credentials_token", "credentials for {} loaded from token", name);
        self.set_referee(name, auth)
    }

    /// # select the competition
    /// switching to another competition discards the current run
    pub fn select_competition(&mut self, competition: Competition) -> CustomResult<()> {
        if self.data.competition != competition && self.data.current_run.is_some() {
            info!(target: "controller:select_competition", "competition changed, discarding current run");
            self.ticker.cancel();
            self.data.current_run = None;
        }
        self.data.competition = competition;
        self.flush_data()
    }

    pub fn select_arena(&mut self, arena: &str) -> CustomResult<()> {
        self.data.arena = arena.to_string();
        if let Some(run) = self.data.current_run.as_mut() {
            run.arena = arena.to_string();
        }
        self.flush_data()
    }

    pub fn select_round(&mut self, round: &str) -> CustomResult<()> {
        self.data.round = round.to_string();
        if let Some(run) = self.data.current_run.as_mut() {
            run.round = round.to_string();
        }
        self.flush_data()
    }

    pub fn set_event(&mut self, event: &str) -> CustomResult<()> {
        self.data.event = event.to_string();
        self.flush_data()
    }

    pub fn set_submit_host(&mut self, host: &str) -> CustomResult<()> {
        self.data.submit_config.host = host.to_string();
        self.flush_data()
    }

    pub fn set_submit_path(&mut self, path: &str) -> CustomResult<()> {
        self.data.submit_config.path = path.to_string();
        self.flush_data()
    }

    /// event, host and path back to the configured defaults
    pub fn reset_settings(&mut self) -> CustomResult<()> {
        self.data.event = self.settings.event.clone();
        self.data.submit_config = SubmitConfig {
            host: self.settings.submit_host.clone(),
            path: self.settings.submit_path.clone(),
        };
        info!(target: "controller:reset_settings", "settings reset to defaults");
        self.flush_data()
    }

    pub async fn check_login(&self) -> bool {
        check_login(self.submissions.transport(), &self.data.submit_config.host, &self.data.referee).await
    }

    /************ RUN SETUP ************/

    fn validate_run(&self, run: &Run) -> CustomResult<()> {
        let refuse = |reason: &str| {
            warn!(target: "controller:create_run", "refused run: {}", reason);
            Err(Error::InvalidRunSetupError {
                reason: reason.to_string(),
            })
        };

        if run.referee.name.is_empty() {
            return refuse("referee name is missing");
        }
        if !self.roster.has_arena(run.competition, &run.arena) {
            return refuse("unknown arena");
        }
        if !self.roster.has_round(run.competition, &run.round) {
            return refuse("unknown round");
        }
        if self.roster.has_team(run.competition, &run.teamname) != Some(true) {
            return refuse("unknown team");
        }
        match (run.evacuation_point, run.competition) {
            (EvacuationPoint::Low, _) | (EvacuationPoint::High, Competition::Line) => Ok(()),
            _ => refuse("invalid evacuation point"),
        }
    }

    /// # create a run
    /// start a fresh run for a team with the selected competition, arena and
    /// round. the clock and the alerts start from zero
    ///
    /// ## Arguments
    /// * `teamname` - The team, must be on the roster
    /// * `evacuation_point` - low, or high for line only
    pub fn create_run(&mut self, teamname: &str, evacuation_point: EvacuationPoint) -> CustomResult<()> {
        let run = Run::new(
            self.data.referee.clone(),
            self.data.competition,
            &self.data.arena,
            &self.data.round,
            teamname,
            evacuation_point,
        );
        self.validate_run(&run)?;

        self.ticker.cancel();
        self.alerts.reset();
        info!(
            target: "controller:create_run",
            "new {} run for {} in {} / {}",
            run.competition,
            run.teamname,
            run.arena,
            run.round
        );
        self.data.current_run = Some(run);
        self.flush_data()
    }

    pub fn discard_run(&mut self) -> CustomResult<()> {
        self.ticker.cancel();
        self.data.current_run = None;
        self.flush_data()
    }

    pub fn set_evacuation_point(&mut self, evacuation_point: EvacuationPoint) -> CustomResult<()> {
        let run = self.run_mut()?;
        match (evacuation_point, run.competition) {
            (EvacuationPoint::Low, _) | (EvacuationPoint::High, Competition::Line) => {
                run.evacuation_point = evacuation_point;
            }
            _ => {
                return Err(Error::InvalidRunSetupError {
                    reason: "invalid evacuation point".to_string(),
                })
            }
        }
        self.flush_data()
    }

    pub fn set_team_started(&mut self, team_started: bool) -> CustomResult<()> {
        self.run_mut()?.team_started = team_started;
        self.flush_data()
    }

    /************ SCREENS ************/

    /// # show a screen
    /// screens that need a run fall back to the setup screen without one.
    /// the pre-run screen applies the round rules, the review screen
    /// finalizes the time
    ///
    /// ## Returns
    /// * `Screen` - The screen that is shown
    pub fn show_screen(&mut self, screen: Screen) -> CustomResult<Screen> {
        let screen = if screen.requires_run() && self.data.current_run.is_none() {
            Screen::Setup
        } else {
            screen
        };

        let now = self.clock.now();
        match screen {
            Screen::PreRun => {
                let run = self.run_mut()?;
                if run.round.contains(VIDEO_VICTIMS_ROUND) {
                    run.sections.current_mut().is_after_last_checkpoint = true;
                }
            }
            Screen::Review => {
                self.run_mut()?.finalize_time_for_review(now);
                self.ticker.cancel();
            }
            _ => {}
        }

        self.screen = screen;
        self.flush_screen()?;
        self.flush_data()?;
        Ok(screen)
    }

    /************ CLOCK ************/

    /// # start or pause the clock
    ///
    /// ## Returns
    /// * `bool` - true if the clock is running afterwards
    pub fn toggle_time(&mut self) -> CustomResult<bool> {
        if self.run_ref()?.time.is_running() {
            self.pause_time()?;
            Ok(false)
        } else {
            self.start_time()?;
            Ok(true)
        }
    }

    pub fn start_time(&mut self) -> CustomResult<bool> {
        let now = self.clock.now();
        let started = self.run_mut()?.time.start(now);
        if started {
            self.ticker.start(self.tick_sender.clone());
            self.flush_data()?;
        }
        Ok(started)
    }

    pub fn pause_time(&mut self) -> CustomResult<bool> {
        let now = self.clock.now();
        let paused = self.run_mut()?.time.pause(now);
        if paused {
            self.ticker.cancel();
            self.flush_data()?;
        }
        Ok(paused)
    }

    /// # reset the time
    /// on the review screen the edited or cut time is restored, everywhere
    /// else the clock and the alerts are reset to zero
    pub fn reset_time(&mut self) -> CustomResult<()> {
        if self.screen == Screen::Review {
            if !self.run_mut()?.restore_original_time() {
                debug!(target: "controller:reset_time", "no original time to restore");
            }
        } else {
            self.run_ref()?;
            self.ticker.cancel();
            self.alerts.reset();
            if let Some(run) = self.data.current_run.as_mut() {
                run.time.reset();
            }
        }
        self.flush_data()
    }

    pub fn set_time(&mut self, seconds: f64) -> CustomResult<()> {
        let now = self.clock.now();
        self.run_mut()?.set_time(seconds, now);
        self.flush_data()
    }

    pub fn elapsed(&self) -> f64 {
        let now = self.clock.now();
        self.current_run().map_or(0.0, |run| run.time.elapsed(now))
    }

    pub fn time_display(&self) -> String {
        TimeFormat::seconds_as_time_string(self.elapsed())
    }

    pub fn remaining_time_display(&self) -> String {
        let max_time = self.current_run().map_or(0.0, |run| run.max_time());
        TimeFormat::remaining_time_string(max_time, self.elapsed())
    }

    /// # handle a clock tick
    /// refresh the readout and play the alerts that became due
    ///
    /// ## Returns
    /// * `Option<TickUpdate>` - none while no run is timed
    pub fn on_tick(&mut self) -> Option<TickUpdate> {
        let now = self.clock.now();
        let run = self.data.current_run.as_ref()?;
        if !run.time.is_running() {
            return None;
        }

        let elapsed = run.time.elapsed(now);
        let max_time = run.max_time();
        let cues = self.alerts.due(elapsed, max_time);
        for cue in &cues {
            self.dispatch_cue(*cue);
        }

        Some(TickUpdate {
            elapsed,
            time: TimeFormat::seconds_as_time_string(elapsed),
            remaining: TimeFormat::remaining_time_string(max_time, elapsed),
            cues,
        })
    }

    fn dispatch_cue(&self, cue: AlertCue) {
        let sink = Arc::clone(&self.alert_sink);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { sink.cue(cue) });
            }
            Err(_) => sink.cue(cue),
        }
    }

    /************ SCORING ACTIONS ************/

    /// # perform a scoring action
    /// apply and log the action. refused actions change nothing
    ///
    /// ## Returns
    /// * `Vec<Advisory>` - Warnings about the clock, the action was performed anyway
    pub fn perform(&mut self, action: LogAction) -> CustomResult<Vec<Advisory>> {
        let now = self.clock.now();
        let run = self.run_mut()?;
        let ctx = ActionContext {
            elapsed: run.time.elapsed(now),
            running: run.time.is_running(),
            max_time: run.max_time(),
        };

        let advisories = match run.event_log.perform(&mut run.sections, action, ctx) {
            Ok(advisories) => advisories,
            Err(error) => {
                warn!(target: "controller:perform", "refused {}: {}", action, error);
                return Err(error);
            }
        };
        self.flush_data()?;
        Ok(advisories)
    }

    pub fn undo(&mut self) -> CustomResult<LogAction> {
        let now = self.clock.now();
        let run = self.run_mut()?;
        let elapsed = run.time.elapsed(now);
        let action = run.event_log.undo(&mut run.sections, elapsed)?;
        self.flush_data()?;
        Ok(action)
    }

    pub fn is_undo_possible(&self) -> bool {
        self.current_run().map_or(false, |run| run.event_log.is_undo_possible())
    }

    /************ TILES ************/

    pub fn tile_mode(&self) -> TileInputMode {
        self.tile_mode
    }

    pub fn set_tile_mode(&mut self, mode: TileInputMode) {
        self.tile_mode = mode;
    }

    pub fn tile_inputs(&self) -> CustomResult<Vec<(u32, i64)>> {
        Ok(TileAccounting::input_values(&self.run_ref()?.sections, self.tile_mode))
    }

    /// # enter the tiles
    ///
    /// ## Arguments
    /// * `values` - One value per section outside the evacuation zone
    ///
    /// ## Returns
    /// * `Vec<TileWarning>` - Sections that got no tiles, the values are stored anyway
    pub fn apply_tiles(&mut self, values: &[i64]) -> CustomResult<Vec<TileWarning>> {
        let mode = self.tile_mode;
        let warnings = TileAccounting::apply(&mut self.run_mut()?.sections, mode, values)?;
        for warning in &warnings {
            warn!(target: "controller:apply_tiles", "{}", warning);
        }
        self.flush_data()?;
        Ok(warnings)
    }

    /************ REVIEW ************/

    pub fn review_values(&self) -> CustomResult<Vec<ReviewValue>> {
        Ok(self.run_ref()?.review_values())
    }

    pub fn edit_section_value(&mut self, section_id: u32, field: ReviewField, input: i64) -> CustomResult<()> {
        self.run_mut()?.edit_section_value(section_id, field, input)?;
        self.flush_data()
    }

    pub fn edit_teamname(&mut self, teamname: &str) -> CustomResult<()> {
        self.run_mut()?.edit_teamname(teamname);
        self.flush_data()
    }

    pub fn set_victims(&mut self, dead_before: i64, living: i64, dead_after: i64) -> CustomResult<()> {
        self.run_mut()?.set_victims(dead_before, living, dead_after)?;
        self.flush_data()
    }

    pub fn set_left_evacuation_zone(&mut self, left: bool) -> CustomResult<()> {
        self.run_mut()?.left_evacuation_zone = left;
        self.flush_data()
    }

    pub fn set_comments(&mut self, comments: &str) -> CustomResult<()> {
        self.run_mut()?.comments = comments.to_string();
        self.flush_data()
    }

    pub fn set_complaints(&mut self, complaints: &str) -> CustomResult<()> {
        self.run_mut()?.set_complaints(complaints);
        self.flush_data()
    }

    pub fn set_confirmed(&mut self, confirmed: bool) -> CustomResult<()> {
        let result = self.run_mut()?.set_confirmed(confirmed);
        self.flush_data()?;
        result
    }

    pub fn summary_of_changes(&self) -> CustomResult<Vec<String>> {
        let run = self.run_ref()?;
        let team_exists = self.roster.has_team(run.competition, &run.teamname);
        Ok(run.summary_of_changes(team_exists, self.clock.now()))
    }

    pub fn can_submit(&self) -> bool {
        self.current_run().map_or(false, SubmissionGate::can_submit)
    }

    /************ SUBMISSION ************/

    /// # submit the current run
    /// the record is stored in the run history and the run is cleared before
    /// the request is sent. the returned attempt is recorded by handing it to
    /// `complete_submission`
    pub fn submit(&mut self) -> CustomResult<PendingSubmission> {
        let run = self.run_ref()?;
        if !SubmissionGate::can_submit(run) {
            warn!(target: "controller:submit", "run of {} is not ready for submission", run.teamname);
            return Err(Error::NotReadyForSubmissionError);
        }

        let mut record = SubmissionRecord::build(run, &self.data.event);
        let run_id = record.identifier();
        self.history.insert(run_id.clone(), record.clone());
        self.flush_history()?;

        self.ticker.cancel();
        self.data.current_run = None;
        self.flush_data()?;

        info!(target: "controller:submit", "submitting run {}", run_id);
        let url = self.data.submit_config.url();
        Ok(self.submissions.dispatch(&url, &run_id, record))
    }

    /// # complete an attempt
    /// wait for the attempt and record its outcome in the history and the
    /// last submit status. the attempt is consumed, so it is recorded once
    pub async fn complete_submission(&mut self, pending: PendingSubmission) -> CustomResult<SubmitStatus> {
        let outcome = pending.outcome().await;
        let status = outcome.status();
        let now = self.clock.now();
        SubmissionManager::apply(&mut self.history, &mut self.data.last_submit_status, outcome, now);
        self.flush_data()?;
        self.flush_history()?;
        Ok(status)
    }

    /// # submit and wait for the result
    /// shows the submit result screen once the attempt finished
    pub async fn submit_and_wait(&mut self) -> CustomResult<SubmitStatus> {
        let pending = self.submit()?;
        let status = self.complete_submission(pending).await?;
        self.screen = Screen::SubmitResult;
        self.flush_screen()?;
        Ok(status)
    }

    /// # retry all failed runs
    /// resubmit every history entry without a successful attempt with the
    /// current credentials. each retry adds one attempt to its entry
    pub async fn retry_all_failed(&mut self) -> CustomResult<RetryReport> {
        let failed = SubmissionManager::failed_ids(&self.history);
        if failed.is_empty() {
            info!(target: "controller:retry_all_failed", "no failed runs to retry");
            return Ok(RetryReport::default());
        }

        let mut records = Vec::new();
        for run_id in failed {
            if let Some(record) = self.history.get_mut(&run_id) {
                record.referee = self.data.referee.clone();
                records.push((run_id, record.clone()));
            }
        }
        self.flush_history()?;

        info!(target: "controller:retry_all_failed", "retrying {} runs", records.len());
        let url = self.data.submit_config.url();
        let outcomes = self.submissions.dispatch_all(&url, records).await;

        let mut report = RetryReport {
            attempted: outcomes.len(),
            ..RetryReport::default()
        };
        let now = self.clock.now();
        for outcome in outcomes {
            match outcome.status() {
                SubmitStatus::Successful => report.successful += 1,
                SubmitStatus::Failed => report.failed += 1,
            }
            SubmissionManager::apply(&mut self.history, &mut self.data.last_submit_status, outcome, now);
        }
        self.flush_data()?;
        self.flush_history()?;
        Ok(report)
    }

    /************ RUN HISTORY ************/

    pub fn history_summaries(&self) -> Vec<HistorySummary> {
        self.history.values().map(SubmissionRecord::summary).collect()
    }

    pub fn score_export(&self) -> BTreeMap<String, ScoreExport> {
        self.history
            .iter()
            .map(|(id, record)| (id.clone(), record.score_export()))
            .collect()
    }

    pub fn history_record(&self, run_id: &str) -> CustomResult<&SubmissionRecord> {
        self.history.get(run_id).ok_or_else(|| Error::UnknownRunError {
            id: run_id.to_string(),
        })
    }

    /// # purge the run history
    /// a backup copy is written under `rcj-runHistory-bak-<ms>` first
    ///
    /// ## Arguments
    /// * `confirmed` - The user confirmed the deletion
    ///
    /// ## Returns
    /// * `Option<String>` - The backup key, none if the history was already empty
    pub fn purge_history(&mut self, confirmed: bool) -> CustomResult<Option<String>> {
        if self.history.is_empty() {
            return Ok(None);
        }
        if !confirmed {
            return Err(Error::PurgeNotConfirmedError);
        }

        let backup_key = format!("{}-bak-{}", LS_RUN_HISTORY, (self.clock.now() * 1000.0).round() as i64);
        set_json(self.store.as_mut(), &backup_key, &self.history)?;
        info!(target: "controller:purge_history", "backed up {} runs to {}", self.history.len(), backup_key);

        self.history.clear();
        self.flush_history()?;
        Ok(Some(backup_key))
    }
}
