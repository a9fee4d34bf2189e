pub mod app_dirs;
pub mod config;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod stats;
pub mod store;
pub mod time_series;
pub mod ui;
pub mod util;

use crate::config::{Config, ConfigStore, FileConfigStore};
use crate::runtime::{AppEvent, CrosstermInput, EventPump};
use crate::session::{DraftField, PracticeSession, PracticeTimer, SessionDraft};
use crate::settings::{SettingsCache, SettingsKey};
use crate::stats::{type_shares, PeriodStats, TodayStats, TypeShare};
use crate::store::Db;
use crate::time_series::{trend_points, TrendPoint};
use chrono::{DateTime, Local};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    collections::HashSet,
    error::Error,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::Duration,
};

const TICK_RATE_MS: u64 = 250;

/// History filter windows cycled by the (d) key; None is all history.
const DAY_FILTERS: [Option<u32>; 5] = [Some(7), Some(30), Some(90), Some(365), None];

/// Stats periods cycled by the (d) key.
const STAT_PERIODS: [u32; 4] = [7, 30, 90, 365];

/// terminal practice tracker with a session timer, history, and progress charts
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal practice tracker: time practice sessions with pause tracking, browse and edit the session history, follow progress with streaks and charts, and keep the option lists that describe what you practice."
)]
pub struct Cli {
    /// database file to use instead of the default state directory
    #[clap(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// copy the database into DIR as a timestamped backup, then exit
    #[clap(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// replace the database with FILE after backing the current data up, then exit
    #[clap(long, value_name = "FILE")]
    pub import: Option<PathBuf>,

    /// write the full session history as CSV to FILE, then exit
    #[clap(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Page {
    Timer,
    History,
    Stats,
    Settings,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Timer, Page::History, Page::Stats, Page::Settings];

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn next(&self) -> Page {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub error: bool,
}

#[derive(Debug, Clone)]
pub struct TextPrompt {
    pub title: String,
    pub buffer: String,
    pub purpose: PromptPurpose,
}

#[derive(Debug, Clone)]
pub enum PromptPurpose {
    AddEntry(SettingsKey),
    RenameEntry(SettingsKey, usize),
    ExportDir,
    ImportPath,
    CsvPath,
}

#[derive(Debug, Clone)]
pub struct Confirm {
    pub message: String,
    pub action: ConfirmAction,
}

#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteSessions(Vec<i64>),
    DeleteEntry(SettingsKey, usize),
    ImportDb(PathBuf),
}

/// Add/edit dialog on the history page.
#[derive(Debug, Clone)]
pub struct RecordDialog {
    pub draft: SessionDraft,
    pub editing_id: Option<i64>,
    pub focus: usize,
    pub editing: bool,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub rows: Vec<PracticeSession>,
    pub selected: usize,
    pub marked: HashSet<i64>,
    pub days: Option<u32>,
    pub collection_idx: usize,
    pub dialog: Option<RecordDialog>,
}

#[derive(Debug)]
pub struct StatsState {
    pub days: u32,
    pub today: TodayStats,
    pub period: PeriodStats,
    pub trend: Vec<TrendPoint>,
    pub shares: Vec<TypeShare>,
}

impl Default for StatsState {
    fn default() -> Self {
        Self {
            days: 30,
            today: TodayStats::default(),
            period: PeriodStats::default(),
            trend: Vec::new(),
            shares: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub db: Db,
    pub settings: SettingsCache,
    pub config: Config,
    pub page: Page,

    // timer page
    pub timer: PracticeTimer,
    pub draft: SessionDraft,
    pub timer_focus: usize,
    pub editing: bool,
    pub today: TodayStats,
    pub last_practiced: Option<DateTime<Local>>,

    // history page
    pub history: HistoryState,

    // stats page
    pub stats_view: StatsState,

    // settings page cursor
    pub settings_list: usize,
    pub settings_entry: usize,

    // shared chrome
    pub status: Option<StatusLine>,
    pub prompt: Option<TextPrompt>,
    pub confirm: Option<Confirm>,
}

impl App {
    pub fn new(db: Db, config: Config) -> Result<Self, Box<dyn Error>> {
        let settings = SettingsCache::load(&db)?;
        let mut draft = SessionDraft::default();
        if let Some(first) = settings.list(SettingsKey::PracticeTypes).first() {
            draft.practice_type = first.clone();
        }
        let today = db.today_stats()?;
        let last_practiced = db.last_session_end()?;

        Ok(Self {
            history: HistoryState {
                days: config.history_days,
                ..HistoryState::default()
            },
            stats_view: StatsState {
                days: config.stats_days,
                ..StatsState::default()
            },
            db,
            settings,
            config,
            page: Page::Timer,
            timer: PracticeTimer::new(),
            draft,
            timer_focus: 0,
            editing: false,
            today,
            last_practiced,
            settings_list: 0,
            settings_entry: 0,
            status: None,
            prompt: None,
            confirm: None,
        })
    }

    pub fn info(&mut self, text: String) {
        self.status = Some(StatusLine { text, error: false });
    }

    pub fn error(&mut self, text: String) {
        self.status = Some(StatusLine { text, error: true });
    }

    /// Switch pages, dropping any in-flight timer session and reloading the
    /// data backing the destination page.
    pub fn show_page(&mut self, page: Page) {
        if self.page == Page::Timer && page != Page::Timer && !self.timer.is_idle() {
            self.timer.discard();
            self.info("Unsaved session discarded".to_string());
        }
        self.editing = false;
        self.page = page;
        match page {
            Page::Timer => {
                self.refresh_today();
                self.refresh_last_practiced();
            }
            Page::History => self.refresh_history(),
            Page::Stats => self.refresh_stats(),
            Page::Settings => {
                if let Err(e) = self.settings.refresh(&self.db) {
                    self.error(e.to_string());
                }
                self.clamp_settings_cursor();
            }
        }
    }

    fn refresh_today(&mut self) {
        match self.db.today_stats() {
            Ok(today) => self.today = today,
            Err(e) => self.error(format!("Database error: {}", e)),
        }
    }

    fn refresh_last_practiced(&mut self) {
        match self.db.last_session_end() {
            Ok(end) => self.last_practiced = end,
            Err(e) => self.error(format!("Database error: {}", e)),
        }
    }

    fn refresh_history(&mut self) {
        let collection = self.collection_filter().map(str::to_string);
        match self.db.sessions(self.history.days, collection.as_deref()) {
            Ok(rows) => {
                self.history.rows = rows;
                if self.history.selected >= self.history.rows.len() {
                    self.history.selected = self.history.rows.len().saturating_sub(1);
                }
                let live: HashSet<i64> =
                    self.history.rows.iter().filter_map(|s| s.id).collect();
                self.history.marked.retain(|id| live.contains(id));
            }
            Err(e) => self.error(format!("Database error: {}", e)),
        }
    }

    fn refresh_stats(&mut self) {
        let days = self.stats_view.days;
        let loaded = (|| -> Result<StatsState, rusqlite::Error> {
            Ok(StatsState {
                days,
                today: self.db.today_stats()?,
                period: self.db.period_stats(days)?,
                trend: trend_points(&self.db.daily_durations(days)?),
                shares: type_shares(&self.db.type_distribution(days)?),
            })
        })();
        match loaded {
            Ok(view) => self.stats_view = view,
            Err(e) => self.error(format!("Database error: {}", e)),
        }
    }

    fn collection_filter(&self) -> Option<&str> {
        if self.history.collection_idx == 0 {
            None
        } else {
            self.settings
                .list(SettingsKey::Collections)
                .get(self.history.collection_idx - 1)
                .map(String::as_str)
        }
    }

    pub fn start_timer(&mut self) {
        if !self.timer.is_idle() {
            return;
        }
        match self.draft.validate_for_timer() {
            Ok(()) => {
                self.editing = false;
                self.status = None;
                self.timer.start();
            }
            Err(msg) => self.error(msg),
        }
    }

    pub fn finish_timer(&mut self) {
        let Some(session) = self.timer.stop(&self.draft) else {
            self.error("No session running".to_string());
            return;
        };
        let secs = session.duration_secs;
        match self.db.insert_session(&session) {
            Ok(_) => {
                self.draft.clear_after_save();
                self.timer_focus = 0;
                self.refresh_today();
                self.refresh_last_practiced();
                self.info(format!("Session saved: {}", util::format_min_sec(secs)));
            }
            Err(e) => self.error(format!("Could not save session: {}", e)),
        }
    }

    pub fn open_add_dialog(&mut self) {
        let mut draft = SessionDraft::new_for_today();
        if let Some(first) = self.settings.list(SettingsKey::PracticeTypes).first() {
            draft.practice_type = first.clone();
        }
        self.history.dialog = Some(RecordDialog {
            draft,
            editing_id: None,
            focus: 0,
            editing: false,
        });
    }

    /// Edit the single marked record, or the cursor row when nothing is
    /// marked.
    pub fn open_edit_dialog(&mut self) {
        if self.history.marked.len() > 1 {
            self.error("Edit one record at a time".to_string());
            return;
        }
        let id = if let Some(&id) = self.history.marked.iter().next() {
            Some(id)
        } else {
            self.history
                .rows
                .get(self.history.selected)
                .and_then(|s| s.id)
        };
        let Some(id) = id else {
            self.error("Select a record to edit".to_string());
            return;
        };
        let draft = match self.history.rows.iter().find(|s| s.id == Some(id)) {
            Some(session) => SessionDraft::from_session(session),
            None => return,
        };
        self.history.dialog = Some(RecordDialog {
            draft,
            editing_id: Some(id),
            focus: 0,
            editing: false,
        });
    }

    pub fn save_dialog(&mut self) {
        let Some(dialog) = &self.history.dialog else {
            return;
        };
        match dialog.draft.to_session(dialog.editing_id) {
            Ok(session) => {
                let result = match dialog.editing_id {
                    Some(id) => self.db.update_session(id, &session).map(|_| "Record updated"),
                    None => self.db.insert_session(&session).map(|_| "Record added"),
                };
                match result {
                    Ok(msg) => {
                        self.history.dialog = None;
                        self.history.marked.clear();
                        self.refresh_history();
                        self.refresh_today();
                        self.info(msg.to_string());
                    }
                    Err(e) => self.error(format!("Could not save record: {}", e)),
                }
            }
            Err(msg) => self.error(msg),
        }
    }

    /// Queue deletion of the marked records, or the cursor row when nothing
    /// is marked, behind a confirmation.
    pub fn request_delete(&mut self) {
        let ids: Vec<i64> = if !self.history.marked.is_empty() {
            self.history.marked.iter().copied().collect()
        } else if let Some(id) = self
            .history
            .rows
            .get(self.history.selected)
            .and_then(|s| s.id)
        {
            vec![id]
        } else {
            self.error("Select a record to delete".to_string());
            return;
        };
        self.confirm = Some(Confirm {
            message: format!("Delete {} record(s)?", ids.len()),
            action: ConfirmAction::DeleteSessions(ids),
        });
    }

    pub fn apply_confirm(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteSessions(ids) => {
                let count = ids.len();
                for id in ids {
                    if let Err(e) = self.db.delete_session(id) {
                        self.error(format!("Could not delete record: {}", e));
                        self.refresh_history();
                        return;
                    }
                }
                self.history.marked.clear();
                self.refresh_history();
                self.refresh_today();
                self.info(format!("{} record(s) deleted", count));
            }
            ConfirmAction::DeleteEntry(key, index) => {
                match self.settings.remove(&self.db, key, index) {
                    Ok(()) => {
                        self.clamp_settings_cursor();
                        self.info("Entry removed".to_string());
                    }
                    Err(e) => self.error(e.to_string()),
                }
            }
            ConfirmAction::ImportDb(path) => match self.db.import_from(&path) {
                Ok(backup) => {
                    if let Err(e) = self.settings.refresh(&self.db) {
                        self.error(e.to_string());
                        return;
                    }
                    self.history.marked.clear();
                    self.clamp_settings_cursor();
                    self.refresh_history();
                    self.refresh_today();
                    self.refresh_last_practiced();
                    self.info(format!(
                        "Database imported, previous data saved to {}",
                        backup.display()
                    ));
                }
                Err(e) => self.error(format!("Import failed: {}", e)),
            },
        }
    }

    pub fn apply_prompt(&mut self, purpose: PromptPurpose, text: String) {
        match purpose {
            PromptPurpose::AddEntry(key) => match self.settings.add(&self.db, key, &text) {
                Ok(()) => {
                    self.settings_entry = self.settings.list(key).len().saturating_sub(1);
                    self.info("Entry added".to_string());
                }
                Err(e) => self.error(e.to_string()),
            },
            PromptPurpose::RenameEntry(key, index) => {
                match self.settings.rename(&self.db, key, index, &text) {
                    Ok(()) => self.info("Entry renamed".to_string()),
                    Err(e) => self.error(e.to_string()),
                }
            }
            PromptPurpose::ExportDir => {
                let dir = text.trim();
                if dir.is_empty() {
                    self.error("Enter a directory".to_string());
                    return;
                }
                match self.db.export_to_dir(Path::new(dir)) {
                    Ok(backup) => self.info(format!("Exported to {}", backup.display())),
                    Err(e) => self.error(format!("Export failed: {}", e)),
                }
            }
            PromptPurpose::ImportPath => {
                let path = text.trim();
                if path.is_empty() {
                    self.error("Enter a file".to_string());
                    return;
                }
                self.confirm = Some(Confirm {
                    message: "Importing replaces the current database. Continue?".to_string(),
                    action: ConfirmAction::ImportDb(PathBuf::from(path)),
                });
            }
            PromptPurpose::CsvPath => {
                let path = text.trim();
                if path.is_empty() {
                    self.error("Enter a file name".to_string());
                    return;
                }
                match store::write_csv(&self.history.rows, Path::new(path)) {
                    Ok(()) => self.info(format!(
                        "Wrote {} rows to {}",
                        self.history.rows.len(),
                        path
                    )),
                    Err(e) => self.error(format!("CSV export failed: {}", e)),
                }
            }
        }
    }

    fn current_settings_key(&self) -> SettingsKey {
        SettingsKey::ALL[self.settings_list.min(SettingsKey::ALL.len() - 1)]
    }

    fn clamp_settings_cursor(&mut self) {
        let len = self.settings.list(self.current_settings_key()).len();
        if self.settings_entry >= len {
            self.settings_entry = len.saturating_sub(1);
        }
    }
}

/// Step the draft's practice type through the configured list.
fn cycle_type(draft: &mut SessionDraft, types: &[String], step: isize) {
    if types.is_empty() {
        return;
    }
    let current = types
        .iter()
        .position(|t| t == &draft.practice_type)
        .unwrap_or(0);
    let len = types.len() as isize;
    let next = (current as isize + step).rem_euclid(len) as usize;
    draft.practice_type = types[next].clone();
}

/// Returns true when the app should exit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    // Modal layers swallow input first
    if app.confirm.is_some() {
        handle_confirm_key(app, key);
        return false;
    }
    if app.prompt.is_some() {
        handle_prompt_key(app, key);
        return false;
    }
    if app.page == Page::History && app.history.dialog.is_some() {
        handle_dialog_key(app, key);
        return false;
    }
    if app.page == Page::Timer && app.editing {
        handle_timer_edit_key(app, key);
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Tab => app.show_page(app.page.next()),
        KeyCode::Char('1') => app.show_page(Page::Timer),
        KeyCode::Char('2') => app.show_page(Page::History),
        KeyCode::Char('3') => app.show_page(Page::Stats),
        KeyCode::Char('4') => app.show_page(Page::Settings),
        _ => match app.page {
            Page::Timer => handle_timer_key(app, key),
            Page::History => handle_history_key(app, key),
            Page::Stats => handle_stats_key(app, key),
            Page::Settings => handle_settings_key(app, key),
        },
    }
    false
}

fn handle_timer_key(app: &mut App, key: KeyEvent) {
    let field = DraftField::TIMER_FIELDS[app.timer_focus];
    match key.code {
        KeyCode::Char('s') => app.start_timer(),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            if !app.timer.is_idle() {
                app.timer.toggle_pause();
            }
        }
        KeyCode::Char('f') => app.finish_timer(),
        KeyCode::Up => app.timer_focus = app.timer_focus.saturating_sub(1),
        KeyCode::Down => {
            if app.timer_focus + 1 < DraftField::TIMER_FIELDS.len() {
                app.timer_focus += 1;
            }
        }
        KeyCode::Left if field == DraftField::PracticeType => {
            if app.timer.is_idle() {
                cycle_type(
                    &mut app.draft,
                    app.settings.list(SettingsKey::PracticeTypes),
                    -1,
                );
            }
        }
        KeyCode::Right if field == DraftField::PracticeType => {
            if app.timer.is_idle() {
                cycle_type(
                    &mut app.draft,
                    app.settings.list(SettingsKey::PracticeTypes),
                    1,
                );
            }
        }
        KeyCode::Enter => {
            if !app.timer.is_idle() {
                app.error("Stop the timer before editing the form".to_string());
            } else if field != DraftField::PracticeType {
                app.editing = true;
            }
        }
        _ => {}
    }
}

fn handle_timer_edit_key(app: &mut App, key: KeyEvent) {
    let field = DraftField::TIMER_FIELDS[app.timer_focus];
    match key.code {
        KeyCode::Enter | KeyCode::Esc => app.editing = false,
        KeyCode::Backspace => {
            app.draft.field_mut(field).pop();
        }
        KeyCode::Char(c) => app.draft.field_mut(field).push(c),
        _ => {}
    }
}

fn handle_history_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up => app.history.selected = app.history.selected.saturating_sub(1),
        KeyCode::Down => {
            if app.history.selected + 1 < app.history.rows.len() {
                app.history.selected += 1;
            }
        }
        KeyCode::Char(' ') => {
            if let Some(id) = app
                .history
                .rows
                .get(app.history.selected)
                .and_then(|s| s.id)
            {
                if !app.history.marked.remove(&id) {
                    app.history.marked.insert(id);
                }
            }
        }
        KeyCode::Char('a') => app.open_add_dialog(),
        KeyCode::Char('e') => app.open_edit_dialog(),
        KeyCode::Char('x') => app.request_delete(),
        KeyCode::Char('d') => {
            let pos = DAY_FILTERS
                .iter()
                .position(|d| *d == app.history.days)
                .unwrap_or(0);
            app.history.days = DAY_FILTERS[(pos + 1) % DAY_FILTERS.len()];
            app.config.history_days = app.history.days;
            app.refresh_history();
        }
        KeyCode::Char('c') => {
            let count = app.settings.list(SettingsKey::Collections).len() + 1;
            app.history.collection_idx = (app.history.collection_idx + 1) % count;
            app.refresh_history();
        }
        KeyCode::Char('w') => {
            app.prompt = Some(TextPrompt {
                title: "Write CSV to".to_string(),
                buffer: "practice_history.csv".to_string(),
                purpose: PromptPurpose::CsvPath,
            });
        }
        _ => {}
    }
}

fn handle_dialog_key(app: &mut App, key: KeyEvent) {
    let Some(dialog) = app.history.dialog.as_mut() else {
        return;
    };
    let field = DraftField::DIALOG_FIELDS[dialog.focus];

    if dialog.editing {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => dialog.editing = false,
            KeyCode::Backspace => {
                dialog.draft.field_mut(field).pop();
            }
            KeyCode::Char(c) => dialog.draft.field_mut(field).push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.history.dialog = None,
        KeyCode::Up => dialog.focus = dialog.focus.saturating_sub(1),
        KeyCode::Down => {
            if dialog.focus + 1 < DraftField::DIALOG_FIELDS.len() {
                dialog.focus += 1;
            }
        }
        KeyCode::Left if field == DraftField::PracticeType => cycle_type(
            &mut dialog.draft,
            app.settings.list(SettingsKey::PracticeTypes),
            -1,
        ),
        KeyCode::Right if field == DraftField::PracticeType => cycle_type(
            &mut dialog.draft,
            app.settings.list(SettingsKey::PracticeTypes),
            1,
        ),
        KeyCode::Enter => {
            if field != DraftField::PracticeType {
                dialog.editing = true;
            }
        }
        KeyCode::Char('s') => app.save_dialog(),
        _ => {}
    }
}

fn handle_stats_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('d') {
        let pos = STAT_PERIODS
            .iter()
            .position(|d| *d == app.stats_view.days)
            .unwrap_or(0);
        app.stats_view.days = STAT_PERIODS[(pos + 1) % STAT_PERIODS.len()];
        app.config.stats_days = app.stats_view.days;
        app.refresh_stats();
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    let list_key = app.current_settings_key();
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Left => {
            if app.settings_list > 0 {
                app.settings_list -= 1;
                app.clamp_settings_cursor();
            }
        }
        KeyCode::Right => {
            if app.settings_list + 1 < SettingsKey::ALL.len() {
                app.settings_list += 1;
                app.clamp_settings_cursor();
            }
        }
        KeyCode::Up if shift => {
            if app.settings_entry > 0 {
                let to = app.settings_entry - 1;
                match app
                    .settings
                    .move_entry(&app.db, list_key, app.settings_entry, to)
                {
                    Ok(()) => app.settings_entry = to,
                    Err(e) => app.error(e.to_string()),
                }
            }
        }
        KeyCode::Down if shift => {
            let len = app.settings.list(list_key).len();
            if app.settings_entry + 1 < len {
                let to = app.settings_entry + 1;
                match app
                    .settings
                    .move_entry(&app.db, list_key, app.settings_entry, to)
                {
                    Ok(()) => app.settings_entry = to,
                    Err(e) => app.error(e.to_string()),
                }
            }
        }
        KeyCode::Up => app.settings_entry = app.settings_entry.saturating_sub(1),
        KeyCode::Down => {
            if app.settings_entry + 1 < app.settings.list(list_key).len() {
                app.settings_entry += 1;
            }
        }
        KeyCode::Char('a') => {
            app.prompt = Some(TextPrompt {
                title: format!("Add to {}", list_key),
                buffer: String::new(),
                purpose: PromptPurpose::AddEntry(list_key),
            });
        }
        KeyCode::Char('r') => {
            if let Some(current) = app.settings.list(list_key).get(app.settings_entry) {
                app.prompt = Some(TextPrompt {
                    title: "Rename entry".to_string(),
                    buffer: current.clone(),
                    purpose: PromptPurpose::RenameEntry(list_key, app.settings_entry),
                });
            }
        }
        KeyCode::Char('x') => {
            if let Some(current) = app.settings.list(list_key).get(app.settings_entry) {
                app.confirm = Some(Confirm {
                    message: format!("Delete '{}'?", current),
                    action: ConfirmAction::DeleteEntry(list_key, app.settings_entry),
                });
            }
        }
        KeyCode::Char('e') => {
            app.prompt = Some(TextPrompt {
                title: "Export database to directory".to_string(),
                buffer: ".".to_string(),
                purpose: PromptPurpose::ExportDir,
            });
        }
        KeyCode::Char('i') => {
            app.prompt = Some(TextPrompt {
                title: "Import database file".to_string(),
                buffer: String::new(),
                purpose: PromptPurpose::ImportPath,
            });
        }
        _ => {}
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(confirm) = app.confirm.take() {
                app.apply_confirm(confirm.action);
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm = None,
        _ => {}
    }
}

fn handle_prompt_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if let Some(prompt) = app.prompt.take() {
                app.apply_prompt(prompt.purpose, prompt.buffer);
            }
        }
        KeyCode::Esc => app.prompt = None,
        KeyCode::Backspace => {
            if let Some(prompt) = app.prompt.as_mut() {
                prompt.buffer.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(prompt) = app.prompt.as_mut() {
                prompt.buffer.push(c);
            }
        }
        _ => {}
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut db = match &cli.db {
        Some(path) => Db::open(path)?,
        None => Db::open_default()?,
    };

    if let Some(dir) = &cli.export {
        let backup = db.export_to_dir(dir)?;
        println!("Exported database to {}", backup.display());
        return Ok(());
    }
    if let Some(source) = &cli.import {
        let backup = db.import_from(source)?;
        println!(
            "Imported {} (previous data backed up to {})",
            source.display(),
            backup.display()
        );
        return Ok(());
    }
    if let Some(path) = &cli.export_csv {
        let sessions = db.sessions(None, None)?;
        store::write_csv(&sessions, path)?;
        println!("Wrote {} sessions to {}", sessions.len(), path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let mut app = App::new(db, config_store.load())?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Remember the filter choices for the next run
    let _ = config_store.save(&app.config);

    res
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let pump = EventPump::new(CrosstermInput::new(), Duration::from_millis(TICK_RATE_MS));

    terminal.draw(|f| ui::render(app, f))?;
    loop {
        // The pump only hands back redraw-worthy events: ticks arrive
        // solely while the clock is running
        match pump.next(app.timer.is_running()) {
            AppEvent::ClockTick => app.timer.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
            }
        }
        terminal.draw(|f| ui::render(app, f))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TimerPhase;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shift_key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::SHIFT)
    }

    fn test_app() -> App {
        App::new(Db::open_in_memory().unwrap(), Config::default()).unwrap()
    }

    fn fill_draft(app: &mut App) {
        app.draft.collection = "Hanon".to_string();
        app.draft.piece = "No. 1".to_string();
        app.draft.section = "Full piece".to_string();
        app.draft.bpm = "100".to_string();
    }

    fn insert_rows(app: &App, count: usize) {
        let today = Local::now().format("%Y-%m-%d").to_string();
        for i in 0..count {
            let session = PracticeSession {
                id: None,
                date: today.clone(),
                start_time: format!("{:02}:00:00", 8 + i),
                end_time: format!("{:02}:30:00", 8 + i),
                duration_secs: 1800,
                collection: "Hanon".to_string(),
                piece: "No. 1".to_string(),
                section: "Full piece".to_string(),
                bpm: "100".to_string(),
                practice_type: "Technique".to_string(),
                pause_count: 0,
                notes: String::new(),
            };
            app.db.insert_session(&session).unwrap();
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["etude"]);
        assert_eq!(cli.db, None);
        assert_eq!(cli.export, None);
        assert_eq!(cli.import, None);
        assert_eq!(cli.export_csv, None);
    }

    #[test]
    fn test_cli_headless_flags() {
        let cli = Cli::parse_from([
            "etude",
            "--db",
            "custom.db",
            "--export",
            "backups",
            "--export-csv",
            "out.csv",
        ]);
        assert_eq!(cli.db, Some(PathBuf::from("custom.db")));
        assert_eq!(cli.export, Some(PathBuf::from("backups")));
        assert_eq!(cli.export_csv, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Timer.next(), Page::History);
        assert_eq!(Page::Settings.next(), Page::Timer);
        assert_eq!(Page::Stats.index(), 2);
        assert_eq!(Page::Timer.to_string(), "Timer");
    }

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert_eq!(app.page, Page::Timer);
        assert_eq!(app.draft.practice_type, "Technique");
        assert_eq!(app.today.count, 0);
        assert_eq!(app.history.days, Some(7));
        assert_eq!(app.stats_view.days, 30);
        assert!(app.last_practiced.is_none());
    }

    #[test]
    fn test_start_timer_requires_filled_form() {
        let mut app = test_app();
        app.start_timer();
        assert!(app.timer.is_idle());
        let status = app.status.unwrap();
        assert!(status.error);
        assert!(status.text.contains("collection"));
    }

    #[test]
    fn test_start_and_finish_records_session() {
        let mut app = test_app();
        fill_draft(&mut app);
        app.draft.notes = "smooth thirds".to_string();
        app.start_timer();
        assert!(app.timer.is_running());

        app.finish_timer();
        assert!(app.timer.is_idle());
        let sessions = app.db.sessions(None, None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].collection, "Hanon");
        assert_eq!(sessions[0].notes, "smooth thirds");

        // Form resets but keeps the practice type
        assert!(app.draft.collection.is_empty());
        assert_eq!(app.draft.practice_type, "Technique");
        assert_eq!(app.today.count, 1);
        assert!(app.last_practiced.is_some());
    }

    #[test]
    fn test_finish_without_start_reports_error() {
        let mut app = test_app();
        app.finish_timer();
        assert!(app.status.unwrap().error);
    }

    #[test]
    fn test_show_page_discards_running_timer() {
        let mut app = test_app();
        fill_draft(&mut app);
        app.start_timer();
        assert!(app.timer.is_running());

        app.show_page(Page::History);
        assert!(app.timer.is_idle());
        assert!(app.db.sessions(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_esc_and_ctrl_c_exit() {
        let mut app = test_app();
        assert!(handle_key(&mut app, key(KeyCode::Esc)));
        assert!(handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
    }

    #[test]
    fn test_tab_and_digits_switch_pages() {
        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.page, Page::History);
        handle_key(&mut app, key(KeyCode::Char('4')));
        assert_eq!(app.page, Page::Settings);
        handle_key(&mut app, key(KeyCode::Char('1')));
        assert_eq!(app.page, Page::Timer);
    }

    #[test]
    fn test_timer_pause_key() {
        let mut app = test_app();
        fill_draft(&mut app);
        app.start_timer();
        handle_key(&mut app, key(KeyCode::Char('p')));
        assert_eq!(app.timer.phase, TimerPhase::Paused);
        assert_eq!(app.timer.pause_count, 1);
        handle_key(&mut app, key(KeyCode::Char('p')));
        assert_eq!(app.timer.phase, TimerPhase::Running);
    }

    #[test]
    fn test_timer_field_editing() {
        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.editing);
        handle_key(&mut app, key(KeyCode::Char('H')));
        handle_key(&mut app, key(KeyCode::Char('a')));
        handle_key(&mut app, key(KeyCode::Backspace));
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(!app.editing);
        assert_eq!(app.draft.collection, "H");
    }

    #[test]
    fn test_form_locked_while_running() {
        let mut app = test_app();
        fill_draft(&mut app);
        app.start_timer();
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(!app.editing);
        assert!(app.status.unwrap().error);
    }

    #[test]
    fn test_cycle_type_wraps() {
        let types = vec![
            "Technique".to_string(),
            "Etude".to_string(),
            "Theory".to_string(),
        ];
        let mut draft = SessionDraft {
            practice_type: "Technique".to_string(),
            ..SessionDraft::default()
        };
        cycle_type(&mut draft, &types, 1);
        assert_eq!(draft.practice_type, "Etude");
        cycle_type(&mut draft, &types, -2);
        assert_eq!(draft.practice_type, "Theory");
        cycle_type(&mut draft, &[], 1);
        assert_eq!(draft.practice_type, "Theory");
    }

    #[test]
    fn test_history_mark_and_delete_flow() {
        let mut app = test_app();
        insert_rows(&app, 3);
        app.show_page(Page::History);
        assert_eq!(app.history.rows.len(), 3);

        handle_key(&mut app, key(KeyCode::Char(' ')));
        handle_key(&mut app, key(KeyCode::Down));
        handle_key(&mut app, key(KeyCode::Char(' ')));
        assert_eq!(app.history.marked.len(), 2);

        handle_key(&mut app, key(KeyCode::Char('x')));
        let confirm = app.confirm.clone().unwrap();
        assert!(confirm.message.contains("2 record(s)"));

        handle_key(&mut app, key(KeyCode::Char('y')));
        assert!(app.confirm.is_none());
        assert_eq!(app.history.rows.len(), 1);
        assert!(app.history.marked.is_empty());
    }

    #[test]
    fn test_delete_falls_back_to_cursor_row() {
        let mut app = test_app();
        insert_rows(&app, 2);
        app.show_page(Page::History);

        handle_key(&mut app, key(KeyCode::Char('x')));
        handle_key(&mut app, key(KeyCode::Char('y')));
        assert_eq!(app.history.rows.len(), 1);
    }

    #[test]
    fn test_confirm_no_cancels() {
        let mut app = test_app();
        insert_rows(&app, 1);
        app.show_page(Page::History);
        handle_key(&mut app, key(KeyCode::Char('x')));
        handle_key(&mut app, key(KeyCode::Char('n')));
        assert!(app.confirm.is_none());
        assert_eq!(app.history.rows.len(), 1);
    }

    #[test]
    fn test_edit_rejects_multiple_marks() {
        let mut app = test_app();
        insert_rows(&app, 2);
        app.show_page(Page::History);
        handle_key(&mut app, key(KeyCode::Char(' ')));
        handle_key(&mut app, key(KeyCode::Down));
        handle_key(&mut app, key(KeyCode::Char(' ')));

        handle_key(&mut app, key(KeyCode::Char('e')));
        assert!(app.history.dialog.is_none());
        assert!(app.status.unwrap().text.contains("one record"));
    }

    #[test]
    fn test_edit_dialog_updates_record() {
        let mut app = test_app();
        insert_rows(&app, 1);
        app.show_page(Page::History);

        handle_key(&mut app, key(KeyCode::Char('e')));
        assert!(app.history.dialog.is_some());

        if let Some(dialog) = app.history.dialog.as_mut() {
            dialog.draft.notes = "edited".to_string();
        }
        app.save_dialog();
        assert!(app.history.dialog.is_none());
        assert_eq!(app.history.rows[0].notes, "edited");
        assert!(!app.status.clone().unwrap().error);
    }

    #[test]
    fn test_add_dialog_inserts_record() {
        let mut app = test_app();
        app.show_page(Page::History);
        handle_key(&mut app, key(KeyCode::Char('a')));
        let dialog = app.history.dialog.as_mut().unwrap();
        assert!(dialog.editing_id.is_none());
        dialog.draft.collection = "Beyer".to_string();
        dialog.draft.piece = "No. 8".to_string();
        dialog.draft.section = "Bars 1-8".to_string();
        dialog.draft.bpm = "72".to_string();
        dialog.draft.duration_min = "15".to_string();

        handle_key(&mut app, key(KeyCode::Char('s')));
        assert!(app.history.dialog.is_none());
        assert_eq!(app.history.rows.len(), 1);
        assert_eq!(app.history.rows[0].duration_secs, 900);
    }

    #[test]
    fn test_dialog_rejects_bad_minutes() {
        let mut app = test_app();
        app.show_page(Page::History);
        app.open_add_dialog();
        let dialog = app.history.dialog.as_mut().unwrap();
        dialog.draft.collection = "Beyer".to_string();
        dialog.draft.piece = "No. 8".to_string();
        dialog.draft.section = "Bars 1-8".to_string();
        dialog.draft.bpm = "72".to_string();
        dialog.draft.duration_min = "abc".to_string();

        app.save_dialog();
        assert!(app.history.dialog.is_some());
        assert!(app.status.unwrap().error);
    }

    #[test]
    fn test_days_filter_cycles() {
        let mut app = test_app();
        app.show_page(Page::History);
        assert_eq!(app.history.days, Some(7));
        handle_key(&mut app, key(KeyCode::Char('d')));
        assert_eq!(app.history.days, Some(30));
        for _ in 0..3 {
            handle_key(&mut app, key(KeyCode::Char('d')));
        }
        assert_eq!(app.history.days, None);
        assert_eq!(app.config.history_days, None);
        handle_key(&mut app, key(KeyCode::Char('d')));
        assert_eq!(app.history.days, Some(7));
    }

    #[test]
    fn test_collection_filter_cycles_and_filters() {
        let mut app = test_app();
        insert_rows(&app, 1);
        app.show_page(Page::History);
        assert_eq!(app.history.rows.len(), 1);

        // First collection in the defaults is Czerny 599, which matches nothing
        handle_key(&mut app, key(KeyCode::Char('c')));
        assert_eq!(app.history.collection_idx, 1);
        assert!(app.history.rows.is_empty());

        // Hanon is second and matches the inserted row
        handle_key(&mut app, key(KeyCode::Char('c')));
        assert_eq!(app.history.rows.len(), 1);
    }

    #[test]
    fn test_stats_period_cycles() {
        let mut app = test_app();
        app.show_page(Page::Stats);
        assert_eq!(app.stats_view.days, 30);
        handle_key(&mut app, key(KeyCode::Char('d')));
        assert_eq!(app.stats_view.days, 90);
        assert_eq!(app.config.stats_days, 90);
    }

    #[test]
    fn test_stats_view_reflects_sessions() {
        let mut app = test_app();
        insert_rows(&app, 2);
        app.show_page(Page::Stats);
        assert_eq!(app.stats_view.period.total_count, 2);
        assert_eq!(app.stats_view.period.total_duration_secs, 3600);
        assert_eq!(app.stats_view.shares.len(), 1);
        assert_eq!(app.stats_view.shares[0].percent, 100.0);
        assert_eq!(app.stats_view.trend.len(), 1);
    }

    #[test]
    fn test_settings_navigation_and_add() {
        let mut app = test_app();
        app.show_page(Page::Settings);
        handle_key(&mut app, key(KeyCode::Right));
        assert_eq!(app.settings_list, 1);

        handle_key(&mut app, key(KeyCode::Char('a')));
        let prompt = app.prompt.take().unwrap();
        assert!(prompt.title.contains("Pieces"));
        app.apply_prompt(prompt.purpose, "No. 9".to_string());
        let pieces = app.settings.list(SettingsKey::Pieces);
        assert_eq!(pieces.last().unwrap(), "No. 9");
        assert_eq!(app.settings_entry, pieces.len() - 1);
    }

    #[test]
    fn test_settings_rename_via_prompt_keys() {
        let mut app = test_app();
        app.show_page(Page::Settings);
        handle_key(&mut app, key(KeyCode::Char('r')));
        assert_eq!(app.prompt.as_ref().unwrap().buffer, "Czerny 599");

        // Append to the prefilled name and submit
        handle_key(&mut app, key(KeyCode::Char('!')));
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.prompt.is_none());
        assert_eq!(app.settings.list(SettingsKey::Collections)[0], "Czerny 599!");
    }

    #[test]
    fn test_settings_duplicate_add_reports_error() {
        let mut app = test_app();
        app.apply_prompt(
            PromptPurpose::AddEntry(SettingsKey::Collections),
            "Hanon".to_string(),
        );
        assert!(app.status.unwrap().error);
    }

    #[test]
    fn test_settings_delete_entry_with_confirm() {
        let mut app = test_app();
        app.show_page(Page::Settings);
        handle_key(&mut app, key(KeyCode::Char('x')));
        assert!(app.confirm.as_ref().unwrap().message.contains("Czerny 599"));
        handle_key(&mut app, key(KeyCode::Char('y')));
        assert_eq!(app.settings.list(SettingsKey::Collections).len(), 3);
        assert_eq!(app.settings.list(SettingsKey::Collections)[0], "Hanon");
    }

    #[test]
    fn test_settings_move_entry_with_shift() {
        let mut app = test_app();
        app.show_page(Page::Settings);
        handle_key(&mut app, shift_key(KeyCode::Down));
        assert_eq!(app.settings_entry, 1);
        let collections = app.settings.list(SettingsKey::Collections);
        assert_eq!(collections[0], "Hanon");
        assert_eq!(collections[1], "Czerny 599");
    }

    #[test]
    fn test_csv_prompt_writes_current_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let mut app = test_app();
        insert_rows(&app, 2);
        app.show_page(Page::History);

        app.apply_prompt(
            PromptPurpose::CsvPath,
            path.to_string_lossy().into_owned(),
        );
        assert!(!app.status.clone().unwrap().error);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().count() >= 3);
    }

    #[test]
    fn test_export_and_import_through_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("practice.db");
        let mut app = App::new(Db::open(&db_path).unwrap(), Config::default()).unwrap();
        insert_rows(&app, 1);

        let export_dir = dir.path().join("backups");
        app.apply_prompt(
            PromptPurpose::ExportDir,
            export_dir.to_string_lossy().into_owned(),
        );
        assert!(!app.status.clone().unwrap().error);
        let backup = std::fs::read_dir(&export_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();

        // Wipe the live data, then import the backup back
        let id = app.db.sessions(None, None).unwrap()[0].id.unwrap();
        app.db.delete_session(id).unwrap();

        app.apply_prompt(
            PromptPurpose::ImportPath,
            backup.to_string_lossy().into_owned(),
        );
        let confirm = app.confirm.take().unwrap();
        app.apply_confirm(confirm.action);
        assert!(!app.status.clone().unwrap().error);
        assert_eq!(app.db.sessions(None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_import_bad_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("practice.db");
        let mut app = App::new(Db::open(&db_path).unwrap(), Config::default()).unwrap();

        let bogus = dir.path().join("bogus.db");
        std::fs::write(&bogus, "junk").unwrap();
        app.apply_confirm(ConfirmAction::ImportDb(bogus));
        assert!(app.status.unwrap().error);
    }

    #[test]
    fn test_prompt_escape_cancels() {
        let mut app = test_app();
        app.show_page(Page::Settings);
        handle_key(&mut app, key(KeyCode::Char('a')));
        assert!(app.prompt.is_some());
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.prompt.is_none());
    }

    #[test]
    fn test_tick_rate_constant() {
        const _: () = assert!(TICK_RATE_MS > 0);
        const _: () = assert!(TICK_RATE_MS <= 1000);
    }
}
