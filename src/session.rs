use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

/// One recorded practice interval with its metadata. `id` is None until the
/// store has assigned a row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSession {
    pub id: Option<i64>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: u64,
    pub collection: String,
    pub piece: String,
    pub section: String,
    pub bpm: String,
    pub practice_type: String,
    pub pause_count: u32,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Stopwatch for the active practice session. Elapsed time is always derived
/// from the wall clock, never accumulated tick by tick, so a slow or missed
/// tick cannot drift the clock. Resume rebases the start instant so the
/// display continues where pause left it.
#[derive(Debug, Clone, Default)]
pub struct PracticeTimer {
    pub phase: TimerPhase,
    started_at: Option<DateTime<Local>>,
    pub elapsed_secs: u64,
    pub pause_count: u32,
}

impl PracticeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.phase == TimerPhase::Idle
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Paused
    }

    pub fn start(&mut self) {
        self.start_at(Local::now());
    }

    pub fn start_at(&mut self, now: DateTime<Local>) {
        self.phase = TimerPhase::Running;
        self.started_at = Some(now);
        self.elapsed_secs = 0;
        self.pause_count = 0;
    }

    pub fn on_tick(&mut self) {
        self.tick_at(Local::now());
    }

    pub fn tick_at(&mut self, now: DateTime<Local>) {
        if self.phase != TimerPhase::Running {
            return;
        }
        if let Some(started) = self.started_at {
            self.elapsed_secs = (now - started).num_seconds().max(0) as u64;
        }
    }

    /// Pause a running timer (counting the pause) or resume a paused one.
    pub fn toggle_pause(&mut self) {
        self.toggle_pause_at(Local::now());
    }

    pub fn toggle_pause_at(&mut self, now: DateTime<Local>) {
        match self.phase {
            TimerPhase::Running => {
                self.tick_at(now);
                self.pause_count += 1;
                self.phase = TimerPhase::Paused;
            }
            TimerPhase::Paused => {
                self.started_at = Some(now - Duration::seconds(self.elapsed_secs as i64));
                self.phase = TimerPhase::Running;
            }
            TimerPhase::Idle => {}
        }
    }

    /// Stop the timer and build the session record from the draft metadata.
    /// Returns None when the timer never started.
    pub fn stop(&mut self, draft: &SessionDraft) -> Option<PracticeSession> {
        self.stop_at(Local::now(), draft)
    }

    pub fn stop_at(&mut self, now: DateTime<Local>, draft: &SessionDraft) -> Option<PracticeSession> {
        if self.is_idle() {
            return None;
        }
        self.tick_at(now);
        let started = now - Duration::seconds(self.elapsed_secs as i64);

        let session = PracticeSession {
            id: None,
            date: now.format("%Y-%m-%d").to_string(),
            start_time: started.format("%H:%M:%S").to_string(),
            end_time: now.format("%H:%M:%S").to_string(),
            duration_secs: self.elapsed_secs,
            collection: draft.collection.trim().to_string(),
            piece: draft.piece.trim().to_string(),
            section: draft.section.trim().to_string(),
            bpm: draft.bpm.trim().to_string(),
            practice_type: draft.practice_type.clone(),
            pause_count: self.pause_count,
            notes: draft.notes.trim().to_string(),
        };

        self.discard();
        Some(session)
    }

    /// Drop the in-flight session without recording anything (page
    /// navigation away from the timer mid-session).
    pub fn discard(&mut self) {
        *self = Self::default();
    }
}

/// Editable form fields shared by the timer page and the history add/edit
/// dialog. All values are kept as text while editing; parsing happens on
/// submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DraftField {
    Date,
    #[strum(serialize = "Start")]
    StartTime,
    #[strum(serialize = "End")]
    EndTime,
    #[strum(serialize = "Minutes")]
    DurationMin,
    Collection,
    Piece,
    Section,
    #[strum(serialize = "BPM")]
    Bpm,
    #[strum(serialize = "Type")]
    PracticeType,
    #[strum(serialize = "Pauses")]
    PauseCount,
    Notes,
}

impl DraftField {
    /// Fields shown on the timer page form.
    pub const TIMER_FIELDS: [DraftField; 6] = [
        DraftField::Collection,
        DraftField::Piece,
        DraftField::Section,
        DraftField::Bpm,
        DraftField::PracticeType,
        DraftField::Notes,
    ];

    /// Fields shown in the history add/edit dialog.
    pub const DIALOG_FIELDS: [DraftField; 11] = [
        DraftField::Date,
        DraftField::StartTime,
        DraftField::EndTime,
        DraftField::DurationMin,
        DraftField::Collection,
        DraftField::Piece,
        DraftField::Section,
        DraftField::Bpm,
        DraftField::PracticeType,
        DraftField::PauseCount,
        DraftField::Notes,
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDraft {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_min: String,
    pub collection: String,
    pub piece: String,
    pub section: String,
    pub bpm: String,
    pub practice_type: String,
    pub pause_count: String,
    pub notes: String,
}

impl SessionDraft {
    /// Fresh draft for the add-record dialog, dated today.
    pub fn new_for_today() -> Self {
        Self {
            date: Local::now().format("%Y-%m-%d").to_string(),
            pause_count: "0".to_string(),
            ..Self::default()
        }
    }

    /// Load a stored record into the draft for editing. Duration is shown
    /// in whole minutes, matching the history table.
    pub fn from_session(session: &PracticeSession) -> Self {
        Self {
            date: session.date.clone(),
            start_time: session.start_time.clone(),
            end_time: session.end_time.clone(),
            duration_min: (session.duration_secs / 60).to_string(),
            collection: session.collection.clone(),
            piece: session.piece.clone(),
            section: session.section.clone(),
            bpm: session.bpm.clone(),
            practice_type: session.practice_type.clone(),
            pause_count: session.pause_count.to_string(),
            notes: session.notes.clone(),
        }
    }

    pub fn field_mut(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::Date => &mut self.date,
            DraftField::StartTime => &mut self.start_time,
            DraftField::EndTime => &mut self.end_time,
            DraftField::DurationMin => &mut self.duration_min,
            DraftField::Collection => &mut self.collection,
            DraftField::Piece => &mut self.piece,
            DraftField::Section => &mut self.section,
            DraftField::Bpm => &mut self.bpm,
            DraftField::PracticeType => &mut self.practice_type,
            DraftField::PauseCount => &mut self.pause_count,
            DraftField::Notes => &mut self.notes,
        }
    }

    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Date => &self.date,
            DraftField::StartTime => &self.start_time,
            DraftField::EndTime => &self.end_time,
            DraftField::DurationMin => &self.duration_min,
            DraftField::Collection => &self.collection,
            DraftField::Piece => &self.piece,
            DraftField::Section => &self.section,
            DraftField::Bpm => &self.bpm,
            DraftField::PracticeType => &self.practice_type,
            DraftField::PauseCount => &self.pause_count,
            DraftField::Notes => &self.notes,
        }
    }

    /// The timer refuses to start until the metadata fields are filled in.
    pub fn validate_for_timer(&self) -> Result<(), String> {
        for (value, name) in [
            (&self.collection, "collection"),
            (&self.piece, "piece"),
            (&self.section, "section"),
            (&self.bpm, "BPM"),
        ] {
            if value.trim().is_empty() {
                return Err(format!("Please fill in {}", name));
            }
        }
        Ok(())
    }

    /// Build a record from the dialog fields. Duration comes back in whole
    /// minutes and is stored as seconds.
    pub fn to_session(&self, id: Option<i64>) -> Result<PracticeSession, String> {
        self.validate_for_timer()?;
        if self.date.trim().is_empty() {
            return Err("Please fill in date".to_string());
        }
        let minutes: u64 = self
            .duration_min
            .trim()
            .parse()
            .map_err(|_| "Minutes must be a whole number".to_string())?;
        let pause_count: u32 = if self.pause_count.trim().is_empty() {
            0
        } else {
            self.pause_count
                .trim()
                .parse()
                .map_err(|_| "Pauses must be a whole number".to_string())?
        };

        Ok(PracticeSession {
            id,
            date: self.date.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            duration_secs: minutes * 60,
            collection: self.collection.trim().to_string(),
            piece: self.piece.trim().to_string(),
            section: self.section.trim().to_string(),
            bpm: self.bpm.trim().to_string(),
            practice_type: self.practice_type.clone(),
            pause_count,
            notes: self.notes.trim().to_string(),
        })
    }

    /// After a timed session is saved the free-text fields are cleared for
    /// the next run; the practice type selection is kept.
    pub fn clear_after_save(&mut self) {
        self.collection.clear();
        self.piece.clear();
        self.section.clear();
        self.bpm.clear();
        self.notes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn filled_draft() -> SessionDraft {
        SessionDraft {
            collection: "Czerny 599".to_string(),
            piece: "No. 12".to_string(),
            section: "Bars 1-8".to_string(),
            bpm: "96".to_string(),
            practice_type: "Etude".to_string(),
            notes: "slow hands separate".to_string(),
            ..SessionDraft::default()
        }
    }

    #[test]
    fn timer_starts_idle() {
        let timer = PracticeTimer::new();
        assert!(timer.is_idle());
        assert_eq!(timer.elapsed_secs, 0);
        assert_eq!(timer.pause_count, 0);
    }

    #[test]
    fn tick_derives_elapsed_from_wall_clock() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(10, 0, 0));
        timer.tick_at(at(10, 0, 1));
        assert_eq!(timer.elapsed_secs, 1);

        // A missed tick does not lose time
        timer.tick_at(at(10, 5, 30));
        assert_eq!(timer.elapsed_secs, 330);
    }

    #[test]
    fn tick_ignored_when_not_running() {
        let mut timer = PracticeTimer::new();
        timer.tick_at(at(10, 0, 5));
        assert_eq!(timer.elapsed_secs, 0);

        timer.start_at(at(10, 0, 0));
        timer.toggle_pause_at(at(10, 0, 10));
        timer.tick_at(at(10, 1, 0));
        assert_eq!(timer.elapsed_secs, 10);
    }

    #[test]
    fn pause_counts_and_freezes() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(9, 0, 0));
        timer.toggle_pause_at(at(9, 0, 30));
        assert!(timer.is_paused());
        assert_eq!(timer.pause_count, 1);
        assert_eq!(timer.elapsed_secs, 30);
    }

    #[test]
    fn resume_rebases_start_instant() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(9, 0, 0));
        timer.toggle_pause_at(at(9, 0, 30));
        // Two minutes of pause do not count as practice
        timer.toggle_pause_at(at(9, 2, 30));
        assert!(timer.is_running());
        timer.tick_at(at(9, 2, 40));
        assert_eq!(timer.elapsed_secs, 40);
    }

    #[test]
    fn pause_resume_pause_increments_each_time() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(9, 0, 0));
        timer.toggle_pause_at(at(9, 0, 10));
        timer.toggle_pause_at(at(9, 0, 20));
        timer.toggle_pause_at(at(9, 0, 30));
        assert_eq!(timer.pause_count, 2);
    }

    #[test]
    fn toggle_pause_on_idle_is_noop() {
        let mut timer = PracticeTimer::new();
        timer.toggle_pause_at(at(9, 0, 0));
        assert!(timer.is_idle());
        assert_eq!(timer.pause_count, 0);
    }

    #[test]
    fn stop_builds_record_and_resets() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(14, 0, 0));
        timer.toggle_pause_at(at(14, 10, 0));
        timer.toggle_pause_at(at(14, 15, 0));

        let session = timer.stop_at(at(14, 20, 0), &filled_draft()).unwrap();
        assert_eq!(session.date, "2026-03-14");
        assert_eq!(session.duration_secs, 15 * 60);
        assert_eq!(session.end_time, "14:20:00");
        assert_eq!(session.start_time, "14:05:00");
        assert_eq!(session.pause_count, 1);
        assert_eq!(session.collection, "Czerny 599");
        assert_eq!(session.id, None);

        assert!(timer.is_idle());
        assert_eq!(timer.elapsed_secs, 0);
    }

    #[test]
    fn stop_while_paused_uses_frozen_elapsed() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(14, 0, 0));
        timer.toggle_pause_at(at(14, 5, 0));

        let session = timer.stop_at(at(14, 30, 0), &filled_draft()).unwrap();
        assert_eq!(session.duration_secs, 5 * 60);
        assert_eq!(session.pause_count, 1);
    }

    #[test]
    fn stop_on_idle_returns_none() {
        let mut timer = PracticeTimer::new();
        assert!(timer.stop_at(at(14, 0, 0), &filled_draft()).is_none());
    }

    #[test]
    fn discard_drops_everything() {
        let mut timer = PracticeTimer::new();
        timer.start_at(at(8, 0, 0));
        timer.tick_at(at(8, 1, 0));
        timer.discard();
        assert!(timer.is_idle());
        assert_eq!(timer.elapsed_secs, 0);
        assert_eq!(timer.pause_count, 0);
    }

    #[test]
    fn validate_for_timer_names_missing_field() {
        let mut draft = filled_draft();
        draft.bpm.clear();
        let err = draft.validate_for_timer().unwrap_err();
        assert!(err.contains("BPM"));

        draft = filled_draft();
        draft.collection = "   ".to_string();
        let err = draft.validate_for_timer().unwrap_err();
        assert!(err.contains("collection"));

        assert!(filled_draft().validate_for_timer().is_ok());
    }

    #[test]
    fn draft_roundtrip_through_session() {
        let session = PracticeSession {
            id: Some(7),
            date: "2026-03-01".to_string(),
            start_time: "10:00:00".to_string(),
            end_time: "10:25:00".to_string(),
            duration_secs: 1500,
            collection: "Hanon".to_string(),
            piece: "No. 3".to_string(),
            section: "Full piece".to_string(),
            bpm: "108".to_string(),
            practice_type: "Technique".to_string(),
            pause_count: 2,
            notes: "even sixteenths".to_string(),
        };

        let draft = SessionDraft::from_session(&session);
        assert_eq!(draft.duration_min, "25");
        assert_eq!(draft.pause_count, "2");

        let rebuilt = draft.to_session(Some(7)).unwrap();
        assert_eq!(rebuilt, session);
    }

    #[test]
    fn to_session_rejects_bad_minutes() {
        let mut draft = filled_draft();
        draft.date = "2026-03-01".to_string();
        draft.duration_min = "twenty".to_string();
        let err = draft.to_session(None).unwrap_err();
        assert!(err.contains("Minutes"));
    }

    #[test]
    fn to_session_defaults_empty_pause_count() {
        let mut draft = filled_draft();
        draft.date = "2026-03-01".to_string();
        draft.duration_min = "10".to_string();
        draft.pause_count = String::new();
        let session = draft.to_session(None).unwrap();
        assert_eq!(session.pause_count, 0);
        assert_eq!(session.duration_secs, 600);
    }

    #[test]
    fn clear_after_save_keeps_practice_type() {
        let mut draft = filled_draft();
        draft.clear_after_save();
        assert!(draft.collection.is_empty());
        assert!(draft.piece.is_empty());
        assert!(draft.section.is_empty());
        assert!(draft.bpm.is_empty());
        assert!(draft.notes.is_empty());
        assert_eq!(draft.practice_type, "Etude");
    }

    #[test]
    fn new_for_today_sets_date() {
        let draft = SessionDraft::new_for_today();
        assert_eq!(draft.date, Local::now().format("%Y-%m-%d").to_string());
        assert_eq!(draft.pause_count, "0");
    }

    #[test]
    fn field_mut_edits_the_right_slot() {
        let mut draft = SessionDraft::default();
        draft.field_mut(DraftField::Piece).push_str("No. 1");
        assert_eq!(draft.piece, "No. 1");
        assert_eq!(draft.field(DraftField::Piece), "No. 1");
    }
}
