use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Result};
use std::io;
use std::path::{Path, PathBuf};

use crate::app_dirs;
use crate::session::PracticeSession;
use crate::stats::{self, PeriodStats, TodayStats};

/// Default option lists seeded into a fresh database, keyed by settings key.
const DEFAULT_SETTINGS: [(&str, &[&str]); 4] = [
    (
        "collections",
        &["Czerny 599", "Hanon", "Beyer", "Sonatina Album"],
    ),
    ("pieces", &["No. 1", "No. 2", "No. 3", "Etude 1", "Etude 2"]),
    (
        "sections",
        &[
            "Bars 1-8",
            "Bars 9-16",
            "Bars 17-24",
            "Bars 25-32",
            "Full piece",
        ],
    ),
    (
        "practice_types",
        &["Technique", "Etude", "Repertoire", "Sight reading", "Theory"],
    ),
];

/// Database manager for practice sessions and settings lists
#[derive(Debug)]
pub struct Db {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Db {
    /// Open (or create) the database at the default state directory.
    pub fn open_default() -> Result<Self> {
        let path = app_dirs::db_path().unwrap_or_else(|| PathBuf::from("practice.db"));
        Self::open(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    rusqlite::Error::SqliteFailure(
                        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                        Some(format!("Failed to create directory: {}", e)),
                    )
                })?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Db {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Db { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS practice_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                duration INTEGER,
                collection TEXT,
                piece TEXT,
                section TEXT,
                bpm TEXT,
                practice_type TEXT,
                pause_count INTEGER DEFAULT 0,
                notes TEXT
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_practice_sessions_date ON practice_sessions(date)",
            [],
        )?;

        for (key, values) in DEFAULT_SETTINGS {
            let json = serde_json::to_string(&values).unwrap_or_else(|_| "[]".to_string());
            conn.execute(
                "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, json],
            )?;
        }

        Ok(())
    }

    // ---- sessions ----

    /// Insert a session record and return its new row id.
    pub fn insert_session(&self, session: &PracticeSession) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO practice_sessions
            (date, start_time, end_time, duration, collection, piece, section, bpm,
             practice_type, pause_count, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                session.date,
                session.start_time,
                session.end_time,
                session.duration_secs as i64,
                session.collection,
                session.piece,
                session.section,
                session.bpm,
                session.practice_type,
                session.pause_count as i64,
                session.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_session(&self, id: i64, session: &PracticeSession) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE practice_sessions
            SET date=?1, start_time=?2, end_time=?3, duration=?4, collection=?5,
                piece=?6, section=?7, bpm=?8, practice_type=?9, pause_count=?10, notes=?11
            WHERE id=?12
            "#,
            params![
                session.date,
                session.start_time,
                session.end_time,
                session.duration_secs as i64,
                session.collection,
                session.piece,
                session.section,
                session.bpm,
                session.practice_type,
                session.pause_count as i64,
                session.notes,
                id,
            ],
        )?;
        Ok(())
    }

    pub fn delete_session(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM practice_sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Sessions from the last `days` days (all history when None), newest
    /// first, optionally restricted to one collection. The date filter uses
    /// a sentinel far in the past when no day limit is given, so one query
    /// shape serves every filter combination.
    pub fn sessions(&self, days: Option<u32>, collection: Option<&str>) -> Result<Vec<PracticeSession>> {
        let since = match days {
            Some(days) => Self::start_date(days),
            None => "0000-00-00".to_string(),
        };
        // Empty string is the "all collections" sentinel
        let collection = collection.unwrap_or("");

        let mut stmt = self.conn.prepare(
            "SELECT id, date, start_time, end_time, duration, collection, piece, section,
                    bpm, practice_type, pause_count, notes
             FROM practice_sessions
             WHERE date >= ?1 AND (?2 = '' OR collection = ?2)
             ORDER BY date DESC, start_time DESC",
        )?;
        let rows = stmt.query_map(params![since, collection], |row| {
            Ok(PracticeSession {
                id: Some(row.get(0)?),
                date: row.get(1)?,
                start_time: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                end_time: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                duration_secs: row.get::<_, Option<i64>>(4)?.unwrap_or(0).max(0) as u64,
                collection: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                piece: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                section: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                bpm: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                practice_type: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                pause_count: row.get::<_, Option<i64>>(10)?.unwrap_or(0).max(0) as u32,
                notes: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
            })
        })?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    /// When the last recorded session ended, for the "last practiced" line.
    pub fn last_session_end(&self) -> Result<Option<DateTime<Local>>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, end_time FROM practice_sessions
             ORDER BY date DESC, end_time DESC LIMIT 1",
        )?;
        let row: Option<(String, Option<String>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .next()
            .transpose()?;

        let Some((date, end_time)) = row else {
            return Ok(None);
        };
        let end_time = end_time.unwrap_or_else(|| "00:00:00".to_string());
        let parsed = NaiveDateTime::parse_from_str(
            &format!("{} {}", date, end_time),
            "%Y-%m-%d %H:%M:%S",
        );
        Ok(parsed
            .ok()
            .and_then(|ndt| ndt.and_local_timezone(Local).single()))
    }

    // ---- settings ----

    pub fn setting_list(&self, key: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?;
        let value: Option<String> = stmt
            .query_map(params![key], |row| row.get(0))?
            .next()
            .transpose()?;

        Ok(value
            .and_then(|v| serde_json::from_str::<Vec<String>>(&v).ok())
            .unwrap_or_default())
    }

    pub fn put_setting_list(&self, key: &str, values: &[String]) -> Result<()> {
        let json = serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string());
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, json],
        )?;
        Ok(())
    }

    // ---- statistics ----

    pub fn today_stats(&self) -> Result<TodayStats> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*), SUM(duration), AVG(pause_count)
             FROM practice_sessions
             WHERE date = ?1",
        )?;
        let (count, duration, avg_pause): (i64, Option<i64>, Option<f64>) =
            stmt.query_row(params![today], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

        Ok(TodayStats {
            count: count.max(0) as u64,
            duration_secs: duration.unwrap_or(0).max(0) as u64,
            avg_pause: stats::round1(avg_pause.unwrap_or(0.0)),
        })
    }

    pub fn period_stats(&self, days: u32) -> Result<PeriodStats> {
        let start = Self::start_date(days);
        let mut stmt = self.conn.prepare(
            "SELECT SUM(duration), COUNT(*), AVG(pause_count)
             FROM practice_sessions
             WHERE date >= ?1",
        )?;
        let (duration, count, avg_pause): (Option<i64>, i64, Option<f64>) =
            stmt.query_row(params![start], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

        let mut dates_stmt = self
            .conn
            .prepare("SELECT DISTINCT date FROM practice_sessions ORDER BY date DESC")?;
        let dates: Vec<NaiveDate> = dates_stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
            .collect();

        Ok(PeriodStats {
            total_duration_secs: duration.unwrap_or(0).max(0) as u64,
            total_count: count.max(0) as u64,
            avg_pause: stats::round1(avg_pause.unwrap_or(0.0)),
            consecutive_days: stats::consecutive_days(&dates, Local::now().date_naive()),
        })
    }

    /// Total practiced seconds per day over the period, oldest first. Feeds
    /// the duration trend chart.
    pub fn daily_durations(&self, days: u32) -> Result<Vec<(NaiveDate, u64)>> {
        let start = Self::start_date(days);
        let mut stmt = self.conn.prepare(
            "SELECT date, SUM(duration)
             FROM practice_sessions
             WHERE date >= ?1
             GROUP BY date
             ORDER BY date",
        )?;
        let rows = stmt.query_map(params![start], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
        })?;

        let mut daily = Vec::new();
        for row in rows {
            let (date, secs) = row?;
            if let Ok(date) = NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
                daily.push((date, secs.unwrap_or(0).max(0) as u64));
            }
        }
        Ok(daily)
    }

    /// Session count per practice type over the period. Feeds the type
    /// distribution chart.
    pub fn type_distribution(&self, days: u32) -> Result<Vec<(String, u64)>> {
        let start = Self::start_date(days);
        let mut stmt = self.conn.prepare(
            "SELECT practice_type, COUNT(*)
             FROM practice_sessions
             WHERE date >= ?1
             GROUP BY practice_type
             ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map(params![start], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                row.get::<_, i64>(1)?,
            ))
        })?;

        let mut distribution = Vec::new();
        for row in rows {
            let (practice_type, count) = row?;
            distribution.push((practice_type, count.max(0) as u64));
        }
        Ok(distribution)
    }

    fn start_date(days: u32) -> String {
        (Local::now() - Duration::days(days as i64))
            .format("%Y-%m-%d")
            .to_string()
    }

    // ---- import / export ----

    /// Copy the live database into `dir` under a timestamped backup name and
    /// return the backup path.
    pub fn export_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        let db_path = self.file_path()?;
        std::fs::create_dir_all(dir)?;
        let backup = dir.join(backup_file_name(Local::now()));
        std::fs::copy(db_path, &backup)?;
        Ok(backup)
    }

    /// Replace the live database with `source` after validating it, backing
    /// the current file up next to it first. Returns the backup path. On any
    /// error the current data is left untouched.
    pub fn import_from(&mut self, source: &Path) -> io::Result<PathBuf> {
        let db_path = self.file_path()?.to_path_buf();
        validate_database_file(source)?;

        let backup_dir = db_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let backup = backup_dir.join(backup_file_name(Local::now()));
        std::fs::copy(&db_path, &backup)?;

        // Close the live connection before overwriting the file underneath it
        let placeholder = Connection::open_in_memory().map_err(sqlite_to_io)?;
        let old = std::mem::replace(&mut self.conn, placeholder);
        old.close().map_err(|(_, e)| sqlite_to_io(e))?;

        std::fs::copy(source, &db_path)?;

        self.conn = Connection::open(&db_path).map_err(sqlite_to_io)?;
        Self::init_schema(&self.conn).map_err(sqlite_to_io)?;
        Ok(backup)
    }

    fn file_path(&self) -> io::Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "store has no backing file (in-memory database)",
            )
        })
    }
}

/// Write session records as CSV, one row per session with a header.
pub fn write_csv(sessions: &[PracticeSession], path: &Path) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for session in sessions {
        writer.serialize(session)?;
    }
    writer.flush()?;
    Ok(())
}

fn backup_file_name(now: DateTime<Local>) -> String {
    format!("practice_backup_{}.db", now.format("%Y%m%d_%H%M%S"))
}

/// A candidate import must be a `.db` sqlite file carrying both application
/// tables.
fn validate_database_file(path: &Path) -> io::Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some("db") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "only .db files can be imported",
        ));
    }
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file: {}", path.display()),
        ));
    }

    let conn = Connection::open(path).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "not a valid database file")
    })?;
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table'")
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "not a valid database file"))?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sqlite_to_io)?
        .filter_map(|r| r.ok())
        .collect();

    if !tables.iter().any(|t| t == "practice_sessions") || !tables.iter().any(|t| t == "settings") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "database is missing the practice_sessions/settings tables",
        ));
    }
    Ok(())
}

fn sqlite_to_io(err: rusqlite::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
