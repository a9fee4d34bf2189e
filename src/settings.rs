use std::fmt;

use crate::store::Db;

/// The four option lists backing the form dropdowns and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum SettingsKey {
    Collections,
    Pieces,
    Sections,
    #[strum(serialize = "Practice types")]
    PracticeTypes,
}

impl SettingsKey {
    pub const ALL: [SettingsKey; 4] = [
        SettingsKey::Collections,
        SettingsKey::Pieces,
        SettingsKey::Sections,
        SettingsKey::PracticeTypes,
    ];

    /// The key string used in the settings table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKey::Collections => "collections",
            SettingsKey::Pieces => "pieces",
            SettingsKey::Sections => "sections",
            SettingsKey::PracticeTypes => "practice_types",
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum SettingsError {
    EmptyEntry,
    DuplicateEntry(String),
    LastEntry,
    Store(rusqlite::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::EmptyEntry => write!(f, "Entry cannot be empty"),
            SettingsError::DuplicateEntry(value) => write!(f, "'{}' already exists", value),
            SettingsError::LastEntry => write!(f, "Keep at least one entry"),
            SettingsError::Store(e) => write!(f, "Settings could not be saved: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<rusqlite::Error> for SettingsError {
    fn from(e: rusqlite::Error) -> Self {
        SettingsError::Store(e)
    }
}

/// In-memory copy of the settings lists. Every mutation validates against
/// the cached copy, writes through to the store, then refreshes the cache
/// from the store so stale state can never linger.
#[derive(Debug, Default, Clone)]
pub struct SettingsCache {
    collections: Vec<String>,
    pieces: Vec<String>,
    sections: Vec<String>,
    practice_types: Vec<String>,
}

impl SettingsCache {
    pub fn load(db: &Db) -> Result<Self, SettingsError> {
        let mut cache = Self::default();
        cache.refresh(db)?;
        Ok(cache)
    }

    pub fn refresh(&mut self, db: &Db) -> Result<(), SettingsError> {
        self.collections = db.setting_list(SettingsKey::Collections.as_str())?;
        self.pieces = db.setting_list(SettingsKey::Pieces.as_str())?;
        self.sections = db.setting_list(SettingsKey::Sections.as_str())?;
        self.practice_types = db.setting_list(SettingsKey::PracticeTypes.as_str())?;
        Ok(())
    }

    pub fn list(&self, key: SettingsKey) -> &[String] {
        match key {
            SettingsKey::Collections => &self.collections,
            SettingsKey::Pieces => &self.pieces,
            SettingsKey::Sections => &self.sections,
            SettingsKey::PracticeTypes => &self.practice_types,
        }
    }

    fn list_mut(&mut self, key: SettingsKey) -> &mut Vec<String> {
        match key {
            SettingsKey::Collections => &mut self.collections,
            SettingsKey::Pieces => &mut self.pieces,
            SettingsKey::Sections => &mut self.sections,
            SettingsKey::PracticeTypes => &mut self.practice_types,
        }
    }

    pub fn add(&mut self, db: &Db, key: SettingsKey, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SettingsError::EmptyEntry);
        }
        if self.list(key).iter().any(|v| v == value) {
            return Err(SettingsError::DuplicateEntry(value.to_string()));
        }
        self.list_mut(key).push(value.to_string());
        self.persist(db, key)
    }

    pub fn rename(
        &mut self,
        db: &Db,
        key: SettingsKey,
        index: usize,
        value: &str,
    ) -> Result<(), SettingsError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SettingsError::EmptyEntry);
        }
        let list = self.list(key);
        if index >= list.len() {
            return Ok(());
        }
        if list.iter().enumerate().any(|(i, v)| i != index && v == value) {
            return Err(SettingsError::DuplicateEntry(value.to_string()));
        }
        self.list_mut(key)[index] = value.to_string();
        self.persist(db, key)
    }

    pub fn remove(&mut self, db: &Db, key: SettingsKey, index: usize) -> Result<(), SettingsError> {
        let list = self.list(key);
        if index >= list.len() {
            return Ok(());
        }
        if list.len() <= 1 {
            return Err(SettingsError::LastEntry);
        }
        self.list_mut(key).remove(index);
        self.persist(db, key)
    }

    /// Move an entry from one position to another, the remove-then-insert
    /// splice of the original drag-and-drop reorder.
    pub fn move_entry(
        &mut self,
        db: &Db,
        key: SettingsKey,
        from: usize,
        to: usize,
    ) -> Result<(), SettingsError> {
        let len = self.list(key).len();
        if from == to || from >= len || to >= len {
            return Ok(());
        }
        let list = self.list_mut(key);
        let entry = list.remove(from);
        list.insert(to, entry);
        self.persist(db, key)
    }

    fn persist(&mut self, db: &Db, key: SettingsKey) -> Result<(), SettingsError> {
        db.put_setting_list(key.as_str(), self.list(key))?;
        self.refresh(db)
    }
}
