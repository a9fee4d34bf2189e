use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "etude";

/// Directory holding the database: XDG state under $HOME when it is set,
/// the platform data dir otherwise.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Some(
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME),
        );
    }
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().to_path_buf())
}

pub fn db_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("practice.db"))
}

/// File for per-machine UI preferences, kept apart from the data that
/// export/import moves around.
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_lives_in_the_state_dir() {
        let Some(db) = db_path() else { return };
        assert!(db.ends_with("practice.db"));
        assert_eq!(db.parent(), state_dir().as_deref());
    }

    #[test]
    fn config_is_separate_from_state() {
        if let (Some(cfg), Some(state)) = (config_path(), state_dir()) {
            assert!(cfg.ends_with("config.json"));
            assert_ne!(cfg.parent(), Some(state.as_path()));
        }
    }
}
