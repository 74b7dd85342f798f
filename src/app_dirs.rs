use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("quizzr"),
            )
        } else {
            ProjectDirs::from("", "", "quizzr")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// SQLite database holding the attempt history.
    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("attempts.db"))
    }

    /// Directory of per-quiz in-progress snapshots.
    pub fn progress_dir() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("progress"))
    }
}
