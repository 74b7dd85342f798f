use crate::app_dirs::AppDirs;
use crate::question::Question;
use crate::session::{Mode, Phase};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Abstract key-value capability so the engine can run against any storage
/// backend and tests can use an in-memory fake.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn delete(&self, key: &str) -> io::Result<()>;
}

/// Production store: one JSON file per key under the app state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let dir = AppDirs::progress_dir().unwrap_or_else(|| PathBuf::from("quizzr_progress"));
        Self { dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are derived from validated quiz ids, so they are already safe
        // file name material.
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory fake for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Serializable projection of in-progress session state. Written only while
/// the phase is in-progress; a payload missing `answers` is treated as
/// corrupt and ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub mode: Option<Mode>,
    pub phase: Phase,
    pub questions: Vec<Question>,
    pub original_questions: Vec<Question>,
    pub answers: HashMap<String, usize>,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub is_mode_locked: bool,
}

/// Per-quiz durable slot for in-progress attempts.
pub struct ProgressStore {
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}

fn persist_key(quiz_id: &str) -> String {
    format!("quiz-progress-{}", quiz_id)
}

impl ProgressStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn file_backed() -> Self {
        Self::new(Box::new(FileStore::new()))
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Best-effort write of the current snapshot. Storage failures are
    /// swallowed; losing a snapshot only costs reload resilience.
    pub fn save(&self, quiz_id: &str, snapshot: &Snapshot) {
        if let Ok(json) = serde_json::to_string(snapshot) {
            let _ = self.store.set(&persist_key(quiz_id), &json);
        }
    }

    /// Read the stored snapshot, failing open: unreadable or malformed
    /// payloads (including ones without an `answers` field) come back as
    /// `None` so initialization degrades to a fresh session.
    pub fn load(&self, quiz_id: &str) -> Option<Snapshot> {
        let raw = self.store.get(&persist_key(quiz_id))?;
        serde_json::from_str(&raw).ok()
    }

    pub fn clear(&self, quiz_id: &str) {
        let _ = self.store.delete(&persist_key(quiz_id));
    }
}
