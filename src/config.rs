//! User settings and data directory layout.
//!
//! Everything lives in one directory: `~/.countdown/` by default, or the
//! directory holding the file passed to `--db`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::write_atomic;
use crate::error::ConfigError;

pub const TASKS_FILE: &str = "tasks.json";
pub const REMINDERS_FILE: &str = "reminders.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Plan reminders when tasks are created or edited.
    pub notifications_enabled: bool,
    /// Principal that new tasks belong to and listings are filtered by.
    pub owner: String,
    /// Also re-plan reminders when a recurring task rolls over on refresh.
    pub replan_on_rollover: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            notifications_enabled: true,
            owner: "local".to_string(),
            replan_on_rollover: false,
        }
    }
}

impl Settings {
    /// Load settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let mut buf = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&buf).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        write_atomic(path, data.as_bytes()).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }
}

/// Resolved locations of the data files.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub tasks: PathBuf,
    pub reminders: PathBuf,
    pub settings: PathBuf,
}

impl DataPaths {
    /// Lay out the data files, honouring an explicit task file path.
    pub fn resolve(db: Option<&Path>, home: Option<&Path>) -> Self {
        let (dir, tasks) = match db {
            Some(db) => {
                let dir = db
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."))
                    .to_path_buf();
                (dir, db.to_path_buf())
            }
            None => {
                let dir = home.unwrap_or_else(|| Path::new(".")).join(".countdown");
                let tasks = dir.join(TASKS_FILE);
                (dir, tasks)
            }
        };
        DataPaths {
            reminders: dir.join(REMINDERS_FILE),
            settings: dir.join(SETTINGS_FILE),
            tasks,
            dir,
        }
    }
}
