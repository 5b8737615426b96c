//! Global urd configuration.

use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use crate::error::{UrdError, UrdResult};
use crate::schedule::Increment;

static DEFAULT_REMINDER_FILE: &str = "~/.reminders";
static DEFAULT_EDITOR: &str = "$EDITOR +%line% %file%";

fn default_remind_command() -> String {
    "remind".to_string()
}

fn default_reminder_files() -> Vec<PathBuf> {
    vec![PathBuf::from(DEFAULT_REMINDER_FILE)]
}

fn default_editor() -> String {
    DEFAULT_EDITOR.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_increment() -> u32 {
    60
}

fn default_add_template() -> String {
    "REM %monname% %mday% %year% MSG %".to_string()
}

fn default_add_timed_template() -> String {
    "REM %monname% %mday% %year% AT %hour%:%min% DURATION %dura% MSG %".to_string()
}

fn default_time_column_width() -> u16 {
    6
}

fn default_idle_advance_minutes() -> i64 {
    5
}

/// Configuration at ~/.config/urd/config.toml
#[derive(Debug, Deserialize, Clone)]
pub struct UrdConfig {
    #[serde(default = "default_remind_command")]
    pub remind_command: String,

    #[serde(default = "default_reminder_files")]
    pub reminder_files: Vec<PathBuf>,

    /// Enables the task source when set.
    #[serde(default)]
    pub task_command: Option<String>,

    #[serde(default)]
    pub task_file: Option<PathBuf>,

    /// Editor command with `%file%` and `%line%` placeholders.
    #[serde(default = "default_editor")]
    pub editor: String,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_increment")]
    pub default_increment: u32,

    #[serde(default = "default_add_template")]
    pub add_template: String,

    #[serde(default = "default_add_timed_template")]
    pub add_timed_template: String,

    #[serde(default = "default_time_column_width")]
    pub time_column_width: u16,

    #[serde(default = "default_idle_advance_minutes")]
    pub idle_advance_minutes: i64,
}

impl Default for UrdConfig {
    fn default() -> Self {
        UrdConfig {
            remind_command: default_remind_command(),
            reminder_files: default_reminder_files(),
            task_command: None,
            task_file: None,
            editor: default_editor(),
            refresh_interval_secs: default_refresh_interval_secs(),
            default_increment: default_increment(),
            add_template: default_add_template(),
            add_timed_template: default_add_timed_template(),
            time_column_width: default_time_column_width(),
            idle_advance_minutes: default_idle_advance_minutes(),
        }
    }
}

impl UrdConfig {
    pub fn config_path() -> UrdResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| UrdError::Config("Could not determine config directory".into()))?
            .join("urd");

        Ok(config_dir.join("config.toml"))
    }

    /// Load ~/.config/urd/config.toml, writing a commented default first if missing.
    pub fn load() -> UrdResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> UrdResult<Self> {
        let config: UrdConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .build()
            .map_err(|e| UrdError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| UrdError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> UrdResult<()> {
        if Increment::from_minutes(self.default_increment).is_none() {
            return Err(UrdError::Config(format!(
                "default_increment must be 15, 30 or 60 (got {})",
                self.default_increment
            )));
        }
        if self.reminder_files.is_empty() {
            return Err(UrdError::Config("reminder_files must not be empty".into()));
        }
        Ok(())
    }

    pub fn increment(&self) -> Increment {
        Increment::from_minutes(self.default_increment).unwrap_or_default()
    }

    /// Reminder files with `~` expanded.
    pub fn reminder_paths(&self) -> Vec<PathBuf> {
        self.reminder_files.iter().map(|p| expand_path(p)).collect()
    }

    pub fn task_path(&self) -> Option<PathBuf> {
        self.task_file.as_deref().map(expand_path)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> UrdResult<()> {
        let contents = format!(
            "\
# urd configuration

# The remind binary:
# remind_command = \"remind\"

# Reminder files, the first one receives new events:
# reminder_files = [\"{DEFAULT_REMINDER_FILE}\"]

# Task tool (enables the task source):
# task_command = \"p2\"
# task_file = \"~/tasks.json\"

# Editor, %file% and %line% are substituted:
# editor = \"{DEFAULT_EDITOR}\"

# Seconds between background reloads:
# refresh_interval_secs = 60

# Slot size in minutes (15, 30 or 60):
# default_increment = 60
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                UrdError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| UrdError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
