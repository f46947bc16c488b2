use crate::config::{
    DEFAULT_SNOOZE_MINUTES, MAX_SNOOZE_MINUTES, MIN_SNOOZE_MINUTES, SETTINGS_FILE,
};
use crate::error::{AppError, AppResult};
use crate::reminder::{parse_time, Priority};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// User preferences that affect scheduling and new reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    #[serde(default = "default_reminder_time")]
    pub default_reminder_time: String,
    #[serde(default)]
    pub default_priority: Priority,
    #[serde(default)]
    pub default_tags: BTreeSet<String>,
    #[serde(default = "default_notification_sound")]
    pub notification_sound: bool,
}

fn default_snooze_minutes() -> u32 {
    DEFAULT_SNOOZE_MINUTES
}

fn default_reminder_time() -> String {
    "09:00".to_string()
}

fn default_notification_sound() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            snooze_minutes: default_snooze_minutes(),
            default_reminder_time: default_reminder_time(),
            default_priority: Priority::default(),
            default_tags: BTreeSet::new(),
            notification_sound: default_notification_sound(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> AppResult<()> {
        if !(MIN_SNOOZE_MINUTES..=MAX_SNOOZE_MINUTES).contains(&self.snooze_minutes) {
            return Err(AppError::validation(format!(
                "snooze minutes must be between {} and {}, got {}",
                MIN_SNOOZE_MINUTES, MAX_SNOOZE_MINUTES, self.snooze_minutes
            )));
        }
        self.reminder_time()?;
        Ok(())
    }

    pub fn reminder_time(&self) -> AppResult<NaiveTime> {
        parse_time(&self.default_reminder_time)
    }

    /// Sets one field from its kebab-case name, as typed on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let mut next = self.clone();
        match key {
            "snooze-minutes" => {
                next.snooze_minutes = value.trim().parse().map_err(|_| {
                    AppError::validation(format!("`{}` is not a number of minutes", value))
                })?;
            }
            "default-reminder-time" => {
                let time = parse_time(value)?;
                next.default_reminder_time = time.format("%H:%M").to_string();
            }
            "default-priority" => next.default_priority = value.parse()?,
            "default-tags" => {
                next.default_tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "notification-sound" => {
                next.notification_sound = value.trim().parse().map_err(|_| {
                    AppError::validation(format!("`{}` is not true or false", value))
                })?;
            }
            other => {
                return Err(AppError::validation(format!("unknown setting `{}`", other)));
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings, writing defaults on first run. Out-of-range
    /// values fall back to defaults rather than failing startup.
    pub async fn load_or_init(&self) -> AppResult<Settings> {
        if !fs::try_exists(&self.path).await? {
            let settings = Settings::default();
            self.save(&settings).await?;
            return Ok(settings);
        }

        let raw = fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::config(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let mut settings: Settings = serde_json::from_str(&raw).map_err(|e| {
            AppError::config(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        if let Err(e) = settings.validate() {
            warn!(error = %e, "invalid settings, restoring defaults");
            settings = Settings::default();
        }
        if self.migrate(&mut settings) {
            self.save(&settings).await?;
        }
        Ok(settings)
    }

    pub async fn save(&self, settings: &Settings) -> AppResult<()> {
        settings.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::config(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let text = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, text).await.map_err(|e| {
            AppError::config(format!("failed to write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    pub async fn reset(&self) -> AppResult<Settings> {
        let settings = Settings::default();
        self.save(&settings).await?;
        Ok(settings)
    }

    fn migrate(&self, settings: &mut Settings) -> bool {
        if settings.schema_version >= CURRENT_SCHEMA_VERSION {
            return false;
        }

        warn!(
            from = settings.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating settings schema"
        );
        settings.schema_version = CURRENT_SCHEMA_VERSION;
        true
    }
}
