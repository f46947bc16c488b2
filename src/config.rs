/// Application configuration constants
///
/// Centralized configuration for the reminders service.

/// Folder under the platform data dir holding storage, settings and logs
pub const APP_DIR_NAME: &str = "NaturalReminders";

/// Key-value document holding reminders and categories
pub const STORAGE_FILE: &str = "storage.json";

/// User settings document
pub const SETTINGS_FILE: &str = "settings.json";

/// Log file prefix, rotated daily
pub const LOG_FILE_PREFIX: &str = "reminders.log";

/// Reserved id of the always-present category
pub const DEFAULT_CATEGORY_ID: &str = "default";

/// Notification ids are the reminder id with this prefix
pub const NOTIFICATION_PREFIX: &str = "reminder-";

/// Notification button order; the index comes back with the click
pub const ACTION_COMPLETE: usize = 0;
pub const ACTION_SNOOZE: usize = 1;

/// Snooze length bounds in minutes
pub const DEFAULT_SNOOZE_MINUTES: u32 = 5;
pub const MIN_SNOOZE_MINUTES: u32 = 1;
pub const MAX_SNOOZE_MINUTES: u32 = 60;

/// How often a live session rescans the store for reminders written elsewhere
pub const DEFAULT_RESCAN_SECS: u64 = 60;

/// Inbound event queue depth
pub const EVENT_QUEUE_CAPACITY: usize = 64;
