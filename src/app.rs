use crate::config::APP_DIR_NAME;
use crate::error::{AppError, AppResult};
use crate::notifier::Notifier;
use crate::reconcile::Reconciler;
use crate::reminder::{NewReminder, Reminder, ReminderUpdate};
use crate::scheduler::AlarmScheduler;
use crate::settings::{Settings, SettingsStore};
use crate::storage::{CategoryStore, JsonFileStore, ReminderStore};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Application state owned by the process entry point and handed down.
pub struct App {
    pub store: Arc<JsonFileStore>,
    pub settings_store: SettingsStore,
    pub settings: Settings,
}

impl App {
    pub fn default_data_dir() -> AppResult<PathBuf> {
        Ok(dirs::data_local_dir()
            .ok_or_else(|| AppError::config("Failed to get local data dir"))?
            .join(APP_DIR_NAME))
    }

    pub async fn open(data_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let data_dir = data_dir.into();
        let store = Arc::new(JsonFileStore::open(&data_dir).await?);
        let settings_store = SettingsStore::from_dir(&data_dir);
        let settings = settings_store.load_or_init().await?;

        info!(data_dir = %data_dir.display(), "application state loaded");
        Ok(Self {
            store,
            settings_store,
            settings,
        })
    }

    pub fn reconciler(
        &self,
        scheduler: Arc<dyn AlarmScheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Reconciler {
        Reconciler::new(
            self.store.clone(),
            scheduler,
            notifier,
            self.settings.clone(),
        )
    }

    /// Applies a partial edit as one whole-record replace. A running
    /// service notices a changed due time through its stale-alarm check or
    /// the next rescan.
    pub async fn edit_reminder(&self, id: &str, update: ReminderUpdate) -> AppResult<Reminder> {
        if update.is_empty() {
            return Err(AppError::validation("nothing to change"));
        }
        if let Some(Some(category_id)) = &update.category_id {
            self.ensure_category(category_id).await?;
        }
        if let Some(Some(rule)) = &update.recurring {
            rule.validate()?;
        }

        let reminder = self
            .store
            .update_by_id(id, update)
            .await?
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
        info!(reminder = %id, due = %reminder.due_at(), "reminder edited");
        Ok(reminder)
    }

    async fn ensure_category(&self, category_id: &str) -> AppResult<()> {
        if self.store.get_category(category_id).await?.is_none() {
            return Err(AppError::not_found(format!("category {}", category_id)));
        }
        Ok(())
    }

    /// Fills in the configured defaults, checks the category and stores
    /// the reminder.
    pub async fn add_reminder(&self, mut new: NewReminder) -> AppResult<Reminder> {
        if let Some(category_id) = &new.category_id {
            self.ensure_category(category_id).await?;
        }
        new.tags.extend(self.settings.default_tags.iter().cloned());

        let reminder = new.into_reminder()?;
        self.store.insert(reminder.clone()).await?;
        info!(reminder = %reminder.id, due = %reminder.due_at(), "reminder added");
        Ok(reminder)
    }

    /// Reminders ordered by due time, open ones only unless `all`.
    pub async fn list_reminders(&self, all: bool) -> AppResult<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = self
            .store
            .get_reminders()
            .await?
            .into_iter()
            .filter(|r| all || !r.completed)
            .collect();
        reminders.sort_by_key(|r| r.due_at());
        Ok(reminders)
    }

    pub async fn get_reminder(&self, id: &str) -> AppResult<Reminder> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))
    }

    pub async fn delete_reminder(&self, id: &str) -> AppResult<()> {
        if !self.store.delete_by_id(id).await? {
            return Err(AppError::not_found(format!("reminder {}", id)));
        }
        info!(reminder = %id, "reminder deleted");
        Ok(())
    }

    pub async fn save_settings(&mut self, settings: Settings) -> AppResult<()> {
        self.settings_store.save(&settings).await?;
        self.settings = settings;
        Ok(())
    }
}

/// Due timestamp for user input. A missing time uses `default_time`; a
/// missing date means today, or tomorrow when that time already passed.
pub fn resolve_due(
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    default_time: NaiveTime,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let time = time.unwrap_or(default_time);
    match date {
        Some(date) => date.and_time(time),
        None => {
            let today = now.date().and_time(time);
            if today > now {
                today
            } else {
                today.checked_add_days(Days::new(1)).unwrap_or(today)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{parse_date, parse_time};
    use tempfile::tempdir;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_date(date).unwrap().and_time(parse_time(time).unwrap())
    }

    #[test]
    fn test_resolve_due_rolls_to_tomorrow() {
        let nine = parse_time("09:00").unwrap();
        let now = at("2024-03-10", "10:00");
        assert_eq!(resolve_due(None, None, nine, now), at("2024-03-11", "09:00"));
        assert_eq!(
            resolve_due(None, Some(parse_time("18:30").unwrap()), nine, now),
            at("2024-03-10", "18:30")
        );
        assert_eq!(
            resolve_due(Some(parse_date("2024-01-01").unwrap()), None, nine, now),
            at("2024-01-01", "09:00")
        );
    }

    #[tokio::test]
    async fn test_add_reminder_applies_defaults_and_checks_category() {
        let dir = tempdir().expect("tempdir");
        let mut app = App::open(dir.path()).await.unwrap();
        let mut settings = app.settings.clone();
        settings.set("default-tags", "inbox").unwrap();
        app.save_settings(settings).await.unwrap();

        let mut new = NewReminder::new("Buy milk", at("2024-03-10", "17:00"));
        new.category_id = Some("groceries".to_string());
        assert!(matches!(
            app.add_reminder(new.clone()).await,
            Err(AppError::NotFound(_))
        ));

        new.category_id = Some("home".to_string());
        let added = app.add_reminder(new).await.unwrap();
        assert!(added.tags.contains("inbox"));
        assert_eq!(app.get_reminder(&added.id).await.unwrap(), added);

        app.delete_reminder(&added.id).await.unwrap();
        assert!(app.list_reminders(true).await.unwrap().is_empty());
        assert!(app.delete_reminder(&added.id).await.is_err());
    }
}
