//! Brings alarms and reminder state back in line with the wall clock.
//!
//! Every state change goes through the store as one whole-record replace
//! before the matching alarm is registered. Alarm names are reminder ids,
//! so re-registering is always safe.

use crate::config::{ACTION_COMPLETE, ACTION_SNOOZE, NOTIFICATION_PREFIX};
use crate::error::{AppError, AppResult};
use crate::notifier::{Notification, Notifier};
use crate::recurrence::next_occurrence;
use crate::reminder::{local_instant, Reminder, ReminderUpdate};
use crate::scheduler::AlarmScheduler;
use crate::settings::Settings;
use crate::storage::ReminderStore;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not due yet; alarm registered at its due time.
    Scheduled,
    /// Recurring and due; moved to its next occurrence and re-armed.
    Advanced(NaiveDateTime),
    /// One-shot and due, or recurrence ended.
    Completed,
    /// Already pending, completed, or gone; nothing to do.
    Untouched,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub scheduled: usize,
    pub advanced: usize,
    pub completed: usize,
    pub fired: usize,
    /// Transient failures, retried on the next trigger.
    pub skipped: usize,
    /// Records that failed validation and were left alone.
    pub invalid: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Scheduled => self.scheduled += 1,
            Outcome::Advanced(_) => self.advanced += 1,
            Outcome::Completed => self.completed += 1,
            Outcome::Untouched => {}
        }
    }

    fn record_error(&mut self, id: &str, error: &AppError) {
        if error.is_transient() {
            warn!(reminder = %id, error = %error, "skipping reminder for this pass");
            self.skipped += 1;
        } else {
            warn!(reminder = %id, error = %error, "reminder left untouched");
            self.invalid += 1;
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

pub fn notification_id(reminder_id: &str) -> String {
    format!("{}{}", NOTIFICATION_PREFIX, reminder_id)
}

pub struct Reconciler {
    store: Arc<dyn ReminderStore>,
    scheduler: Arc<dyn AlarmScheduler>,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        scheduler: Arc<dyn AlarmScheduler>,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            scheduler,
            notifier,
            settings,
        }
    }

    /// Startup pass over every non-completed reminder. Missed reminders are
    /// settled without a notification.
    pub async fn reconcile(&self, now: NaiveDateTime) -> AppResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for stored in self.store.get_all().await? {
            let reminder = match stored {
                Ok(reminder) => reminder,
                Err(rejected) => {
                    warn!(%rejected, "malformed reminder excluded from reconciliation");
                    report.invalid += 1;
                    continue;
                }
            };
            if reminder.completed {
                continue;
            }

            let id = reminder.id.clone();
            match self.reconcile_reminder(reminder, now).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => report.record_error(&id, &e),
            }
        }

        info!(?report, %now, "reconciliation pass complete");
        Ok(report)
    }

    pub async fn reconcile_reminder(
        &self,
        reminder: Reminder,
        now: NaiveDateTime,
    ) -> AppResult<Outcome> {
        if reminder.completed {
            return Ok(Outcome::Untouched);
        }
        if !reminder.is_due(now) {
            self.arm(&reminder.id, reminder.due_at()).await?;
            return Ok(Outcome::Scheduled);
        }
        self.settle_due(reminder, now).await
    }

    /// Live pass for a running session: arms reminders that have no alarm
    /// yet and fires overdue ones nobody scheduled (written by another
    /// process). Pending alarms are left to fire on their own.
    pub async fn rescan(&self, now: NaiveDateTime) -> AppResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for stored in self.store.get_all().await? {
            let Ok(reminder) = stored else {
                report.invalid += 1;
                continue;
            };
            if reminder.completed || self.scheduler.is_scheduled(&reminder.id).await {
                continue;
            }

            let id = reminder.id.clone();
            let result = if !reminder.is_due(now) {
                self.reconcile_reminder(reminder, now).await
            } else {
                report.fired += 1;
                self.fire(reminder, now).await
            };
            match result {
                Ok(outcome) => report.record(outcome),
                Err(e) => report.record_error(&id, &e),
            }
        }

        Ok(report)
    }

    /// Alarm named `name` went off.
    pub async fn on_alarm(&self, name: &str, now: NaiveDateTime) -> AppResult<Outcome> {
        let Some(reminder) = self.store.get_by_id(name).await? else {
            debug!(alarm = %name, "alarm for deleted reminder ignored");
            return Ok(Outcome::Untouched);
        };
        if reminder.completed {
            debug!(alarm = %name, "alarm for completed reminder ignored");
            return Ok(Outcome::Untouched);
        }

        if !reminder.is_due(now) {
            // edited or snoozed after this alarm was armed
            self.arm(&reminder.id, reminder.due_at()).await?;
            return Ok(Outcome::Scheduled);
        }

        self.fire(reminder, now).await
    }

    async fn fire(&self, reminder: Reminder, now: NaiveDateTime) -> AppResult<Outcome> {
        if reminder.notification {
            self.notifier
                .notify(&notification_id(&reminder.id), self.notification_for(&reminder))
                .await?;
        }
        self.settle_due(reminder, now).await
    }

    /// Due branch: advance a recurring reminder or complete it.
    async fn settle_due(&self, reminder: Reminder, now: NaiveDateTime) -> AppResult<Outcome> {
        let next = match &reminder.recurring {
            Some(rule) => next_occurrence(reminder.due_at(), rule, now),
            None => None,
        };

        match next {
            Some(next) => {
                if self
                    .store
                    .update_by_id(&reminder.id, ReminderUpdate::due_at(next))
                    .await?
                    .is_none()
                {
                    return Ok(Outcome::Untouched);
                }
                self.arm(&reminder.id, next).await?;
                info!(reminder = %reminder.id, %next, "recurring reminder advanced");
                Ok(Outcome::Advanced(next))
            }
            None => {
                if self
                    .store
                    .update_by_id(&reminder.id, ReminderUpdate::completed(true))
                    .await?
                    .is_none()
                {
                    return Ok(Outcome::Untouched);
                }
                if reminder.is_recurring() {
                    info!(reminder = %reminder.id, "recurrence ended, reminder completed");
                } else {
                    info!(reminder = %reminder.id, "reminder completed");
                }
                Ok(Outcome::Completed)
            }
        }
    }

    /// A notification button was clicked.
    pub async fn on_notification_action(
        &self,
        notification_id: &str,
        action_index: usize,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        let id = notification_id
            .strip_prefix(NOTIFICATION_PREFIX)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::validation(format!("unknown notification `{}`", notification_id))
            })?;

        let result = match action_index {
            ACTION_COMPLETE => self.complete(id).await.map(drop),
            ACTION_SNOOZE => self.snooze(id, now).await.map(drop),
            other => {
                warn!(notification = %notification_id, action = other, "unknown notification action");
                Ok(())
            }
        };

        if let Err(e) = self.notifier.clear(notification_id).await {
            warn!(notification = %notification_id, error = %e, "failed to clear notification");
        }
        result
    }

    /// Completes the reminder even if it recurs and drops its pending alarm.
    pub async fn complete(&self, id: &str) -> AppResult<Reminder> {
        let reminder = self
            .store
            .update_by_id(id, ReminderUpdate::completed(true))
            .await?
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
        self.scheduler.cancel(id).await?;
        info!(reminder = %id, "reminder completed by user");
        Ok(reminder)
    }

    /// Moves the reminder to `now + snooze` and re-arms it. Recurrence is
    /// left as it is; completed reminders can't be snoozed.
    pub async fn snooze(&self, id: &str, now: NaiveDateTime) -> AppResult<Reminder> {
        let current = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
        if current.completed {
            return Err(AppError::validation(format!(
                "reminder {} is completed, reopen it first",
                id
            )));
        }

        let until = now + Duration::minutes(i64::from(self.settings.snooze_minutes));
        let reminder = self
            .store
            .update_by_id(id, ReminderUpdate::due_at(until))
            .await?
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
        self.arm(id, reminder.due_at()).await?;
        info!(reminder = %id, until = %reminder.due_at(), "reminder snoozed");
        Ok(reminder)
    }

    fn notification_for(&self, reminder: &Reminder) -> Notification {
        Notification {
            title: reminder.title.clone(),
            body: reminder.description.clone().unwrap_or_default(),
            actions: vec![
                "Complete".to_string(),
                format!("Snooze ({} min)", self.settings.snooze_minutes),
            ],
            silent: !self.settings.notification_sound,
        }
    }

    async fn arm(&self, id: &str, at: NaiveDateTime) -> AppResult<()> {
        self.scheduler.schedule_at(id, local_instant(at)).await
    }
}
