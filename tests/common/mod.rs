#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use natural_reminders::error::{AppError, AppResult};
use natural_reminders::notifier::{Notification, Notifier};
use natural_reminders::reminder::{Reminder, ReminderUpdate};
use natural_reminders::scheduler::AlarmScheduler;
use natural_reminders::settings::Settings;
use natural_reminders::storage::{MemoryStore, ReminderStore, StoredReminder};
use natural_reminders::Reconciler;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn record(id: &str, date: &str, time: &str) -> Value {
    json!({
        "id": id,
        "title": format!("reminder {}", id),
        "date": date,
        "time": time,
        "completed": false,
        "notification": true,
    })
}

pub fn monthly(id: &str, date: &str, time: &str, end_date: Option<&str>) -> Value {
    let mut value = record(id, date, time);
    value["recurring"] = json!({
        "type": "monthly",
        "interval": 1,
        "endDate": end_date,
    });
    value
}

/// Records every alarm it is asked to arm; nothing ever fires.
#[derive(Default)]
pub struct SpyScheduler {
    alarms: Mutex<BTreeMap<String, DateTime<Utc>>>,
    scheduled: Mutex<Vec<String>>,
}

impl SpyScheduler {
    pub fn alarm(&self, name: &str) -> Option<DateTime<Utc>> {
        self.alarms.lock().unwrap().get(name).copied()
    }

    pub fn schedule_count(&self, name: &str) -> usize {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl AlarmScheduler for SpyScheduler {
    async fn schedule_at(&self, name: &str, when: DateTime<Utc>) -> AppResult<()> {
        self.alarms.lock().unwrap().insert(name.to_string(), when);
        self.scheduled.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn cancel(&self, name: &str) -> AppResult<bool> {
        Ok(self.alarms.lock().unwrap().remove(name).is_some())
    }

    async fn is_scheduled(&self, name: &str) -> bool {
        self.alarms.lock().unwrap().contains_key(name)
    }
}

#[derive(Default)]
pub struct SpyNotifier {
    shown: Mutex<Vec<(String, Notification)>>,
    cleared: Mutex<Vec<String>>,
    failing: bool,
}

impl SpyNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn shown(&self) -> Vec<(String, Notification)> {
        self.shown.lock().unwrap().clone()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for SpyNotifier {
    async fn notify(&self, id: &str, notification: Notification) -> AppResult<()> {
        if self.failing {
            return Err(AppError::notifier("notification service unavailable"));
        }
        self.shown
            .lock()
            .unwrap()
            .push((id.to_string(), notification));
        Ok(())
    }

    async fn clear(&self, id: &str) -> AppResult<()> {
        self.cleared.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// Store whose updates fail for the listed ids.
pub struct FlakyStore {
    inner: MemoryStore,
    failing: HashSet<String>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: failing.iter().map(|id| id.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ReminderStore for FlakyStore {
    async fn get_all(&self) -> AppResult<Vec<StoredReminder>> {
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<Reminder>> {
        self.inner.get_by_id(id).await
    }

    async fn save_all(&self, reminders: &[Reminder]) -> AppResult<()> {
        self.inner.save_all(reminders).await
    }

    async fn update_by_id(&self, id: &str, update: ReminderUpdate) -> AppResult<Option<Reminder>> {
        if self.failing.contains(id) {
            return Err(AppError::storage(format!("disk full writing {}", id)));
        }
        self.inner.update_by_id(id, update).await
    }

    async fn insert(&self, reminder: Reminder) -> AppResult<()> {
        self.inner.insert(reminder).await
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<bool> {
        self.inner.delete_by_id(id).await
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub scheduler: Arc<SpyScheduler>,
    pub notifier: Arc<SpyNotifier>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new(records: Vec<Value>) -> Self {
        Self::with_notifier(records, SpyNotifier::default())
    }

    pub fn with_notifier(records: Vec<Value>, notifier: SpyNotifier) -> Self {
        let store = Arc::new(MemoryStore::from_records(records));
        let scheduler = Arc::new(SpyScheduler::default());
        let notifier = Arc::new(notifier);
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            scheduler.clone(),
            notifier.clone(),
            Settings::default(),
        ));
        Self {
            store,
            scheduler,
            notifier,
            reconciler,
        }
    }

    pub async fn reminder(&self, id: &str) -> Reminder {
        self.store.get_by_id(id).await.unwrap().unwrap()
    }
}
