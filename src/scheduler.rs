use crate::dispatch::{Event, EventSender};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Named one-shot alarms. Scheduling a name that is already pending
/// replaces it, so a reminder never has two alarms outstanding.
#[async_trait]
pub trait AlarmScheduler: Send + Sync {
    async fn schedule_at(&self, name: &str, when: DateTime<Utc>) -> AppResult<()>;

    /// `true` when a pending alarm was removed.
    async fn cancel(&self, name: &str) -> AppResult<bool>;

    async fn is_scheduled(&self, name: &str) -> bool;
}

struct Alarm {
    when: DateTime<Utc>,
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct AlarmTable {
    alarms: HashMap<String, Alarm>,
    next_generation: u64,
}

/// One sleeping tokio task per alarm. Due alarms post
/// `Event::AlarmFired` to the dispatch queue; deadlines already in the
/// past fire immediately.
pub struct TokioAlarmScheduler {
    events: EventSender,
    table: Arc<Mutex<AlarmTable>>,
}

impl TokioAlarmScheduler {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            table: Arc::new(Mutex::new(AlarmTable::default())),
        }
    }

    /// Pending alarms ordered by deadline.
    pub fn pending(&self) -> Vec<(String, DateTime<Utc>)> {
        let table = lock(&self.table);
        let mut pending: Vec<_> = table
            .alarms
            .iter()
            .map(|(name, alarm)| (name.clone(), alarm.when))
            .collect();
        pending.sort_by_key(|(_, when)| *when);
        pending
    }

    pub fn cancel_all(&self) {
        let mut table = lock(&self.table);
        for (_, alarm) in table.alarms.drain() {
            alarm.handle.abort();
        }
    }
}

fn lock(table: &Mutex<AlarmTable>) -> MutexGuard<'_, AlarmTable> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl AlarmScheduler for TokioAlarmScheduler {
    async fn schedule_at(&self, name: &str, when: DateTime<Utc>) -> AppResult<()> {
        let mut table = lock(&self.table);
        table.next_generation += 1;
        let generation = table.next_generation;

        let delay = (when - Utc::now()).to_std().unwrap_or_default();
        let events = self.events.clone();
        let shared = Arc::clone(&self.table);
        let alarm_name = name.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut table = lock(&shared);
                match table.alarms.get(&alarm_name) {
                    Some(alarm) if alarm.generation == generation => {
                        table.alarms.remove(&alarm_name);
                    }
                    _ => return,
                }
            }
            debug!(alarm = %alarm_name, "alarm fired");
            if let Err(e) = events.send(Event::AlarmFired { name: alarm_name }).await {
                warn!(error = %e, "dropping fired alarm");
            }
        });

        if let Some(previous) = table.alarms.insert(
            name.to_string(),
            Alarm {
                when,
                generation,
                handle,
            },
        ) {
            previous.handle.abort();
            debug!(alarm = %name, previous = %previous.when, "replaced pending alarm");
        }

        debug!(alarm = %name, when = %when, epoch_ms = when.timestamp_millis(), "alarm scheduled");
        Ok(())
    }

    async fn cancel(&self, name: &str) -> AppResult<bool> {
        let removed = lock(&self.table).alarms.remove(name);
        match removed {
            Some(alarm) => {
                alarm.handle.abort();
                debug!(alarm = %name, "alarm cancelled");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn is_scheduled(&self, name: &str) -> bool {
        lock(&self.table).alarms.contains_key(name)
    }
}
