use super::{CategoryStore, Document, ReminderStore, StoredReminder};
use crate::category::Category;
use crate::error::AppResult;
use crate::reminder::{Reminder, ReminderUpdate};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// Process-local store with the same record semantics as the file store.
#[derive(Debug)]
pub struct MemoryStore {
    document: Mutex<Document>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            document: Mutex::new(Document::seeded()),
        }
    }

    /// Raw records, decoded lazily like the file store does.
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut document = Document::seeded();
        document.reminders = records;
        Self {
            document: Mutex::new(document),
        }
    }

    pub fn snapshot(&self) -> Document {
        self.lock().clone()
    }

    /// Lock the document, recovering from poison if needed
    fn lock(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn get_all(&self) -> AppResult<Vec<StoredReminder>> {
        Ok(self.lock().decode_all())
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<Reminder>> {
        self.lock().get(id)
    }

    async fn save_all(&self, reminders: &[Reminder]) -> AppResult<()> {
        self.lock().replace_all(reminders)
    }

    async fn update_by_id(&self, id: &str, update: ReminderUpdate) -> AppResult<Option<Reminder>> {
        self.lock().update(id, update)
    }

    async fn insert(&self, reminder: Reminder) -> AppResult<()> {
        self.lock().insert(reminder)
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<bool> {
        Ok(self.lock().delete(id))
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn get_all_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.lock().categories())
    }

    async fn save_categories(&self, categories: &[Category]) -> AppResult<()> {
        self.lock().set_categories(categories)
    }
}
