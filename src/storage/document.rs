use super::{RejectedRecord, StoredReminder};
use crate::category::{self, Category};
use crate::error::{AppError, AppResult};
use crate::reminder::{Reminder, ReminderUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// The key-value document behind every store: raw reminder records plus
/// categories. Records are kept as JSON so malformed ones can be preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub reminders: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Value>>,
}

pub fn decode_record(value: &Value) -> StoredReminder {
    let id = record_id(value).map(str::to_string);
    let reminder: Reminder =
        serde_json::from_value(value.clone()).map_err(|e| RejectedRecord {
            id: id.clone(),
            reason: e.to_string(),
        })?;
    reminder.validate().map_err(|e| RejectedRecord {
        id,
        reason: e.to_string(),
    })?;
    Ok(reminder)
}

fn record_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

impl Document {
    /// Fresh document with the first-run categories.
    pub fn seeded() -> Self {
        let categories = category::seed_categories()
            .iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect();
        Self {
            reminders: Vec::new(),
            categories: Some(categories),
        }
    }

    pub fn decode_all(&self) -> Vec<StoredReminder> {
        self.reminders.iter().map(decode_record).collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.reminders.iter().position(|r| record_id(r) == Some(id))
    }

    pub fn get(&self, id: &str) -> AppResult<Option<Reminder>> {
        match self.position(id) {
            Some(idx) => decode_record(&self.reminders[idx])
                .map(Some)
                .map_err(|rejected| AppError::validation(rejected.to_string())),
            None => Ok(None),
        }
    }

    pub fn update(&mut self, id: &str, update: ReminderUpdate) -> AppResult<Option<Reminder>> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        let mut reminder = decode_record(&self.reminders[idx])
            .map_err(|rejected| AppError::validation(rejected.to_string()))?;
        reminder.apply(update);
        reminder.validate()?;
        self.reminders[idx] = serde_json::to_value(&reminder)?;
        Ok(Some(reminder))
    }

    pub fn insert(&mut self, reminder: Reminder) -> AppResult<()> {
        reminder.validate()?;
        if self.position(&reminder.id).is_some() {
            return Err(AppError::validation(format!(
                "reminder {} already exists",
                reminder.id
            )));
        }
        self.reminders.push(serde_json::to_value(&reminder)?);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.reminders.len();
        self.reminders.retain(|r| record_id(r) != Some(id));
        self.reminders.len() != before
    }

    /// Replaces every decodable record. Rejected records whose id isn't
    /// being written are kept as they are.
    pub fn replace_all(&mut self, reminders: &[Reminder]) -> AppResult<()> {
        let mut ids = HashSet::new();
        let mut records = Vec::with_capacity(reminders.len());
        for reminder in reminders {
            reminder.validate()?;
            if !ids.insert(reminder.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate reminder id {}",
                    reminder.id
                )));
            }
            records.push(serde_json::to_value(reminder)?);
        }

        let kept = self.reminders.iter().filter(|raw| {
            decode_record(raw).is_err() && !record_id(raw).is_some_and(|id| ids.contains(id))
        });
        let mut merged: Vec<Value> = kept.cloned().collect();
        merged.extend(records);
        self.reminders = merged;
        Ok(())
    }

    pub fn categories(&self) -> Vec<Category> {
        let stored = self
            .categories
            .iter()
            .flatten()
            .filter_map(|raw| match serde_json::from_value::<Category>(raw.clone()) {
                Ok(category) => Some(category),
                Err(e) => {
                    warn!(error = %e, "skipping malformed category");
                    None
                }
            })
            .collect();
        category::with_default(stored)
    }

    pub fn set_categories(&mut self, categories: &[Category]) -> AppResult<()> {
        let mut records = Vec::with_capacity(categories.len());
        for category in categories.iter().filter(|c| !c.is_default()) {
            category.validate()?;
            records.push(serde_json::to_value(category)?);
        }
        self.categories = Some(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{parse_date, parse_time, NewReminder};
    use serde_json::json;

    fn reminder(title: &str) -> Reminder {
        let due = parse_date("2024-01-31")
            .unwrap()
            .and_time(parse_time("09:00").unwrap());
        NewReminder::new(title, due).into_reminder().unwrap()
    }

    fn malformed() -> Value {
        json!({
            "id": "broken",
            "title": "Rent",
            "date": "2024-01-01",
            "time": "10:00:00",
            "recurring": {"type": "fortnightly", "interval": 1}
        })
    }

    #[test]
    fn test_rejected_record_is_reported_with_id() {
        let doc = Document {
            reminders: vec![malformed()],
            categories: None,
        };
        let decoded = doc.decode_all();
        let rejected = decoded[0].as_ref().unwrap_err();
        assert_eq!(rejected.id.as_deref(), Some("broken"));
        assert!(doc.get("broken").is_err());
    }

    #[test]
    fn test_trailing_garbage_in_date_is_rejected() {
        for date in ["2024-01-31garbage", "2024-01-31T99:99"] {
            let record = json!({
                "id": "r1",
                "title": "Rent",
                "date": date,
                "time": "09:00",
            });
            let rejected = decode_record(&record).unwrap_err();
            assert_eq!(rejected.id.as_deref(), Some("r1"));
            assert!(rejected.reason.contains("invalid date"), "{}", rejected.reason);
        }
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let r = reminder("Pay bills");
        let id = r.id.clone();
        let mut doc = Document::default();
        doc.insert(r).unwrap();

        let updated = doc
            .update(&id, ReminderUpdate::completed(true))
            .unwrap()
            .unwrap();
        assert!(updated.completed);
        assert_eq!(doc.get(&id).unwrap().unwrap(), updated);
        assert!(doc.update("missing", ReminderUpdate::completed(true)).unwrap().is_none());
    }

    #[test]
    fn test_update_refuses_malformed_record() {
        let mut doc = Document {
            reminders: vec![malformed()],
            categories: None,
        };
        let before = doc.clone();
        assert!(doc.update("broken", ReminderUpdate::completed(true)).is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_replace_all_keeps_rejected_records() {
        let mut doc = Document {
            reminders: vec![malformed()],
            categories: None,
        };
        doc.insert(reminder("old")).unwrap();

        let fresh = reminder("new");
        doc.replace_all(std::slice::from_ref(&fresh)).unwrap();

        assert_eq!(doc.reminders.len(), 2);
        assert_eq!(doc.reminders[0], malformed());
        assert_eq!(doc.get(&fresh.id).unwrap().unwrap().title, "new");
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let r = reminder("x");
        let mut doc = Document::default();
        doc.insert(r.clone()).unwrap();
        assert!(doc.insert(r).is_err());
    }

    #[test]
    fn test_categories_never_store_default() {
        let mut doc = Document::seeded();
        let mut all = doc.categories();
        assert_eq!(all[0].id, "default");
        assert_eq!(all.len(), 3);

        all[0].name = "Renamed".to_string();
        doc.set_categories(&all).unwrap();
        assert_eq!(doc.categories.as_ref().unwrap().len(), 2);
        assert_eq!(doc.categories()[0].name, "Default");
    }
}
