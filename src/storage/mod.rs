mod document;
mod local;
mod memory;

use crate::category::Category;
use crate::error::{AppError, AppResult};
use crate::reminder::{Reminder, ReminderUpdate};
use async_trait::async_trait;
use std::fmt;

pub use document::{decode_record, Document};
pub use local::JsonFileStore;
pub use memory::MemoryStore;

/// A stored reminder that failed decode-and-validate. It is never mutated
/// and survives later writes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub id: Option<String>,
    pub reason: String,
}

impl fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "record {}: {}", id, self.reason),
            None => write!(f, "record without id: {}", self.reason),
        }
    }
}

pub type StoredReminder = Result<Reminder, RejectedRecord>;

/// Canonical owner of reminders. Updates replace the whole record; across
/// processes the last write wins.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn get_all(&self) -> AppResult<Vec<StoredReminder>>;

    /// `Err(Validation)` when the record exists but is malformed.
    async fn get_by_id(&self, id: &str) -> AppResult<Option<Reminder>>;

    async fn save_all(&self, reminders: &[Reminder]) -> AppResult<()>;

    /// Applies `update` to the stored record and writes it back in one
    /// replace. `Ok(None)` when no such reminder exists.
    async fn update_by_id(&self, id: &str, update: ReminderUpdate) -> AppResult<Option<Reminder>>;

    async fn insert(&self, reminder: Reminder) -> AppResult<()>;

    async fn delete_by_id(&self, id: &str) -> AppResult<bool>;

    async fn get_reminders(&self) -> AppResult<Vec<Reminder>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter_map(Result::ok)
            .collect())
    }
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories, the default one first.
    async fn get_all_categories(&self) -> AppResult<Vec<Category>>;

    /// Replaces the stored categories. The default category is never written.
    async fn save_categories(&self, categories: &[Category]) -> AppResult<()>;

    async fn get_category(&self, id: &str) -> AppResult<Option<Category>> {
        Ok(self
            .get_all_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id))
    }

    async fn add_category(&self, category: Category) -> AppResult<()> {
        category.validate()?;
        if category.is_default() {
            return Err(AppError::validation("the default category is reserved"));
        }
        let mut categories = self.get_all_categories().await?;
        if categories.iter().any(|c| c.id == category.id) {
            return Err(AppError::validation(format!(
                "category {} already exists",
                category.id
            )));
        }
        categories.push(category);
        self.save_categories(&categories).await
    }

    async fn update_category(&self, category: Category) -> AppResult<()> {
        category.validate()?;
        if category.is_default() {
            return Err(AppError::validation("the default category can't be changed"));
        }
        let mut categories = self.get_all_categories().await?;
        let slot = categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or_else(|| AppError::not_found(format!("category {}", category.id)))?;
        *slot = category;
        self.save_categories(&categories).await
    }

    async fn remove_category(&self, id: &str) -> AppResult<()> {
        if id == crate::config::DEFAULT_CATEGORY_ID {
            return Err(AppError::validation("the default category can't be removed"));
        }
        let mut categories = self.get_all_categories().await?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(AppError::not_found(format!("category {}", id)));
        }
        self.save_categories(&categories).await
    }
}
