use super::{CategoryStore, Document, ReminderStore, StoredReminder};
use crate::category::Category;
use crate::config::STORAGE_FILE;
use crate::error::{AppError, AppResult};
use crate::reminder::{Reminder, ReminderUpdate};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Reminders and categories in one JSON document on local disk.
///
/// Every write goes to its own sibling temp file that is renamed over the
/// document, so readers never see a half-written file and concurrent
/// writers never share a temp path. The mutex serializes read-modify-write
/// inside this process only; across processes the last rename wins.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(app_data_path: impl AsRef<Path>) -> AppResult<Self> {
        let dir = app_data_path.as_ref();
        fs::create_dir_all(dir).await.map_err(|e| {
            AppError::storage(format!("failed to create {}: {}", dir.display(), e))
        })?;

        let store = Self {
            path: dir.join(STORAGE_FILE),
            lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path).await? {
            let mut document = store.load().await?;
            if document.categories.is_none() {
                document.categories = Document::seeded().categories;
                store.save(&document).await?;
            }
        } else {
            info!(path = %store.path.display(), "initializing reminder storage");
            store.save(&Document::seeded()).await?;
        }

        Ok(store)
    }

    async fn load(&self) -> AppResult<Document> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::default()),
            Err(e) => {
                return Err(AppError::storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            AppError::storage(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, document: &Document) -> AppResult<()> {
        let content = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension(format!(
            "json.{}-{}.tmp",
            std::process::id(),
            Uuid::new_v4().simple()
        ));
        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(AppError::storage(format!(
                "failed to write {}: {}",
                tmp.display(),
                e
            )));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(AppError::storage(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }
        debug!(path = %self.path.display(), records = document.reminders.len(), "storage saved");
        Ok(())
    }

    async fn read<T>(&self, f: impl FnOnce(&Document) -> AppResult<T> + Send) -> AppResult<T> {
        let _guard = self.lock.lock().await;
        let document = self.load().await?;
        f(&document)
    }

    async fn write<T>(&self, f: impl FnOnce(&mut Document) -> AppResult<T> + Send) -> AppResult<T> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let out = f(&mut document)?;
        self.save(&document).await?;
        Ok(out)
    }
}

#[async_trait]
impl ReminderStore for JsonFileStore {
    async fn get_all(&self) -> AppResult<Vec<StoredReminder>> {
        self.read(|doc| Ok(doc.decode_all())).await
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<Reminder>> {
        self.read(|doc| doc.get(id)).await
    }

    async fn save_all(&self, reminders: &[Reminder]) -> AppResult<()> {
        self.write(|doc| doc.replace_all(reminders)).await
    }

    async fn update_by_id(&self, id: &str, update: ReminderUpdate) -> AppResult<Option<Reminder>> {
        self.write(|doc| doc.update(id, update)).await
    }

    async fn insert(&self, reminder: Reminder) -> AppResult<()> {
        self.write(|doc| doc.insert(reminder)).await
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<bool> {
        self.write(|doc| Ok(doc.delete(id))).await
    }
}

#[async_trait]
impl CategoryStore for JsonFileStore {
    async fn get_all_categories(&self) -> AppResult<Vec<Category>> {
        self.read(|doc| Ok(doc.categories())).await
    }

    async fn save_categories(&self, categories: &[Category]) -> AppResult<()> {
        self.write(|doc| doc.set_categories(categories)).await
    }
}
