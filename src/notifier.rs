use crate::error::AppResult;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Button labels; a click reports back the label's index.
    pub actions: Vec<String>,
    pub silent: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, id: &str, notification: Notification) -> AppResult<()>;
    async fn clear(&self, id: &str) -> AppResult<()>;
}

/// Prints notifications to the terminal running the service. Answers come
/// back as stdin lines, see `service::parse_console_line`.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, id: &str, notification: Notification) -> AppResult<()> {
        info!(notification = %id, title = %notification.title, "notification raised");

        let bell = if notification.silent { "" } else { "\x07" };
        println!("{}🔔 {}", bell, notification.title);
        if !notification.body.is_empty() {
            println!("   {}", notification.body);
        }
        let reminder_id = id
            .strip_prefix(crate::config::NOTIFICATION_PREFIX)
            .unwrap_or(id);
        let buttons: Vec<String> = notification
            .actions
            .iter()
            .enumerate()
            .map(|(idx, label)| format!("[{}] {}", idx, label))
            .collect();
        println!("   {}  (answer: <index> {})", buttons.join("  "), reminder_id);
        Ok(())
    }

    async fn clear(&self, id: &str) -> AppResult<()> {
        info!(notification = %id, "notification cleared");
        Ok(())
    }
}
