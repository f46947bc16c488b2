//! Table and JSON output for CLI commands.

use crate::category::Category;
use crate::reminder::Reminder;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

#[derive(Tabled)]
pub struct ReminderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Repeats")]
    repeats: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Reminder> for ReminderRow {
    fn from(reminder: &Reminder) -> Self {
        let repeats = match &reminder.recurring {
            Some(rule) if rule.interval == 1 => rule.kind.to_string(),
            Some(rule) => format!("every {} × {}", rule.interval, rule.kind),
            None => "-".to_string(),
        };
        Self {
            id: reminder.id.clone(),
            title: reminder.title.clone(),
            due: reminder.due_at().format("%Y-%m-%d %H:%M").to_string(),
            priority: reminder.priority.to_string(),
            repeats,
            status: if reminder.completed { "done" } else { "open" }.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Icon")]
    icon: String,
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            color: category.color.clone(),
            icon: category.icon.clone(),
        }
    }
}

/// Print a list of items, converting each into its table row
pub fn print_list<'a, T, R>(items: &'a [T], format: OutputFormat)
where
    T: Serialize,
    R: Tabled + From<&'a T>,
{
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let rows: Vec<R> = items.iter().map(R::from).collect();
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// One row per serialized field. Non-object values yield a single row.
fn field_rows<T: Serialize>(item: &T) -> Vec<FieldRow> {
    match serde_json::to_value(item) {
        Ok(Value::Object(fields)) => fields
            .iter()
            .map(|(field, value)| FieldRow {
                field: field.clone(),
                value: render_value(value),
            })
            .collect(),
        Ok(other) => vec![FieldRow {
            field: "value".to_string(),
            value: render_value(&other),
        }],
        Err(e) => vec![FieldRow {
            field: "error".to_string(),
            value: e.to_string(),
        }],
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{}", Table::new(field_rows(item)));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ReconcileReport;
    use serde_json::json;

    #[test]
    fn test_field_rows_flatten_an_object() {
        let report = ReconcileReport {
            scheduled: 2,
            ..ReconcileReport::default()
        };
        let rows = field_rows(&report);
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().any(|r| r.field == "scheduled" && r.value == "2"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(null)), "-");
        assert_eq!(render_value(&json!("09:00:00")), "09:00:00");
        assert_eq!(render_value(&json!(["home", "work"])), "home, work");
        assert_eq!(render_value(&json!({"type": "daily"})), r#"{"type":"daily"}"#);
    }
}
