use crate::error::{AppError, AppResult};
use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(AppError::validation(format!("unknown priority `{}`", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecurrenceKind::Daily => "daily",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for RecurrenceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(RecurrenceKind::Daily),
            "weekly" => Ok(RecurrenceKind::Weekly),
            "monthly" => Ok(RecurrenceKind::Monthly),
            "yearly" => Ok(RecurrenceKind::Yearly),
            other => Err(AppError::validation(format!(
                "unknown recurrence type `{}`",
                other
            ))),
        }
    }
}

/// How a reminder's occurrence advances after it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    pub interval: u32,
    #[serde(default, with = "end_date_format")]
    pub end_date: Option<NaiveDate>,
    /// Stored and round-tripped, never consulted when advancing.
    #[serde(default)]
    pub end_after_occurrences: Option<u32>,
}

impl Recurrence {
    pub fn new(kind: RecurrenceKind, interval: u32) -> Self {
        Self {
            kind,
            interval,
            end_date: None,
            end_after_occurrences: None,
        }
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.interval == 0 {
            return Err(AppError::validation("recurrence interval must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "date_format")]
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub time: NaiveTime,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub recurring: Option<Recurrence>,
    #[serde(default = "default_notification")]
    pub notification: bool,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

fn default_notification() -> bool {
    true
}

impl Reminder {
    /// Local wall-clock instant this reminder is due at.
    pub fn due_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        !self.completed && self.due_at() <= now
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring.is_some()
    }

    pub fn set_due_at(&mut self, at: NaiveDateTime) {
        let at = at.with_nanosecond(0).unwrap_or(at);
        self.date = at.date();
        self.time = at.time();
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::validation("reminder id is empty"));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::validation(format!(
                "reminder {} has an empty title",
                self.id
            )));
        }
        if let Some(category_id) = &self.category_id {
            if category_id.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "reminder {} has an empty category id",
                    self.id
                )));
            }
        }
        if let Some(rule) = &self.recurring {
            rule.validate()?;
        }
        Ok(())
    }

    /// Applies every field set in `update` and refreshes `last_modified`.
    pub fn apply(&mut self, update: ReminderUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(time) = update.time {
            self.time = time;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(category_id) = update.category_id {
            self.category_id = category_id;
        }
        if let Some(recurring) = update.recurring {
            self.recurring = recurring;
        }
        if let Some(notification) = update.notification {
            self.notification = notification;
        }
        self.last_modified = Utc::now();
    }
}

/// User input for a reminder that doesn't exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub category_id: Option<String>,
    pub recurring: Option<Recurrence>,
    pub notification: bool,
}

impl NewReminder {
    pub fn new(title: impl Into<String>, due_at: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            description: None,
            date: due_at.date(),
            time: due_at.time(),
            priority: Priority::default(),
            tags: BTreeSet::new(),
            category_id: None,
            recurring: None,
            notification: true,
        }
    }

    pub fn into_reminder(self) -> AppResult<Reminder> {
        let now = Utc::now();
        let mut reminder = Reminder {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            date: self.date,
            time: self.time,
            completed: false,
            priority: self.priority,
            tags: self.tags,
            category_id: self.category_id,
            recurring: self.recurring,
            notification: self.notification,
            created: now,
            last_modified: now,
        };
        reminder.set_due_at(reminder.due_at());
        reminder.validate()?;
        Ok(reminder)
    }
}

/// Partial update; `None` leaves a field alone. Nullable fields take
/// `Some(None)` to clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub tags: Option<BTreeSet<String>>,
    pub category_id: Option<Option<String>>,
    pub recurring: Option<Option<Recurrence>>,
    pub notification: Option<bool>,
}

impl ReminderUpdate {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn due_at(at: NaiveDateTime) -> Self {
        let at = at.with_nanosecond(0).unwrap_or(at);
        Self {
            date: Some(at.date()),
            time: Some(at.time()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Maps a local wall-clock time onto an absolute instant.
pub fn local_instant(at: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&at) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // skipped by a DST jump, fire right after the gap
            let shifted = at + Duration::hours(1);
            Local
                .from_local_datetime(&shifted)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&at))
        }
    }
}

/// Strict `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AppError::validation(format!("invalid date `{}`: {}", raw, e)))
}

pub fn parse_time(raw: &str) -> AppResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| AppError::validation(format!("invalid time `{}`: {}", raw, e)))
}

mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

mod time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

mod end_date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.serialize_some(&date.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            Some(raw) if !raw.trim().is_empty() => {
                // full ISO timestamps are reduced to their calendar date
                let date = match raw.split_once('T') {
                    Some((date, _)) => date,
                    None => raw.as_str(),
                };
                super::parse_date(date)
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_date(date).unwrap().and_time(parse_time(time).unwrap())
    }

    #[test]
    fn test_decodes_stored_record_with_defaults() {
        let json = r#"{
            "id": "1706000000000",
            "title": "Water the plants",
            "date": "2024-01-31",
            "time": "09:00"
        }"#;
        let reminder: Reminder = serde_json::from_str(json).unwrap();
        assert_eq!(reminder.due_at(), at("2024-01-31", "09:00:00"));
        assert_eq!(reminder.priority, Priority::Medium);
        assert!(reminder.notification);
        assert!(!reminder.completed);
        assert!(reminder.recurring.is_none());
        assert!(reminder.category_id.is_none());
    }

    #[test]
    fn test_serializes_camel_case_and_hms() {
        let mut reminder = NewReminder::new("Standup", at("2024-03-01", "09:30"))
            .into_reminder()
            .unwrap();
        reminder.category_id = Some("work".to_string());
        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["time"], "09:30:00");
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["categoryId"], "work");
        assert!(json.get("lastModified").is_some());
    }

    #[test]
    fn test_unknown_recurrence_type_is_rejected() {
        let json = r#"{
            "id": "r1", "title": "x", "date": "2024-01-01", "time": "10:00:00",
            "recurring": {"type": "hourly", "interval": 1, "endDate": null, "endAfterOccurrences": null}
        }"#;
        assert!(serde_json::from_str::<Reminder>(json).is_err());
    }

    #[test]
    fn test_end_date_accepts_iso_timestamp() {
        let json = r#"{"type": "monthly", "interval": 2, "endDate": "2024-06-30T00:00:00.000Z", "endAfterOccurrences": 4}"#;
        let rule: Recurrence = serde_json::from_str(json).unwrap();
        assert_eq!(rule.end_date, Some(parse_date("2024-06-30").unwrap()));
        assert_eq!(rule.end_after_occurrences, Some(4));
        assert_eq!(rule.kind, RecurrenceKind::Monthly);
    }

    #[test]
    fn test_validate_rejects_empty_title_and_zero_interval() {
        let mut reminder = NewReminder::new("ok", at("2024-01-01", "10:00"))
            .into_reminder()
            .unwrap();
        reminder.title = "   ".to_string();
        assert!(reminder.validate().is_err());

        reminder.title = "ok".to_string();
        reminder.recurring = Some(Recurrence::new(RecurrenceKind::Daily, 0));
        assert!(matches!(reminder.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_apply_update_touches_only_given_fields() {
        let mut reminder = NewReminder::new("Call mom", at("2024-01-01", "10:00"))
            .into_reminder()
            .unwrap();
        let before = reminder.clone();

        reminder.apply(ReminderUpdate::due_at(at("2024-01-02", "11:15:42")));

        assert_eq!(reminder.due_at(), at("2024-01-02", "11:15:42"));
        assert_eq!(reminder.title, before.title);
        assert_eq!(reminder.id, before.id);
        assert!(reminder.last_modified >= before.last_modified);
    }

    #[test]
    fn test_is_due() {
        let reminder = NewReminder::new("x", at("2024-01-01", "10:00"))
            .into_reminder()
            .unwrap();
        assert!(!reminder.is_due(at("2024-01-01", "09:59:59")));
        assert!(reminder.is_due(at("2024-01-01", "10:00:00")));
    }

    #[test]
    fn test_dates_are_parsed_strictly() {
        assert!(parse_date("2024-01-31").is_ok());
        assert!(parse_date("2024-01-31junk").is_err());
        assert!(parse_date("2024-01-31T09:00:00").is_err());
        assert!(parse_date("2024-02-30").is_err());

        let json = r#"{"type": "daily", "interval": 1, "endDate": "2024-06-30junk"}"#;
        assert!(serde_json::from_str::<Recurrence>(json).is_err());
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
