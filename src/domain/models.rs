use crate::domain::error::DomainError;
use crate::domain::schedule::time_to_seconds;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "In-progress")]
    InProgress,
    Complete,
    Pending,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::InProgress,
        TaskStatus::Complete,
        TaskStatus::Pending,
        TaskStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "In-progress",
            Self::Complete => "Complete",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in-progress" | "in_progress" | "inprogress" => Some(Self::InProgress),
            "complete" | "completed" => Some(Self::Complete),
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Weekday names as they appear on the wire. Ordering follows the
/// Sunday-first convention used for day distances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// 0 = Sunday .. 6 = Saturday.
    pub fn index(self) -> u8 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sunday => "Sunday",
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Some(Self::Sunday),
            "monday" | "mon" => Some(Self::Monday),
            "tuesday" | "tue" => Some(Self::Tuesday),
            "wednesday" | "wed" => Some(Self::Wednesday),
            "thursday" | "thu" => Some(Self::Thursday),
            "friday" | "fri" => Some(Self::Friday),
            "saturday" | "sat" => Some(Self::Saturday),
            _ => None,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EffortEntry {
    pub time: u64,
    #[serde(alias = "createdAt")]
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringDay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub day: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub completed: TaskStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RecurringDay {
    pub fn new(day: DayOfWeek, start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            title: None,
            day,
            start_time: start_time.into(),
            end_time: end_time.into(),
            completed: TaskStatus::InProgress,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default, rename = "user")]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub recurring_days: Vec<RecurringDay>,
    #[serde(default)]
    pub times: Vec<EffortEntry>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub completed: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl Task {
    pub fn total_effort_seconds(&self) -> u64 {
        self.times
            .iter()
            .fold(0u64, |total, entry| total.saturating_add(entry.time))
    }

    pub fn day_entry(&self, day: DayOfWeek) -> Option<&RecurringDay> {
        self.recurring_days.iter().find(|entry| entry.day == day)
    }

    pub fn is_scheduled_on(&self, day: DayOfWeek) -> bool {
        self.kind == TaskKind::Recurring && self.day_entry(day).is_some()
    }

    /// Structural checks that must hold before a status change is evaluated.
    pub fn check_shape(&self) -> Result<(), DomainError> {
        match self.kind {
            TaskKind::OneTime if !self.recurring_days.is_empty() => Err(DomainError::MalformedTask(
                format!("one-time task {} carries schedule entries", self.id),
            )),
            TaskKind::OneTime => Ok(()),
            TaskKind::Recurring => {
                let mut seen = HashSet::new();
                for entry in &self.recurring_days {
                    if !seen.insert(entry.day) {
                        return Err(DomainError::MalformedTask(format!(
                            "task {} has more than one entry for {}",
                            self.id,
                            entry.day.name()
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        self.check_shape().map_err(|error| error.to_string())?;

        let start = self
            .start_date
            .as_deref()
            .map(|value| parse_date(value, "task.start_date"))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|value| parse_date(value, "task.end_date"))
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err("task.end_date must be on or after task.start_date".to_string());
            }
        }

        for entry in &self.recurring_days {
            time_to_seconds(&entry.start_time)
                .map_err(|_| "recurring_days[].start_time must be HH:MM".to_string())?;
            time_to_seconds(&entry.end_time)
                .map_err(|_| "recurring_days[].end_time must be HH:MM".to_string())?;
        }
        for subtask in &self.subtasks {
            validate_non_empty(&subtask.title, "task.subtasks[].title")?;
        }
        for category in &self.categories {
            validate_non_empty(&category.name, "task.categories[].name")?;
        }
        Ok(())
    }

    /// Whether a one-time task's date range covers `date`. Missing bounds are open.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        if self.kind != TaskKind::OneTime {
            return false;
        }
        let parse = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        };
        let after_start = parse(&self.start_date).is_none_or(|start| start <= date);
        let before_end = parse(&self.end_date).is_none_or(|end| date <= end);
        after_start && before_end
    }
}

/// Decodes a task document received from outside the process. A recurring
/// task whose `recurringDays` is missing or not an array is rejected instead
/// of silently defaulting to an empty schedule.
pub fn decode_task(value: serde_json::Value) -> Result<Task, DomainError> {
    let kind = value.get("type").and_then(serde_json::Value::as_str);
    let has_schedule_array = value
        .get("recurringDays")
        .is_some_and(serde_json::Value::is_array);
    if kind == Some("recurring") && !has_schedule_array {
        return Err(DomainError::MalformedTask(
            "recurringDays is missing or not an array".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|error| DomainError::MalformedTask(format!("invalid task payload: {error}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            avatar_url: self.avatar_url.clone(),
            created_at: self.created_at,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "user.id")?;
        validate_non_empty(&self.username, "user.username")?;
        validate_non_empty(&self.email, "user.email")?;
        validate_non_empty(&self.password_hash, "user.password_hash")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && !self.token.trim().is_empty()
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_recurring_task() -> Task {
        Task {
            id: "tsk-1".to_string(),
            user_id: "usr-1".to_string(),
            title: "Morning run".to_string(),
            description: Some("around the park".to_string()),
            kind: TaskKind::Recurring,
            start_date: None,
            end_date: None,
            recurring_days: vec![
                RecurringDay::new(DayOfWeek::Monday, "07:00", "08:00"),
                RecurringDay::new(DayOfWeek::Thursday, "07:00", "08:00"),
            ],
            times: vec![EffortEntry {
                time: 1200,
                recorded_at: fixed_time("2026-02-16T07:20:00Z"),
            }],
            priority: Priority::High,
            categories: vec![Category {
                name: "health".to_string(),
            }],
            subtasks: vec![Subtask {
                title: "stretch".to_string(),
                completed: false,
            }],
            completed: TaskStatus::InProgress,
            created_at: fixed_time("2026-02-16T06:00:00Z"),
            completed_at: None,
            version: 0,
        }
    }

    fn sample_one_time_task() -> Task {
        Task {
            id: "tsk-2".to_string(),
            kind: TaskKind::OneTime,
            title: "File taxes".to_string(),
            recurring_days: Vec::new(),
            start_date: Some("2026-02-10".to_string()),
            end_date: Some("2026-02-20".to_string()),
            ..sample_recurring_task()
        }
    }

    #[test]
    fn task_validate_accepts_valid_tasks() {
        assert!(sample_recurring_task().validate().is_ok());
        assert!(sample_one_time_task().validate().is_ok());
    }

    #[test]
    fn task_validate_rejects_empty_title() {
        let mut task = sample_recurring_task();
        task.title = "   ".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_reversed_dates_and_bad_times() {
        let mut task = sample_one_time_task();
        task.end_date = Some("2026-02-01".to_string());
        assert!(task.validate().is_err());

        let mut task = sample_recurring_task();
        task.recurring_days[0].end_time = "25:00".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn check_shape_rejects_duplicate_weekdays() {
        let mut task = sample_recurring_task();
        task.recurring_days
            .push(RecurringDay::new(DayOfWeek::Monday, "18:00", "19:00"));
        assert!(matches!(
            task.check_shape(),
            Err(DomainError::MalformedTask(_))
        ));
    }

    #[test]
    fn check_shape_rejects_one_time_task_with_schedule() {
        let mut task = sample_one_time_task();
        task.recurring_days
            .push(RecurringDay::new(DayOfWeek::Friday, "09:00", "10:00"));
        assert!(matches!(
            task.check_shape(),
            Err(DomainError::MalformedTask(_))
        ));
    }

    #[test]
    fn wire_format_uses_camel_case_fields_and_status_names() {
        let value = serde_json::to_value(sample_recurring_task()).expect("serialize task");
        assert_eq!(value["type"], "recurring");
        assert_eq!(value["user"], "usr-1");
        assert_eq!(value["completed"], "In-progress");
        assert_eq!(value["recurringDays"][0]["day"], "Monday");
        assert_eq!(value["recurringDays"][0]["startTime"], "07:00");
        assert_eq!(value["priority"], "high");
        assert!(value["times"][0].get("recordedAt").is_some());
    }

    #[test]
    fn decode_task_accepts_legacy_identifiers() {
        let value = serde_json::json!({
            "_id": "abc",
            "title": "Read",
            "type": "recurring",
            "recurringDays": [{ "day": "Friday", "startTime": "20:00", "endTime": "21:00" }],
            "times": [{ "time": 60, "createdAt": "2026-02-16T20:00:00Z" }],
            "createdAt": "2026-02-16T06:00:00Z"
        });
        let task = decode_task(value).expect("decode task");
        assert_eq!(task.id, "abc");
        assert_eq!(task.recurring_days[0].completed, TaskStatus::InProgress);
        assert_eq!(task.total_effort_seconds(), 60);
    }

    #[test]
    fn decode_task_rejects_recurring_without_schedule_array() {
        let missing = serde_json::json!({
            "id": "abc",
            "title": "Read",
            "type": "recurring",
            "createdAt": "2026-02-16T06:00:00Z"
        });
        assert!(matches!(
            decode_task(missing),
            Err(DomainError::MalformedTask(_))
        ));

        let not_array = serde_json::json!({
            "id": "abc",
            "title": "Read",
            "type": "recurring",
            "recurringDays": { "day": "Friday" },
            "createdAt": "2026-02-16T06:00:00Z"
        });
        assert!(matches!(
            decode_task(not_array),
            Err(DomainError::MalformedTask(_))
        ));
    }

    #[test]
    fn covers_date_respects_open_and_closed_bounds() {
        let task = sample_one_time_task();
        let inside = NaiveDate::from_ymd_opt(2026, 2, 15).expect("valid date");
        let outside = NaiveDate::from_ymd_opt(2026, 2, 21).expect("valid date");
        assert!(task.covers_date(inside));
        assert!(!task.covers_date(outside));

        let mut open = sample_one_time_task();
        open.start_date = None;
        open.end_date = None;
        assert!(open.covers_date(outside));
        assert!(!sample_recurring_task().covers_date(inside));
    }

    #[test]
    fn status_and_weekday_parsing() {
        assert_eq!(TaskStatus::parse("in_progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("Complete"), Some(TaskStatus::Complete));
        assert_eq!(TaskStatus::parse("done"), None);
        assert_eq!(DayOfWeek::parse("wed"), Some(DayOfWeek::Wednesday));
        assert_eq!(DayOfWeek::from(Weekday::Sun).index(), 0);
        assert_eq!(DayOfWeek::Saturday.index(), 6);
    }

    #[test]
    fn auth_token_expires() {
        let token = AuthToken {
            token: "tok".to_string(),
            user_id: "usr-1".to_string(),
            issued_at: fixed_time("2026-02-16T08:00:00Z"),
            expires_at: fixed_time("2026-02-16T09:00:00Z"),
        };
        assert!(token.is_valid_at(fixed_time("2026-02-16T08:59:59Z")));
        assert!(!token.is_valid_at(fixed_time("2026-02-16T09:00:00Z")));
    }
}
