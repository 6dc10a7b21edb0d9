use crate::domain::error::DomainError;
use crate::domain::models::{DayOfWeek, Task, TaskKind, TaskStatus};
use crate::domain::schedule::{resolve_day_entry, seconds_between};
use chrono::{DateTime, Utc};

/// Overrun tolerated past a day's window before a completion counts as failed.
pub const GRACE_PERIOD_SECONDS: u64 = 30 * 60;

/// Upper bound for a single recorded effort entry.
pub const MAX_EFFORT_ENTRY_SECONDS: u64 = 24 * 3600;

pub fn check_effort_entry(seconds: u64) -> Result<(), String> {
    if seconds == 0 {
        return Err("effort must be at least one second".to_string());
    }
    if seconds > MAX_EFFORT_ENTRY_SECONDS {
        return Err(format!(
            "effort entry of {seconds}s exceeds {MAX_EFFORT_ENTRY_SECONDS}s"
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub requested: TaskStatus,
    pub status: TaskStatus,
    /// The schedule entry that was updated, for recurring tasks.
    pub day: Option<DayOfWeek>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn classify_effort(total_effort_seconds: u64, window_seconds: u32) -> TaskStatus {
    let window = u64::from(window_seconds);
    if total_effort_seconds <= window {
        TaskStatus::Complete
    } else if total_effort_seconds <= window + GRACE_PERIOD_SECONDS {
        TaskStatus::Pending
    } else {
        TaskStatus::Failed
    }
}

/// Applies a requested status to `task`. On error the task is left untouched.
pub fn apply_status(
    task: &mut Task,
    requested: TaskStatus,
    now: DateTime<Utc>,
    today: DayOfWeek,
) -> Result<StatusChange, DomainError> {
    match task.kind {
        TaskKind::OneTime => {
            task.completed = requested;
            task.completed_at = (requested == TaskStatus::Complete).then_some(now);
            Ok(StatusChange {
                requested,
                status: requested,
                day: None,
                completed_at: task.completed_at,
            })
        }
        TaskKind::Recurring => {
            let position = resolve_day_entry(&task.recurring_days, today)?;
            let total_effort = task.total_effort_seconds();
            let entry = task
                .recurring_days
                .get_mut(position)
                .ok_or(DomainError::NoMatchingDay)?;

            let status = if requested == TaskStatus::Complete {
                let window = seconds_between(&entry.start_time, &entry.end_time)?;
                entry.completed_at = Some(now);
                classify_effort(total_effort, window)
            } else {
                requested
            };
            entry.completed = status;

            Ok(StatusChange {
                requested,
                status,
                day: Some(entry.day),
                completed_at: entry.completed_at,
            })
        }
    }
}
