use crate::domain::models::{DayOfWeek, Task, TaskKind, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const RECENT_COMPLETION_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub in_progress: usize,
    pub complete: usize,
    pub pending: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Complete => self.complete += 1,
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.in_progress + self.complete + self.pending + self.failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskEffort {
    pub task_id: String,
    pub title: String,
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub generated_at: DateTime<Utc>,
    pub today: DayOfWeek,
    pub total_tasks: usize,
    pub one_time_tasks: usize,
    pub recurring_tasks: usize,
    pub one_time_status: StatusCounts,
    pub recurring_day_status: StatusCounts,
    pub total_effort_seconds: u64,
    pub effort_by_task: Vec<TaskEffort>,
    pub completed_last_week: usize,
}

/// Summarizes a user's tasks. "Completed" covers both one-time completions
/// and recurring day entries completed within the last seven days.
pub fn build_report(tasks: &[Task], now: DateTime<Utc>, today: DayOfWeek) -> TaskReport {
    let recent_cutoff = now - Duration::days(RECENT_COMPLETION_DAYS);
    let mut one_time_status = StatusCounts::default();
    let mut recurring_day_status = StatusCounts::default();
    let mut completed_last_week = 0;

    for task in tasks {
        let completion_times = match task.kind {
            TaskKind::OneTime => {
                one_time_status.record(task.completed);
                vec![task.completed_at.filter(|_| task.completed == TaskStatus::Complete)]
            }
            TaskKind::Recurring => task
                .recurring_days
                .iter()
                .map(|entry| {
                    recurring_day_status.record(entry.completed);
                    entry
                        .completed_at
                        .filter(|_| entry.completed == TaskStatus::Complete)
                })
                .collect(),
        };
        if completion_times
            .into_iter()
            .flatten()
            .any(|completed_at| completed_at > recent_cutoff && completed_at <= now)
        {
            completed_last_week += 1;
        }
    }

    let mut effort_by_task = tasks
        .iter()
        .map(|task| TaskEffort {
            task_id: task.id.clone(),
            title: task.title.clone(),
            seconds: task.total_effort_seconds(),
        })
        .filter(|effort| effort.seconds > 0)
        .collect::<Vec<_>>();
    effort_by_task.sort_by(|left, right| {
        right
            .seconds
            .cmp(&left.seconds)
            .then_with(|| left.title.cmp(&right.title))
    });

    let recurring_tasks = tasks
        .iter()
        .filter(|task| task.kind == TaskKind::Recurring)
        .count();

    TaskReport {
        generated_at: now,
        today,
        total_tasks: tasks.len(),
        one_time_tasks: tasks.len() - recurring_tasks,
        recurring_tasks,
        one_time_status,
        recurring_day_status,
        total_effort_seconds: effort_by_task
            .iter()
            .fold(0u64, |total, effort| total.saturating_add(effort.seconds)),
        effort_by_task,
        completed_last_week,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EffortEntry, Priority, RecurringDay};

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn task(id: &str, kind: TaskKind, efforts: &[u64]) -> Task {
        Task {
            id: id.to_string(),
            user_id: "usr-1".to_string(),
            title: format!("task {id}"),
            description: None,
            kind,
            start_date: None,
            end_date: None,
            recurring_days: Vec::new(),
            times: efforts
                .iter()
                .map(|time| EffortEntry {
                    time: *time,
                    recorded_at: fixed_time("2026-02-17T09:00:00Z"),
                })
                .collect(),
            priority: Priority::Medium,
            categories: Vec::new(),
            subtasks: Vec::new(),
            completed: TaskStatus::InProgress,
            created_at: fixed_time("2026-02-01T06:00:00Z"),
            completed_at: None,
            version: 0,
        }
    }

    #[test]
    fn report_counts_statuses_effort_and_recent_completions() {
        let now = fixed_time("2026-02-18T12:00:00Z");

        let mut done = task("a", TaskKind::OneTime, &[300]);
        done.completed = TaskStatus::Complete;
        done.completed_at = Some(fixed_time("2026-02-17T10:00:00Z"));

        let mut stale = task("b", TaskKind::OneTime, &[]);
        stale.completed = TaskStatus::Complete;
        stale.completed_at = Some(fixed_time("2026-01-02T10:00:00Z"));

        let mut routine = task("c", TaskKind::Recurring, &[1_200, 600]);
        let mut monday = RecurringDay::new(DayOfWeek::Monday, "07:00", "08:00");
        monday.completed = TaskStatus::Complete;
        monday.completed_at = Some(fixed_time("2026-02-16T08:00:00Z"));
        let mut friday = RecurringDay::new(DayOfWeek::Friday, "07:00", "08:00");
        friday.completed = TaskStatus::Failed;
        routine.recurring_days = vec![monday, friday];

        let report = build_report(&[done, stale, routine], now, DayOfWeek::Wednesday);
        assert_eq!(report.total_tasks, 3);
        assert_eq!(report.one_time_tasks, 2);
        assert_eq!(report.recurring_tasks, 1);
        assert_eq!(report.one_time_status.complete, 2);
        assert_eq!(report.recurring_day_status.complete, 1);
        assert_eq!(report.recurring_day_status.failed, 1);
        assert_eq!(report.recurring_day_status.total(), 2);
        assert_eq!(report.total_effort_seconds, 2_100);
        assert_eq!(
            report
                .effort_by_task
                .iter()
                .map(|effort| effort.task_id.as_str())
                .collect::<Vec<_>>(),
            vec!["c", "a"]
        );
        assert_eq!(report.completed_last_week, 2);
    }

    #[test]
    fn empty_task_list_produces_zeroed_report() {
        let now = fixed_time("2026-02-18T12:00:00Z");
        let report = build_report(&[], now, DayOfWeek::Wednesday);
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.total_effort_seconds, 0);
        assert!(report.effort_by_task.is_empty());
        assert_eq!(report.one_time_status, StatusCounts::default());
    }
}
