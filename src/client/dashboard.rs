use crate::application::reports::{build_report, TaskReport};
use crate::domain::clock::Clock;
use crate::domain::models::{DayOfWeek, Priority, Task, TaskKind, TaskStatus};
use crate::domain::schedule::{seconds_between, time_to_seconds};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub task_id: String,
    pub title: String,
    pub kind: TaskKind,
    pub priority: Priority,
    pub status: TaskStatus,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Length of today's window; `None` for one-time tasks and unreadable times.
    pub window_seconds: Option<u32>,
    pub effort_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub report: TaskReport,
    pub agenda: Vec<AgendaItem>,
}

/// Recurring tasks with an entry today, ordered by start time, followed by
/// unfinished one-time tasks whose date range covers `date`.
pub fn todays_agenda(tasks: &[Task], today: DayOfWeek, date: NaiveDate) -> Vec<AgendaItem> {
    let mut recurring = tasks
        .iter()
        .filter_map(|task| {
            let entry = task.day_entry(today).filter(|_| task.kind == TaskKind::Recurring)?;
            Some(AgendaItem {
                task_id: task.id.clone(),
                title: entry.title.clone().unwrap_or_else(|| task.title.clone()),
                kind: task.kind,
                priority: task.priority,
                status: entry.completed,
                start_time: Some(entry.start_time.clone()),
                end_time: Some(entry.end_time.clone()),
                window_seconds: seconds_between(&entry.start_time, &entry.end_time).ok(),
                effort_seconds: task.total_effort_seconds(),
            })
        })
        .collect::<Vec<_>>();
    recurring.sort_by_cached_key(|item| {
        (
            item.start_time
                .as_deref()
                .and_then(|start| time_to_seconds(start).ok()),
            item.title.clone(),
        )
    });

    let one_time = tasks
        .iter()
        .filter(|task| task.covers_date(date) && task.completed != TaskStatus::Complete)
        .map(|task| AgendaItem {
            task_id: task.id.clone(),
            title: task.title.clone(),
            kind: task.kind,
            priority: task.priority,
            status: task.completed,
            start_time: None,
            end_time: None,
            window_seconds: None,
            effort_seconds: task.total_effort_seconds(),
        });

    recurring.extend(one_time);
    recurring
}

pub fn build_dashboard(tasks: &[Task], clock: &Clock) -> Dashboard {
    let today = clock.today();
    Dashboard {
        report: build_report(tasks, clock.now(), today),
        agenda: todays_agenda(tasks, today, clock.local_date()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RecurringDay;
    use chrono::{DateTime, Utc};

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn task(id: &str, kind: TaskKind, days: Vec<RecurringDay>) -> Task {
        Task {
            id: id.to_string(),
            user_id: "usr-1".to_string(),
            title: format!("task {id}"),
            description: None,
            kind,
            start_date: None,
            end_date: None,
            recurring_days: days,
            times: Vec::new(),
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
    fn agenda_lists_todays_entries_then_open_one_time_tasks() {
        let evening = task(
            "evening",
            TaskKind::Recurring,
            vec![RecurringDay::new(DayOfWeek::Wednesday, "22:00", "01:00")],
        );
        let morning = task(
            "morning",
            TaskKind::Recurring,
            vec![
                RecurringDay::new(DayOfWeek::Monday, "07:00", "08:00"),
                RecurringDay::new(DayOfWeek::Wednesday, "07:00", "08:00"),
            ],
        );
        let friday_only = task(
            "friday",
            TaskKind::Recurring,
            vec![RecurringDay::new(DayOfWeek::Friday, "07:00", "08:00")],
        );
        let mut due = task("due", TaskKind::OneTime, Vec::new());
        due.start_date = Some("2026-02-10".to_string());
        due.end_date = Some("2026-02-20".to_string());
        let mut finished = task("finished", TaskKind::OneTime, Vec::new());
        finished.completed = TaskStatus::Complete;

        let date = NaiveDate::from_ymd_opt(2026, 2, 18).expect("valid date");
        let agenda = todays_agenda(
            &[evening, morning, friday_only, due, finished],
            DayOfWeek::Wednesday,
            date,
        );

        assert_eq!(
            agenda.iter().map(|item| item.task_id.as_str()).collect::<Vec<_>>(),
            vec!["morning", "evening", "due"]
        );
        assert_eq!(agenda[0].window_seconds, Some(3_600));
        assert_eq!(agenda[1].window_seconds, Some(10_800));
        assert_eq!(agenda[2].window_seconds, None);
    }

    #[test]
    fn agenda_orders_by_clock_time_not_text() {
        let late = task(
            "late",
            TaskKind::Recurring,
            vec![RecurringDay::new(DayOfWeek::Wednesday, "08:00", "09:00")],
        );
        let early = task(
            "early",
            TaskKind::Recurring,
            vec![RecurringDay::new(DayOfWeek::Wednesday, "7:05", "7:45")],
        );
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).expect("valid date");
        let agenda = todays_agenda(&[late, early], DayOfWeek::Wednesday, date);
        assert_eq!(
            agenda.iter().map(|item| item.task_id.as_str()).collect::<Vec<_>>(),
            vec!["early", "late"]
        );
    }

    #[test]
    fn dashboard_uses_clock_for_report_and_agenda() {
        let clock = Clock::fixed(fixed_time("2026-02-18T09:00:00Z"), chrono_tz::Tz::UTC);
        let routine = task(
            "routine",
            TaskKind::Recurring,
            vec![RecurringDay::new(DayOfWeek::Wednesday, "08:00", "16:00")],
        );
        let dashboard = build_dashboard(&[routine], &clock);
        assert_eq!(dashboard.report.today, DayOfWeek::Wednesday);
        assert_eq!(dashboard.report.recurring_tasks, 1);
        assert_eq!(dashboard.agenda.len(), 1);
        assert_eq!(dashboard.agenda[0].window_seconds, Some(28_800));
    }
}
