use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::error::ServiceError;
use crate::application::reports::{build_report, TaskReport};
use crate::application::task_updates::TaskUpdater;
use crate::domain::clock::Clock;
use crate::domain::models::{decode_task, DayOfWeek, RecurringDay, Task, TaskStatus};
use crate::infrastructure::avatar_storage::AvatarStorage;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::session_repository::{
    InMemorySessionRepository, SessionRepository, SqliteSessionRepository,
};
use crate::infrastructure::task_store::{InMemoryTaskStore, SqliteTaskStore, TaskStore};
use crate::infrastructure::user_store::{InMemoryUserStore, SqliteUserStore, UserStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fields a client may not overwrite through the generic task update.
const PROTECTED_TASK_FIELDS: [&str; 5] = ["id", "_id", "user", "createdAt", "type"];

pub struct AppState {
    config: AppConfig,
    task_store: Arc<dyn TaskStore>,
    user_store: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionRepository>,
    avatars: AvatarStorage,
    clock: Clock,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::from_bootstrap(bootstrap_workspace(&workspace_root)?)
    }

    pub fn from_bootstrap(bootstrap: BootstrapResult) -> Result<Self, InfraError> {
        let clock = Clock::system(bootstrap.config.parsed_timezone()?);
        Ok(Self {
            config: bootstrap.config,
            task_store: Arc::new(SqliteTaskStore::new(&bootstrap.database_path)),
            user_store: Arc::new(SqliteUserStore::new(&bootstrap.database_path)),
            sessions: Arc::new(SqliteSessionRepository::new(&bootstrap.database_path)),
            avatars: AvatarStorage::new(&bootstrap.uploads_dir),
            clock,
        })
    }

    /// Memory-backed state; uploads still go to `uploads_dir` on disk.
    pub fn in_memory(config: AppConfig, uploads_dir: &Path, clock: Clock) -> Self {
        Self {
            config,
            task_store: Arc::new(InMemoryTaskStore::default()),
            user_store: Arc::new(InMemoryUserStore::default()),
            sessions: Arc::new(InMemorySessionRepository::default()),
            avatars: AvatarStorage::new(uploads_dir),
            clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn task_store(&self) -> &Arc<dyn TaskStore> {
        &self.task_store
    }

    pub fn user_store(&self) -> &Arc<dyn UserStore> {
        &self.user_store
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    pub fn avatars(&self) -> &AvatarStorage {
        &self.avatars
    }

    pub fn updater(&self) -> TaskUpdater {
        TaskUpdater::new(self.task_store.clone(), self.clock.clone())
    }

    pub fn command_error(&self, command: &str, error: &ServiceError) -> String {
        match error {
            ServiceError::Store(_) => {
                tracing::error!(command, code = error.code(), %error, "command failed")
            }
            _ => tracing::warn!(command, code = error.code(), %error, "command rejected"),
        }
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTime {
    pub task_id: String,
    pub task_title: String,
    #[serde(flatten)]
    pub entry: RecurringDay,
}

pub async fn create_task_impl(
    state: &AppState,
    user_id: &str,
    payload: Value,
) -> Result<Task, ServiceError> {
    let Value::Object(mut fields) = payload else {
        return Err(ServiceError::InvalidInput(
            "task payload must be a JSON object".to_string(),
        ));
    };
    fields.remove("_id");
    fields.insert("id".to_string(), Value::String(String::new()));
    fields.insert("user".to_string(), Value::String(user_id.to_string()));
    fields.insert(
        "createdAt".to_string(),
        serde_json::to_value(state.clock.now()).map_err(InfraError::from)?,
    );

    let task = decode_task(Value::Object(fields))?;
    task.validate().map_err(ServiceError::InvalidInput)?;
    let task = state.task_store.insert(task).await?;

    state.log_info("create_task", &format!("created task_id={}", task.id));
    Ok(task)
}

pub async fn list_tasks_impl(state: &AppState, user_id: &str) -> Result<Vec<Task>, ServiceError> {
    Ok(state.task_store.list_for_user(user_id).await?)
}

pub async fn get_task_impl(
    state: &AppState,
    user_id: &str,
    task_id: &str,
) -> Result<Task, ServiceError> {
    let task_id = required_id(task_id, "task_id")?;
    let task = state.task_store.get(task_id).await?;
    if task.user_id != user_id {
        return Err(ServiceError::NotFound(format!("task {task_id}")));
    }
    Ok(task)
}

pub async fn list_times_impl(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<ScheduledTime>, ServiceError> {
    let tasks = state.task_store.list_for_user(user_id).await?;
    Ok(tasks
        .into_iter()
        .flat_map(|task| {
            let Task {
                id,
                title,
                recurring_days,
                ..
            } = task;
            recurring_days.into_iter().map(move |entry| ScheduledTime {
                task_id: id.clone(),
                task_title: title.clone(),
                entry,
            })
        })
        .collect())
}

pub async fn tasks_by_day_impl(
    state: &AppState,
    user_id: &str,
    day: &str,
) -> Result<Vec<Task>, ServiceError> {
    let day = DayOfWeek::parse(day)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unknown weekday: {day}")))?;
    Ok(state.task_store.list_for_day(user_id, day).await?)
}

/// Merges the top-level fields of `patch` onto the stored task. Without a
/// `version` in the patch the stored one is used, so the write only fails on
/// a concurrent change when the caller asked for that check.
pub async fn update_task_impl(
    state: &AppState,
    user_id: &str,
    task_id: &str,
    patch: Value,
) -> Result<Task, ServiceError> {
    let Value::Object(patch) = patch else {
        return Err(ServiceError::InvalidInput(
            "task payload must be a JSON object".to_string(),
        ));
    };
    let stored = get_task_impl(state, user_id, task_id).await?;

    let mut document = serde_json::to_value(&stored).map_err(InfraError::from)?;
    if let Value::Object(fields) = &mut document {
        for (key, value) in patch {
            if PROTECTED_TASK_FIELDS.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key, value);
        }
    }

    let merged = decode_task(document)?;
    merged.validate().map_err(ServiceError::InvalidInput)?;
    let updated = state.task_store.update(merged).await?;

    state.log_info(
        "update_task",
        &format!("updated task_id={} version={}", updated.id, updated.version),
    );
    Ok(updated)
}

pub async fn delete_task_impl(
    state: &AppState,
    user_id: &str,
    task_id: &str,
) -> Result<bool, ServiceError> {
    let task = get_task_impl(state, user_id, task_id).await?;
    let removed = state.task_store.delete(&task.id).await?;
    if removed {
        state.log_info("delete_task", &format!("deleted task_id={}", task.id));
    }
    Ok(removed)
}

pub async fn change_task_status_impl(
    state: &AppState,
    user_id: &str,
    task_id: &str,
    status: &str,
) -> Result<Task, ServiceError> {
    let task_id = required_id(task_id, "task_id")?;
    let requested = TaskStatus::parse(status)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unknown task status: {status}")))?;
    state
        .updater()
        .change_owned_status(user_id, task_id, requested)
        .await
}

pub async fn record_effort_impl(
    state: &AppState,
    user_id: &str,
    task_id: &str,
    seconds: u64,
) -> Result<Task, ServiceError> {
    let task_id = required_id(task_id, "task_id")?;
    state
        .updater()
        .record_owned_effort(user_id, task_id, seconds)
        .await
}

pub async fn task_report_impl(state: &AppState, user_id: &str) -> Result<TaskReport, ServiceError> {
    let tasks = state.task_store.list_for_user(user_id).await?;
    Ok(build_report(&tasks, state.clock.now(), state.clock.today()))
}

pub(crate) fn required_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "{field_name} must not be empty"
        )));
    }
    Ok(trimmed)
}
