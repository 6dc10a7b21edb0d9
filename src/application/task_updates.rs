use crate::application::error::ServiceError;
use crate::domain::clock::Clock;
use crate::domain::error::DomainError;
use crate::domain::models::{EffortEntry, Task, TaskStatus};
use crate::domain::status::{apply_status, check_effort_entry};
use crate::infrastructure::task_cache::TaskRepository;
use crate::infrastructure::task_store::TaskStore;
use std::sync::Arc;

/// Read-modify-write path for status changes and effort entries.
///
/// Each call loads the task, checks its shape, applies the change, persists it
/// through the store's versioned `update`, and mirrors the stored result into
/// the optional task repository. Nothing is written when any step fails.
pub struct TaskUpdater {
    store: Arc<dyn TaskStore>,
    repository: Option<Arc<dyn TaskRepository>>,
    clock: Clock,
}

impl TaskUpdater {
    pub fn new(store: Arc<dyn TaskStore>, clock: Clock) -> Self {
        Self {
            store,
            repository: None,
            clock,
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn TaskRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub async fn change_status(
        &self,
        task_id: &str,
        requested: TaskStatus,
    ) -> Result<Task, ServiceError> {
        let task = self.load(task_id, None).await?;
        self.apply_and_persist(task, requested).await
    }

    /// Same as [`Self::change_status`], but a task owned by someone else is
    /// reported as missing.
    pub async fn change_owned_status(
        &self,
        user_id: &str,
        task_id: &str,
        requested: TaskStatus,
    ) -> Result<Task, ServiceError> {
        let task = self.load(task_id, Some(user_id)).await?;
        self.apply_and_persist(task, requested).await
    }

    pub async fn record_effort(&self, task_id: &str, seconds: u64) -> Result<Task, ServiceError> {
        self.append_effort(task_id, None, seconds).await
    }

    pub async fn record_owned_effort(
        &self,
        user_id: &str,
        task_id: &str,
        seconds: u64,
    ) -> Result<Task, ServiceError> {
        self.append_effort(task_id, Some(user_id), seconds).await
    }

    async fn load(&self, task_id: &str, owner: Option<&str>) -> Result<Task, ServiceError> {
        let task = self
            .store
            .get(task_id)
            .await
            .map_err(|error| match ServiceError::from(error) {
                ServiceError::Domain(malformed @ DomainError::MalformedTask(_)) => {
                    self.reject_malformed(task_id, malformed)
                }
                other => other,
            })?;
        if owner.is_some_and(|owner| owner != task.user_id) {
            return Err(ServiceError::NotFound(format!("task {task_id}")));
        }
        task.check_shape()
            .map_err(|error| self.reject_malformed(task_id, error))?;
        Ok(task)
    }

    fn reject_malformed(&self, task_id: &str, error: DomainError) -> ServiceError {
        tracing::warn!(task_id, %error, "rejecting update of malformed task");
        ServiceError::Domain(error)
    }

    async fn apply_and_persist(
        &self,
        mut task: Task,
        requested: TaskStatus,
    ) -> Result<Task, ServiceError> {
        let change = apply_status(&mut task, requested, self.clock.now(), self.clock.today())?;
        let stored = self.persist(task).await?;
        tracing::info!(
            task_id = %stored.id,
            requested = change.requested.as_str(),
            status = change.status.as_str(),
            day = change.day.map(|day| day.name()),
            version = stored.version,
            "task status updated"
        );
        Ok(stored)
    }

    async fn append_effort(
        &self,
        task_id: &str,
        owner: Option<&str>,
        seconds: u64,
    ) -> Result<Task, ServiceError> {
        check_effort_entry(seconds).map_err(ServiceError::InvalidInput)?;
        let mut task = self.load(task_id, owner).await?;
        task.times.push(EffortEntry {
            time: seconds,
            recorded_at: self.clock.now(),
        });
        let stored = self.persist(task).await?;
        tracing::info!(
            task_id = %stored.id,
            seconds,
            total = stored.total_effort_seconds(),
            "effort recorded"
        );
        Ok(stored)
    }

    async fn persist(&self, task: Task) -> Result<Task, ServiceError> {
        let stored = self.store.update(task).await?;
        if let Some(repository) = &self.repository {
            repository.upsert(&stored)?;
        }
        Ok(stored)
    }
}
