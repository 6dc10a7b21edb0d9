use crate::domain::models::Task;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

/// Process-local list of the caller's tasks, kept in sync after each
/// successful write so views can re-read without another round trip.
pub trait TaskRepository: Send + Sync {
    fn list(&self) -> Result<Vec<Task>, InfraError>;
    fn get(&self, task_id: &str) -> Result<Option<Task>, InfraError>;
    fn upsert(&self, task: &Task) -> Result<(), InfraError>;
    fn replace_all(&self, tasks: Vec<Task>) -> Result<(), InfraError>;
    fn remove(&self, task_id: &str) -> Result<(), InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<Vec<Task>>,
}

impl InMemoryTaskRepository {
    fn normalized_id(task_id: &str) -> Option<&str> {
        let normalized = task_id.trim();
        (!normalized.is_empty()).then_some(normalized)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Task>>, InfraError> {
        self.tasks
            .lock()
            .map_err(|error| {
                InfraError::InvalidConfig(format!("task cache lock poisoned: {error}"))
            })
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn list(&self) -> Result<Vec<Task>, InfraError> {
        Ok(self.lock()?.clone())
    }

    fn get(&self, task_id: &str) -> Result<Option<Task>, InfraError> {
        let Some(task_id) = Self::normalized_id(task_id) else {
            return Ok(None);
        };
        Ok(self.lock()?.iter().find(|task| task.id == task_id).cloned())
    }

    /// Replaces the entry in place so list order is stable across updates.
    fn upsert(&self, task: &Task) -> Result<(), InfraError> {
        if Self::normalized_id(&task.id).is_none() {
            return Err(InfraError::InvalidConfig(
                "task id is required for cache upsert".to_string(),
            ));
        }
        let mut tasks = self.lock()?;
        match tasks.iter_mut().find(|cached| cached.id == task.id) {
            Some(cached) => *cached = task.clone(),
            None => tasks.push(task.clone()),
        }
        Ok(())
    }

    fn replace_all(&self, tasks: Vec<Task>) -> Result<(), InfraError> {
        *self.lock()? = tasks;
        Ok(())
    }

    fn remove(&self, task_id: &str) -> Result<(), InfraError> {
        let Some(task_id) = Self::normalized_id(task_id) else {
            return Ok(());
        };
        self.lock()?.retain(|task| task.id != task_id);
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        self.lock()?.clear();
        Ok(())
    }
}
