use crate::domain::error::DomainError;
use crate::domain::models::{decode_task, DayOfWeek, Task};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::ids::next_id;
use crate::infrastructure::storage::open_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistence for task documents. `update` is a compare-and-swap on
/// `Task::version`: it fails with `Conflict` when the stored version moved on,
/// and returns the task with its version incremented.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Task>, InfraError>;

    async fn list_for_day(&self, user_id: &str, day: DayOfWeek) -> Result<Vec<Task>, InfraError> {
        Ok(self
            .list_for_user(user_id)
            .await?
            .into_iter()
            .filter(|task| task.is_scheduled_on(day))
            .collect())
    }

    async fn get(&self, task_id: &str) -> Result<Task, InfraError>;

    async fn insert(&self, task: Task) -> Result<Task, InfraError>;

    async fn update(&self, task: Task) -> Result<Task, InfraError>;

    async fn delete(&self, task_id: &str) -> Result<bool, InfraError>;
}

fn task_not_found(task_id: &str) -> InfraError {
    InfraError::NotFound(format!("task {task_id}"))
}

fn stale_version(task_id: &str, submitted: u64, stored: u64) -> InfraError {
    InfraError::Conflict(format!(
        "task {task_id} is at version {stored}, update was based on {submitted}"
    ))
}

#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

impl SqliteTaskStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_connection(&self.db_path)
    }

    fn decode_row(document: &str, version: i64) -> Result<Task, InfraError> {
        let value: serde_json::Value = serde_json::from_str(document).map_err(|error| {
            DomainError::MalformedTask(format!("stored task document is not JSON: {error}"))
        })?;
        let mut task = decode_task(value)?;
        task.version = version.max(0) as u64;
        Ok(task)
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Task>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT document, version FROM tasks WHERE user_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = statement
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|(document, version)| Self::decode_row(document, *version))
            .collect()
    }

    async fn get(&self, task_id: &str) -> Result<Task, InfraError> {
        let connection = self.connect()?;
        let row: Option<(String, i64)> = connection
            .query_row(
                "SELECT document, version FROM tasks WHERE id = ?1",
                params![task_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((document, version)) = row else {
            return Err(task_not_found(task_id));
        };
        Self::decode_row(&document, version)
    }

    async fn insert(&self, mut task: Task) -> Result<Task, InfraError> {
        if task.id.trim().is_empty() {
            task.id = next_id("tsk");
        }
        task.version = 0;

        let connection = self.connect()?;
        let document = serde_json::to_string(&task)?;
        connection.execute(
            "INSERT INTO tasks (id, user_id, version, created_at, document)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.id,
                task.user_id,
                task.version as i64,
                task.created_at.to_rfc3339(),
                document
            ],
        )?;
        Ok(task)
    }

    async fn update(&self, task: Task) -> Result<Task, InfraError> {
        let connection = self.connect()?;
        let stored_version: Option<i64> = connection
            .query_row(
                "SELECT version FROM tasks WHERE id = ?1",
                params![task.id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(stored_version) = stored_version else {
            return Err(task_not_found(&task.id));
        };
        let stored_version = stored_version.max(0) as u64;
        if stored_version != task.version {
            return Err(stale_version(&task.id, task.version, stored_version));
        }

        let mut updated = task;
        updated.version = stored_version + 1;
        let document = serde_json::to_string(&updated)?;
        let changed = connection.execute(
            "UPDATE tasks SET user_id = ?2, version = ?3, document = ?4
             WHERE id = ?1 AND version = ?5",
            params![
                updated.id,
                updated.user_id,
                updated.version as i64,
                document,
                stored_version as i64
            ],
        )?;
        if changed == 0 {
            return Err(stale_version(&updated.id, stored_version, stored_version + 1));
        }
        Ok(updated)
    }

    async fn delete(&self, task_id: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let removed = connection.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        Ok(removed > 0)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Task>>, InfraError> {
        self.tasks
            .lock()
            .map_err(|error| {
                InfraError::InvalidConfig(format!("task store lock poisoned: {error}"))
            })
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Task>, InfraError> {
        let tasks = self.lock()?;
        let mut owned = tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        owned.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(owned)
    }

    async fn get(&self, task_id: &str) -> Result<Task, InfraError> {
        let tasks = self.lock()?;
        tasks.get(task_id).cloned().ok_or_else(|| task_not_found(task_id))
    }

    async fn insert(&self, mut task: Task) -> Result<Task, InfraError> {
        if task.id.trim().is_empty() {
            task.id = next_id("tsk");
        }
        task.version = 0;

        let mut tasks = self.lock()?;
        if tasks.contains_key(&task.id) {
            return Err(InfraError::Conflict(format!("task {} already exists", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update(&self, task: Task) -> Result<Task, InfraError> {
        let mut tasks = self.lock()?;
        let Some(stored) = tasks.get_mut(&task.id) else {
            return Err(task_not_found(&task.id));
        };
        if stored.version != task.version {
            return Err(stale_version(&task.id, task.version, stored.version));
        }

        let mut updated = task;
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, task_id: &str) -> Result<bool, InfraError> {
        let mut tasks = self.lock()?;
        Ok(tasks.remove(task_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Priority, RecurringDay, TaskKind, TaskStatus};
    use crate::infrastructure::storage::initialize_database;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_DB.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "taskdeck-task-store-{}-{}.sqlite",
                std::process::id(),
                sequence
            ));
            initialize_database(&path).expect("initialize database");
            Self { path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_task(user_id: &str, title: &str, created_at: &str, days: Vec<RecurringDay>) -> Task {
        Task {
            id: String::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: None,
            kind: if days.is_empty() {
                TaskKind::OneTime
            } else {
                TaskKind::Recurring
            },
            start_date: None,
            end_date: None,
            recurring_days: days,
            times: Vec::new(),
            priority: Priority::Medium,
            categories: Vec::new(),
            subtasks: Vec::new(),
            completed: TaskStatus::InProgress,
            created_at: fixed_time(created_at),
            completed_at: None,
            version: 7,
        }
    }

    async fn exercise_store(store: &dyn TaskStore) {
        let first = store
            .insert(sample_task("usr-1", "Second", "2026-02-16T09:00:00Z", Vec::new()))
            .await
            .expect("insert first");
        let second = store
            .insert(sample_task(
                "usr-1",
                "First",
                "2026-02-16T08:00:00Z",
                vec![RecurringDay::new(DayOfWeek::Friday, "09:00", "10:00")],
            ))
            .await
            .expect("insert second");
        store
            .insert(sample_task("usr-2", "Other", "2026-02-16T07:00:00Z", Vec::new()))
            .await
            .expect("insert other");

        assert!(!first.id.is_empty());
        assert_eq!(first.version, 0);

        let listed = store.list_for_user("usr-1").await.expect("list");
        assert_eq!(
            listed.iter().map(|task| task.title.as_str()).collect::<Vec<_>>(),
            vec!["First", "Second"]
        );

        let friday = store
            .list_for_day("usr-1", DayOfWeek::Friday)
            .await
            .expect("list by day");
        assert_eq!(friday.len(), 1);
        assert_eq!(friday[0].id, second.id);

        let mut changed = store.get(&first.id).await.expect("get");
        changed.title = "Renamed".to_string();
        let updated = store.update(changed.clone()).await.expect("update");
        assert_eq!(updated.version, 1);
        assert_eq!(store.get(&first.id).await.expect("reload").title, "Renamed");

        let stale = store.update(changed).await;
        assert!(matches!(stale, Err(InfraError::Conflict(_))));

        assert!(matches!(
            store.get("missing").await,
            Err(InfraError::NotFound(_))
        ));
        assert!(store.delete(&first.id).await.expect("delete"));
        assert!(!store.delete(&first.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn sqlite_store_round_trip() {
        let database = TempDatabase::new();
        let store = SqliteTaskStore::new(&database.path);
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryTaskStore::default();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_reports_unreadable_documents_as_malformed() {
        let database = TempDatabase::new();
        let store = SqliteTaskStore::new(&database.path);
        let connection = open_connection(&database.path).expect("open");
        for (id, document) in [
            (
                "tsk-no-days",
                concat!(
                    r#"{"id":"tsk-no-days","user":"usr-1","title":"Broken","#,
                    r#""type":"recurring","createdAt":"2026-02-16T06:00:00Z"}"#
                ),
            ),
            ("tsk-garbage", "{not json"),
        ] {
            connection
                .execute(
                    "INSERT INTO tasks (id, user_id, version, created_at, document)
                     VALUES (?1, 'usr-1', 0, '2026-02-16T06:00:00Z', ?2)",
                    params![id, document],
                )
                .expect("insert raw row");
            assert!(matches!(
                store.get(id).await,
                Err(InfraError::Domain(DomainError::MalformedTask(_)))
            ));
        }
        assert!(matches!(
            store.list_for_user("usr-1").await,
            Err(InfraError::Domain(DomainError::MalformedTask(_)))
        ));
    }
}
