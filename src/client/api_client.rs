use crate::application::accounts::{LoginRequest, LoginResponse, RegisterRequest};
use crate::application::error::ServiceError;
use crate::application::reports::TaskReport;
use crate::application::task_updates::TaskUpdater;
use crate::client::dashboard::{build_dashboard, Dashboard};
use crate::client::session::{Session, SessionData, SessionStore};
use crate::domain::clock::Clock;
use crate::domain::models::{decode_task, DayOfWeek, PublicUser, Task, TaskStatus};
use crate::domain::status::check_effort_entry;
use crate::http::error::ErrorBody;
use crate::http::users::UserEnvelope;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_cache::TaskRepository;
use crate::infrastructure::task_store::TaskStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// REST client for a taskdeck server. The session is injected so callers
/// decide whether it is shared, restored from a store, or throwaway.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Session,
    session_store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        session: Session,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self, InfraError> {
        let base_url = Url::parse(base_url)
            .map_err(|error| {
                InfraError::InvalidConfig(format!("invalid base url '{base_url}': {error}"))
            })?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "base url cannot be a base: {base_url}"
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            session,
            session_store,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| InfraError::InvalidConfig("base url cannot be a base".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, InfraError> {
        let token = self.session.token()?.ok_or_else(|| InfraError::Api {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            code: "unauthorized".to_string(),
            message: "not signed in".to_string(),
        })?;
        Ok(request.bearer_auth(token))
    }

    fn api_error(status: StatusCode, body: &str) -> InfraError {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => InfraError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message: parsed.error,
            },
            Err(_) => InfraError::Api {
                status: status.as_u16(),
                code: "http_error".to_string(),
                message: if body.trim().is_empty() {
                    format!("http {}", status.as_u16())
                } else {
                    body.trim().to_string()
                },
            },
        }
    }

    /// Sends the request and returns the status with the raw body of a
    /// successful response.
    async fn send(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<(StatusCode, String), InfraError> {
        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while {action}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| {
                InfraError::Http(format!("failed reading response while {action}: {error}"))
            })?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, InfraError> {
        let (_, body) = self.send(request, action).await?;
        serde_json::from_str(&body).map_err(|error| {
            InfraError::Http(format!("invalid payload while {action}: {error}; body={body}"))
        })
    }

    async fn send_task(&self, request: RequestBuilder, action: &str) -> Result<Task, InfraError> {
        let value: Value = self.send_json(request, action).await?;
        Ok(decode_task(value)?)
    }

    async fn send_tasks(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<Vec<Task>, InfraError> {
        let values: Vec<Value> = self.send_json(request, action).await?;
        values
            .into_iter()
            .map(|value| decode_task(value).map_err(InfraError::from))
            .collect()
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<PublicUser, InfraError> {
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password_confirmation.to_string(),
        };
        let envelope: UserEnvelope = self
            .send_json(
                self.client
                    .post(self.endpoint(&["users", "register"])?)
                    .json(&request),
                "registering",
            )
            .await?;
        Ok(envelope.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, InfraError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .send_json(
                self.client
                    .post(self.endpoint(&["users", "login"])?)
                    .json(&request),
                "signing in",
            )
            .await?;

        let data = SessionData {
            token: response.token,
            user: response.user.clone(),
        };
        self.session.set(data.clone())?;
        self.session_store.save(&data)?;
        tracing::info!(user_id = %response.user.id, "signed in");
        Ok(response.user)
    }

    /// Revokes the token server-side when possible; the local session is
    /// cleared either way.
    pub async fn logout(&self) -> Result<(), InfraError> {
        if self.session.token()?.is_some() {
            let request = self.authorized(self.client.post(self.endpoint(&["users", "logout"])?))?;
            if let Err(error) = self.send(request, "signing out").await {
                tracing::warn!(%error, "server-side sign out failed");
            }
        }
        self.session.clear()?;
        self.session_store.delete()
    }

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, InfraError> {
        let request = self.authorized(self.client.get(self.endpoint(&["tasks"])?))?;
        self.send_tasks(request, "listing tasks").await
    }

    pub async fn fetch_task(&self, task_id: &str) -> Result<Task, InfraError> {
        let request =
            self.authorized(self.client.get(self.endpoint(&["tasks", "by-id", task_id])?))?;
        self.send_task(request, "loading task").await
    }

    pub async fn tasks_by_day(&self, day: DayOfWeek) -> Result<Vec<Task>, InfraError> {
        let request =
            self.authorized(self.client.get(self.endpoint(&["tasks", "by-day", day.name()])?))?;
        self.send_tasks(request, "listing tasks by day").await
    }

    pub async fn create_task(&self, task: &Task) -> Result<Task, InfraError> {
        let request = self.authorized(self.client.post(self.endpoint(&["tasks"])?).json(task))?;
        self.send_task(request, "creating task").await
    }

    /// Sends the full document, including its version, so a concurrent change
    /// on the server surfaces as a conflict.
    pub async fn put_task(&self, task: &Task) -> Result<Task, InfraError> {
        let url = self.endpoint(&["tasks", task.id.as_str()])?;
        let request = self.authorized(self.client.put(url).json(task))?;
        self.send_task(request, "updating task").await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<bool, InfraError> {
        let request = self.authorized(self.client.delete(self.endpoint(&["tasks", task_id])?))?;
        match self.send(request, "deleting task").await {
            Ok(_) => Ok(true),
            Err(InfraError::Api { status: 404, .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    pub async fn report(&self) -> Result<TaskReport, InfraError> {
        let request = self.authorized(self.client.get(self.endpoint(&["tasks", "report"])?))?;
        self.send_json(request, "loading report").await
    }

    /// Evaluates the status change locally against the server's copy of the
    /// task, then writes it back and mirrors it into `repository`.
    pub async fn change_task_status(
        &self,
        repository: Arc<dyn TaskRepository>,
        clock: Clock,
        task_id: &str,
        requested: TaskStatus,
    ) -> Result<Task, ServiceError> {
        TaskUpdater::new(Arc::new(self.clone()), clock)
            .with_repository(repository)
            .change_status(task_id, requested)
            .await
    }

    pub async fn record_effort(
        &self,
        repository: &dyn TaskRepository,
        task_id: &str,
        seconds: u64,
    ) -> Result<Task, ServiceError> {
        check_effort_entry(seconds).map_err(ServiceError::InvalidInput)?;
        let request = self.authorized(
            self.client
                .post(self.endpoint(&["tasks", task_id, "times"])?)
                .json(&serde_json::json!({ "time": seconds })),
        )?;
        let task = self.send_task(request, "recording effort").await?;
        repository.upsert(&task)?;
        Ok(task)
    }

    /// Refreshes `repository` from the server and summarizes it for today.
    pub async fn dashboard(
        &self,
        repository: &dyn TaskRepository,
        clock: &Clock,
    ) -> Result<Dashboard, InfraError> {
        let tasks = self.fetch_tasks().await?;
        repository.replace_all(tasks.clone())?;
        Ok(build_dashboard(&tasks, clock))
    }
}

#[async_trait]
impl TaskStore for ApiClient {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Task>, InfraError> {
        Ok(self
            .fetch_tasks()
            .await?
            .into_iter()
            .filter(|task| task.user_id == user_id)
            .collect())
    }

    async fn list_for_day(&self, user_id: &str, day: DayOfWeek) -> Result<Vec<Task>, InfraError> {
        Ok(self
            .tasks_by_day(day)
            .await?
            .into_iter()
            .filter(|task| task.user_id == user_id)
            .collect())
    }

    async fn get(&self, task_id: &str) -> Result<Task, InfraError> {
        match self.fetch_task(task_id).await {
            Err(InfraError::Api { status: 404, message, .. }) => Err(InfraError::NotFound(message)),
            other => other,
        }
    }

    async fn insert(&self, task: Task) -> Result<Task, InfraError> {
        self.create_task(&task).await
    }

    async fn update(&self, task: Task) -> Result<Task, InfraError> {
        match self.put_task(&task).await {
            Err(InfraError::Api { status: 409, message, .. }) => Err(InfraError::Conflict(message)),
            Err(InfraError::Api { status: 404, message, .. }) => Err(InfraError::NotFound(message)),
            other => other,
        }
    }

    async fn delete(&self, task_id: &str) -> Result<bool, InfraError> {
        self.delete_task(task_id).await
    }
}
