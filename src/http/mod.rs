//! REST surface over the application commands.
//!
//! Every `/tasks` route and the account-management routes expect
//! `Authorization: Bearer <token>`; registration, login, health and uploaded
//! files are public.

pub mod auth;
pub mod error;
pub mod tasks;
pub mod users;

use crate::application::commands::AppState;
use crate::infrastructure::error::InfraError;
use axum::Json;
use axum::Router;
use axum::routing::{get, post, put};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/by-id/{id}", get(tasks::get_task))
        .route("/tasks/times", get(tasks::list_times))
        .route("/tasks/by-day/{day}", get(tasks::tasks_by_day))
        .route("/tasks/report", get(tasks::report))
        .route(
            "/tasks/{id}",
            put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/tasks/{id}/status", put(tasks::change_status))
        .route("/tasks/{id}/times", post(tasks::record_effort))
        .route("/users", get(users::list_users))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/logout", post(users::logout))
        .route("/users/change-avatar", post(users::change_avatar))
        .route("/users/by-id/{id}", put(users::update_user_by_id))
        .route(
            "/users/{email}",
            get(users::get_user)
                .put(users::update_user_by_email)
                .delete(users::delete_user),
        )
        .route("/uploads/{file}", get(users::serve_upload))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// A running server bound to a local address.
pub struct TaskdeckServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TaskdeckServer {
    /// Binds `bind_addr` (port `0` picks a free one) and serves in a background task.
    pub async fn start(state: SharedState, bind_addr: &str) -> Result<Self, InfraError> {
        let listener = TcpListener::bind(bind_addr).await?;
        let addr = listener.local_addr()?;
        let app = router(state);

        tracing::info!("taskdeck listening on http://{addr}");
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!("taskdeck server error: {error}");
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }

    /// Waits until the server task ends.
    pub async fn wait(mut self) -> Result<(), InfraError> {
        (&mut self.handle)
            .await
            .map_err(|error| InfraError::Http(format!("server task failed: {error}")))
    }
}

impl Drop for TaskdeckServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
