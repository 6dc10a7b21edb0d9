pub mod application;
pub mod client;
pub mod domain;
pub mod http;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::AppState;
use infrastructure::error::InfraError;
use infrastructure::logging::init_logging;
use std::path::Path;
use std::sync::Arc;

/// Bootstraps `workspace_root`, starts logging and serves the REST API until
/// the server task ends.
pub async fn run(workspace_root: &Path, port_override: Option<u16>) -> Result<(), InfraError> {
    let mut bootstrap = bootstrap_workspace(workspace_root)?;
    let _log_guard = init_logging(&bootstrap.logs_dir)?;
    if let Some(port) = port_override {
        bootstrap.config.port = port;
    }

    let bind_addr = bootstrap.config.socket_address();
    tracing::info!(
        workspace = %bootstrap.workspace_root.display(),
        database = %bootstrap.database_path.display(),
        timezone = %bootstrap.config.timezone,
        "workspace ready"
    );

    let state = Arc::new(AppState::from_bootstrap(bootstrap)?);
    let server = http::TaskdeckServer::start(state, &bind_addr).await?;
    server.wait().await
}
