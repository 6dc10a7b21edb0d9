use crate::infrastructure::config::{ensure_default_config, load_config_with_env, AppConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config: AppConfig,
    pub database_path: PathBuf,
    pub logs_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let uploads_dir = workspace_root.join("uploads");
    let database_path = state_dir.join("taskdeck.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;
    fs::create_dir_all(&uploads_dir)?;

    ensure_default_config(&config_dir)?;
    let config = load_config_with_env(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config,
        database_path,
        logs_dir,
        uploads_dir,
    })
}
