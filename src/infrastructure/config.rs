use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    pub timezone: String,
    pub bind_address: String,
    pub port: u16,
    pub session_ttl_minutes: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            app_name: "taskdeck".to_string(),
            timezone: "UTC".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            session_ttl_minutes: 60,
        }
    }
}

impl AppConfig {
    pub fn parsed_timezone(&self) -> Result<Tz, InfraError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("unknown timezone '{}': {error}", self.timezone))
        })
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        self.parsed_timezone()?;
        if self.bind_address.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "bindAddress must not be empty".to_string(),
            ));
        }
        if self.session_ttl_minutes == 0 {
            return Err(InfraError::InvalidConfig(
                "sessionTtlMinutes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let config: AppConfig = serde_json::from_value(read_config(&config_dir.join(APP_JSON))?)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config_with_env(config_dir: &Path) -> Result<AppConfig, InfraError> {
    apply_env_overrides(load_config(config_dir)?, |key| std::env::var(key).ok())
}

pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind_address) = optional_lookup_value(&lookup, &["TASKDECK_BIND_ADDRESS"]) {
        config.bind_address = bind_address;
    }
    if let Some(raw_port) = optional_lookup_value(&lookup, &["TASKDECK_PORT", "PORT"]) {
        config.port = raw_port
            .parse::<u16>()
            .map_err(|error| {
                InfraError::InvalidConfig(format!("invalid port '{raw_port}': {error}"))
            })?;
    }
    if let Some(timezone) = optional_lookup_value(&lookup, &["TASKDECK_TIMEZONE"]) {
        config.timezone = timezone;
    }
    config.validate()?;
    Ok(config)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
