use crate::domain::models::TimerSettings;
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const APP_JSON: &str = "app.json";
const TIMER_JSON: &str = "timer.json";
const DEFAULT_HOSTS_PATH: &str = "/etc/hosts";
const WORKSPACE_ENV_KEYS: [&str; 1] = ["TOMATO_FOCUS_WORKSPACE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingBackend {
    RulesFile,
    Hosts,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierBackend {
    Desktop,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub app_name: String,
    pub blocking_backend: BlockingBackend,
    pub hosts_path: PathBuf,
    pub notifier: NotifierBackend,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    let settings = TimerSettings::default();
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "TomatoFocus",
                "blocking": {
                    "backend": "rules_file",
                    "hostsPath": DEFAULT_HOSTS_PATH
                },
                "notifier": "desktop"
            }),
        ),
        (
            TIMER_JSON,
            serde_json::json!({
                "schema": 1,
                "workMinutes": settings.work_minutes,
                "shortBreakMinutes": settings.short_break_minutes,
                "longBreakMinutes": settings.long_break_minutes,
                "longBreakInterval": settings.long_break_interval
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            write_config(&path, &value)?;
        }
    }
    Ok(())
}

fn write_config(path: &Path, value: &serde_json::Value) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_host_config(config_dir: &Path) -> Result<HostConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let app_name = app
        .get("appName")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("TomatoFocus")
        .to_string();

    let blocking = app.get("blocking");
    let blocking_backend = match blocking
        .and_then(|value| value.get("backend"))
        .and_then(serde_json::Value::as_str)
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        None | Some("rules_file") => BlockingBackend::RulesFile,
        Some("hosts") => BlockingBackend::Hosts,
        Some("none") => BlockingBackend::Disabled,
        Some(other) => {
            return Err(InfraError::InvalidConfig(format!(
                "unknown blocking.backend '{other}' (expected rules_file, hosts or none)"
            )));
        }
    };
    let hosts_path = blocking
        .and_then(|value| value.get("hostsPath"))
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTS_PATH));

    let notifier = match app
        .get("notifier")
        .and_then(serde_json::Value::as_str)
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        None | Some("desktop") => NotifierBackend::Desktop,
        Some("log") => NotifierBackend::Log,
        Some(other) => {
            return Err(InfraError::InvalidConfig(format!(
                "unknown notifier '{other}' (expected desktop or log)"
            )));
        }
    };

    Ok(HostConfig {
        app_name,
        blocking_backend,
        hosts_path,
        notifier,
    })
}

pub fn read_timer_settings(config_dir: &Path) -> Result<TimerSettings, InfraError> {
    let path = config_dir.join(TIMER_JSON);
    let timer = read_config(&path)?;
    let settings = TimerSettings {
        work_minutes: read_minutes(&timer, "workMinutes", &path)?,
        short_break_minutes: read_minutes(&timer, "shortBreakMinutes", &path)?,
        long_break_minutes: read_minutes(&timer, "longBreakMinutes", &path)?,
        long_break_interval: read_minutes(&timer, "longBreakInterval", &path)?,
    };
    settings.validate().map_err(InfraError::InvalidConfig)?;
    Ok(settings)
}

fn read_minutes(value: &serde_json::Value, key: &str, path: &Path) -> Result<u32, InfraError> {
    value
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .and_then(|raw| u32::try_from(raw).ok())
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "{key} must be a positive integer in {}",
                path.display()
            ))
        })
}

pub fn save_timer_settings(config_dir: &Path, settings: &TimerSettings) -> Result<(), InfraError> {
    settings.validate().map_err(InfraError::InvalidConfig)?;
    let path = config_dir.join(TIMER_JSON);
    let mut timer = read_config(&path)?;
    let object = timer.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert("workMinutes".to_string(), settings.work_minutes.into());
    object.insert(
        "shortBreakMinutes".to_string(),
        settings.short_break_minutes.into(),
    );
    object.insert(
        "longBreakMinutes".to_string(),
        settings.long_break_minutes.into(),
    );
    object.insert(
        "longBreakInterval".to_string(),
        settings.long_break_interval.into(),
    );
    write_config(&path, &timer)
}

pub fn resolve_workspace_root(explicit: Option<PathBuf>) -> Result<PathBuf, InfraError> {
    resolve_workspace_root_from_lookup(explicit, |key| std::env::var(key).ok())
}

fn resolve_workspace_root_from_lookup<F>(
    explicit: Option<PathBuf>,
    lookup: F,
) -> Result<PathBuf, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = optional_lookup_value(&lookup, &WORKSPACE_ENV_KEYS) {
        return Ok(PathBuf::from(path));
    }
    Ok(std::env::current_dir()?)
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
