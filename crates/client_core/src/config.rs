use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;

use crate::{events_bus::DEFAULT_BUS_CAPACITY, paging::DEFAULT_PAGE_SIZE};

pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub database_url: String,
    pub request_timeout_secs: u64,
    pub page_size: usize,
    pub bus_capacity: usize,
    pub notification_ttl_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            database_url: "sqlite://./data/client.db".into(),
            request_timeout_secs: 30,
            page_size: DEFAULT_PAGE_SIZE,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            notification_ttl_ms: 4000,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

/// Defaults, then `client.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "config: ignoring malformed settings file"),
        }
    }

    if let Some(v) = env("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(parsed) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = parsed;
    }
    if let Some(parsed) = env("APP__PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = parsed;
    }
    if let Some(parsed) = env("APP__BUS_CAPACITY").and_then(|v| v.parse().ok()) {
        settings.bus_capacity = parsed;
    }
    if let Some(parsed) = env("APP__NOTIFICATION_TTL_MS").and_then(|v| v.parse().ok()) {
        settings.notification_ttl_ms = parsed;
    }

    settings.database_url = normalize_database_url(&settings.database_url);
    settings.page_size = settings.page_size.max(1);
    settings.bus_capacity = settings.bus_capacity.max(1);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("request_timeout_secs").and_then(as_u64) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.get("page_size").and_then(as_u64) {
        settings.page_size = v as usize;
    }
    if let Some(v) = file_cfg.get("bus_capacity").and_then(as_u64) {
        settings.bus_capacity = v as usize;
    }
    if let Some(v) = file_cfg.get("notification_ttl_ms").and_then(as_u64) {
        settings.notification_ttl_ms = v;
    }
}

fn as_u64(value: &toml::Value) -> Option<u64> {
    value.as_integer().and_then(|v| u64::try_from(v).ok())
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
