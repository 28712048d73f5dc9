use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "conduit.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub database_url: String,
    pub log_filter: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: client_core::DEFAULT_API_URL.into(),
            database_url: "sqlite://./data/conduit.db".into(),
            log_filter: "info".into(),
            request_timeout_secs: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new(CONFIG_FILE));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) else {
        eprintln!("ignoring unparseable config file {}", path.display());
        return;
    };

    if let Some(v) = file_cfg.get("api_url").and_then(toml::Value::as_str) {
        settings.api_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("log_filter").and_then(toml::Value::as_str) {
        settings.log_filter = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
    {
        settings.request_timeout_secs = u64::try_from(v).ok();
    }
}

/// Later keys in each pair win, so `APP__*` overrides the short names.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["CONDUIT_API_URL", "APP__API_URL"] {
        if let Some(v) = lookup(key) {
            settings.api_url = v;
        }
    }
    for key in ["CONDUIT_DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = lookup(key) {
            settings.database_url = v;
        }
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.replace('\\', "/");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
