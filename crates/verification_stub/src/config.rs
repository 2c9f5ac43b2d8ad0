use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

pub const SETTINGS_FILE: &str = "verification.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub token_secret: String,
    pub token_ttl_seconds: i64,
    /// Upper bound on one multipart submission, all documents included.
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".into(),
            token_secret: "devsecret".into(),
            token_ttl_seconds: 3600,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(Path::new(SETTINGS_FILE)) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!(file = SETTINGS_FILE, "ignoring unparseable settings file");
        return;
    };

    if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
        settings.bind_addr = v.to_string();
    }
    if let Some(v) = file_cfg.get("token_secret").and_then(toml::Value::as_str) {
        settings.token_secret = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("token_ttl_seconds")
        .and_then(toml::Value::as_integer)
    {
        settings.token_ttl_seconds = v;
    }
    if let Some(v) = file_cfg
        .get("max_upload_bytes")
        .and_then(toml::Value::as_integer)
        .and_then(|v| usize::try_from(v).ok())
    {
        settings.max_upload_bytes = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = var("APP__TOKEN_SECRET") {
        settings.token_secret = v;
    }
    if let Some(parsed) = var("APP__TOKEN_TTL_SECONDS").and_then(|v| v.parse().ok()) {
        settings.token_ttl_seconds = parsed;
    }
    if let Some(parsed) = var("APP__MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
        settings.max_upload_bytes = parsed;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
