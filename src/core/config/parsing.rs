use std::env;

use super::types::{ConfigError, Environment};

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:3000", "http://localhost:5173", "https://fit.neu.edu.vn"];

pub(super) const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Resolves the backend base URL: an explicit full URL first, then host and
/// port parts, then the built-in default.
pub(super) fn resolve_backend_url(
    full_url: Option<String>,
    host: Option<String>,
    port: Option<String>,
) -> Result<String, ConfigError> {
    if let Some(url) = full_url {
        return normalize_backend_url(url);
    }

    if let Some(host) = host {
        let port = match port {
            Some(value) => parse_u16("BACKEND_PORT", value)?,
            None => 80,
        };
        let host = host.trim_end_matches('/');
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{port}")
        } else {
            format!("http://{host}:{port}")
        };
        return normalize_backend_url(url);
    }

    Ok(DEFAULT_BACKEND_URL.to_string())
}

fn normalize_backend_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let authority =
        trimmed.strip_prefix("http://").or_else(|| trimmed.strip_prefix("https://")).unwrap_or("");

    if authority.is_empty() {
        return Err(ConfigError::InvalidBackendUrl(raw));
    }

    Ok(trimmed.to_string())
}

/// Normalizes a deployment prefix to `/segment[/segment]` or the empty string.
pub(super) fn parse_base_path(value: Option<String>) -> String {
    let Some(raw) = value else {
        return String::new();
    };

    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }

    format!("/{trimmed}")
}

pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(default_cors_origins());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(default_cors_origins());
    }

    Ok(items)
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}
