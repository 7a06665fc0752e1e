use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use campusdesk_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = match &config.llm.api_key {
        Some(secret) => redact_secret(secret.expose_secret()),
        None => "<unset>".to_string(),
    };

    // (key path, effective value, env variable)
    let fields: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "CAMPUSDESK_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "CAMPUSDESK_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "CAMPUSDESK_DATABASE_TIMEOUT_SECS",
        ),
        (
            "database.seed_demo_data",
            config.database.seed_demo_data.to_string(),
            "CAMPUSDESK_DATABASE_SEED_DEMO_DATA",
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), "CAMPUSDESK_LLM_PROVIDER"),
        ("llm.model", config.llm.model.clone(), "CAMPUSDESK_LLM_MODEL"),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "CAMPUSDESK_LLM_BASE_URL",
        ),
        ("llm.api_key", api_key, "CAMPUSDESK_LLM_API_KEY"),
        ("llm.temperature", config.llm.temperature.to_string(), "CAMPUSDESK_LLM_TEMPERATURE"),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), "CAMPUSDESK_LLM_TIMEOUT_SECS"),
        ("llm.max_retries", config.llm.max_retries.to_string(), "CAMPUSDESK_LLM_MAX_RETRIES"),
        ("router.strategy", format!("{:?}", config.router.strategy), "CAMPUSDESK_ROUTER_STRATEGY"),
        (
            "router.tool_timeout_secs",
            config.router.tool_timeout_secs.to_string(),
            "CAMPUSDESK_ROUTER_TOOL_TIMEOUT_SECS",
        ),
        (
            "router.max_tool_rounds",
            config.router.max_tool_rounds.to_string(),
            "CAMPUSDESK_ROUTER_MAX_TOOL_ROUNDS",
        ),
        (
            "router.max_prompt_chars",
            config.router.max_prompt_chars.to_string(),
            "CAMPUSDESK_ROUTER_MAX_PROMPT_CHARS",
        ),
        ("cache.ttl_secs", config.cache.ttl_secs.to_string(), "CAMPUSDESK_CACHE_TTL_SECS"),
        ("cache.max_entries", config.cache.max_entries.to_string(), "CAMPUSDESK_CACHE_MAX_ENTRIES"),
        (
            "tools.default_limit",
            config.tools.default_limit.to_string(),
            "CAMPUSDESK_TOOLS_DEFAULT_LIMIT",
        ),
        ("tools.max_limit", config.tools.max_limit.to_string(), "CAMPUSDESK_TOOLS_MAX_LIMIT"),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            "CAMPUSDESK_SERVER_BIND_ADDRESS",
        ),
        ("server.port", config.server.port.to_string(), "CAMPUSDESK_SERVER_PORT"),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "CAMPUSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        ("logging.level", config.logging.level.clone(), "CAMPUSDESK_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "CAMPUSDESK_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_key) in fields {
        let source = field_source(
            key_path,
            Some(env_key),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("campusdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/campusdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognisable key prefix such as `sk-` and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
