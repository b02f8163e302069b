use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use riskline_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: Option<&str>| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, Some("RISKLINE_DATABASE_URL"));
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        Some("RISKLINE_DATABASE_MAX_CONNECTIONS"),
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        Some("RISKLINE_DATABASE_TIMEOUT_SECS"),
    );

    push(
        "source.token_url",
        unset_or(&config.source.token_url),
        Some("RISKLINE_SOURCE_TOKEN_URL"),
    );
    push("source.api_url", unset_or(&config.source.api_url), Some("RISKLINE_SOURCE_API_URL"));
    push(
        "source.client_id",
        unset_or(&config.source.client_id),
        Some("RISKLINE_SOURCE_CLIENT_ID"),
    );
    let client_secret = redact_secret(config.source.client_secret.expose_secret());
    push("source.client_secret", &client_secret, Some("RISKLINE_SOURCE_CLIENT_SECRET"));

    push("llm.provider", &format!("{:?}", config.llm.provider), Some("RISKLINE_LLM_PROVIDER"));
    push("llm.model", &config.llm.model, Some("RISKLINE_LLM_MODEL"));
    push(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        Some("RISKLINE_LLM_BASE_URL"),
    );
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    push("llm.api_key", llm_api_key, Some("RISKLINE_LLM_API_KEY"));

    push(
        "underwriting.rule_set",
        config.underwriting.rule_set.as_str(),
        Some("RISKLINE_UNDERWRITING_RULE_SET"),
    );
    push(
        "underwriting.rules_version",
        &config.underwriting.rules_version,
        Some("RISKLINE_UNDERWRITING_RULES_VERSION"),
    );
    let rules_path = config
        .underwriting
        .rules_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    push("underwriting.rules_path", &rules_path, Some("RISKLINE_UNDERWRITING_RULES_PATH"));

    push("logging.level", &config.logging.level, Some("RISKLINE_LOGGING_LEVEL"));
    push("logging.format", &format!("{:?}", config.logging.format), Some("RISKLINE_LOGGING_FORMAT"));

    lines.join("\n")
}

fn unset_or(value: &str) -> &str {
    if value.trim().is_empty() {
        "<unset>"
    } else {
        value
    }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("riskline.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/riskline.toml");
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

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<unset>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
