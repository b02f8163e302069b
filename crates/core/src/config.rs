use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::underwriting::RuleSet;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub llm: LlmConfig,
    pub underwriting: UnderwritingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// External policy-administration API. Credentials follow the provider's
/// client-credentials grant; the secret never leaves the process unredacted.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub token_url: String,
    pub api_url: String,
    pub audience: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct UnderwritingConfig {
    pub rule_set: RuleSet,
    pub rules_version: String,
    /// Optional path to the free-text guideline document. Versioning
    /// metadata only: thresholds always come from configuration, never from
    /// parsing this file.
    pub rules_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub rule_set: Option<RuleSet>,
    pub rules_version: Option<String>,
    pub source_client_id: Option<String>,
    pub source_client_secret: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://riskline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            source: SourceConfig {
                token_url: String::new(),
                api_url: String::new(),
                audience: String::new(),
                client_id: String::new(),
                client_secret: String::new().into(),
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            underwriting: UnderwritingConfig {
                rule_set: RuleSet::HardGate,
                rules_version: "v1.0".to_string(),
                rules_path: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("riskline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(source) = patch.source {
            if let Some(token_url) = source.token_url {
                self.source.token_url = token_url;
            }
            if let Some(api_url) = source.api_url {
                self.source.api_url = api_url;
            }
            if let Some(audience) = source.audience {
                self.source.audience = audience;
            }
            if let Some(client_id) = source.client_id {
                self.source.client_id = client_id;
            }
            if let Some(client_secret) = source.client_secret {
                self.source.client_secret = secret_value(client_secret);
            }
            if let Some(timeout_secs) = source.timeout_secs {
                self.source.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(underwriting) = patch.underwriting {
            if let Some(rule_set) = underwriting.rule_set {
                self.underwriting.rule_set = rule_set;
            }
            if let Some(rules_version) = underwriting.rules_version {
                self.underwriting.rules_version = rules_version;
            }
            if let Some(rules_path) = underwriting.rules_path {
                self.underwriting.rules_path = Some(rules_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RISKLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("RISKLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("RISKLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RISKLINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("RISKLINE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RISKLINE_SOURCE_TOKEN_URL") {
            self.source.token_url = value;
        }
        if let Some(value) = read_env("RISKLINE_SOURCE_API_URL") {
            self.source.api_url = value;
        }
        if let Some(value) = read_env("RISKLINE_SOURCE_AUDIENCE") {
            self.source.audience = value;
        }
        if let Some(value) = read_env("RISKLINE_SOURCE_CLIENT_ID") {
            self.source.client_id = value;
        }
        if let Some(value) = read_env("RISKLINE_SOURCE_CLIENT_SECRET") {
            self.source.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("RISKLINE_SOURCE_TIMEOUT_SECS") {
            self.source.timeout_secs = parse_u64("RISKLINE_SOURCE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RISKLINE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("RISKLINE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("RISKLINE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("RISKLINE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("RISKLINE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("RISKLINE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("RISKLINE_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("RISKLINE_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("RISKLINE_UNDERWRITING_RULE_SET") {
            self.underwriting.rule_set =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "RISKLINE_UNDERWRITING_RULE_SET".to_string(),
                    value,
                })?;
        }
        if let Some(value) = read_env("RISKLINE_UNDERWRITING_RULES_VERSION") {
            self.underwriting.rules_version = value;
        }
        if let Some(value) = read_env("RISKLINE_UNDERWRITING_RULES_PATH") {
            self.underwriting.rules_path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("RISKLINE_LOGGING_LEVEL").or_else(|| read_env("RISKLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RISKLINE_LOGGING_FORMAT").or_else(|| read_env("RISKLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(rule_set) = overrides.rule_set {
            self.underwriting.rule_set = rule_set;
        }
        if let Some(rules_version) = overrides.rules_version {
            self.underwriting.rules_version = rules_version;
        }
        if let Some(client_id) = overrides.source_client_id {
            self.source.client_id = client_id;
        }
        if let Some(client_secret) = overrides.source_client_secret {
            self.source.client_secret = secret_value(client_secret);
        }
        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_source(&self.source)?;
        validate_llm(&self.llm)?;
        validate_underwriting(&self.underwriting)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Whether enough source credentials are present to attempt a fetch.
    pub fn source_ready(&self) -> bool {
        !self.source.token_url.trim().is_empty()
            && !self.source.api_url.trim().is_empty()
            && !self.source.client_id.trim().is_empty()
            && !self.source.client_secret.expose_secret().trim().is_empty()
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("riskline.toml"), PathBuf::from("config/riskline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    for (key, url) in [("source.token_url", &source.token_url), ("source.api_url", &source.api_url)]
    {
        let trimmed = url.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("http://") && !trimmed.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    if source.timeout_secs == 0 || source.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "source.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_underwriting(underwriting: &UnderwritingConfig) -> Result<(), ConfigError> {
    if underwriting.rules_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "underwriting.rules_version must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    source: Option<SourcePatch>,
    llm: Option<LlmPatch>,
    underwriting: Option<UnderwritingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SourcePatch {
    token_url: Option<String>,
    api_url: Option<String>,
    audience: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct UnderwritingPatch {
    rule_set: Option<RuleSet>,
    rules_version: Option<String>,
    rules_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use crate::underwriting::RuleSet;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SOURCE_CLIENT_SECRET", "secret-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("riskline.toml");
            fs::write(
                &path,
                r#"
[source]
token_url = "https://auth.example.com/oauth/token"
api_url = "https://api.example.com/handlers/all-policies"
client_id = "riskline-dev"
client_secret = "${TEST_SOURCE_CLIENT_SECRET}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.source.client_secret.expose_secret() == "secret-from-env",
                "client secret should be loaded from environment",
            )?;
            ensure(config.source_ready(), "source should be ready with full credentials")?;
            Ok(())
        })();

        clear_vars(&["TEST_SOURCE_CLIENT_SECRET"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RISKLINE_LOG_LEVEL", "warn");
        env::set_var("RISKLINE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["RISKLINE_LOG_LEVEL", "RISKLINE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RISKLINE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("RISKLINE_UNDERWRITING_RULE_SET", "risk_accumulation");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("riskline.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[underwriting]
rule_set = "hard_gate"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.underwriting.rule_set == RuleSet::RiskAccumulation,
                "env rule set should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["RISKLINE_DATABASE_URL", "RISKLINE_UNDERWRITING_RULE_SET"]);
        result
    }

    #[test]
    fn invalid_rule_set_env_override_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RISKLINE_UNDERWRITING_RULE_SET", "vibes");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected load failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let is_override_error = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "RISKLINE_UNDERWRITING_RULE_SET"
            );
            ensure(is_override_error, "failure should name the offending env var")
        })();

        clear_vars(&["RISKLINE_UNDERWRITING_RULE_SET"]);
        result
    }

    #[test]
    fn non_http_source_url_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RISKLINE_SOURCE_API_URL", "ftp://example.com/policies");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("source.api_url")
            );
            ensure(has_message, "validation failure should mention source.api_url")
        })();

        clear_vars(&["RISKLINE_SOURCE_API_URL"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RISKLINE_SOURCE_CLIENT_SECRET", "super-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("super-secret-value"),
                "debug output should not contain the client secret",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["RISKLINE_SOURCE_CLIENT_SECRET"]);
        result
    }

    #[test]
    fn source_is_not_ready_with_partial_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(!config.source_ready(), "defaults carry no credentials")
        })();

        result
    }
}
