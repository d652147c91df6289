//! Settings loading from the process environment.

use std::collections::HashMap;
use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{Secret, Settings};
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },

    #[error("invalid value {value:?} for `{key}`: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment.
    ///
    /// Variables already set in the process take precedence over the file.
    pub fn from_env() -> Result<Self, ConfigError> {
        hydrate_env_file(None)?;
        Self::from_vars(env::vars())
    }

    /// Load settings from an explicit set of variables.
    ///
    /// Unknown keys are ignored; blank values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = EnvVars::new(vars);
        let defaults = Settings::default();
        let mut settings = defaults.clone();

        let app = &mut settings.app;
        app.project_name = env.string("PROJECT_NAME", &defaults.app.project_name);
        app.version = env.string("VERSION", &defaults.app.version);
        app.environment = env.parse("ENVIRONMENT", defaults.app.environment.clone(), "profile name")?;
        app.deployment_env = env.string("DEPLOYMENT_ENV", &defaults.app.deployment_env);
        app.server_name = env.string("SERVER_NAME", &defaults.app.server_name);

        let server = &mut settings.server;
        server.bind_address = env.parse("BIND_ADDRESS", defaults.server.bind_address, "socket address such as 0.0.0.0:8000")?;
        server.request_timeout_secs = env.parse("REQUEST_TIMEOUT_SECS", defaults.server.request_timeout_secs, "non-negative integer")?;
        server.force_https = env.flag("FORCE_HTTPS", defaults.server.force_https)?;
        server.allowed_hosts = env.list("ALLOWED_HOSTS", &defaults.server.allowed_hosts)?;
        if env.get("FORWARDED_ALLOW_IPS").is_some() {
            server.forwarded_allow_ips = env
                .list("FORWARDED_ALLOW_IPS", &[])?
                .iter()
                .map(|ip| parse_value("FORWARDED_ALLOW_IPS", ip, "list of IP addresses"))
                .collect::<Result<Vec<_>, _>>()?;
        }

        if let Some(secret) = env.secret("SECRET_KEY") {
            settings.security.secret_key = secret;
        }

        let cors = &mut settings.cors;
        cors.origins = env.list("BACKEND_CORS_ORIGINS", &defaults.cors.origins)?;
        cors.allow_credentials = env.flag("CORS_ALLOW_CREDENTIALS", defaults.cors.allow_credentials)?;
        cors.allow_methods = env.list("CORS_ALLOW_METHODS", &defaults.cors.allow_methods)?;
        cors.allow_headers = env.list("CORS_ALLOW_HEADERS", &defaults.cors.allow_headers)?;

        let services = &mut settings.services;
        services.openai_api_key = env.secret("OPENAI_API_KEY");
        services.deepseek_api_key = env.secret("DEEPSEEK_API_KEY");
        services.insee_api_key = env.secret("INSEE_API_KEY");
        services.banque_france_api_key = env.secret("BANQUE_FRANCE_API_KEY");
        services.eurostat_api_key = env.secret("EUROSTAT_API_KEY");

        settings.storage.database_url = env.string("DATABASE_URL", &defaults.storage.database_url);
        if let Some(dir) = env.get("UPLOAD_DIR") {
            settings.storage.upload_dir = PathBuf::from(dir);
        }

        settings.cache.redis_url = env.get("REDIS_URL").map(str::to_string);

        settings.logging.level = env.parse("LOG_LEVEL", defaults.logging.level, "one of TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL")?;
        if let Some(file) = env.get("LOG_FILE") {
            settings.logging.file = PathBuf::from(file);
        }

        settings.reporting.sentry_dsn = env.secret("SENTRY_DSN");

        settings.rate_limit.requests_per_second = env.parse("RATE_LIMIT_PER_SECOND", defaults.rate_limit.requests_per_second, "positive integer")?;
        settings.rate_limit.burst_size = env.parse("RATE_LIMIT_BURST", defaults.rate_limit.burst_size, "positive integer")?;

        settings.metrics.enabled = env.flag("METRICS_ENABLED", defaults.metrics.enabled)?;
        settings.metrics.address = env.parse("METRICS_ADDRESS", defaults.metrics.address, "socket address such as 0.0.0.0:9090")?;

        validate_settings(&settings).map_err(ConfigError::Validation)?;

        Ok(settings)
    }
}

/// Load variables from an env file into the process environment.
///
/// With no explicit path, `.env` is searched from the working directory
/// upwards and its absence is not an error. Existing variables are kept.
pub fn hydrate_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    let result = match path {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()),
    };

    match result {
        Ok(()) => Ok(()),
        Err(dotenvy::Error::Io(err)) if path.is_none() && err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ConfigError::Dotenv { source: err }),
    }
}

/// Snapshot of raw variables with typed accessors.
struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Trimmed value, `None` when unset or blank.
    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn secret(&self, key: &str) -> Option<Secret> {
        self.get(key).map(Secret::new)
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => parse_value(key, raw, expected),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, raw, "boolean (true/false)")),
        }
    }

    /// A JSON array of strings, or comma-separated text.
    fn list(&self, key: &'static str, default: &[String]) -> Result<Vec<String>, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default.to_vec());
        };
        if raw.starts_with('[') {
            return serde_json::from_str::<Vec<String>>(raw)
                .map_err(|_| invalid(key, raw, "JSON array of strings"));
        }
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str, expected: &'static str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| invalid(key, raw, expected))
}

fn invalid(key: &'static str, raw: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        expected,
    }
}
