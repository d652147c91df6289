//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the API.
//! Every field carries a default so an empty environment yields a
//! runnable development configuration.

use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::level_filters::LevelFilter;

/// Versioned API path prefix.
pub const API_V1_STR: &str = "/api/v1";

/// Maximum accepted request body (10 MiB).
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Cache entry lifetime in seconds.
pub const CACHE_TTL_SECS: u64 = 3600;

/// Access token lifetime: 8 days.
pub const ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 60 * 24 * 8;

/// Size at which the log file rolls over (10 MiB).
pub const LOG_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Number of rotated log files kept next to the active one.
pub const LOG_BACKUP_COUNT: usize = 5;

/// Placeholder secret shipped with the defaults.
pub const DEFAULT_SECRET_KEY: &str = "your-secret-key-here";

/// Headers stamped on every outbound response.
pub const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("content-security-policy", "default-src 'self'"),
];

/// Resolved runtime profile.
///
/// Computed once from `ENVIRONMENT`; every environment-dependent decision
/// (fault detail exposure, sampling, HTTPS redirect, framework verbosity)
/// goes through this type. Unrecognized names are kept verbatim as
/// [`Environment::Other`] and behave like a non-production profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Testing,
    Production,
    Other(String),
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Testing => "testing",
            Environment::Production => "production",
            Environment::Other(name) => name,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Whether fault messages may be returned to clients.
    pub fn exposes_fault_details(&self) -> bool {
        !self.is_production()
    }

    /// Fraction of errors and traces forwarded to the reporting backend.
    pub fn report_sample_rate(&self) -> f32 {
        if self.is_production() {
            0.1
        } else {
            1.0
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Ok(match name.to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            "staging" => Environment::Staging,
            "testing" | "test" => Environment::Testing,
            "production" | "prod" => Environment::Production,
            _ => Environment::Other(name.to_string()),
        })
    }
}

/// Log severity threshold, accepting the conventional level names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            // tracing has no level above ERROR
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }

    /// Directive name understood by `EnvFilter`.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(()),
        }
    }
}

/// A credential that never shows up in logs or printed configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// Root settings for the API process.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Settings {
    /// Identity and runtime profile.
    pub app: AppSettings,

    /// Listener and transport policy.
    pub server: ServerSettings,

    /// Token signing.
    pub security: SecuritySettings,

    /// Cross-origin policy.
    pub cors: CorsSettings,

    /// Third-party API credentials.
    pub services: ServiceSettings,

    /// Database and upload storage.
    pub storage: StorageSettings,

    /// Cache backend.
    pub cache: CacheSettings,

    /// Log sinks.
    pub logging: LoggingSettings,

    /// Remote error reporting.
    pub reporting: ReportingSettings,

    /// Per-client request throttling.
    pub rate_limit: RateLimitSettings,

    /// Prometheus exporter.
    pub metrics: MetricsSettings,
}

/// Application identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSettings {
    pub project_name: String,
    pub version: String,
    pub api_v1_str: String,
    pub environment: Environment,
    /// Free-form deployment tag attached to error reports.
    pub deployment_env: String,
    pub server_name: String,
}

impl AppSettings {
    /// Path of the OpenAPI document.
    pub fn openapi_url(&self) -> String {
        format!("{}/openapi.json", self.api_v1_str)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            project_name: "Valorix Evaluation API".to_string(),
            version: "1.0.0".to_string(),
            api_v1_str: API_V1_STR.to_string(),
            environment: Environment::Development,
            deployment_env: "development".to_string(),
            server_name: "valorix-api".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSettings {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: SocketAddr,

    /// Total time allowed for a request in seconds.
    pub request_timeout_secs: u64,

    /// Redirect plain HTTP to HTTPS (production only).
    pub force_https: bool,

    /// Accepted `Host` header values; `*` accepts any.
    pub allowed_hosts: Vec<String>,

    /// Peers whose `X-Forwarded-*` headers are trusted.
    pub forwarded_allow_ips: Vec<IpAddr>,
}

impl ServerSettings {
    pub fn accepts_any_host(&self) -> bool {
        self.allowed_hosts.iter().any(|h| h == "*")
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout_secs: 30,
            force_https: false,
            allowed_hosts: vec!["*".to_string()],
            forwarded_allow_ips: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuritySettings {
    pub secret_key: Secret,
    pub access_token_expire_minutes: u64,
}

impl SecuritySettings {
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key.expose() == DEFAULT_SECRET_KEY
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            secret_key: Secret::new(DEFAULT_SECRET_KEY),
            access_token_expire_minutes: ACCESS_TOKEN_EXPIRE_MINUTES,
        }
    }
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorsSettings {
    /// Allowed origins; an empty list disables CORS entirely.
    pub origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            allow_credentials: true,
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ServiceSettings {
    pub openai_api_key: Option<Secret>,
    pub deepseek_api_key: Option<Secret>,
    pub insee_api_key: Option<Secret>,
    pub banque_france_api_key: Option<Secret>,
    pub eurostat_api_key: Option<Secret>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSettings {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:///./app.db".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: MAX_UPLOAD_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingSettings {
    pub level: LogLevel,

    /// Active log file; backups are written next to it as `<file>.N`.
    pub file: PathBuf,

    pub max_file_bytes: u64,
    pub backup_count: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: PathBuf::from("valorix_api.log"),
            max_file_bytes: LOG_MAX_BYTES,
            backup_count: LOG_BACKUP_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ReportingSettings {
    /// Sentry DSN; reporting is disabled when absent.
    pub sentry_dsn: Option<Secret>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitSettings {
    /// Sustained requests per second per client.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub address: SocketAddr,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            address: SocketAddr::from(([0, 0, 0, 0], 9090)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_aliases() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!(" test ".parse::<Environment>(), Ok(Environment::Testing));
        assert_eq!("preprod".parse::<Environment>(), Ok(Environment::Other("preprod".into())));
    }

    #[test]
    fn production_profile_hides_details_and_samples_down() {
        assert!(!Environment::Production.exposes_fault_details());
        assert_eq!(Environment::Production.report_sample_rate(), 0.1);
        assert!(Environment::Staging.exposes_fault_details());
        assert_eq!(Environment::Staging.report_sample_rate(), 1.0);
    }

    #[test]
    fn unrecognized_profile_is_neither_production_nor_development() {
        let qa = Environment::Other("qa".into());
        assert!(!qa.is_production());
        assert!(!qa.is_development());
        assert!(qa.exposes_fault_details());
        assert_eq!(qa.as_str(), "qa");
        assert_eq!(serde_json::to_string(&qa).unwrap(), "\"qa\"");
        assert_eq!(serde_json::to_string(&Environment::Production).unwrap(), "\"production\"");
    }

    #[test]
    fn log_level_names() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("CRITICAL".parse::<LogLevel>().map(LogLevel::as_filter), Ok(LevelFilter::ERROR));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"***\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn openapi_url_uses_prefix() {
        assert_eq!(AppSettings::default().openapi_url(), "/api/v1/openapi.json");
    }
}
