//! Consumer-specific views computed from [`Settings`].
//!
//! Each mapping is a pure function of the settings snapshot. None of them
//! can fail: absent inputs become absent outputs (an unset `REDIS_URL`
//! yields a cache config without a URL).

use serde::Serialize;

use crate::config::schema::{Secret, Settings};

pub const DB_POOL_SIZE: u32 = 5;
pub const DB_MAX_OVERFLOW: u32 = 10;
pub const DB_POOL_TIMEOUT_SECS: u64 = 30;
pub const DB_POOL_RECYCLE_SECS: u64 = 1800;
pub const CACHE_KEY_PREFIX: &str = "valorix:";

pub const INSEE_BASE_URL: &str = "https://api.insee.fr";
pub const BANQUE_FRANCE_BASE_URL: &str = "https://api.banque-france.fr";
pub const EUROSTAT_BASE_URL: &str = "https://ec.europa.eu/eurostat/api";

/// All derived mappings, built together once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedConfig {
    pub middleware: MiddlewareConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub external_services: ExternalServicesConfig,
}

impl DerivedConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            middleware: MiddlewareConfig::from_settings(settings),
            database: DatabaseConfig::from_settings(settings),
            cache: CacheConfig::from_settings(settings),
            external_services: ExternalServicesConfig::from_settings(settings),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiddlewareConfig {
    pub trusted_hosts: Vec<String>,
    pub allowed_hosts: Vec<String>,
    pub cors_origins: Vec<String>,
    pub cors_methods: Vec<String>,
    pub cors_headers: Vec<String>,
}

impl MiddlewareConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            trusted_hosts: vec!["*".to_string()],
            allowed_hosts: settings.server.allowed_hosts.clone(),
            cors_origins: settings.cors.origins.clone(),
            cors_methods: settings.cors.allow_methods.clone(),
            cors_headers: settings.cors.allow_headers.clone(),
        }
    }
}

/// Connection pool parameters for the relational store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Log every statement.
    pub echo: bool,
    pub pool_size: u32,
    /// Connections allowed beyond `pool_size` under load.
    pub max_overflow: u32,
    pub pool_timeout_secs: u64,
    /// Connections older than this are recycled.
    pub pool_recycle_secs: u64,
}

impl DatabaseConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.storage.database_url.clone(),
            echo: false,
            pool_size: DB_POOL_SIZE,
            max_overflow: DB_MAX_OVERFLOW,
            pool_timeout_secs: DB_POOL_TIMEOUT_SECS,
            pool_recycle_secs: DB_POOL_RECYCLE_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheConfig {
    pub url: Option<String>,
    pub ttl_secs: u64,
    pub prefix: String,
}

impl CacheConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.cache.redis_url.clone(),
            ttl_secs: settings.cache.ttl_secs,
            prefix: CACHE_KEY_PREFIX.to_string(),
        }
    }

    /// Namespaced cache key.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

/// Endpoint and credential for one upstream data provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEndpoint {
    pub api_key: Option<Secret>,
    pub base_url: String,
}

impl ServiceEndpoint {
    fn new(api_key: &Option<Secret>, base_url: &str) -> Self {
        Self {
            api_key: api_key.clone(),
            base_url: base_url.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalServicesConfig {
    pub insee: ServiceEndpoint,
    pub banque_france: ServiceEndpoint,
    pub eurostat: ServiceEndpoint,
}

impl ExternalServicesConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let services = &settings.services;
        Self {
            insee: ServiceEndpoint::new(&services.insee_api_key, INSEE_BASE_URL),
            banque_france: ServiceEndpoint::new(&services.banque_france_api_key, BANQUE_FRANCE_BASE_URL),
            eurostat: ServiceEndpoint::new(&services.eurostat_api_key, EUROSTAT_BASE_URL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuilding_is_deterministic() {
        let mut settings = Settings::default();
        settings.cache.redis_url = Some("redis://cache:6379/0".into());
        settings.services.insee_api_key = Some(Secret::new("insee"));

        let first = DerivedConfig::from_settings(&settings);
        let second = DerivedConfig::from_settings(&settings);
        assert_eq!(first, second);
        assert_eq!(serde_json::to_value(&first).unwrap(), serde_json::to_value(&second).unwrap());
    }

    #[test]
    fn missing_inputs_become_absent_outputs() {
        let derived = DerivedConfig::from_settings(&Settings::default());

        assert_eq!(derived.cache.url, None);
        assert_eq!(derived.cache.ttl_secs, 3600);
        assert_eq!(derived.cache.key("report:42"), "valorix:report:42");
        assert!(!derived.external_services.insee.is_configured());
        assert_eq!(derived.external_services.eurostat.base_url, "https://ec.europa.eu/eurostat/api");
    }

    #[test]
    fn database_pool_parameters() {
        let derived = DatabaseConfig::from_settings(&Settings::default());
        assert_eq!(derived.url, "sqlite:///./app.db");
        assert!(!derived.echo);
        assert_eq!((derived.pool_size, derived.max_overflow), (5, 10));
        assert_eq!((derived.pool_timeout_secs, derived.pool_recycle_secs), (30, 1800));
    }

    #[test]
    fn middleware_mirrors_cors_and_hosts() {
        let mut settings = Settings::default();
        settings.server.allowed_hosts = vec!["api.valorix.fr".into()];
        let middleware = MiddlewareConfig::from_settings(&settings);

        assert_eq!(middleware.trusted_hosts, vec!["*"]);
        assert_eq!(middleware.allowed_hosts, vec!["api.valorix.fr"]);
        assert_eq!(middleware.cors_origins, settings.cors.origins);
        assert_eq!(middleware.cors_methods, vec!["*"]);
    }

    #[test]
    fn api_keys_are_redacted_when_serialized() {
        let mut settings = Settings::default();
        settings.services.eurostat_api_key = Some(Secret::new("eurostat-key"));
        let json = serde_json::to_string(&ExternalServicesConfig::from_settings(&settings)).unwrap();

        assert!(!json.contains("eurostat-key"));
        assert!(json.contains("\"***\""));
    }
}
