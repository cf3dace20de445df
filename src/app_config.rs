// Centralized configuration management for the TrustScan backend
// Load ALL env vars ONCE at startup, hand sub-configs to components by value

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::config::ScoringPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub intel: IntelConfig,
    pub scoring: ScoringPolicy,
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub rust_log: String,
    pub cors_allowed_origins: Vec<String>,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration. `url` is only required for the postgres cache backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
    pub run_migrations: bool,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub connection_timeout: u64,
    pub command_timeout: u64,
    /// Entries kept per URL list; older entries are trimmed
    pub history_depth: u32,
}

/// Where verdicts are persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CacheBackend {
    Postgres,
    Redis,
    Memory,
}

impl std::str::FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(CacheBackend::Postgres),
            "redis" => Ok(CacheBackend::Redis),
            "memory" | "in-memory" => Ok(CacheBackend::Memory),
            other => Err(ConfigError::InvalidValue(
                "CACHE_BACKEND".to_string(),
                format!("unknown backend '{}' (expected postgres, redis or memory)", other),
            )),
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Postgres => write!(f, "postgres"),
            CacheBackend::Redis => write!(f, "redis"),
            CacheBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Verdict cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Threat intelligence vendors and collector budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    pub virustotal_api_key: Option<String>,
    pub virustotal_api_url: String,
    pub safe_browsing_api_key: Option<String>,
    pub safe_browsing_api_url: String,
    pub abuseipdb_api_key: Option<String>,
    pub abuseipdb_api_url: String,
    pub abuseipdb_max_age_days: u32,
    pub whoisjson_api_key: Option<String>,
    pub whoisjson_api_url: String,
    pub ssllabs_api_url: String,
    pub doh_resolver_url: String,
    pub collector_timeout_seconds: u64,
    pub http_timeout_seconds: u64,
    pub reputation_poll_attempts: u32,
    pub reputation_poll_interval_ms: u64,
    pub certificate_poll_attempts: u32,
    pub certificate_poll_interval_ms: u64,
    pub user_agent: String,
}

impl IntelConfig {
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            virustotal_api_key: None,
            virustotal_api_url: "https://www.virustotal.com/api/v3".to_string(),
            safe_browsing_api_key: None,
            safe_browsing_api_url: "https://safebrowsing.googleapis.com/v4".to_string(),
            abuseipdb_api_key: None,
            abuseipdb_api_url: "https://api.abuseipdb.com/api/v2".to_string(),
            abuseipdb_max_age_days: 90,
            whoisjson_api_key: None,
            whoisjson_api_url: "https://api.whoisjson.com/v1".to_string(),
            ssllabs_api_url: "https://api.ssllabs.com/api/v3".to_string(),
            doh_resolver_url: "https://dns.google/resolve".to_string(),
            collector_timeout_seconds: 10,
            http_timeout_seconds: 8,
            reputation_poll_attempts: 4,
            reputation_poll_interval_ms: 2000,
            certificate_poll_attempts: 3,
            certificate_poll_interval_ms: 2000,
            user_agent: "TrustScan-Collector/1.0".to_string(),
        }
    }
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_openapi: bool,
}

/// Local development settings: in-memory cache and no vendor credentials
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_address: "0.0.0.0:8080".to_string(),
                port: 8080,
                rust_log: "info".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                min_connections: 2,
                connect_timeout: 30,
                idle_timeout: 600,
                max_lifetime: 1800,
                run_migrations: false,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                connection_timeout: 5,
                command_timeout: 5,
                history_depth: 10,
            },
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                ttl_seconds: 3600,
            },
            intel: IntelConfig::default(),
            scoring: ScoringPolicy::default(),
            features: FeatureConfig {
                enable_openapi: true,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        // Present and non-empty, otherwise None
        let get_optional = |key: &str| -> Option<String> {
            env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_u8_or_default = |key: &str, default: &str| -> Result<u8, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid score (0-255)".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let server = ServerConfig {
            bind_address,
            port,
            rust_log: get_or_default("RUST_LOG", "info"),
            cors_allowed_origins: get_or_default("CORS_ALLOWED_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        let cache = CacheConfig {
            backend: get_or_default("CACHE_BACKEND", "postgres").parse()?,
            ttl_seconds: parse_u64_or_default("VERDICT_CACHE_TTL_SECONDS", "3600")?,
        };
        if cache.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "VERDICT_CACHE_TTL_SECONDS".to_string(),
                "TTL must be greater than 0".to_string(),
            ));
        }

        let database_url = match (cache.backend, get_optional("DATABASE_URL")) {
            (_, Some(url)) => url,
            (CacheBackend::Postgres, None) => {
                return Err(ConfigError::MissingVar("DATABASE_URL".to_string()))
            },
            (_, None) => String::new(),
        };

        let database = DatabaseConfig {
            url: database_url,
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "2")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
            run_migrations: !parse_bool_or_default("DISABLE_EMBEDDED_MIGRATIONS", "false"),
        };

        let redis = RedisConfig {
            url: get_or_default("REDIS_URL", "redis://localhost:6379"),
            connection_timeout: parse_u64_or_default("REDIS_CONNECTION_TIMEOUT", "5")?,
            command_timeout: parse_u64_or_default("REDIS_COMMAND_TIMEOUT", "5")?,
            history_depth: parse_or_default("REDIS_HISTORY_DEPTH", "10")?,
        };

        let defaults = IntelConfig::default();
        let intel = IntelConfig {
            virustotal_api_key: get_optional("VIRUSTOTAL_API_KEY"),
            virustotal_api_url: get_or_default("VIRUSTOTAL_API_URL", &defaults.virustotal_api_url),
            safe_browsing_api_key: get_optional("GOOGLE_SAFE_BROWSING_API_KEY"),
            safe_browsing_api_url: get_or_default(
                "GOOGLE_SAFE_BROWSING_API_URL",
                &defaults.safe_browsing_api_url,
            ),
            abuseipdb_api_key: get_optional("ABUSEIPDB_API_KEY"),
            abuseipdb_api_url: get_or_default("ABUSEIPDB_API_URL", &defaults.abuseipdb_api_url),
            abuseipdb_max_age_days: parse_or_default("ABUSEIPDB_MAX_AGE_DAYS", "90")?,
            whoisjson_api_key: get_optional("WHOISJSON_API_KEY"),
            whoisjson_api_url: get_or_default("WHOISJSON_API_URL", &defaults.whoisjson_api_url),
            ssllabs_api_url: get_or_default("SSLLABS_API_URL", &defaults.ssllabs_api_url),
            doh_resolver_url: get_or_default("DOH_RESOLVER_URL", &defaults.doh_resolver_url),
            collector_timeout_seconds: parse_u64_or_default("COLLECTOR_TIMEOUT_SECONDS", "10")?,
            http_timeout_seconds: parse_u64_or_default("COLLECTOR_HTTP_TIMEOUT_SECONDS", "8")?,
            reputation_poll_attempts: parse_or_default("REPUTATION_POLL_ATTEMPTS", "4")?,
            reputation_poll_interval_ms: parse_u64_or_default(
                "REPUTATION_POLL_INTERVAL_MS",
                "2000",
            )?,
            certificate_poll_attempts: parse_or_default("CERTIFICATE_POLL_ATTEMPTS", "3")?,
            certificate_poll_interval_ms: parse_u64_or_default(
                "CERTIFICATE_POLL_INTERVAL_MS",
                "2000",
            )?,
            user_agent: get_or_default("COLLECTOR_USER_AGENT", &defaults.user_agent),
        };
        if intel.collector_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "COLLECTOR_TIMEOUT_SECONDS".to_string(),
                "Timeout must be greater than 0".to_string(),
            ));
        }

        let scoring = ScoringPolicy::with_thresholds(
            parse_u8_or_default("TRUST_SAFE_THRESHOLD", "75")?,
            parse_u8_or_default("TRUST_CAUTION_THRESHOLD", "40")?,
        );
        scoring
            .validate()
            .map_err(|e| ConfigError::InvalidValue("TRUST_*_THRESHOLD".to_string(), e))?;

        let features = FeatureConfig {
            enable_openapi: parse_bool_or_default("ENABLE_OPENAPI", "true"),
        };

        Ok(Self {
            environment,
            server,
            database,
            redis,
            cache,
            intel,
            scoring,
            features,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Names of the threat intelligence vendors that have credentials
    pub fn configured_sources(&self) -> Vec<&'static str> {
        let mut sources = vec!["dns", "whois", "ssllabs"];
        if self.intel.virustotal_api_key.is_some() {
            sources.push("virustotal");
        }
        if self.intel.safe_browsing_api_key.is_some() {
            sources.push("safe_browsing");
        }
        if self.intel.abuseipdb_api_key.is_some() {
            sources.push("abuseipdb");
        }
        sources
    }
}

/// Get the global configuration instance
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "CACHE_BACKEND",
            "DATABASE_URL",
            "VERDICT_CACHE_TTL_SECONDS",
            "VIRUSTOTAL_API_KEY",
            "GOOGLE_SAFE_BROWSING_API_KEY",
            "ABUSEIPDB_API_KEY",
            "TRUST_SAFE_THRESHOLD",
            "TRUST_CAUTION_THRESHOLD",
            "COLLECTOR_TIMEOUT_SECONDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_environment_from_string() {
        assert_eq!(
            Environment::from("development".to_string()),
            Environment::Development
        );
        assert_eq!(
            Environment::from("prod".to_string()),
            Environment::Production
        );
        assert_eq!(Environment::from("test".to_string()), Environment::Test);
        assert_eq!(
            Environment::from("staging".to_string()),
            Environment::Staging
        );
    }

    #[test]
    fn test_cache_backend_parsing() {
        assert_eq!("postgres".parse::<CacheBackend>().unwrap(), CacheBackend::Postgres);
        assert_eq!("Redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!("memory".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        assert!("sqlite".parse::<CacheBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_postgres_backend_requires_database_url() {
        clear_env();
        env::set_var("CACHE_BACKEND", "postgres");

        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_with_env() {
        clear_env();
        env::set_var("CACHE_BACKEND", "memory");
        env::set_var("VERDICT_CACHE_TTL_SECONDS", "1800");
        env::set_var("VIRUSTOTAL_API_KEY", "vt-test-key");
        env::set_var("GOOGLE_SAFE_BROWSING_API_KEY", "   ");
        env::set_var("TRUST_SAFE_THRESHOLD", "80");

        let config = AppConfig::from_env().expect("Failed to load test config");

        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl(), Duration::from_secs(1800));
        assert_eq!(config.intel.virustotal_api_key.as_deref(), Some("vt-test-key"));
        // Blank keys count as missing credentials
        assert!(config.intel.safe_browsing_api_key.is_none());
        assert_eq!(config.scoring.thresholds.safe_min, 80);
        assert_eq!(config.scoring.thresholds.caution_min, 40);
        assert!(config.configured_sources().contains(&"virustotal"));
        assert!(!config.configured_sources().contains(&"safe_browsing"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_inverted_thresholds_rejected() {
        clear_env();
        env::set_var("CACHE_BACKEND", "memory");
        env::set_var("TRUST_SAFE_THRESHOLD", "30");
        env::set_var("TRUST_CAUTION_THRESHOLD", "60");

        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::InvalidValue(_, _))
        ));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_collector_timeout_rejected() {
        clear_env();
        env::set_var("CACHE_BACKEND", "memory");
        env::set_var("COLLECTOR_TIMEOUT_SECONDS", "0");

        assert!(AppConfig::from_env().is_err());

        clear_env();
    }
}
