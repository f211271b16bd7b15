use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Secret of the development profile. Tokens signed with it are only good
/// for local development; deployed environments refuse to start with it.
const DEVELOPMENT_JWT_SECRET: &str = "tenant-admin-development-secret";

const MB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub exports: ExportConfig,
    pub reports: ReportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// `APP_ENV`, defaulting to development
    fn detect() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    /// Requests allowed per caller per window
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub max_schedules_per_tenant: i64,
    pub max_recipients_per_schedule: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Upper bound on rows loaded for one report run
    pub max_rows: i64,
    pub execution_history_limit: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_schedules_per_tenant: 20,
            max_recipients_per_schedule: 50,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::for_environment(Environment::detect());
        config.apply_env_overrides();
        config
    }

    /// Built-in profile for an environment, before any env overrides
    pub fn for_environment(environment: Environment) -> Self {
        let (max_connections, acquire_timeout_secs) = match environment {
            Environment::Development => (10, 30),
            Environment::Staging => (20, 10),
            Environment::Production => (50, 5),
        };
        let api = match environment {
            Environment::Development => ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 10 * MB,
            },
            Environment::Staging => ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 5 * MB,
            },
            Environment::Production => ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 60,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 2 * MB,
            },
        };
        let security = match environment {
            Environment::Development => SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec!["http://localhost:3000".into(), "http://localhost:5173".into()],
            },
            // Deployed profiles must take JWT_SECRET; an empty secret rejects every token
            Environment::Staging => SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".into()],
            },
            Environment::Production => SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".into()],
            },
        };
        let max_rows = match environment {
            Environment::Development => 50_000,
            Environment::Staging => 20_000,
            Environment::Production => 10_000,
        };

        Self {
            environment,
            database: DatabaseConfig {
                max_connections,
                acquire_timeout_secs,
            },
            api,
            security,
            exports: ExportConfig::default(),
            reports: ReportConfig {
                max_rows,
                execution_history_limit: 50,
            },
        }
    }

    /// A deployed environment may not run with a missing or well-known signing secret
    pub fn check_jwt_secret(&self) -> Result<(), &'static str> {
        if self.environment == Environment::Development {
            return Ok(());
        }
        let secret = self.security.jwt_secret.trim();
        if secret.is_empty() {
            Err("JWT_SECRET must be set outside development")
        } else if secret == DEVELOPMENT_JWT_SECRET {
            Err("JWT_SECRET must not reuse the development secret outside development")
        } else {
            Ok(())
        }
    }

    fn apply_env_overrides(&mut self) {
        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_from_env("DATABASE_ACQUIRE_TIMEOUT", &mut self.database.acquire_timeout_secs);

        override_from_env("API_ENABLE_RATE_LIMITING", &mut self.api.enable_rate_limiting);
        override_from_env("API_RATE_LIMIT_REQUESTS", &mut self.api.rate_limit_requests);
        override_from_env("API_RATE_LIMIT_WINDOW_SECS", &mut self.api.rate_limit_window_secs);
        override_from_env("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        override_from_env("JWT_SECRET", &mut self.security.jwt_secret);
        override_from_env("SECURITY_JWT_EXPIRY_HOURS", &mut self.security.jwt_expiry_hours);
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        override_from_env("EXPORTS_MAX_SCHEDULES_PER_TENANT", &mut self.exports.max_schedules_per_tenant);
        override_from_env("EXPORTS_MAX_RECIPIENTS", &mut self.exports.max_recipients_per_schedule);
        override_from_env("REPORTS_MAX_ROWS", &mut self.reports.max_rows);
        override_from_env("REPORTS_EXECUTION_HISTORY_LIMIT", &mut self.reports.execution_history_limit);
    }
}

/// Replace `target` when `key` is set and parses; bad values are logged and ignored
fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    let Ok(raw) = env::var(key) else { return };
    match raw.parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!("Ignoring unparseable {}={:?}", key, raw),
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_profile() {
        let config = AppConfig::for_environment(Environment::Development);
        assert!(!config.api.enable_rate_limiting);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.exports.max_schedules_per_tenant, 20);
    }

    #[test]
    fn production_profile() {
        let config = AppConfig::for_environment(Environment::Production);
        assert!(config.api.enable_rate_limiting);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.api.rate_limit_requests, 60);
        assert_eq!(config.api.max_request_size_bytes, 2 * MB);
    }

    #[test]
    fn staging_profile_has_no_built_in_secret() {
        let config = AppConfig::for_environment(Environment::Staging);
        assert!(config.security.jwt_secret.is_empty());
        assert_ne!(config.security.jwt_secret, DEVELOPMENT_JWT_SECRET);
    }

    #[test]
    fn deployed_environments_require_a_real_secret() {
        for environment in [Environment::Staging, Environment::Production] {
            let mut config = AppConfig::for_environment(environment);
            assert!(config.check_jwt_secret().is_err(), "{:?} accepted an empty secret", environment);

            config.security.jwt_secret = DEVELOPMENT_JWT_SECRET.to_string();
            assert!(config.check_jwt_secret().is_err(), "{:?} accepted the development secret", environment);

            config.security.jwt_secret = "a-long-random-deployment-secret".to_string();
            assert!(config.check_jwt_secret().is_ok());
        }
        assert!(AppConfig::for_environment(Environment::Development).check_jwt_secret().is_ok());
    }

    #[test]
    fn serialized_config_omits_secret() {
        let value = serde_json::to_value(AppConfig::for_environment(Environment::Development)).unwrap();
        assert!(value["security"].get("jwt_secret").is_none());
        assert_eq!(value["exports"]["max_schedules_per_tenant"], 20);
    }

    #[test]
    fn unparseable_override_keeps_default() {
        let mut limit = 20_i64;
        std::env::set_var("TEST_OVERRIDE_NOT_A_NUMBER", "twenty");
        override_from_env("TEST_OVERRIDE_NOT_A_NUMBER", &mut limit);
        assert_eq!(limit, 20);

        std::env::set_var("TEST_OVERRIDE_NUMBER", "5");
        override_from_env("TEST_OVERRIDE_NUMBER", &mut limit);
        assert_eq!(limit, 5);
    }
}
