//! Layered server configuration
//!
//! Built-in defaults, then an optional YAML/TOML/JSON file, then environment
//! variables of the form `CAREDESK__SECTION__KEY`.

use auth_identity::IdentityConfig;
use billing_service::BillingConfig;
use config::{Config, Environment, File};
use error_common::CareError;
use logger_redacted::LogSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "CAREDESK";
const DEV_JWT_SECRET: &str = "caredesk-development-secret-change-me-now";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; any origin when empty
    pub cors_origins: Vec<String>,
    pub environment: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// PostgreSQL URL. The in-memory store is used when unset.
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub issuer: String,
    pub token_ttl_minutes: i64,
    pub password_min_length: usize,
    /// Argon2id memory cost in KiB
    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: "caredesk".to_string(),
            token_ttl_minutes: 480,
            password_min_length: 10,
            password_hash_memory_kib: 19456,
            password_hash_iterations: 2,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PharmacySettings {
    pub expiry_warning_days: i64,
}

impl Default for PharmacySettings {
    fn default() -> Self {
        Self {
            expiry_warning_days: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub billing: BillingConfig,
    pub pharmacy: PharmacySettings,
    pub logging: LogSettings,
}

impl AppConfig {
    /// Load defaults, then `path` when it exists, then the environment.
    pub fn load(path: &str) -> error_common::Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .map_err(|e| CareError::ConfigError(e.to_string()))?;

        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.cors_origins");

        let config: AppConfig = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name(path).required(false))
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CareError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    pub fn validate(&self) -> error_common::Result<()> {
        if self.server.port == 0 {
            return Err(CareError::ConfigError("server.port must be non-zero".into()));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(CareError::ConfigError(
                "auth.token_ttl_minutes must be positive".into(),
            ));
        }
        if self.billing.tax_rate_percent < Decimal::ZERO
            || self.billing.tax_rate_percent > Decimal::ONE_HUNDRED
        {
            return Err(CareError::ConfigError(
                "billing.tax_rate_percent must be within 0..=100".into(),
            ));
        }
        if self.pharmacy.expiry_warning_days < 0 {
            return Err(CareError::ConfigError(
                "pharmacy.expiry_warning_days must not be negative".into(),
            ));
        }
        if self.is_production() {
            match &self.auth.jwt_secret {
                Some(secret) if secret.len() >= 32 => {}
                _ => {
                    return Err(CareError::ConfigError(
                        "auth.jwt_secret of at least 32 bytes is required in production".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Identity settings derived from the `auth` section
    pub fn identity(&self) -> IdentityConfig {
        let jwt_secret = match &self.auth.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                tracing::warn!("auth.jwt_secret is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };
        IdentityConfig {
            jwt_secret,
            issuer: self.auth.issuer.clone(),
            token_ttl_minutes: self.auth.token_ttl_minutes,
            password_min_length: self.auth.password_min_length,
            argon2_m_cost: self.auth.password_hash_memory_kib,
            argon2_t_cost: self.auth.password_hash_iterations,
        }
    }

    /// Configuration for tests: in-memory store and fast password hashing
    pub fn for_tests() -> Self {
        let identity = IdentityConfig::for_tests();
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some(identity.jwt_secret);
        config.auth.password_hash_memory_kib = identity.argon2_m_cost;
        config.auth.password_hash_iterations = identity.argon2_t_cost;
        config
    }
}
