//! # ash-config
//!
//! Layered settings for the Ashtray binary. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/default.toml`, then `config/{ASHTRAY_ENV}.toml` (both optional)
//! 3. environment variables, e.g. `ASHTRAY__SERVER__PORT=9000`
//!
//! A `.env` file in the working directory is loaded first when present.

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "ASHTRAY";
const MIN_JWT_SECRET_CHARS: usize = 32;
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;
const MAX_POST_COOLDOWN_HOURS: u32 = 24 * 365;
const MAX_COMMENT_COOLDOWN_MINUTES: u32 = 24 * 60;
const MAX_COMMENT_RETENTION_DAYS: u32 = 3650;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// `development` relaxes secret checks
    pub environment: String,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub limits: LimitSettings,
    pub log: LogSettings,
    /// Set when `.env` was read during [`Settings::load`].
    #[serde(skip)]
    pub dotenv_loaded: bool,
    /// Set when development mode replaced a missing or short JWT secret.
    #[serde(skip)]
    pub generated_jwt_secret: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// e.g. `sqlite://ashtray.db?mode=rwc` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: Option<SecretString>,
    pub token_ttl_hours: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitSettings {
    pub post_cooldown_hours: u32,
    pub comment_cooldown_minutes: u32,
    pub comment_retention_days: u32,
    pub prune_interval_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset
    pub filter: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let dotenv_loaded = dotenvy::dotenv().is_ok();
        let environment =
            std::env::var(format!("{ENV_PREFIX}_ENV")).unwrap_or_else(|_| "development".to_string());

        let builder = Self::defaults(Config::builder())?
            .set_override("environment", environment.clone())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.dotenv_loaded = dotenv_loaded;
        settings.validate()?;
        Ok(settings)
    }

    /// Settings built only from the defaults, for tests and tooling.
    pub fn from_defaults() -> Result<Self, ConfigError> {
        let mut settings: Settings = Self::defaults(Config::builder())?
            .set_override("environment", "development")?
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://ashtray.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.token_ttl_hours", 24 * 7)?
            .set_default("limits.post_cooldown_hours", 48)?
            .set_default("limits.comment_cooldown_minutes", 7)?
            .set_default("limits.comment_retention_days", 30)?
            .set_default("limits.prune_interval_minutes", 60)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "ashtray=info,ash_api=info,tower_http=info")?)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        let secret_len = self
            .auth
            .jwt_secret
            .as_ref()
            .map(|s| s.expose_secret().len())
            .unwrap_or(0);

        if secret_len < MIN_JWT_SECRET_CHARS {
            if !self.is_development() {
                return Err(ConfigError::Invalid(format!(
                    "auth.jwt_secret must be at least {MIN_JWT_SECRET_CHARS} characters \
                     (set {ENV_PREFIX}__AUTH__JWT_SECRET)"
                )));
            }
            let generated = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
            self.auth.jwt_secret = Some(SecretString::from(generated));
            self.generated_jwt_secret = true;
        }

        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}"
            )));
        }
        let limits = &self.limits;
        if limits.post_cooldown_hours > MAX_POST_COOLDOWN_HOURS {
            return Err(ConfigError::Invalid(format!(
                "limits.post_cooldown_hours must be at most {MAX_POST_COOLDOWN_HOURS}"
            )));
        }
        if limits.comment_cooldown_minutes > MAX_COMMENT_COOLDOWN_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "limits.comment_cooldown_minutes must be at most {MAX_COMMENT_COOLDOWN_MINUTES}"
            )));
        }
        if !(1..=MAX_COMMENT_RETENTION_DAYS).contains(&limits.comment_retention_days) {
            return Err(ConfigError::Invalid(format!(
                "limits.comment_retention_days must be between 1 and {MAX_COMMENT_RETENTION_DAYS}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        if self.limits.prune_interval_minutes == 0 {
            return Err(ConfigError::Invalid("limits.prune_interval_minutes must be positive".into()));
        }
        Ok(())
    }

    /// The signing secret. Always present after validation.
    pub fn jwt_secret(&self) -> &str {
        self.auth
            .jwt_secret
            .as_ref()
            .map(|s| s.expose_secret())
            .unwrap_or_default()
    }
}
