//! Process configuration, extracted once at startup and passed down
//! explicitly.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `DB_USER`, `DB_HOST`, `DB_PASSWORD`, `DB_PORT` for the connection
//! 3. `BANK_*` environment variables for everything else

use crate::db::models::AccountId;
use crate::error::BankError;
use crate::service::retry::RetryPolicy;
use crate::service::transfer::TransferRequest;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::time::Duration;

/// `DB_*` keys read as plain text. The database name is not among them: it
/// is always `bank` unless set in code.
const DB_TEXT_KEYS: &[&str] = &["user", "host", "password"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            host: "localhost".to_string(),
            port: 26257,
            password: None,
            name: "bank".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Connection options with TLS disabled.
    pub fn connect_options(&self) -> PgConnectOptions {
        let opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .ssl_mode(PgSslMode::Disable);
        match self.password.as_deref() {
            Some(password) => opts.password(password),
            None => opts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            min_delay_ms: 10,
            max_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: i64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            from: 1,
            to: 2,
            amount: 250,
        }
    }
}

impl TransferConfig {
    pub fn request(&self) -> Result<TransferRequest, BankError> {
        TransferRequest::new(self.from, self.to, self.amount)
    }
}

/// `BANK_*` settings; flat so each field maps to one variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct AppSettings {
    loglevel: String,
    seed: bool,
    max_retries: usize,
    min_delay_ms: u64,
    max_delay_ms: u64,
    from: AccountId,
    to: AccountId,
    amount: i64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        let transfer = TransferConfig::default();
        Self {
            loglevel: "info".to_string(),
            seed: false,
            max_retries: retry.max_retries,
            min_delay_ms: retry.min_delay_ms,
            max_delay_ms: retry.max_delay_ms,
            from: transfer.from,
            to: transfer.to,
            amount: transfer.amount,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub retry: RetryConfig,
    pub transfer: TransferConfig,
    pub loglevel: String,
    /// Insert the demo accounts before the first report.
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_parts(DatabaseConfig::default(), AppSettings::default())
    }
}

impl Config {
    /// Extract the configuration from the process environment.
    pub fn from_env() -> Result<Self, BankError> {
        // Credentials and host names are taken verbatim: `Env` would turn
        // `DB_PASSWORD=0123` into the integer 123.
        let mut db = Figment::from(Serialized::defaults(DatabaseConfig::default()))
            .merge(Env::prefixed("DB_").only(&["port"]));
        for (key, value) in Env::prefixed("DB_").only(DB_TEXT_KEYS).iter() {
            db = db.merge(Serialized::default(key.as_str(), value));
        }
        let database: DatabaseConfig = db.extract()?;
        let settings: AppSettings = Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Env::prefixed("BANK_"))
            .extract()?;
        Ok(Self::from_parts(database, settings))
    }

    fn from_parts(database: DatabaseConfig, s: AppSettings) -> Self {
        Self {
            database,
            retry: RetryConfig {
                max_retries: s.max_retries,
                min_delay_ms: s.min_delay_ms,
                max_delay_ms: s.max_delay_ms,
            },
            transfer: TransferConfig {
                from: s.from,
                to: s.to,
                amount: s.amount,
            },
            loglevel: s.loglevel,
            seed: s.seed,
        }
    }
}
