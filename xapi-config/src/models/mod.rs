pub mod sources;

use std::{fmt, path::PathBuf, time::Duration};

use crate::constants::PRODUCTION_ENV;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
    pub cache: CacheConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Deployment environment. Only `prod` enforces API keys; every other value
/// is treated as a local/development deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Production,
    Other(String),
}

impl Environment {
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed == PRODUCTION_ENV {
            Self::Production
        } else {
            Self::Other(trimmed.to_string())
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Production => PRODUCTION_ENV,
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    pub environment: Environment,
    /// Trimmed, non-empty API keys accepted by the gate in production.
    pub api_keys: Vec<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("environment", &self.environment)
            .field("api_keys", &format_args!("<{} keys>", self.api_keys.len()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub mysql: MySqlConfig,
    /// `None` when `SUPABASE_URL` or `SUPABASE_KEY` is missing.
    pub supabase: Option<SupabaseConfig>,
}

#[derive(Clone)]
pub struct MySqlConfig {
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

impl fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: url::Url,
    pub key: String,
    pub table: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("key", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Upper bound for the `limit` query parameter.
    pub max_records_per_request: u32,
    /// Upper bound for `skip + limit`.
    pub max_total_records: u64,
    pub request_timeout: Duration,
    /// Pages wider than this are fetched as concurrent chunks.
    pub chunk_size: u32,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub env_files_loaded: Vec<PathBuf>,
}
