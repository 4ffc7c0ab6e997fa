pub mod error;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::debug;

use crate::{
    constants::*,
    models::{
        AuthConfig, CacheConfig, Config, ConfigMetadata, DatabaseConfig,
        Environment, LimitsConfig, MySqlConfig, ServerConfig, SupabaseConfig,
        sources::EnvConfig,
    },
    util::parse_csv,
    validation::{ConfigWarning, ConfigWarnings},
};
use error::ConfigLoadError;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    /// Directory holding `.env`, `.env.prod` and `.env.local`. Defaults to
    /// the working directory.
    pub env_dir: Option<PathBuf>,
    /// Skip env files entirely and only read the process environment.
    pub skip_env_files: bool,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_env_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.env_dir = Some(dir.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_files_loaded = if self.options.skip_env_files {
            Vec::new()
        } else {
            self.load_env_files()?
        };

        let (mut config, warnings) = compose_config(EnvConfig::gather()?)?;
        config.metadata.env_files_loaded = env_files_loaded;

        Ok(ConfigLoad { config, warnings })
    }

    /// Load `.env`, then `.env.prod` or `.env.local` depending on `ENV`.
    /// The second file overrides values from the first; values already in
    /// the process environment win over `.env` but not over the second file.
    pub fn load_env_files(&self) -> Result<Vec<PathBuf>, ConfigLoadError> {
        let dir = self
            .options
            .env_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let mut loaded = Vec::new();

        let common = dir.join(COMMON_ENV_FILE);
        if load_env_file(&common, false)? {
            loaded.push(common);
        }

        let is_production = std::env::var("ENV")
            .map(|value| value.trim() == PRODUCTION_ENV)
            .unwrap_or(false);
        let specific = dir.join(if is_production {
            PRODUCTION_ENV_FILE
        } else {
            LOCAL_ENV_FILE
        });
        if load_env_file(&specific, true)? {
            loaded.push(specific);
        }

        debug!(files = ?loaded, "env files loaded");
        Ok(loaded)
    }
}

fn load_env_file(
    path: &Path,
    override_existing: bool,
) -> Result<bool, ConfigLoadError> {
    let result = if override_existing {
        dotenvy::from_path_override(path)
    } else {
        dotenvy::from_path(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(source) => Err(ConfigLoadError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Apply defaults and guard rails to raw environment values.
pub fn compose_config(
    env: EnvConfig,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    let environment =
        Environment::from_label(env.env.as_deref().unwrap_or(DEFAULT_ENV));

    let raw_keys = env.api_key.unwrap_or_else(|| DEFAULT_API_KEY.to_string());
    let api_keys = parse_csv(&raw_keys);
    if environment.is_production() {
        if api_keys.is_empty() {
            warnings.push(
                ConfigWarning::new(
                    "no API keys configured; every production request will be rejected",
                )
                .with_hint("set XAPI_API_KEY to a comma-separated key list"),
            );
        } else if api_keys.iter().any(|key| key == DEFAULT_API_KEY) {
            warnings.push(
                ConfigWarning::new("the default API key is accepted in production")
                    .with_hint("remove `test` from XAPI_API_KEY"),
            );
        }
    }

    let supabase = match (env.supabase_url, env.supabase_key) {
        (Some(raw_url), Some(key)) => {
            let url = url::Url::parse(&raw_url).map_err(|source| {
                ConfigLoadError::InvalidSupabaseUrl { source }
            })?;
            Some(SupabaseConfig {
                url,
                key,
                table: env
                    .supabase_table
                    .unwrap_or_else(|| DEFAULT_SUPABASE_TABLE.to_string()),
            })
        }
        _ => {
            warnings.push(ConfigWarning::new(
                "Supabase configuration incomplete; MySQL will be the only backend",
            ).with_hint("set both SUPABASE_URL and SUPABASE_KEY to enable it"));
            None
        }
    };

    let mysql = MySqlConfig {
        database: env
            .db_name
            .unwrap_or_else(|| DEFAULT_MYSQL_DATABASE.to_string()),
        user: env.db_user.unwrap_or_else(|| DEFAULT_MYSQL_USER.to_string()),
        password: env.db_password,
        host: env.db_host.unwrap_or_else(|| DEFAULT_MYSQL_HOST.to_string()),
        port: env.db_port.unwrap_or(DEFAULT_MYSQL_PORT),
        max_connections: non_zero(
            env.db_max_connections,
            DEFAULT_MYSQL_MAX_CONNECTIONS,
            "DB_MAX_CONNECTIONS",
        )?,
    };

    let limits = LimitsConfig {
        max_records_per_request: non_zero(
            env.max_records_per_request,
            DEFAULT_MAX_RECORDS_PER_REQUEST,
            "MAX_RECORDS_PER_REQUEST",
        )?,
        max_total_records: non_zero(
            env.max_total_records,
            DEFAULT_MAX_TOTAL_RECORDS,
            "MAX_TOTAL_RECORDS",
        )?,
        request_timeout: Duration::from_secs(non_zero(
            env.large_request_timeout_secs,
            DEFAULT_LARGE_REQUEST_TIMEOUT_SECS,
            "LARGE_REQUEST_TIMEOUT",
        )?),
        chunk_size: non_zero(
            env.large_request_chunk_size,
            DEFAULT_LARGE_REQUEST_CHUNK_SIZE,
            "LARGE_REQUEST_CHUNK_SIZE",
        )?,
    };

    if u64::from(limits.max_records_per_request) > limits.max_total_records {
        warnings.push(ConfigWarning::new(format!(
            "MAX_RECORDS_PER_REQUEST ({}) exceeds MAX_TOTAL_RECORDS ({})",
            limits.max_records_per_request, limits.max_total_records
        )));
    }

    let cache = CacheConfig {
        enabled: env.cache_enabled.unwrap_or(true),
        ttl: Duration::from_secs(
            env.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        ),
        max_entries: env.cache_max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
    };
    if cache.enabled && (cache.ttl.is_zero() || cache.max_entries == 0) {
        warnings.push(ConfigWarning::new(
            "asset cache enabled with a zero TTL or capacity; nothing will be cached",
        ));
    }

    let config = Config {
        server: ServerConfig {
            host: env
                .server_host
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            port: env.server_port.unwrap_or(DEFAULT_SERVER_PORT),
        },
        auth: AuthConfig {
            environment,
            api_keys,
        },
        database: DatabaseConfig { mysql, supabase },
        limits,
        cache,
        metadata: ConfigMetadata::default(),
    };

    Ok((config, warnings))
}

fn non_zero<T>(
    value: Option<T>,
    default: T,
    name: &'static str,
) -> Result<T, ConfigLoadError>
where
    T: PartialEq + Default,
{
    let value = value.unwrap_or(default);
    if value == T::default() {
        return Err(ConfigLoadError::ZeroLimit { name });
    }
    Ok(value)
}
