use crate::{
    loader::error::ConfigLoadError,
    util::{non_empty_var, parse_bool_var, parse_var},
};

/// Environment-derived configuration values, before defaults are applied.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub env: Option<String>,
    pub api_key: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_max_connections: Option<u32>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub supabase_table: Option<String>,
    pub max_records_per_request: Option<u32>,
    pub max_total_records: Option<u64>,
    pub large_request_timeout_secs: Option<u64>,
    pub large_request_chunk_size: Option<u32>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_max_entries: Option<usize>,
}

impl EnvConfig {
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Ok(Self {
            env: non_empty_var("ENV"),
            // Blank is meaningful here: it disables every key.
            api_key: std::env::var("XAPI_API_KEY").ok(),
            server_host: non_empty_var("SERVER_HOST"),
            server_port: parse_var("SERVER_PORT")?,
            db_name: non_empty_var("DB_NAME"),
            db_user: non_empty_var("DB_USER"),
            db_password: std::env::var("DB_PASSWORD").ok(),
            db_host: non_empty_var("DB_HOST"),
            db_port: parse_var("DB_PORT")?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS")?,
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_key: non_empty_var("SUPABASE_KEY"),
            supabase_table: non_empty_var("SUPABASE_TABLE"),
            max_records_per_request: parse_var("MAX_RECORDS_PER_REQUEST")?,
            max_total_records: parse_var("MAX_TOTAL_RECORDS")?,
            large_request_timeout_secs: parse_var("LARGE_REQUEST_TIMEOUT")?,
            large_request_chunk_size: parse_var("LARGE_REQUEST_CHUNK_SIZE")?,
            cache_enabled: parse_bool_var("ASSET_CACHE_ENABLED")?,
            cache_ttl_secs: parse_var("ASSET_CACHE_TTL_SECS")?,
            cache_max_entries: parse_var("ASSET_CACHE_MAX_ENTRIES")?,
        })
    }
}
