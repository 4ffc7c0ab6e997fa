pub const DEFAULT_API_KEY: &str = "test";
pub const PRODUCTION_ENV: &str = "prod";
pub const DEFAULT_ENV: &str = "local";

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8000;

pub const DEFAULT_MYSQL_DATABASE: &str = "assets";
pub const DEFAULT_MYSQL_USER: &str = "root";
pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_SUPABASE_TABLE: &str = "assets";

pub const DEFAULT_MAX_RECORDS_PER_REQUEST: u32 = 10_000;
pub const DEFAULT_MAX_TOTAL_RECORDS: u64 = 100_000;
pub const DEFAULT_LARGE_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LARGE_REQUEST_CHUNK_SIZE: u32 = 1_000;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Env files consulted by the loader, in load order. The environment-specific
/// file overrides values from the common one.
pub const COMMON_ENV_FILE: &str = ".env";
pub const PRODUCTION_ENV_FILE: &str = ".env.prod";
pub const LOCAL_ENV_FILE: &str = ".env.local";
