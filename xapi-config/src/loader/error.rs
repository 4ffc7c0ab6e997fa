use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("SUPABASE_URL is not a valid URL: {source}")]
    InvalidSupabaseUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("{name} has an invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    ZeroLimit { name: &'static str },
}
