//! Shared configuration library for xapi.
//!
//! Configuration comes from the process environment, optionally seeded from
//! layered `.env` files. Both the server binary and the core crate consume the
//! typed [`Config`] produced here so defaults live in one place.

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::sources::EnvConfig;
pub use models::{
    AuthConfig, CacheConfig, Config, ConfigMetadata, DatabaseConfig,
    Environment, LimitsConfig, MySqlConfig, ServerConfig, SupabaseConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
