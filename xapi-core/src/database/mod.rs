//! Record store: one repository port, two interchangeable adapters.

pub mod cache;
pub mod chunked;
pub mod context;
pub mod mysql;
pub mod ports;
pub mod supabase;

pub use context::{BackendConnector, StoreContext};
pub use ports::{AssetRepository, BackendKind, Page};
