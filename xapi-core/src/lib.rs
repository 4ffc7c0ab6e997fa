//! Core library for the xapi assets service.
//!
//! The crate owns everything below the HTTP surface: the [`Asset`] record,
//! the [`AssetFilter`] / [`DeleteCriteria`] predicate models, date parsing,
//! and the record store. The store is a single [`AssetRepository`] port with
//! two adapters (MySQL and Supabase/PostgREST) that must answer identically;
//! [`StoreContext`] picks one at startup and keeps it for the process
//! lifetime.

pub mod asset;
pub mod database;
pub mod dates;
pub mod error;
pub mod filter;

pub use asset::{Asset, NewAsset};
pub use database::{
    AssetRepository, BackendKind, Page, StoreContext,
    cache::{CachedAssetRepository, ListCache, ListCacheKey},
    chunked::fetch_in_chunks,
};
pub use dates::{format_canonical, parse_datetime};
pub use error::{Result, StoreError};
pub use filter::{AssetFilter, DeleteCriteria};
