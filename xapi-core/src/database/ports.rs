use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    asset::{Asset, NewAsset},
    error::Result,
    filter::{AssetFilter, DeleteCriteria},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendKind {
    /// Hosted table service reached over PostgREST.
    Supabase,
    /// Relational server reached over the MySQL protocol.
    MySql,
}

impl BackendKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Supabase => "Supabase",
            Self::MySql => "MySQL",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Offset pagination. Callers validate the range before reaching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub skip: u64,
    pub limit: u32,
}

impl Page {
    pub const fn new(skip: u64, limit: u32) -> Self {
        Self { skip, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

/// The record store contract. Every adapter must give identical answers for
/// identical calls, except for row order, which is whatever the backend
/// returns by default.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetRepository: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Persist one row. Fails with `DuplicateKey` when `(ip, port)` exists.
    async fn create(&self, asset: NewAsset) -> Result<Asset>;

    async fn list(&self, filter: &AssetFilter, page: Page) -> Result<Vec<Asset>>;

    /// Number of rows matching `filter`, ignoring pagination.
    async fn count(&self, filter: &AssetFilter) -> Result<u64>;

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Asset>>;

    /// Physically remove matching rows and report how many went.
    async fn delete_by_criteria(&self, criteria: &DeleteCriteria) -> Result<u64>;

    /// Release backend resources at shutdown.
    async fn close(&self) {}
}
