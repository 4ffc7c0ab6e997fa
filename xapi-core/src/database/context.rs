use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tracing::{error, info, warn};
use xapi_config::{CacheConfig, DatabaseConfig, MySqlConfig, SupabaseConfig};

use crate::{
    database::{
        cache::{CachedAssetRepository, ListCache},
        mysql::MySqlAssetRepository,
        ports::{AssetRepository, BackendKind},
        supabase::SupabaseAssetRepository,
    },
    error::{Result, StoreError},
};

/// One candidate backend in the startup fallback order.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn connect(&self) -> Result<Arc<dyn AssetRepository>>;
}

#[derive(Debug, Clone)]
pub struct SupabaseConnector(pub SupabaseConfig);

#[async_trait]
impl BackendConnector for SupabaseConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Supabase
    }

    async fn connect(&self) -> Result<Arc<dyn AssetRepository>> {
        let repository = SupabaseAssetRepository::connect(&self.0).await?;
        Ok(Arc::new(repository))
    }
}

#[derive(Debug, Clone)]
pub struct MySqlConnector(pub MySqlConfig);

#[async_trait]
impl BackendConnector for MySqlConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn connect(&self) -> Result<Arc<dyn AssetRepository>> {
        let repository = MySqlAssetRepository::connect(&self.0).await?;
        Ok(Arc::new(repository))
    }
}

#[derive(Clone)]
enum StoreState {
    Ready {
        kind: BackendKind,
        repository: Arc<dyn AssetRepository>,
    },
    Unavailable(String),
}

/// The record store chosen at startup.
///
/// The selection is made once and never revisited; if no backend answered,
/// every store operation fails with [`StoreError::StoreUnavailable`] while
/// the rest of the service keeps serving.
#[derive(Clone)]
pub struct StoreContext {
    state: StoreState,
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            StoreState::Ready { kind, repository } => f
                .debug_struct("StoreContext")
                .field("backend", kind)
                .field("repository_ptr", &Arc::as_ptr(repository))
                .finish(),
            StoreState::Unavailable(reason) => f
                .debug_struct("StoreContext")
                .field("unavailable", reason)
                .finish(),
        }
    }
}

impl StoreContext {
    /// Try Supabase (when configured) and then MySQL, keeping the first
    /// backend that answers.
    pub async fn connect(database: &DatabaseConfig, cache: &CacheConfig) -> Self {
        let mut connectors: Vec<Box<dyn BackendConnector>> = Vec::new();
        match &database.supabase {
            Some(supabase) => {
                connectors.push(Box::new(SupabaseConnector(supabase.clone())))
            }
            None => info!("Supabase not configured; skipping"),
        }
        connectors.push(Box::new(MySqlConnector(database.mysql.clone())));

        Self::connect_first(&connectors).await.with_cache(cache)
    }

    pub async fn connect_first(connectors: &[Box<dyn BackendConnector>]) -> Self {
        let mut failures = Vec::new();

        for connector in connectors {
            let kind = connector.kind();
            info!(backend = %kind, "connecting to record store");
            match connector.connect().await {
                Ok(repository) => {
                    info!(backend = %kind, "record store selected");
                    return Self::from_repository(repository);
                }
                Err(err) => {
                    warn!(backend = %kind, error = %err, "record store connection failed");
                    failures.push(format!("{kind}: {err}"));
                }
            }
        }

        error!("no record store reachable; store operations will fail");
        let reason = if failures.is_empty() {
            "no backend configured".to_string()
        } else {
            failures.join("; ")
        };
        Self::unavailable(reason)
    }

    pub fn from_repository(repository: Arc<dyn AssetRepository>) -> Self {
        Self {
            state: StoreState::Ready {
                kind: repository.kind(),
                repository,
            },
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: StoreState::Unavailable(reason.into()),
        }
    }

    /// Wrap the selected repository in the list cache when enabled.
    pub fn with_cache(self, cache: &CacheConfig) -> Self {
        match self.state {
            StoreState::Ready { kind, repository } if cache.enabled => {
                info!(
                    ttl_secs = cache.ttl.as_secs(),
                    max_entries = cache.max_entries,
                    "list cache enabled"
                );
                let cached = CachedAssetRepository::new(
                    repository,
                    ListCache::new(cache.ttl, cache.max_entries),
                );
                Self {
                    state: StoreState::Ready {
                        kind,
                        repository: Arc::new(cached),
                    },
                }
            }
            state => Self { state },
        }
    }

    pub fn repository(&self) -> Result<Arc<dyn AssetRepository>> {
        match &self.state {
            StoreState::Ready { repository, .. } => Ok(Arc::clone(repository)),
            StoreState::Unavailable(reason) => {
                Err(StoreError::StoreUnavailable(reason.clone()))
            }
        }
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        match &self.state {
            StoreState::Ready { kind, .. } => Some(*kind),
            StoreState::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend_kind().is_some()
    }

    pub async fn close(&self) {
        if let StoreState::Ready { kind, repository } = &self.state {
            repository.close().await;
            info!(backend = %kind, "record store closed");
        }
    }
}
