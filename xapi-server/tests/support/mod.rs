#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum_test::TestServer;
use parking_lot::Mutex;
use serde_json::{Value, json};

use xapi_config::{EnvConfig, loader::compose_config};
use xapi_core::{
    Asset, AssetFilter, AssetRepository, BackendKind, DeleteCriteria, NewAsset,
    Page, StoreContext, StoreError, format_canonical,
    filter::{Column, Predicate, Value as FilterValue},
};
use xapi_server::{AppState, create_app};

/// Store double that evaluates predicates the way both real backends do:
/// case-sensitive equality, case-insensitive literal substring, and a text
/// comparison of canonical `lastupdatetime` values against the cutoff.
/// `(ip, port)` is unique only when `port` is set, as with a SQL unique key
/// over a nullable column.
#[derive(Debug, Default)]
pub struct InMemoryAssetRepository {
    rows: Mutex<Vec<Asset>>,
    next_id: Mutex<i64>,
}

fn column_text(asset: &Asset, column: Column) -> Option<String> {
    let fields = &asset.fields;
    match column {
        Column::Identifier => Some(fields.identifier.clone()),
        Column::Ip => Some(fields.ip.clone()),
        Column::Port => fields.port.map(|port| port.to_string()),
        Column::Domain => fields.domain.clone(),
        Column::Title => fields.title.clone(),
        Column::Product => fields.product.clone(),
        Column::Country => fields.country.clone(),
        Column::CountryName => fields.country_name.clone(),
        Column::Region => fields.region.clone(),
        Column::SearchEngine => Some(fields.search_engine.clone()),
        Column::Protocol => fields.protocol.clone(),
        Column::AsOrganization => fields.as_organization.clone(),
        Column::LastUpdateTime => fields.lastupdatetime.clone(),
    }
}

fn matches(asset: &Asset, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|predicate| match predicate {
        Predicate::Eq(column, FilterValue::Text(expected)) => {
            column_text(asset, *column).as_deref() == Some(expected.as_str())
        }
        Predicate::Eq(Column::Port, FilterValue::Int(expected)) => {
            asset.fields.port == Some(*expected)
        }
        Predicate::Eq(column, FilterValue::Int(expected)) => {
            column_text(asset, *column) == Some(expected.to_string())
        }
        Predicate::Contains(column, needle) => column_text(asset, *column)
            .is_some_and(|text| {
                text.to_lowercase().contains(&needle.to_lowercase())
            }),
        Predicate::Before(column, cutoff) => column_text(asset, *column)
            .is_some_and(|text| text < format_canonical(cutoff)),
    })
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn insert(&self, asset: NewAsset) -> Asset {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        let asset = Asset {
            id: *next_id,
            fields: asset,
        };
        self.rows.lock().push(asset.clone());
        asset
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn create(&self, asset: NewAsset) -> Result<Asset, StoreError> {
        let asset = asset.with_canonical_lastupdatetime()?;
        let taken = asset.port.is_some()
            && self.rows.lock().iter().any(|row| {
                row.fields.ip == asset.ip && row.fields.port == asset.port
            });
        if taken {
            return Err(StoreError::DuplicateKey(format!(
                "Duplicate entry '{}-{:?}' for key 'assets_ip_port'",
                asset.ip, asset.port
            )));
        }
        Ok(self.insert(asset))
    }

    async fn list(
        &self,
        filter: &AssetFilter,
        page: Page,
    ) -> Result<Vec<Asset>, StoreError> {
        let predicates = filter.predicates()?;
        let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|asset| matches(asset, &predicates))
            .skip(skip)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &AssetFilter) -> Result<u64, StoreError> {
        let predicates = filter.predicates()?;
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|asset| matches(asset, &predicates))
            .count() as u64)
    }

    async fn get_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Asset>, StoreError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|asset| asset.identifier() == identifier)
            .cloned())
    }

    async fn delete_by_criteria(
        &self,
        criteria: &DeleteCriteria,
    ) -> Result<u64, StoreError> {
        let predicates = criteria.predicates()?;
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|asset| !matches(asset, &predicates));
        Ok((before - rows.len()) as u64)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub repository: Arc<InMemoryAssetRepository>,
}

pub fn dev_env() -> EnvConfig {
    EnvConfig {
        env: Some("dev".into()),
        ..EnvConfig::default()
    }
}

pub fn prod_env(keys: &str) -> EnvConfig {
    EnvConfig {
        env: Some("prod".into()),
        api_key: Some(keys.into()),
        ..EnvConfig::default()
    }
}

pub fn build_test_app(env: EnvConfig) -> TestApp {
    let repository = Arc::new(InMemoryAssetRepository::new());
    let (config, _warnings) = compose_config(env).expect("test config composes");

    let store = StoreContext::from_repository(repository.clone())
        .with_cache(&config.cache);
    let state = AppState::new(store, Arc::new(config));
    TestApp {
        server: serve(state),
        repository,
    }
}

pub fn build_unavailable_app(env: EnvConfig) -> TestServer {
    let (config, _warnings) = compose_config(env).expect("test config composes");
    let state = AppState::new(
        StoreContext::unavailable("no backend reachable"),
        Arc::new(config),
    );
    serve(state)
}

fn serve(state: AppState) -> TestServer {
    let make_service =
        create_app(state).into_make_service_with_connect_info::<SocketAddr>();
    TestServer::builder()
        .http_transport()
        .build(make_service)
        .expect("test server starts")
}

pub fn asset_json(identifier: &str, ip: &str, port: i32) -> Value {
    json!({
        "identifier": identifier,
        "url": format!("http://{ip}:{port}"),
        "timestamp": "2024-03-19",
        "search_engine": "fofa",
        "query_statements": "title=\"nginx\"",
        "protocol": "http",
        "ip": ip,
        "port": port,
        "title": "Welcome to nginx",
        "country": "CN",
        "country_name": "China",
        "region": "Beijing",
        "as_organization": "Example Cloud",
        "lastupdatetime": "2024-03-19 10:30:00"
    })
}
