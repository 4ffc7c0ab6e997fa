use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    MySql, MySqlPool, QueryBuilder,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
};
use tracing::{debug, info};
use xapi_config::MySqlConfig;

use crate::{
    asset::{Asset, NewAsset},
    database::ports::{AssetRepository, BackendKind, Page},
    dates::format_canonical,
    error::{Result, StoreError},
    filter::{AssetFilter, DeleteCriteria, Predicate, Value},
};

const SELECT_ASSETS: &str = "SELECT id, identifier, url, `timestamp`, \
     search_engine, query_statements, protocol, ip, port, domain, title, \
     product, product_category, country, country_name, region, city, os, \
     as_organization, lastupdatetime, icp FROM assets WHERE 1=1";

const INSERT_ASSET: &str = "INSERT INTO assets (identifier, url, `timestamp`, \
     search_engine, query_statements, protocol, ip, port, domain, title, \
     product, product_category, country, country_name, region, city, os, \
     as_organization, lastupdatetime, icp) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Binary collation: exact matches and the `(ip, port)` key compare bytes,
/// the same as PostgreSQL text equality.
const EXACT_COLLATION: &str = "utf8mb4_bin";

/// Table bootstrap for `db init`. `(ip, port)` is the only declared
/// uniqueness; `identifier` is indexed for the create-path lookup.
pub const CREATE_ASSETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS assets (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    identifier VARCHAR(255) NOT NULL,
    url VARCHAR(255) NOT NULL,
    `timestamp` VARCHAR(255) NOT NULL,
    search_engine VARCHAR(255) NOT NULL,
    query_statements VARCHAR(255) NOT NULL,
    protocol VARCHAR(255) NULL,
    ip VARCHAR(255) NOT NULL,
    port INT NULL,
    domain VARCHAR(255) NULL,
    title VARCHAR(255) NULL,
    product VARCHAR(255) NULL,
    product_category VARCHAR(255) NULL,
    country VARCHAR(255) NULL,
    country_name VARCHAR(255) NULL,
    region VARCHAR(255) NULL,
    city VARCHAR(255) NULL,
    os VARCHAR(255) NULL,
    as_organization VARCHAR(255) NULL,
    lastupdatetime VARCHAR(255) NULL,
    icp VARCHAR(255) NULL,
    UNIQUE KEY assets_ip_port (ip, port),
    KEY assets_identifier (identifier)
) DEFAULT CHARSET = utf8mb4 COLLATE = utf8mb4_bin
"#;

#[derive(Clone, Debug)]
pub struct MySqlAssetRepository {
    pool: MySqlPool,
}

impl MySqlAssetRepository {
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database)
            .charset("utf8mb4");
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::StoreUnavailable(format!(
                    "MySQL connection failed: {e}"
                ))
            })?;

        let repository = Self::from_pool(pool);
        repository.ping().await?;
        info!(host = %config.host, database = %config.database, "connected to MySQL");
        Ok(repository)
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    pub async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(CREATE_ASSETS_TABLE).execute(self.pool()).await?;
        info!("assets table ensured");
        Ok(())
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// `col COLLATE utf8mb4_bin = `, so tables created with a case-insensitive
/// default collation still match exactly.
fn push_exact(builder: &mut QueryBuilder<'_, MySql>, column: &str) {
    builder
        .push(column)
        .push(" COLLATE ")
        .push(EXACT_COLLATION)
        .push(" = ");
}

fn push_predicates(builder: &mut QueryBuilder<'_, MySql>, predicates: &[Predicate]) {
    for predicate in predicates {
        builder.push(" AND ");
        match predicate {
            Predicate::Eq(column, Value::Text(text)) => {
                push_exact(builder, column.as_str());
                builder.push_bind(text.clone());
            }
            Predicate::Eq(column, Value::Int(number)) => {
                builder.push(column.as_str()).push(" = ");
                builder.push_bind(*number);
            }
            Predicate::Contains(column, needle) => {
                builder.push("LOWER(").push(column.as_str()).push(") LIKE ");
                builder.push_bind(escape_like(&needle.to_lowercase()));
            }
            Predicate::Before(column, cutoff) => {
                // Stored values are canonical, so text order is date order.
                builder.push(column.as_str()).push(" < ");
                builder.push_bind(format_canonical(cutoff));
            }
        }
    }
}

pub(crate) fn list_query(
    predicates: &[Predicate],
    page: Page,
) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::<MySql>::new(SELECT_ASSETS);
    push_predicates(&mut builder, predicates);
    builder.push(" LIMIT ");
    builder.push_bind(u64::from(page.limit));
    builder.push(" OFFSET ");
    builder.push_bind(page.skip);
    builder
}

pub(crate) fn count_query(predicates: &[Predicate]) -> QueryBuilder<'static, MySql> {
    let mut builder =
        QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM assets WHERE 1=1");
    push_predicates(&mut builder, predicates);
    builder
}

pub(crate) fn delete_query(predicates: &[Predicate]) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::<MySql>::new("DELETE FROM assets WHERE 1=1");
    push_predicates(&mut builder, predicates);
    builder
}

#[async_trait]
impl AssetRepository for MySqlAssetRepository {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn create(&self, asset: NewAsset) -> Result<Asset> {
        let asset = asset.with_canonical_lastupdatetime()?;
        let result = sqlx::query(INSERT_ASSET)
            .bind(&asset.identifier)
            .bind(&asset.url)
            .bind(&asset.timestamp)
            .bind(&asset.search_engine)
            .bind(&asset.query_statements)
            .bind(&asset.protocol)
            .bind(&asset.ip)
            .bind(asset.port)
            .bind(&asset.domain)
            .bind(&asset.title)
            .bind(&asset.product)
            .bind(&asset.product_category)
            .bind(&asset.country)
            .bind(&asset.country_name)
            .bind(&asset.region)
            .bind(&asset.city)
            .bind(&asset.os)
            .bind(&asset.as_organization)
            .bind(&asset.lastupdatetime)
            .bind(&asset.icp)
            .execute(self.pool())
            .await?;

        let id = i64::try_from(result.last_insert_id()).map_err(|_| {
            StoreError::Backend("insert id out of range".to_string())
        })?;
        debug!(id, identifier = %asset.identifier, "asset inserted");

        Ok(Asset { id, fields: asset })
    }

    async fn list(&self, filter: &AssetFilter, page: Page) -> Result<Vec<Asset>> {
        let predicates = filter.predicates()?;
        let mut builder = list_query(&predicates, page);
        let rows = builder
            .build_query_as::<Asset>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &AssetFilter) -> Result<u64> {
        let predicates = filter.predicates()?;
        let mut builder = count_query(&predicates);
        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(self.pool())
            .await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Asset>> {
        let mut builder = QueryBuilder::<MySql>::new(SELECT_ASSETS);
        builder.push(" AND ");
        push_exact(&mut builder, "identifier");
        builder.push_bind(identifier.to_string());
        builder.push(" LIMIT 1");
        let row = builder
            .build_query_as::<Asset>()
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    async fn delete_by_criteria(&self, criteria: &DeleteCriteria) -> Result<u64> {
        let predicates = criteria.predicates()?;
        let mut builder = delete_query(&predicates);
        // Single statement: MySQL applies it atomically to the matched rows.
        let result = builder.build().execute(self.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("MySQL pool closed");
    }
}
