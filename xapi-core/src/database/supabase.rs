//! PostgREST adapter for a Supabase-hosted `assets` table.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap},
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;
use xapi_config::SupabaseConfig;

use crate::{
    asset::{Asset, NewAsset},
    database::ports::{AssetRepository, BackendKind, Page},
    dates::format_canonical,
    error::{Result, StoreError},
    filter::{AssetFilter, DeleteCriteria, Predicate, Value},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UNIQUE_VIOLATION_CODE: &str = "23505";

#[derive(Clone)]
pub struct SupabaseAssetRepository {
    client: Client,
    endpoint: Url,
    key: String,
}

impl fmt::Debug for SupabaseAssetRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseAssetRepository")
            .field("endpoint", &self.endpoint.as_str())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Resolve `<base>/rest/v1/<table>`, tolerating a base with or without a
/// trailing slash.
pub(crate) fn table_endpoint(base: &Url, table: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
        .and_then(|rest| rest.join(table))
        .map_err(|e| StoreError::Backend(format!("invalid Supabase endpoint: {e}")))
}

/// Quote text as a POSIX regular expression that matches it literally.
/// PostgreSQL reads a backslash before any non-alphanumeric character as
/// that character.
pub(crate) fn regex_literal(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() * 2);
    for ch in raw.chars() {
        if ch.is_ascii() && !ch.is_ascii_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Render predicates as PostgREST horizontal filters.
///
/// Substring matches use `imatch` (`~*`) on an escaped literal; `ilike`
/// would treat `*`, `%` and `_` in the text as wildcards. Date cutoffs are
/// sent in the canonical text form and stored values are canonical, so the
/// text comparison follows date order.
pub(crate) fn predicate_params(predicates: &[Predicate]) -> Vec<(String, String)> {
    predicates
        .iter()
        .map(|predicate| match predicate {
            Predicate::Eq(column, Value::Text(text)) => {
                (column.as_str().to_string(), format!("eq.{text}"))
            }
            Predicate::Eq(column, Value::Int(number)) => {
                (column.as_str().to_string(), format!("eq.{number}"))
            }
            Predicate::Contains(column, needle) => {
                (
                column.as_str().to_string(),
                format!("imatch.{}", regex_literal(needle)),
            )
            }
            Predicate::Before(column, cutoff) => (
                column.as_str().to_string(),
                format!("lt.{}", format_canonical(cutoff)),
            ),
        })
        .collect()
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub(crate) fn parse_content_range_total(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = raw.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

pub(crate) fn map_error_response(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .or(parsed.details.clone())
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::CONFLICT
        || parsed.code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
    {
        return StoreError::DuplicateKey(message);
    }

    // PGRST1xx: PostgREST could not parse the request itself.
    if status == StatusCode::BAD_REQUEST
        && parsed.code.as_deref().is_some_and(|code| code.starts_with("PGRST1"))
    {
        return StoreError::InvalidQuery(message);
    }

    match status {
        StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            StoreError::StoreUnavailable(format!("Supabase {status}: {message}"))
        }
        _ => StoreError::Backend(format!("Supabase {status}: {message}")),
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_error_response(status, &body))
}

impl SupabaseAssetRepository {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: table_endpoint(&config.url, &config.table)?,
            key: config.key.clone(),
        })
    }

    /// Build the adapter and prove the table answers a one-row read.
    pub async fn connect(config: &SupabaseConfig) -> Result<Self> {
        let repository = Self::new(config)?;
        repository.probe().await?;
        info!(endpoint = %repository.endpoint, "connected to Supabase");
        Ok(repository)
    }

    pub async fn probe(&self) -> Result<()> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("limit", "1")])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.endpoint.clone())
            .header("apikey", &self.key)
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
    }
}

#[async_trait]
impl AssetRepository for SupabaseAssetRepository {
    fn kind(&self) -> BackendKind {
        BackendKind::Supabase
    }

    async fn create(&self, asset: NewAsset) -> Result<Asset> {
        let asset = asset.with_canonical_lastupdatetime()?;
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&asset)
            .send()
            .await?;
        let rows: Vec<Asset> = ensure_success(response).await?.json().await?;

        let created = rows.into_iter().next().ok_or_else(|| {
            StoreError::Backend("Supabase insert returned no row".to_string())
        })?;
        debug!(id = created.id, identifier = %created.identifier(), "asset inserted");
        Ok(created)
    }

    async fn list(&self, filter: &AssetFilter, page: Page) -> Result<Vec<Asset>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(predicate_params(&filter.predicates()?));
        params.push(("offset".to_string(), page.skip.to_string()));
        params.push(("limit".to_string(), page.limit.to_string()));

        let response = self.request(Method::GET).query(&params).send().await?;
        let rows = ensure_success(response).await?.json().await?;
        Ok(rows)
    }

    async fn count(&self, filter: &AssetFilter) -> Result<u64> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(predicate_params(&filter.predicates()?));

        let response = self
            .request(Method::HEAD)
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        parse_content_range_total(response.headers()).ok_or_else(|| {
            StoreError::Backend("Supabase count response lacked Content-Range".to_string())
        })
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Asset>> {
        let eq = format!("eq.{identifier}");
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("identifier", eq.as_str()), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<Asset> = ensure_success(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_by_criteria(&self, criteria: &DeleteCriteria) -> Result<u64> {
        let params = predicate_params(&criteria.predicates()?);

        let response = self
            .request(Method::DELETE)
            .header("Prefer", "return=representation,count=exact")
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        if let Some(total) = parse_content_range_total(response.headers()) {
            return Ok(total);
        }
        warn!("Supabase delete lacked Content-Range; counting returned rows");
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(rows.len() as u64)
    }
}
