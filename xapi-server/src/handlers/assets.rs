use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use xapi_core::{
    Asset, AssetFilter, DeleteCriteria, NewAsset, Page, StoreError,
    fetch_in_chunks,
};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

const DEFAULT_LIMIT: i64 = 100;

fn report(operation: &'static str) -> impl Fn(&StoreError) {
    move |err: &StoreError| match err {
        StoreError::DuplicateKey(_)
        | StoreError::UnparseableDate(_)
        | StoreError::EmptyCriteria
        | StoreError::InvalidQuery(_) => {
            warn!(operation, error = %err, "asset request rejected by store")
        }
        _ => error!(operation, error = %err, "asset store call failed"),
    }
}

pub async fn create_asset(
    State(state): State<AppState>,
    payload: Result<Json<NewAsset>, JsonRejection>,
) -> AppResult<Json<Asset>> {
    let Json(asset) = payload?;
    let repository = state.store.repository()?;

    let existing = repository
        .get_by_identifier(&asset.identifier)
        .await
        .inspect_err(report("create_asset"))?;
    if existing.is_some() {
        return Err(AppError::bad_request(format!(
            "Asset with identifier '{}' already exists",
            asset.identifier
        )));
    }

    let created = repository
        .create(asset)
        .await
        .inspect_err(report("create_asset"))?;
    info!(id = created.id, identifier = %created.identifier(), "asset created");
    Ok(Json(created))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListAssetsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub identifier: Option<String>,
    pub ip: Option<String>,
    pub port: Option<i32>,
    pub domain: Option<String>,
    pub title: Option<String>,
    pub product: Option<String>,
    pub country: Option<String>,
    pub search_engine: Option<String>,
    pub protocol: Option<String>,
    pub org: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl ListAssetsQuery {
    /// Check the paging window against the configured bounds.
    pub fn page(&self, max_limit: u32, max_total: u64) -> AppResult<Page> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);

        let skip = u64::try_from(skip)
            .map_err(|_| AppError::validation("skip must be greater than or equal to 0"))?;
        let limit = u32::try_from(limit)
            .ok()
            .filter(|limit| (1..=max_limit).contains(limit))
            .ok_or_else(|| {
                AppError::validation(format!("limit must be between 1 and {max_limit}"))
            })?;

        if skip.saturating_add(u64::from(limit)) > max_total {
            return Err(AppError::validation(format!(
                "skip + limit must not exceed {max_total}"
            )));
        }

        Ok(Page::new(skip, limit))
    }

    pub fn filter(&self) -> AssetFilter {
        AssetFilter {
            identifier: self.identifier.clone(),
            ip: self.ip.clone(),
            port: self.port,
            domain: self.domain.clone(),
            title: self.title.clone(),
            product: self.product.clone(),
            country: self.country.clone(),
            search_engine: self.search_engine.clone(),
            protocol: self.protocol.clone(),
            org: self.org.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
        .normalized()
    }
}

#[derive(Debug, Serialize)]
pub struct AssetPage {
    pub total: u64,
    pub items: Vec<Asset>,
}

pub async fn list_assets(
    State(state): State<AppState>,
    query: Result<Query<ListAssetsQuery>, QueryRejection>,
) -> AppResult<Json<AssetPage>> {
    let Query(query) = query?;
    let limits = &state.config().limits;
    let page = query.page(limits.max_records_per_request, limits.max_total_records)?;
    let filter = query.filter();

    let repository = state.store.repository()?;
    let total = repository
        .count(&filter)
        .await
        .inspect_err(report("list_assets"))?;

    let fetched = if page.limit > limits.chunk_size {
        fetch_in_chunks(repository.as_ref(), &filter, page, limits.chunk_size).await
    } else {
        repository.list(&filter, page).await
    };
    let items = fetched.inspect_err(report("list_assets"))?;

    Ok(Json(AssetPage { total, items }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteAssetsQuery {
    pub title: Option<String>,
    pub search_engine: Option<String>,
    pub day: Option<i64>,
    pub before: Option<String>,
    pub country_name: Option<String>,
    pub region: Option<String>,
}

impl DeleteAssetsQuery {
    /// Resolve `day` against `now` and assemble the criteria.
    pub fn criteria(&self, now: NaiveDateTime) -> AppResult<DeleteCriteria> {
        let date_limit = match self.day {
            None => None,
            Some(day) if day < 0 => {
                return Err(AppError::validation(
                    "day must be greater than or equal to 0",
                ));
            }
            Some(day) => Some(
                TimeDelta::try_days(day)
                    .and_then(|delta| now.checked_sub_signed(delta))
                    .ok_or_else(|| AppError::validation("day is out of range"))?,
            ),
        };

        Ok(DeleteCriteria {
            title: self.title.clone(),
            search_engine: self.search_engine.clone(),
            before: self.before.clone(),
            date_limit,
            country_name: self.country_name.clone(),
            region: self.region.clone(),
        }
        .normalized())
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteSummary {
    pub deleted_count: u64,
}

pub async fn delete_assets(
    State(state): State<AppState>,
    query: Result<Query<DeleteAssetsQuery>, QueryRejection>,
) -> AppResult<Json<DeleteSummary>> {
    let Query(query) = query?;
    let criteria = query.criteria(Local::now().naive_local())?;
    if criteria.is_empty() {
        return Err(StoreError::EmptyCriteria.into());
    }

    let repository = state.store.repository()?;
    let deleted_count = repository
        .delete_by_criteria(&criteria)
        .await
        .inspect_err(report("delete_assets"))?;

    info!(deleted_count, ?criteria, "assets deleted");
    Ok(Json(DeleteSummary { deleted_count }))
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub status: &'static str,
    pub connection: &'static str,
}

/// Report which backend was selected without touching any row.
pub async fn test_connection(
    State(state): State<AppState>,
) -> AppResult<Json<ConnectionStatus>> {
    let repository = state.store.repository()?;
    Ok(Json(ConnectionStatus {
        status: "success",
        connection: repository.kind().name(),
    }))
}
