//! Request handlers
//!
//! Store access happens inside [`with_store`], a short synchronous critical
//! section run on the blocking pool; no lock is held across an await.

use crate::api::auth::require_admin;
use crate::api::error::ApiError;
use crate::api::types::{
    DataStatusResponse, HealthResponse, MessageResponse, PageParams, PriceRangeParams,
    RootResponse, SearchParams, StatusResponse, TopRatedParams,
};
use crate::api::{AppState, ScrapeSlot};
use crate::output::stats::{load_category_stats, load_overview, CategoryStats, StatsOverview};
use crate::storage::{BookRecord, BookSearch, BookStore, SqliteStorage};
use crate::{load_export, CatalogError};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use std::path::PathBuf;
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Runs `f` against the locked store on the blocking pool
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&SqliteStorage) -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || {
        let store = store
            .lock()
            .map_err(|_| ApiError::Internal("Record store is unavailable".to_string()))?;
        f(&store).map_err(ApiError::from)
    })
    .await
    .map_err(|e| {
        tracing::error!("Store task failed: {}", e);
        ApiError::Internal("Internal server error".to_string())
    })?
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Book Catalog API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/api/v1".to_string(),
    })
}

pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: "API is running".to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = with_store(&state, |store| {
        store.ping()?;
        Ok(store.has_books()?)
    })
    .await;

    let response = match probe {
        Ok(has_data) => HealthResponse {
            status: "healthy".to_string(),
            database_connected: true,
            has_data,
        },
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            HealthResponse {
                status: "unhealthy".to_string(),
                database_connected: false,
                has_data: false,
            }
        }
    };

    Json(response)
}

pub async fn data_status(State(state): State<AppState>) -> Json<DataStatusResponse> {
    let probe = with_store(&state, |store| {
        let has_data = store.has_books()?;
        let last_run = store.latest_completed_load_run()?;
        Ok((has_data, last_run.and_then(|run| run.finished_at)))
    })
    .await;

    let response = match probe {
        Ok((has_data, last_loaded_at)) => DataStatusResponse {
            has_data,
            status: if has_data { "data_loaded" } else { "no_data" }.to_string(),
            last_loaded_at,
            error: None,
        },
        Err(e) => DataStatusResponse {
            has_data: false,
            status: "database_error".to_string(),
            last_loaded_at: None,
            error: Some(e.to_string()),
        },
    };

    Json(response)
}

pub async fn list_books(
    State(state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Vec<BookRecord>> {
    let page = query_params(query)?.validate()?;
    let books = with_store(&state, move |store| {
        Ok(store.list_books(page.skip, page.limit)?)
    })
    .await?;
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<BookRecord> {
    let Path(id) = id.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    with_store(&state, move |store| Ok(store.get_book(id)?))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))
}

pub async fn search_books(
    State(state): State<AppState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<BookRecord>> {
    let params = query_params(query)?;
    let (title, category) = params.filters()?;
    let page = params.page()?;

    let search = BookSearch { title, category };
    let books = with_store(&state, move |store| {
        Ok(store.search_books(&search, page.skip, page.limit)?)
    })
    .await?;
    Ok(Json(books))
}

pub async fn books_by_price_range(
    State(state): State<AppState>,
    query: Result<Query<PriceRangeParams>, QueryRejection>,
) -> ApiResult<Vec<BookRecord>> {
    let params = query_params(query)?;
    let (min_price, max_price) = params.bounds()?;
    let page = params.page()?;

    let books = with_store(&state, move |store| {
        Ok(store.books_in_price_range(min_price, max_price, page.skip, page.limit)?)
    })
    .await?;
    Ok(Json(books))
}

pub async fn top_rated(
    State(state): State<AppState>,
    query: Result<Query<TopRatedParams>, QueryRejection>,
) -> ApiResult<Vec<BookRecord>> {
    let limit = query_params(query)?.limit()?;
    let books = with_store(&state, move |store| Ok(store.top_rated(limit)?)).await?;
    Ok(Json(books))
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let categories = with_store(&state, |store| Ok(store.categories()?)).await?;
    Ok(Json(categories))
}

pub async fn stats_overview(State(state): State<AppState>) -> ApiResult<StatsOverview> {
    let overview = with_store(&state, |store| load_overview(store)).await?;
    Ok(Json(overview))
}

pub async fn stats_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryStats>> {
    let stats = with_store(&state, |store| load_category_stats(store)).await?;
    Ok(Json(stats))
}

/// Starts a scrape followed by a load, admin only
///
/// The work runs in the background; a second trigger while one is running
/// is rejected with 409.
pub async fn trigger_scrape(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<MessageResponse> {
    require_admin(state.authorizer.as_ref(), &headers)?;

    let slot = state.try_start_scrape().ok_or_else(|| {
        ApiError::Conflict("A scrape is already running".to_string())
    })?;

    tracing::info!("Scrape triggered over HTTP");
    tokio::spawn(run_scrape_and_load(state, slot));

    Ok(Json(MessageResponse {
        message: "Scraping triggered successfully".to_string(),
    }))
}

async fn run_scrape_and_load(state: AppState, slot: ScrapeSlot) {
    // Released when this task finishes, however it finishes
    let _slot = slot;

    if let Err(e) = crate::scrape::run_scrape(&state.config).await {
        tracing::error!("Triggered scrape failed: {}", e);
        return;
    }

    let export_path = PathBuf::from(&state.config.storage.export_path);
    let store = state.store.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let mut store = store
            .lock()
            .map_err(|_| {
                CatalogError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "record store lock poisoned",
                ))
            })?;
        load_export(&mut *store, &export_path)
    })
    .await;

    match loaded {
        Ok(Ok(report)) => tracing::info!("Triggered load finished: {} books", report.rows_loaded),
        Ok(Err(e)) => tracing::error!("Triggered load failed: {}", e),
        Err(e) => tracing::error!("Load task panicked: {}", e),
    }
}
