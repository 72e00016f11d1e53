//! REST API over the record store
//!
//! Provides read-only access to the loaded catalog with:
//! - Paginated listing, lookup by id and substring search
//! - Price range and top-rated queries
//! - Aggregate statistics
//! - Health and data status probes
//! - An admin-only trigger that re-scrapes and reloads in the background

pub mod auth;
mod error;
mod handlers;
mod router;
pub mod types;

pub use auth::{AdminAuthorizer, AdminCheck, StaticTokenAuthorizer};
pub use error::ApiError;
pub use router::create_router;

use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::CatalogError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared state for the web server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Mutex<SqliteStorage>>,
    pub authorizer: Arc<dyn AdminAuthorizer>,
    /// Set while a triggered scrape and load is running (only one can run at a time)
    pub scrape_running: Arc<AtomicBool>,
}

impl AppState {
    /// Builds state with the token authorizer from the configuration
    pub fn new(config: Config, store: SqliteStorage) -> Self {
        let authorizer = Arc::new(StaticTokenAuthorizer::from_config(&config.auth));
        Self::with_authorizer(config, store, authorizer)
    }

    pub fn with_authorizer(
        config: Config,
        store: SqliteStorage,
        authorizer: Arc<dyn AdminAuthorizer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
            authorizer,
            scrape_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the single scrape slot, returning None if it is taken
    pub(crate) fn try_start_scrape(&self) -> Option<ScrapeSlot> {
        self.scrape_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScrapeSlot {
                flag: Arc::clone(&self.scrape_running),
            })
    }
}

/// Releases the scrape slot when dropped
pub(crate) struct ScrapeSlot {
    flag: Arc<AtomicBool>,
}

impl Drop for ScrapeSlot {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Start the web server
///
/// Serves until Ctrl-C is received.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), CatalogError> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn state() -> AppState {
        let config = parse_config(
            r#"
[scraper]
base-url = "http://127.0.0.1:9/"

[storage]
database-path = "unused.db"
export-path = "unused.csv"
"#,
        )
        .unwrap();
        AppState::new(config, SqliteStorage::open_in_memory().unwrap())
    }

    #[test]
    fn test_scrape_slot_is_single_flight() {
        let state = state();

        let slot = state.try_start_scrape().expect("slot should be free");
        assert!(state.try_start_scrape().is_none());

        drop(slot);
        assert!(state.try_start_scrape().is_some());
    }

    #[tokio::test]
    async fn test_health_reports_broken_schema() {
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use tower::ServiceExt;

        let state = state();
        state
            .store
            .lock()
            .unwrap()
            .execute_raw("DROP TABLE books;")
            .unwrap();

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["database_connected"], false);
    }
}
