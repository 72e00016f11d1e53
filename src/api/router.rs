//! Router configuration for the web server

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes
///
/// Everything except the banner lives under `/api/v1`.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Books
        .route("/books", get(handlers::list_books))
        .route("/books/search", get(handlers::search_books))
        .route("/books/price-range", get(handlers::books_by_price_range))
        .route("/books/top-rated", get(handlers::top_rated))
        .route("/books/:book_id", get(handlers::get_book))
        .route("/categories", get(handlers::categories))
        // Insights
        .route("/stats/overview", get(handlers::stats_overview))
        .route("/stats/categories", get(handlers::stats_categories))
        // Probes
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/data-status", get(handlers::data_status))
        // Admin
        .route("/scraping/trigger", post(handlers::trigger_scrape));

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
