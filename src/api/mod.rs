//! Decision service (Axum)
//!
//! - `POST /ai-suggest` - arbitrate one conflict payload
//! - `GET /health` - classifier and schedule status
//! - `GET /trains/:id` - schedule lookup
//! - `GET /conflicts` - conflict scan over the loaded schedule

pub mod handlers;

pub use handlers::{ApiError, ApiState};

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the CORS layer.
///
/// Set `ARBITER_CORS_ORIGINS` to a comma-separated list of allowed origins;
/// otherwise any origin may call the service (it carries no credentials).
fn build_cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    match std::env::var("ARBITER_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            layer.allow_origin(allowed)
        }
        Err(_) => layer.allow_origin(Any),
    }
}

/// Create the service router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .route("/ai-suggest", post(handlers::ai_suggest))
        .route("/health", get(handlers::get_health))
        .route("/trains/:id", get(handlers::get_train))
        .route("/conflicts", get(handlers::get_conflicts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
