//! REST API module using Axum
//!
//! Every endpoint lives under `/api/v1` and answers with the `{data, meta}`
//! envelope; `/health` sits at the root.

mod actor;
pub mod envelope;
pub mod handlers;
mod routes;

pub use actor::{RequestActor, ACTOR_EMAIL_HEADER, ACTOR_ROLE_HEADER};
pub use handlers::ApiState;

use axum::http::{header, HeaderName, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `CEMENT_OPS_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for a separately served dashboard.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ACTOR_EMAIL_HEADER),
            HeaderName::from_static(ACTOR_ROLE_HEADER),
        ]);

    match std::env::var("CEMENT_OPS_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::root_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
