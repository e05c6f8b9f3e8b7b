pub mod aggregated;
pub mod collections;
pub mod data;
pub mod health;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(collections::router())
                .merge(data::router())
                .merge(aggregated::router()),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
