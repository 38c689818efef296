pub mod movie;
pub mod paging;

use axum::{routing::get, Router};

use crate::{
    error::{ApiError, NOT_FOUND_MESSAGE},
    health::healthcheck,
    state::AppState,
};

/// All `/v1` routes, unknown paths answer with JSON 404
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .nest("/v1/movies", movie::router())
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())
}
