use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "available",
        "environment": state.config().environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
