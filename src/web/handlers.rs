use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use super::AppState;
use crate::models::ChooseResponse;

/// GET /photo - choose one valid image at random, caching new ones along
/// the way. Always answers 200 with `{status, data}`.
pub async fn choose_photo(State(state): State<AppState>) -> Json<ChooseResponse> {
    Json(state.chooser.respond().await)
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
