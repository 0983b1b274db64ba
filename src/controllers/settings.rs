use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use super::{seating_error, store_error};
use crate::error::SeatingError;
use crate::models::Settings;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

// GET /api/settings
async fn get_settings(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, (StatusCode, String)> {
    let settings = state.store.get_settings().await.map_err(store_error)?;
    Ok(Json(settings))
}

// PUT /api/settings
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Settings>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    settings
        .validate()
        .map_err(|e| seating_error(SeatingError::InvalidSettings(e)))?;
    state.store.set_settings(&settings).await.map_err(store_error)?;
    tracing::info!("Seating settings updated");
    Ok(Json(settings))
}
