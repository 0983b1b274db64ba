use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashSet;
use std::sync::Arc;

use super::store_error;
use crate::models::Guest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/guests", get(list_guests).put(replace_guests))
}

// GET /api/guests
async fn list_guests(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, (StatusCode, String)> {
    let guests = state.store.get_guests().await.map_err(store_error)?;
    Ok(Json(guests))
}

// PUT /api/guests - список целиком заменяет сохранённый
async fn replace_guests(
    State(state): State<Arc<AppState>>,
    Json(guests): Json<Vec<Guest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut ids = HashSet::new();
    if let Some(dup) = guests.iter().find(|g| !ids.insert(g.id)) {
        return Err((StatusCode::BAD_REQUEST, format!("duplicate guest id {}", dup.id)));
    }
    state.store.set_guests(&guests).await.map_err(store_error)?;
    tracing::info!("Stored {} guests", guests.len());
    Ok(StatusCode::NO_CONTENT)
}
