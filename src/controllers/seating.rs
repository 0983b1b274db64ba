use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use super::{parse_day, seating_error, store_error};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seating/run", post(run_seating))
        .route("/seating/status", get(seating_status))
        .route("/seats/{day}", get(seats_for_day))
        .route("/day-assignments", get(day_assignments))
}

// POST /api/seating/run
async fn run_seating(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Err((StatusCode::CONFLICT, "seating run already in progress".to_string()));
    };

    let guests = state.store.get_guests().await.map_err(store_error)?;
    if guests.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no guests to seat".to_string()));
    }

    let summary = state
        .engine()
        .auto_assign_seating(&guests)
        .await
        .map_err(seating_error)?;
    Ok(Json(summary))
}

// GET /api/seating/status
async fn seating_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = state.store.get_seating_status().await.map_err(store_error)?;
    Ok(Json(status))
}

// GET /api/seats/{day}
async fn seats_for_day(
    State(state): State<Arc<AppState>>,
    Path(day): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let day = parse_day(&day)?;
    let matrix = match state.store.get_seats_for_day(day).await.map_err(store_error)? {
        Some(matrix) => matrix,
        None => {
            // До первого прогона показываем пустой зал с блокировками
            let blocked = state.store.get_blocked_seats(Some(day)).await.map_err(store_error)?;
            let mut matrix = state.venue.blank_matrix(day);
            matrix.paint_blocked(&blocked);
            matrix
        }
    };
    Ok(Json(matrix))
}

// GET /api/day-assignments
async fn day_assignments(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.store.get_day_assignments().await.map_err(store_error)? {
        Some(seating) => Ok(Json(seating)),
        None => Err((StatusCode::NOT_FOUND, "no seating run yet".to_string())),
    }
}
