use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{parse_day, store_error};
use crate::models::{BlockedSeat, Day};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/blocked-seats", get(list_blocked).post(block_seat))
        .route("/blocked-seats/{day}/{row}/{seat}", delete(unblock_seat))
}

#[derive(Debug, Deserialize)]
struct BlockedQuery {
    day: Option<String>,
}

// GET /api/blocked-seats?day=
async fn list_blocked(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BlockedQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let day = params.day.as_deref().map(parse_day).transpose()?;
    let seats = state.store.get_blocked_seats(day).await.map_err(store_error)?;
    Ok(Json(seats))
}

// POST /api/blocked-seats
async fn block_seat(
    State(state): State<Arc<AppState>>,
    Json(seat): Json<BlockedSeat>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let row_len = seat
        .row
        .checked_sub(1)
        .and_then(|r| state.venue.rows().get(r as usize))
        .map(|r| r.capacity);
    match row_len {
        Some(len) if seat.seat_number >= 1 && seat.seat_number <= len => {}
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("seat {} in row {} does not exist", seat.seat_number, seat.row),
            ))
        }
    }

    let matrix = state.store.get_seats_for_day(seat.day).await.map_err(store_error)?;
    let occupied = matrix
        .as_ref()
        .and_then(|m| m.rows.get(seat.row as usize - 1))
        .and_then(|r| r.seats.get(seat.seat_number as usize - 1))
        .is_some_and(|s| s.occupant.is_some());
    if occupied {
        return Err((StatusCode::CONFLICT, "seat is occupied".to_string()));
    }

    state.store.block_seat(seat.clone()).await.map_err(store_error)?;
    if let Some(mut m) = matrix {
        m.paint_blocked(std::slice::from_ref(&seat));
        state.store.set_seats_for_day(&m).await.map_err(store_error)?;
    }
    tracing::info!("Blocked {} row {} seat {}", seat.day, seat.row, seat.seat_number);
    Ok((StatusCode::CREATED, Json(seat)))
}

// DELETE /api/blocked-seats/{day}/{row}/{seat}
async fn unblock_seat(
    State(state): State<Arc<AppState>>,
    Path((day, row, seat)): Path<(String, u32, u32)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let day: Day = parse_day(&day)?;
    let removed = state.store.unblock_seat(day, row, seat).await.map_err(store_error)?;
    if !removed {
        return Err((StatusCode::NOT_FOUND, "seat is not blocked".to_string()));
    }

    if let Some(mut matrix) = state.store.get_seats_for_day(day).await.map_err(store_error)? {
        let target = row
            .checked_sub(1)
            .zip(seat.checked_sub(1))
            .and_then(|(r, s)| matrix.rows.get_mut(r as usize)?.seats.get_mut(s as usize));
        if let Some(s) = target {
            s.blocked = false;
            s.reason = None;
        }
        state.store.set_seats_for_day(&matrix).await.map_err(store_error)?;
    }
    tracing::info!("Unblocked {} row {} seat {}", day, row, seat);
    Ok(StatusCode::NO_CONTENT)
}
