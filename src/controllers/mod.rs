pub mod blocked;
pub mod guests;
pub mod seating;
pub mod settings;

use axum::http::StatusCode;
use axum::Router;
use std::sync::Arc;

use crate::error::SeatingError;
use crate::models::Day;
use crate::store::StoreError;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(seating::routes())
        .merge(blocked::routes())
        .merge(settings::routes())
        .merge(guests::routes())
}

/* ---------- helpers ---------- */

pub(crate) fn seating_error(err: SeatingError) -> (StatusCode, String) {
    let status = match err {
        SeatingError::InvalidSettings(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!("{}: {} ({})", err.code(), err, err.solution());
    (status, format!("{}: {}", err.code(), err))
}

pub(crate) fn store_error(err: StoreError) -> (StatusCode, String) {
    seating_error(SeatingError::Store(err))
}

pub(crate) fn parse_day(raw: &str) -> Result<Day, (StatusCode, String)> {
    raw.parse()
        .map_err(|e: crate::models::guest::UnknownDay| (StatusCode::BAD_REQUEST, e.to_string()))
}
