use serde::Serialize;
use thiserror::Error;

use crate::models::{Day, GuestId};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Ошибки рассадки. Код и подсказка уходят в лог и в ответ API.
#[derive(Debug, Error)]
pub enum SeatingError {
    /// Не хватает мест в дне. Никогда не повторяется с другим порогом.
    #[error("not enough capacity on {day}: requested {requested}, available {available}")]
    CapacityExceeded {
        day: Day,
        requested: u32,
        available: u32,
    },

    /// Предпочтение соседа не выполнено, гость посажен обычным способом
    #[error("seating preference of guest {guest} for guest {preferred} could not be honored")]
    PreferenceConflict { guest: GuestId, preferred: GuestId },

    /// Посадить мешают только заблокированные кресла
    #[error("only blocked seats prevent placing guest {guest} on {day}")]
    BlockedSeatConflict { guest: GuestId, day: Day },

    #[error("no seats available for guest {guest} on {day}")]
    NoSeatsAvailable { guest: GuestId, day: Day },

    #[error("guest {guest} cannot be seated: {reason}")]
    InvalidGuest { guest: GuestId, reason: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unexpected seating failure: {message}")]
    Unknown { message: String },
}

impl SeatingError {
    pub fn code(&self) -> &'static str {
        match self {
            SeatingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            SeatingError::PreferenceConflict { .. } => "PREFERENCE_CONFLICT",
            SeatingError::BlockedSeatConflict { .. } => "BLOCKED_SEAT_CONFLICT",
            SeatingError::NoSeatsAvailable { .. } => "NO_SEATS_AVAILABLE",
            SeatingError::InvalidGuest { .. } => "INVALID_GUEST",
            SeatingError::InvalidSettings(_) => "INVALID_SETTINGS",
            SeatingError::Store(_) => "STORE_ERROR",
            SeatingError::Unknown { .. } => "UNKNOWN_ERROR",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SeatingError::PreferenceConflict { .. }
            | SeatingError::BlockedSeatConflict { .. }
            | SeatingError::NoSeatsAvailable { .. }
            | SeatingError::InvalidGuest { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Подсказка оператору, что делать дальше
    pub fn solution(&self) -> &'static str {
        match self {
            SeatingError::CapacityExceeded { .. } => {
                "choose another day for this guest or reduce the number of tickets"
            }
            SeatingError::PreferenceConflict { .. } => {
                "check that both guests picked the same first day"
            }
            SeatingError::BlockedSeatConflict { .. } => {
                "unblock seats, reorder other groups or try the second preference day"
            }
            SeatingError::NoSeatsAvailable { .. } => "try another day or relax the seating settings",
            SeatingError::InvalidGuest { .. } => "fix the guest record and run the seating again",
            SeatingError::InvalidSettings(_) => "correct the seating settings",
            SeatingError::Store(_) => "check the storage connection and retry",
            SeatingError::Unknown { .. } => "restart the application",
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        SeatingError::Unknown {
            message: message.into(),
        }
    }
}
