//! Хранилище состояния рассадки.
//!
//! Всё лежит в key-value как JSON-блобы: матрица дня целиком, итоги дней,
//! реестр заблокированных кресел, настройки, гости, ручные приоритеты и статус запуска.
//! Бэкенды: Redis для сервера и память для офлайн-режима и тестов.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{BlockedSeat, Day, DaySeating, Guest, SeatMatrix, SeatingStatus, Settings};
use crate::seating::priority::PriorityOverrides;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

pub type MemoryStore = KvSeatStore<MemoryBackend>;
pub type RedisStore = KvSeatStore<RedisBackend>;

// === Ключи ===
pub const DAY_ASSIGNMENTS_KEY: &str = "dayAssignments";
pub const BLOCKED_SEATS_KEY: &str = "blockedSeats";
pub const SETTINGS_KEY: &str = "settings";
pub const GUESTS_KEY: &str = "guests";
pub const PRIORITY_MATRIX_KEY: &str = "priorityMatrix";
pub const SEATING_STATUS_KEY: &str = "seatingStatus";

pub fn seats_key(day: Day) -> String {
    format!("seats:{}", day)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("corrupt value under key `{key}`: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize value for key `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Сырой доступ к KV: строка по ключу
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Операции над состоянием рассадки, которые нужны движку и API
#[async_trait]
pub trait SeatStore: Send + Sync {
    async fn get_seats_for_day(&self, day: Day) -> Result<Option<SeatMatrix>, StoreError>;
    async fn set_seats_for_day(&self, matrix: &SeatMatrix) -> Result<(), StoreError>;

    async fn get_day_assignments(&self) -> Result<Option<DaySeating>, StoreError>;
    async fn update_day_assignments(&self, seating: &DaySeating) -> Result<(), StoreError>;

    async fn get_blocked_seats(&self, day: Option<Day>) -> Result<Vec<BlockedSeat>, StoreError>;
    async fn block_seat(&self, seat: BlockedSeat) -> Result<(), StoreError>;
    async fn unblock_seat(&self, day: Day, row: u32, seat_number: u32) -> Result<bool, StoreError>;
    async fn unblock_all_seats(&self) -> Result<(), StoreError>;

    async fn get_settings(&self) -> Result<Settings, StoreError>;
    async fn set_settings(&self, settings: &Settings) -> Result<(), StoreError>;

    async fn get_guests(&self) -> Result<Vec<Guest>, StoreError>;
    async fn set_guests(&self, guests: &[Guest]) -> Result<(), StoreError>;

    async fn get_priority_overrides(&self) -> Result<PriorityOverrides, StoreError>;
    async fn set_priority_overrides(&self, overrides: &PriorityOverrides) -> Result<(), StoreError>;

    async fn get_seating_status(&self) -> Result<SeatingStatus, StoreError>;
    async fn set_seating_status(&self, status: &SeatingStatus) -> Result<(), StoreError>;
}

/// SeatStore поверх любого KV-бэкенда
pub struct KvSeatStore<B> {
    backend: B,
}

impl<B: KvBackend> KvSeatStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(data) = self.backend.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    async fn save<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, data).await
    }
}

#[async_trait]
impl<B: KvBackend> SeatStore for KvSeatStore<B> {
    async fn get_seats_for_day(&self, day: Day) -> Result<Option<SeatMatrix>, StoreError> {
        self.load(&seats_key(day)).await
    }

    async fn set_seats_for_day(&self, matrix: &SeatMatrix) -> Result<(), StoreError> {
        self.save(&seats_key(matrix.day), matrix).await
    }

    async fn get_day_assignments(&self) -> Result<Option<DaySeating>, StoreError> {
        self.load(DAY_ASSIGNMENTS_KEY).await
    }

    async fn update_day_assignments(&self, seating: &DaySeating) -> Result<(), StoreError> {
        self.save(DAY_ASSIGNMENTS_KEY, seating).await
    }

    async fn get_blocked_seats(&self, day: Option<Day>) -> Result<Vec<BlockedSeat>, StoreError> {
        let seats: Vec<BlockedSeat> = self.load(BLOCKED_SEATS_KEY).await?.unwrap_or_default();
        Ok(match day {
            Some(day) => seats.into_iter().filter(|s| s.day == day).collect(),
            None => seats,
        })
    }

    // Повторная блокировка того же кресла заменяет причину
    async fn block_seat(&self, seat: BlockedSeat) -> Result<(), StoreError> {
        let mut seats = self.get_blocked_seats(None).await?;
        seats.retain(|s| !s.same_seat(seat.day, seat.row, seat.seat_number));
        debug!("Blocking seat {} row {} seat {}", seat.day, seat.row, seat.seat_number);
        seats.push(seat);
        self.save(BLOCKED_SEATS_KEY, &seats).await
    }

    async fn unblock_seat(&self, day: Day, row: u32, seat_number: u32) -> Result<bool, StoreError> {
        let mut seats = self.get_blocked_seats(None).await?;
        let before = seats.len();
        seats.retain(|s| !s.same_seat(day, row, seat_number));
        if seats.len() == before {
            return Ok(false);
        }
        debug!("Unblocking seat {} row {} seat {}", day, row, seat_number);
        self.save(BLOCKED_SEATS_KEY, &seats).await?;
        Ok(true)
    }

    async fn unblock_all_seats(&self) -> Result<(), StoreError> {
        self.save(BLOCKED_SEATS_KEY, &Vec::<BlockedSeat>::new()).await
    }

    async fn get_settings(&self) -> Result<Settings, StoreError> {
        Ok(self.load(SETTINGS_KEY).await?.unwrap_or_default())
    }

    async fn set_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.save(SETTINGS_KEY, settings).await
    }

    async fn get_guests(&self) -> Result<Vec<Guest>, StoreError> {
        Ok(self.load(GUESTS_KEY).await?.unwrap_or_default())
    }

    async fn set_guests(&self, guests: &[Guest]) -> Result<(), StoreError> {
        self.save(GUESTS_KEY, guests).await
    }

    async fn get_priority_overrides(&self) -> Result<PriorityOverrides, StoreError> {
        Ok(self.load(PRIORITY_MATRIX_KEY).await?.unwrap_or_default())
    }

    async fn set_priority_overrides(&self, overrides: &PriorityOverrides) -> Result<(), StoreError> {
        self.save(PRIORITY_MATRIX_KEY, overrides).await
    }

    async fn get_seating_status(&self) -> Result<SeatingStatus, StoreError> {
        Ok(self.load(SEATING_STATUS_KEY).await?.unwrap_or_default())
    }

    async fn set_seating_status(&self, status: &SeatingStatus) -> Result<(), StoreError> {
        self.save(SEATING_STATUS_KEY, status).await
    }
}
