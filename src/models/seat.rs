use serde::{Deserialize, Serialize};

use super::guest::{Day, GuestId};

/// Одно кресло в зале на конкретный день
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    /// Номер кресла в ряду, с 1
    pub number: u32,
    #[serde(default)]
    pub occupant: Option<GuestId>,
    /// Чем меньше, тем лучше место
    pub priority: f64,
    /// Отметка "сидит рядом с выбранным соседом" для отображения
    #[serde(default)]
    pub together: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Seat {
    pub fn new(number: u32, priority: f64) -> Self {
        Self {
            number,
            occupant: None,
            priority,
            together: false,
            blocked: false,
            reason: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none() && !self.blocked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatRow {
    /// Номер ряда, с 1
    pub number: u32,
    pub balcony: bool,
    pub seats: Vec<Seat>,
}

/// Рассадка одного дня. Хранится целиком одним JSON-блобом.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatMatrix {
    pub day: Day,
    pub rows: Vec<SeatRow>,
}
