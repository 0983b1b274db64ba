use serde::{Deserialize, Serialize};

use super::guest::Day;

/// Административно заблокированное кресло. Ряд и номер с 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedSeat {
    pub day: Day,
    pub row: u32,
    pub seat_number: u32,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BlockedSeat {
    pub fn new(day: Day, row: u32, seat_number: u32, reason: Option<String>) -> Self {
        Self {
            day,
            row,
            seat_number,
            reason,
        }
    }

    pub fn same_seat(&self, day: Day, row: u32, seat_number: u32) -> bool {
        self.day == day && self.row == row && self.seat_number == seat_number
    }
}
