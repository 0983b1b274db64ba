use std::collections::BTreeMap;

use crate::models::{Day, SeatMatrix, Settings};
use crate::venue::Venue;

/// Ручные приоритеты: номер ряда -> номер кресла -> приоритет (всё с 1)
pub type PriorityOverrides = BTreeMap<u32, BTreeMap<u32, f64>>;

const IDEAL_ROW_MULTIPLIER: f64 = 0.5;

/// Базовый приоритет каждого кресла. Не зависит от гостя, пересчитывается на каждый запуск.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityMatrix {
    rows: Vec<Vec<f64>>,
}

impl PriorityMatrix {
    /// (расстояние до центра ряда + 1) * множитель ряда; в идеальной полосе множитель 0.5
    pub fn generate(venue: &Venue, settings: &Settings) -> Self {
        let rows = venue
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, layout)| {
                let row_number = idx as u32 + 1;
                let multiplier = if settings.in_ideal_band(row_number) {
                    IDEAL_ROW_MULTIPLIER
                } else {
                    1.0
                };
                let center = (layout.capacity / 2) as i64;
                (0..layout.capacity as i64)
                    .map(|col| ((col - center).abs() + 1) as f64 * multiplier)
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Ручные значения заменяют вычисленные только там, где заданы
    pub fn with_overrides(mut self, overrides: &PriorityOverrides) -> Self {
        for (row_number, seats) in overrides {
            let Some(row) = (*row_number as usize)
                .checked_sub(1)
                .and_then(|idx| self.rows.get_mut(idx))
            else {
                continue;
            };
            for (seat_number, priority) in seats {
                if let Some(cell) = (*seat_number as usize)
                    .checked_sub(1)
                    .and_then(|idx| row.get_mut(idx))
                {
                    *cell = *priority;
                }
            }
        }
        self
    }

    pub fn get(&self, row: usize, seat: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(seat)).copied()
    }

    /// Свежая пустая матрица дня с этими приоритетами
    pub fn to_matrix(&self, day: Day, venue: &Venue) -> SeatMatrix {
        let mut matrix = venue.blank_matrix(day);
        for (r, row) in matrix.rows.iter_mut().enumerate() {
            for (s, seat) in row.seats.iter_mut().enumerate() {
                if let Some(priority) = self.get(r, s) {
                    seat.priority = priority;
                }
            }
        }
        matrix
    }
}
