//! Схема зала: сколько кресел в каждом ряду, где балкон, где места для колясок.
//! Неизменна во время работы, матрицы дней строятся по ней.

use serde::{Deserialize, Serialize};

use crate::models::{Day, Seat, SeatMatrix, SeatRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowLayout {
    pub capacity: u32,
    pub balcony: bool,
    #[serde(default)]
    pub wheelchair: Option<String>,
}

impl RowLayout {
    pub fn ground(capacity: u32) -> Self {
        Self {
            capacity,
            balcony: false,
            wheelchair: None,
        }
    }

    pub fn balcony(capacity: u32) -> Self {
        Self {
            capacity,
            balcony: true,
            wheelchair: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    rows: Vec<RowLayout>,
}

// Вместимость рядов театрального зала, с первого ряда. Ряды 17-22 на балконе.
const THEATER_ROWS: [u32; 22] = [
    19, 24, 27, 30, 31, 32, 35, 36, 37, 38, 13, 13, 13, 13, 12, 12, 38, 39, 39, 39, 39, 39,
];
const FIRST_BALCONY_ROW: usize = 17;
const WHEELCHAIR_ROW: usize = 15;

impl Venue {
    pub fn new(rows: Vec<RowLayout>) -> Self {
        Self { rows }
    }

    /// Зал, под который писался планировщик
    pub fn theater() -> Self {
        let rows = THEATER_ROWS
            .iter()
            .enumerate()
            .map(|(idx, &capacity)| {
                let number = idx + 1;
                RowLayout {
                    capacity,
                    balcony: number >= FIRST_BALCONY_ROW,
                    wheelchair: (number == WHEELCHAIR_ROW)
                        .then(|| "2 stoelen voor 1 rolstoel".to_string()),
                }
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[RowLayout] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_capacity(&self) -> u32 {
        self.rows.iter().map(|r| r.capacity).sum()
    }

    /// Пустая матрица дня, все приоритеты равны 1
    pub fn blank_matrix(&self, day: Day) -> SeatMatrix {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, layout)| SeatRow {
                number: idx as u32 + 1,
                balcony: layout.balcony,
                seats: (1..=layout.capacity).map(|n| Seat::new(n, 1.0)).collect(),
            })
            .collect();
        SeatMatrix { day, rows }
    }
}

impl Default for Venue {
    fn default() -> Self {
        Self::theater()
    }
}
