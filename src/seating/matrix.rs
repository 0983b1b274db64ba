//! Операции над матрицей дня и транзакция `Scratch` для пробных перестановок.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;

use crate::models::{BlockedSeat, GuestId, SeatMatrix};

/// Непрерывный блок кресел в одном ряду (индексы с 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatBlock {
    pub row: usize,
    pub start: usize,
    pub len: usize,
}

impl SeatBlock {
    pub fn new(row: usize, start: usize, len: usize) -> Self {
        Self { row, start, len }
    }

    pub fn seats(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn row_number(&self) -> u32 {
        self.row as u32 + 1
    }
}

/// Снятая блокировка: позиция и причина, чтобы её можно было вернуть
#[derive(Debug, Clone, PartialEq)]
pub struct ClearedBlock {
    pub row: usize,
    pub seat: usize,
    pub reason: Option<String>,
}

impl SeatMatrix {
    pub fn seat_count(&self) -> usize {
        self.rows.iter().map(|r| r.seats.len()).sum()
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map(|r| r.seats.len()).unwrap_or(0)
    }

    /// Блок, который занимает гость (первый найденный)
    pub fn locate(&self, guest: GuestId) -> Option<SeatBlock> {
        for (r, row) in self.rows.iter().enumerate() {
            let mut seats = row
                .seats
                .iter()
                .enumerate()
                .filter(|(_, s)| s.occupant == Some(guest))
                .map(|(i, _)| i);
            if let Some(first) = seats.next() {
                let last = seats.last().unwrap_or(first);
                return Some(SeatBlock::new(r, first, last - first + 1));
            }
        }
        None
    }

    pub fn is_seated(&self, guest: GuestId) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.seats.iter())
            .any(|s| s.occupant == Some(guest))
    }

    /// Освобождает все кресла гостя, возвращает их число
    pub fn vacate(&mut self, guest: GuestId) -> u32 {
        let mut freed = 0;
        for seat in self.rows.iter_mut().flat_map(|r| r.seats.iter_mut()) {
            if seat.occupant == Some(guest) {
                seat.occupant = None;
                seat.together = false;
                freed += 1;
            }
        }
        freed
    }

    /// Блок внутри ряда, все кресла пустые и не заблокированы
    pub fn block_is_free(&self, block: &SeatBlock) -> bool {
        match self.rows.get(block.row) {
            Some(row) if block.len > 0 && block.end() <= row.seats.len() => {
                row.seats[block.seats()].iter().all(|s| s.is_free())
            }
            _ => false,
        }
    }

    pub fn block_has_blocked(&self, block: &SeatBlock) -> bool {
        self.rows
            .get(block.row)
            .and_then(|row| row.seats.get(block.seats()))
            .map(|seats| seats.iter().any(|s| s.blocked))
            .unwrap_or(true)
    }

    pub fn average_priority(&self, block: &SeatBlock) -> Option<f64> {
        let seats = self.rows.get(block.row)?.seats.get(block.seats())?;
        if seats.is_empty() {
            return None;
        }
        Some(seats.iter().map(|s| s.priority).sum::<f64>() / seats.len() as f64)
    }

    /// Занятые кресла блока: гость -> сколько его кресел в блоке
    pub fn occupants_in(&self, block: &SeatBlock) -> BTreeMap<GuestId, u32> {
        let mut found = BTreeMap::new();
        if let Some(seats) = self.rows.get(block.row).and_then(|r| r.seats.get(block.seats())) {
            for id in seats.iter().filter_map(|s| s.occupant) {
                *found.entry(id).or_insert(0) += 1;
            }
        }
        found
    }

    pub fn assign(&mut self, block: &SeatBlock, guest: GuestId, together: bool) {
        if let Some(row) = self.rows.get_mut(block.row) {
            for seat in row.seats.iter_mut().skip(block.start).take(block.len) {
                seat.occupant = Some(guest);
                seat.together = together;
            }
        }
    }

    pub fn mark_together(&mut self, guest: GuestId, together: bool) {
        for seat in self.rows.iter_mut().flat_map(|r| r.seats.iter_mut()) {
            if seat.occupant == Some(guest) {
                seat.together = together;
            }
        }
    }

    pub fn is_together(&self, guest: GuestId) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.seats.iter())
            .any(|s| s.occupant == Some(guest) && s.together)
    }

    /// Процент занятых кресел партера. Без партера считается заполненным.
    pub fn ground_floor_occupancy(&self) -> f64 {
        let (taken, total) = self
            .rows
            .iter()
            .filter(|r| !r.balcony)
            .flat_map(|r| r.seats.iter())
            .fold((0usize, 0usize), |(taken, total), s| {
                (taken + s.occupant.is_some() as usize, total + 1)
            });
        if total == 0 {
            return 100.0;
        }
        taken as f64 * 100.0 / total as f64
    }

    /// Переносит реестр блокировок на матрицу (ряд и кресло с 1)
    pub fn paint_blocked(&mut self, blocked: &[BlockedSeat]) {
        for b in blocked.iter().filter(|b| b.day == self.day) {
            let seat = (b.row as usize)
                .checked_sub(1)
                .and_then(|r| self.rows.get_mut(r))
                .and_then(|row| {
                    (b.seat_number as usize)
                        .checked_sub(1)
                        .and_then(|s| row.seats.get_mut(s))
                });
            if let Some(seat) = seat {
                seat.blocked = true;
                seat.reason = b.reason.clone();
            }
        }
    }

    pub fn has_blocked(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.seats.iter())
            .any(|s| s.blocked)
    }

    /// Снимает все блокировки, возвращает что было снято
    pub fn clear_blocked_flags(&mut self) -> Vec<ClearedBlock> {
        let mut cleared = Vec::new();
        for (r, row) in self.rows.iter_mut().enumerate() {
            for (s, seat) in row.seats.iter_mut().enumerate() {
                if seat.blocked {
                    seat.blocked = false;
                    cleared.push(ClearedBlock {
                        row: r,
                        seat: s,
                        reason: seat.reason.take(),
                    });
                }
            }
        }
        cleared
    }

    /// Возвращает блокировку на кресла, которые остались пустыми
    pub fn restore_blocked(&mut self, cleared: &[ClearedBlock]) {
        for c in cleared {
            if let Some(seat) = self.rows.get_mut(c.row).and_then(|r| r.seats.get_mut(c.seat)) {
                if seat.occupant.is_none() {
                    seat.blocked = true;
                    seat.reason = c.reason.clone();
                }
            }
        }
    }

    /// Сколько кресел у каждого гостя в матрице
    pub fn occupants(&self) -> BTreeMap<GuestId, u32> {
        let mut found = BTreeMap::new();
        for id in self
            .rows
            .iter()
            .flat_map(|r| r.seats.iter())
            .filter_map(|s| s.occupant)
        {
            *found.entry(id).or_insert(0) += 1;
        }
        found
    }
}

/// Пробная копия матрицы: меняем копию, `commit` подменяет оригинал,
/// а drop без `commit` просто выбрасывает изменения.
pub struct Scratch<'m> {
    target: &'m mut SeatMatrix,
    copy: SeatMatrix,
}

impl<'m> Scratch<'m> {
    pub fn begin(target: &'m mut SeatMatrix) -> Self {
        let copy = target.clone();
        Self { target, copy }
    }

    pub fn matrix(&mut self) -> &mut SeatMatrix {
        &mut self.copy
    }

    pub fn view(&self) -> &SeatMatrix {
        &self.copy
    }

    pub fn commit(self) {
        *self.target = self.copy;
    }
}
