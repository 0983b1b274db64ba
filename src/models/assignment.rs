use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::guest::{Day, GuestId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub guest_id: GuestId,
    pub seats: u32,
    #[serde(rename = "assignedDay")]
    pub day: Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAssignment {
    pub assigned: u32,
    pub capacity: u32,
    #[serde(default, rename = "seats")]
    pub records: Vec<AssignmentRecord>,
}

impl DayAssignment {
    pub fn new(capacity: u32) -> Self {
        Self {
            assigned: 0,
            capacity,
            records: Vec::new(),
        }
    }
}

/// Итоги по дням: сколько мест занято и кем
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaySeating {
    pub days: BTreeMap<Day, DayAssignment>,
}

impl DaySeating {
    /// Пустые итоги на все три дня с одинаковой вместимостью
    pub fn new(capacity: u32) -> Self {
        Self {
            days: Day::ALL
                .iter()
                .map(|d| (*d, DayAssignment::new(capacity)))
                .collect(),
        }
    }

    pub fn day(&self, day: Day) -> Option<&DayAssignment> {
        self.days.get(&day)
    }

    pub fn remaining(&self, day: Day) -> u32 {
        self.days
            .get(&day)
            .map(|d| d.capacity.saturating_sub(d.assigned))
            .unwrap_or(0)
    }

    pub fn fits(&self, day: Day, tickets: u32) -> bool {
        self.days
            .get(&day)
            .map(|d| d.assigned + tickets <= d.capacity)
            .unwrap_or(false)
    }

    pub fn record(&mut self, day: Day, guest_id: GuestId, seats: u32) {
        if let Some(entry) = self.days.get_mut(&day) {
            entry.assigned += seats;
            entry.records.push(AssignmentRecord { guest_id, seats, day });
        }
    }

    /// Убрать гостя из итогов дня, вернуть сколько мест освободилось
    pub fn remove(&mut self, day: Day, guest_id: GuestId) -> Option<u32> {
        let entry = self.days.get_mut(&day)?;
        let pos = entry.records.iter().position(|r| r.guest_id == guest_id)?;
        let record = entry.records.remove(pos);
        entry.assigned = entry.assigned.saturating_sub(record.seats);
        Some(record.seats)
    }

    pub fn placed_day(&self, guest_id: GuestId) -> Option<Day> {
        self.days
            .iter()
            .find(|(_, d)| d.records.iter().any(|r| r.guest_id == guest_id))
            .map(|(day, _)| *day)
    }

    pub fn is_placed(&self, guest_id: GuestId) -> bool {
        self.placed_day(guest_id).is_some()
    }

    /// assigned == сумме записей, не больше вместимости, гость не встречается дважды
    pub fn check(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (day, entry) in &self.days {
            let sum: u32 = entry.records.iter().map(|r| r.seats).sum();
            if sum != entry.assigned {
                return Err(format!("{day}: assigned {} but records sum to {sum}", entry.assigned));
            }
            if entry.assigned > entry.capacity {
                return Err(format!("{day}: assigned {} exceeds capacity {}", entry.assigned, entry.capacity));
            }
            for r in &entry.records {
                if !seen.insert(r.guest_id) {
                    return Err(format!("guest {} recorded more than once", r.guest_id));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_remove_keep_totals_consistent() {
        let mut seating = DaySeating::new(10);
        seating.record(Day::Thursday, 1, 4);
        seating.record(Day::Thursday, 2, 3);
        assert_eq!(seating.remaining(Day::Thursday), 3);
        assert!(seating.fits(Day::Thursday, 3));
        assert!(!seating.fits(Day::Thursday, 4));
        assert_eq!(seating.remove(Day::Thursday, 1), Some(4));
        assert_eq!(seating.remove(Day::Thursday, 1), None);
        assert_eq!(seating.placed_day(2), Some(Day::Thursday));
        assert!(seating.check().is_ok());
    }

    #[test]
    fn check_reports_duplicate_guest() {
        let mut seating = DaySeating::new(10);
        seating.record(Day::Wednesday, 1, 1);
        seating.record(Day::Friday, 1, 1);
        assert!(seating.check().is_err());
    }

    #[test]
    fn serializes_as_day_keyed_map() {
        let mut seating = DaySeating::new(5);
        seating.record(Day::Friday, 9, 2);
        let value = serde_json::to_value(&seating).unwrap();
        assert_eq!(value["vrijdag"]["assigned"], 2);
        assert_eq!(value["vrijdag"]["seats"][0]["guestId"], 9);
        assert_eq!(value["vrijdag"]["seats"][0]["assignedDay"], "vrijdag");
    }
}
