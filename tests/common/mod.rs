#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;

use seat_planner::models::{Day, Guest, GuestId, Settings};
use seat_planner::seating::{Operator, SeatingEngine};
use seat_planner::store::{MemoryBackend, MemoryStore, SeatStore};
use seat_planner::venue::{RowLayout, Venue};

pub fn registered(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9 + minute / 60, minute % 60, 0))
        .unwrap()
}

/// Гость с выдуманным именем; порядок регистрации задаётся `minute`
pub fn guest(id: GuestId, tickets: u32, first_day: Day, minute: u32) -> Guest {
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    Guest::new(id, first, last, tickets, first_day, registered(minute))
}

/// Идеальная полоса из одного первого ряда
pub fn front_row_settings() -> Settings {
    Settings {
        ideal_row_start: 1,
        ideal_row_end: 1,
        ..Settings::default()
    }
}

pub struct Harness {
    pub store: Arc<dyn SeatStore>,
    pub engine: SeatingEngine,
}

pub async fn harness(rows: Vec<RowLayout>, settings: Settings, operator: Arc<dyn Operator>) -> Harness {
    let store: Arc<dyn SeatStore> = Arc::new(MemoryStore::new(MemoryBackend::default()));
    store.set_settings(&settings).await.unwrap();
    let engine = SeatingEngine::new(store.clone(), operator, Venue::new(rows));
    Harness { store, engine }
}
