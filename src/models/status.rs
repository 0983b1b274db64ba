use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Прогресс последнего запуска, UI опрашивает его через /api/seating/status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeatingStatus {
    pub is_done: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub guests_to_process: usize,
    pub processed_guests: usize,
}

impl SeatingStatus {
    pub fn started(guests_to_process: usize) -> Self {
        let now = Utc::now();
        Self {
            is_done: false,
            last_updated: Some(now),
            start_time: Some(now),
            guests_to_process,
            processed_guests: 0,
        }
    }

    pub fn advance(&mut self, processed: usize) {
        self.processed_guests = processed;
        self.last_updated = Some(Utc::now());
    }

    pub fn finish(&mut self) {
        self.is_done = true;
        self.processed_guests = self.guests_to_process;
        self.last_updated = Some(Utc::now());
    }
}
