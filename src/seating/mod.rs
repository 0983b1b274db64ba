//! Движок рассадки.
//!
//! Состоит из независимых частей: приоритеты кресел, разбор предпочтений,
//! посадка одного гостя, посадка рядом с соседом, уплотнение ряда, разрешение
//! конфликтов с заблокированными креслами и оркестратор полного прогона.

pub mod compaction;
pub mod conflict;
pub mod engine;
pub mod matrix;
pub mod operator;
pub mod placement;
pub mod policy;
pub mod preferences;
pub mod priority;
pub mod together;

use std::collections::BTreeMap;

use crate::models::{Guest, GuestId, Settings};
use crate::venue::Venue;

pub use engine::{Placement, RunSummary, SeatingEngine};
pub use matrix::{Scratch, SeatBlock};
pub use operator::{Choice, Operator, PolicyOperator, Prompt, ScriptedOperator};
pub use placement::{PlacementKind, SearchScope, SeatingResult};
pub use policy::{Escalation, PolicyTable};
pub use preferences::{PreferenceSet, SeatingPreference};
pub use priority::{PriorityMatrix, PriorityOverrides};

/// Всё, что нужно алгоритму на один прогон. Передаётся явно, глобального состояния нет.
#[derive(Debug, Clone)]
pub struct SeatingContext {
    pub settings: Settings,
    pub policy: PolicyTable,
    pub venue: Venue,
    pub roster: BTreeMap<GuestId, Guest>,
    pub preferences: PreferenceSet,
}

impl SeatingContext {
    pub fn new(settings: Settings, venue: Venue, guests: &[Guest]) -> Self {
        let preferences = PreferenceSet::resolve(guests, &settings);
        Self {
            settings,
            policy: PolicyTable::default(),
            venue,
            roster: guests.iter().map(|g| (g.id, g.clone())).collect(),
            preferences,
        }
    }

    pub fn guest(&self, id: GuestId) -> Option<&Guest> {
        self.roster.get(&id)
    }

    /// Можно ли пересаживать гостя ради других: известен и не VIP
    pub fn is_movable(&self, id: GuestId) -> bool {
        self.guest(id).map(|g| !g.is_vip()).unwrap_or(false)
    }
}
