//! Пороги и множители эскалации в одном месте.

use crate::models::{DayRank, Guest, Tier};

/// Лестница порогов: start, start+step, ... пока <= max
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Escalation {
    pub start: f64,
    pub step: f64,
    pub max: f64,
}

impl Escalation {
    pub const fn new(start: f64, step: f64, max: f64) -> Self {
        Self { start, step, max }
    }

    pub fn thresholds(&self) -> impl Iterator<Item = f64> {
        let Escalation { start, step, max } = *self;
        let count = if step > 0.0 && start <= max {
            ((max - start) / step).floor() as usize + 1
        } else {
            0
        };
        (0..count).map(move |i| start + step * i as f64)
    }

    /// Последний порог лестницы
    pub fn ceiling(&self) -> Option<f64> {
        self.thresholds().last()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    /// VIP в своей полосе рядов
    pub vip_band: Escalation,
    /// VIP по всему залу, включая балкон
    pub vip_any: Escalation,
    pub standard: Escalation,
    /// Исполнитель в свой первый день, когда это последний день
    pub performer_last_day: Escalation,
    /// Пороги для пересадки групп при перестановке
    pub reorder_reseat: Vec<f64>,
    /// Порог пробной посадки при проверке конфликта блокировок
    pub conflict_trial: f64,

    pub honoree_factor: f64,
    pub performer_factor: f64,
    pub teacher_factor: f64,

    pub adjacent_factor: f64,
    pub mutual_factor: f64,
    pub move_others_factor: f64,
    pub displaced_reseat_factor: f64,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            vip_band: Escalation::new(2.0, 2.0, 10.0),
            vip_any: Escalation::new(3.0, 5.0, 40.0),
            standard: Escalation::new(3.0, 2.0, 20.0),
            performer_last_day: Escalation::new(1.0, 2.0, 20.0),
            reorder_reseat: vec![15.0, 25.0, 40.0, 60.0],
            conflict_trial: 20.0,
            honoree_factor: 0.5,
            performer_factor: 0.7,
            teacher_factor: 0.8,
            adjacent_factor: 1.5,
            mutual_factor: 2.0,
            move_others_factor: 1.5,
            displaced_reseat_factor: 1.5,
        }
    }
}

impl PolicyTable {
    pub fn tier_factor(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Honoree => self.honoree_factor,
            Tier::Performer => self.performer_factor,
            Tier::Teacher => self.teacher_factor,
            Tier::Regular => 1.0,
        }
    }

    /// Множитель порога в зависимости от того, какой это день для гостя
    pub fn day_factor(&self, guest: &Guest, rank: DayRank) -> f64 {
        let performer = guest.is_performer;
        match (rank, performer) {
            (DayRank::First, true) => 0.3,
            (DayRank::First, false) => 0.6,
            (DayRank::Second, true) => 2.0,
            (DayRank::Second, false) => 1.5,
            (DayRank::Other, true) => 5.0,
            (DayRank::Other, false) => 4.0,
        }
    }

    /// Допуск для посадки рядом с соседом; для взаимных пар удваивается
    pub fn preference_allowance(&self, threshold: f64, mutual: bool) -> f64 {
        let allowance = threshold * self.adjacent_factor;
        if mutual {
            allowance * self.mutual_factor
        } else {
            allowance
        }
    }
}
