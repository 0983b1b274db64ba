//! Кто с кем хочет сидеть.
//!
//! Два прохода: обычные гости по номеру студента и преподаватели по email.
//! Рёбра направленные; взаимное ребро хранится в обе стороны.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::models::{Guest, GuestId, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingPreference {
    pub guest: GuestId,
    pub preferred: GuestId,
    pub is_mutual: bool,
    pub is_teacher: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceSet {
    edges: Vec<SeatingPreference>,
}

impl PreferenceSet {
    pub fn resolve(guests: &[Guest], settings: &Settings) -> Self {
        let mut edges = student_edges(guests, settings);
        edges.extend(teacher_edges(guests, settings));

        // Дубликаты направленных рёбер схлопываются, порядок сохраняется
        let mut seen = HashSet::new();
        edges.retain(|e| seen.insert((e.guest, e.preferred)));
        debug!("Resolved {} seating preferences", edges.len());
        Self { edges }
    }

    pub fn edges(&self) -> &[SeatingPreference] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Исходящие рёбра гостя
    pub fn for_guest(&self, guest: GuestId) -> impl Iterator<Item = &SeatingPreference> {
        self.edges.iter().filter(move |e| e.guest == guest)
    }

    /// Участвует ли гость хоть в одном ребре
    pub fn has_preference(&self, guest: GuestId) -> bool {
        self.edges.iter().any(|e| e.guest == guest || e.preferred == guest)
    }

    /// Одна запись на неупорядоченную пару
    pub fn pairs(&self) -> Vec<(GuestId, GuestId)> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .map(|e| (e.guest.min(e.preferred), e.guest.max(e.preferred)))
            .filter(|pair| seen.insert(*pair))
            .collect()
    }

    /// Взаимные пары преподавателей, каждая один раз, в порядке первого ребра
    pub fn teacher_mutual_pairs(&self) -> Vec<(GuestId, GuestId)> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| e.is_teacher && e.is_mutual)
            .filter(|e| seen.insert((e.guest.min(e.preferred), e.guest.max(e.preferred))))
            .map(|e| (e.guest, e.preferred))
            .collect()
    }
}

fn push_edge(edges: &mut Vec<SeatingPreference>, from: &Guest, to: &Guest, mutual: bool, teacher: bool) {
    edges.push(SeatingPreference {
        guest: from.id,
        preferred: to.id,
        is_mutual: mutual,
        is_teacher: teacher,
    });
    if mutual {
        edges.push(SeatingPreference {
            guest: to.id,
            preferred: from.id,
            is_mutual: true,
            is_teacher: teacher,
        });
    }
}

fn student_edges(guests: &[Guest], settings: &Settings) -> Vec<SeatingPreference> {
    let by_student: BTreeMap<i64, &Guest> = guests
        .iter()
        .filter_map(|g| g.student_number.map(|n| (n, g)))
        .collect();

    let mut edges = Vec::new();
    for guest in guests {
        // Почётные гости не участвуют в обычных предпочтениях
        if guest.is_honoree {
            continue;
        }
        let Some(number) = guest.preferred_student_number() else {
            continue;
        };
        let Some(target) = by_student.get(&number).copied() else {
            debug!("No guest with student number {} for {}", number, guest.full_name());
            continue;
        };
        if target.id == guest.id || target.is_honoree {
            continue;
        }
        if target.is_vip() && !settings.allow_regular_to_vip_preference {
            continue;
        }
        if !guest.shares_day_with(target) {
            debug!("{} and {} share no day", guest.full_name(), target.full_name());
            continue;
        }
        let mutual = guest.student_number.is_some()
            && target.preferred_student_number() == guest.student_number;
        if settings.require_mutual_preference && !mutual {
            continue;
        }
        push_edge(&mut edges, guest, target, mutual, false);
    }
    edges
}

fn teacher_edges(guests: &[Guest], settings: &Settings) -> Vec<SeatingPreference> {
    let by_email: BTreeMap<String, &Guest> = guests
        .iter()
        .filter(|g| g.is_teacher)
        .filter_map(|g| g.normalized_email().map(|e| (e, g)))
        .collect();

    let mut edges = Vec::new();
    for teacher in guests.iter().filter(|g| g.is_teacher && !g.is_honoree) {
        let own = teacher.normalized_email();
        for email in teacher.preferred_email_list() {
            if own.as_deref() == Some(email.as_str()) {
                continue;
            }
            let Some(target) = by_email.get(&email).copied() else {
                continue;
            };
            if target.id == teacher.id || target.is_honoree || !teacher.shares_day_with(target) {
                continue;
            }
            let mutual = own
                .as_ref()
                .map(|own| target.preferred_email_list().contains(own))
                .unwrap_or(false);
            if settings.require_mutual_preference && !mutual {
                continue;
            }
            push_edge(&mut edges, teacher, target, mutual, true);
        }
    }
    edges
}
