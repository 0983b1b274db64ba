//! Посадка одного гостя на одну попытку порога.

use serde::Serialize;
use tracing::debug;

use super::matrix::SeatBlock;
use super::{together, SeatingContext};
use crate::models::{BlockedSeat, DaySeating, Guest, GuestId, SeatMatrix, Settings};

const BASE_SCORE: f64 = 100.0;
const IDEAL_ROW_BONUS: f64 = 50.0;
const IDEAL_ROW_DISTANCE_PENALTY: f64 = 5.0;
const OUTER_ROW_DISTANCE_PENALTY: f64 = 10.0;
const CENTER_DISTANCE_PENALTY: f64 = 5.0;
const PROBE_OFFSET_PENALTY: f64 = 10.0;

/// В каких рядах искать (номера с 1, включительно)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    AllRows,
    RowBand { first: u32, last: u32 },
}

impl SearchScope {
    /// Полоса VIP: идеальные ряды плюс допустимое отклонение
    pub fn vip_band(settings: &Settings) -> Self {
        SearchScope::RowBand {
            first: settings
                .ideal_row_start
                .saturating_sub(settings.max_vip_row_deviation),
            last: settings.ideal_row_end + settings.max_vip_row_deviation,
        }
    }

    pub fn contains(&self, row_number: u32) -> bool {
        match self {
            SearchScope::AllRows => true,
            SearchScope::RowBand { first, last } => (*first..=*last).contains(&row_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlacementKind {
    Normal,
    Adjacent {
        preferred: GuestId,
        mutual: bool,
    },
    Relocated {
        preferred: GuestId,
        moved: Vec<GuestId>,
    },
    MovedOthers {
        preferred: GuestId,
        moved: Vec<GuestId>,
    },
    Compacted {
        moved: Vec<GuestId>,
    },
    TeacherPair {
        partner: GuestId,
    },
    BlockedSeatsUsed {
        unblocked: Vec<BlockedSeat>,
    },
    Reordered {
        moved: Vec<GuestId>,
        evicted: Vec<GuestId>,
    },
}

/// Итог удачной посадки: кого посадили (иногда двоих) и кого пришлось снять
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingResult {
    pub kind: PlacementKind,
    pub block: SeatBlock,
    pub seated: Vec<(GuestId, u32)>,
    pub evicted: Vec<GuestId>,
}

impl SeatingResult {
    pub fn single(kind: PlacementKind, guest: &Guest, block: SeatBlock) -> Self {
        Self {
            kind,
            block,
            seated: vec![(guest.id, guest.tickets)],
            evicted: Vec::new(),
        }
    }
}

/// Оценка позиции: база 100, штраф балкона, бонус идеальной полосы, штраф за удаление от центра.
/// `row_index` и `start` считаются с 0. Полоса сравнивается с индексом ряда,
/// поэтому полоса 3..6 здесь означает ряды с номерами 4-7.
pub fn seat_score(settings: &Settings, row_index: usize, balcony: bool, start: usize, row_len: usize) -> f64 {
    let mut score = BASE_SCORE;
    if balcony {
        score -= settings.balcony_penalty;
    }

    let row = row_index as f64;
    if settings.in_ideal_band(row_index as u32) {
        score += IDEAL_ROW_BONUS;
        score -= IDEAL_ROW_DISTANCE_PENALTY * (row - settings.ideal_center() as f64).abs();
    } else {
        let to_start = (row - settings.ideal_row_start as f64).abs();
        let to_end = (row - settings.ideal_row_end as f64).abs();
        score -= OUTER_ROW_DISTANCE_PENALTY * to_start.min(to_end);
    }

    if settings.prefer_center_seats {
        score -= CENTER_DISTANCE_PENALTY * (start as f64 - (row_len / 2) as f64).abs();
    }
    score.max(0.0)
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    block: SeatBlock,
    score: f64,
}

/// Стартовые позиции от центра наружу: центр, потом попеременно слева и справа
pub(crate) fn probe_starts(row_len: usize, tickets: usize) -> Vec<(usize, usize)> {
    if tickets == 0 || tickets > row_len {
        return Vec::new();
    }
    let center = (row_len / 2).saturating_sub(tickets / 2).min(row_len - tickets);
    let reach = center.max(row_len - tickets - center);
    let mut starts = vec![(center, 0)];
    for offset in 1..=reach {
        if let Some(left) = center.checked_sub(offset) {
            starts.push((left, offset));
        }
        if center + offset + tickets <= row_len {
            starts.push((center + offset, offset));
        }
    }
    starts
}

/// Обычная посадка без соседей. Кандидаты партера и балкона сортируются отдельно,
/// балкон добавляется только когда партер заполнен или в нём ничего нет.
pub fn try_normal_seating(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    tickets: u32,
    max_priority: f64,
    scope: SearchScope,
) -> Option<SeatBlock> {
    let settings = &ctx.settings;
    let n = tickets as usize;
    let vip = guest.is_vip();
    let mut ground = Vec::new();
    let mut balcony = Vec::new();

    for (r, row) in matrix.rows.iter().enumerate() {
        if !scope.contains(row.number) {
            continue;
        }
        let len = row.seats.len();
        for (start, offset) in probe_starts(len, n) {
            let block = SeatBlock::new(r, start, n);
            if !matrix.block_is_free(&block) {
                continue;
            }
            match matrix.average_priority(&block) {
                Some(avg) if avg <= max_priority => {}
                _ => continue,
            }
            let mut score = seat_score(settings, r, row.balcony, start, len)
                - PROBE_OFFSET_PENALTY * offset as f64;
            if vip && row.balcony {
                score -= settings.balcony_penalty * 2.0;
            }
            let candidate = Candidate { block, score };
            if row.balcony {
                balcony.push(candidate);
            } else {
                ground.push(candidate);
            }
        }
    }

    ground.sort_by(|a, b| b.score.total_cmp(&a.score));
    balcony.sort_by(|a, b| b.score.total_cmp(&a.score));

    let use_balcony =
        ground.is_empty() || matrix.ground_floor_occupancy() >= settings.use_balcony_threshold;
    let mut options = ground;
    if use_balcony {
        options.extend(balcony);
    }

    // Перепроверяем свободность на момент записи
    let chosen = options
        .into_iter()
        .find(|c| matrix.block_is_free(&c.block))?;
    matrix.assign(&chosen.block, guest.id, false);
    debug!(
        "Seated {} in row {} from seat {} (score {:.1})",
        guest.full_name(),
        chosen.block.row_number(),
        chosen.block.start + 1,
        chosen.score
    );
    Some(chosen.block)
}

/// Одна попытка с заданным порогом. Порог масштабируется коэффициентом категории;
/// не-VIP с предпочтением сначала пробуют сесть рядом с соседом.
/// `seating = None` отключает предпочтения (пробные посадки и пересадки).
pub fn try_assign_seats(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    max_priority: f64,
    scope: SearchScope,
    seating: Option<&DaySeating>,
) -> Option<SeatingResult> {
    if matrix.is_seated(guest.id) {
        return None;
    }
    let max = max_priority * ctx.policy.tier_factor(guest.tier());

    if !guest.is_vip() && ctx.settings.prioritize_preferences {
        if let Some(seating) = seating {
            if let Some(result) = together::try_preference_seating(ctx, matrix, guest, max, seating) {
                return Some(result);
            }
        }
    }

    try_normal_seating(ctx, matrix, guest, guest.tickets, max, scope)
        .map(|block| SeatingResult::single(PlacementKind::Normal, guest, block))
}
