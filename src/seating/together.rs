//! Посадка рядом с выбранным соседом: вплотную к нему, общий блок с пересадкой
//! посторонних, "подвинуть других" для взаимных пар и пары преподавателей.
//!
//! Все перестановки идут через `Scratch`: либо пересажены все, либо матрица не тронута.

use std::collections::BTreeMap;
use tracing::debug;

use super::matrix::{Scratch, SeatBlock};
use super::placement::{seat_score, try_normal_seating, PlacementKind, SearchScope, SeatingResult};
use super::SeatingContext;
use crate::models::{DaySeating, Guest, GuestId, SeatMatrix, Settings};

/// Пробует все исходящие предпочтения гостя по очереди
pub fn try_preference_seating(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    max_priority: f64,
    seating: &DaySeating,
) -> Option<SeatingResult> {
    let day = matrix.day;
    let preferences: Vec<_> = ctx
        .preferences
        .for_guest(guest.id)
        .filter(|p| !p.is_teacher)
        .copied()
        .collect();

    for pref in preferences {
        let Some(preferred) = ctx.guest(pref.preferred).filter(|p| p.tickets > 0) else {
            continue;
        };
        // Оба должны выбрать этот день первым
        if guest.first_day != day || preferred.first_day != day {
            debug!(
                "{} and {} do not both pick {} first",
                guest.full_name(),
                preferred.full_name(),
                day
            );
            continue;
        }

        let allowance = ctx.policy.preference_allowance(max_priority, pref.is_mutual);

        if matrix.is_seated(preferred.id) {
            if let Some(block) = try_adjacent(matrix, guest, preferred.id, allowance, pref.is_mutual) {
                return Some(SeatingResult::single(
                    PlacementKind::Adjacent {
                        preferred: preferred.id,
                        mutual: pref.is_mutual,
                    },
                    guest,
                    block,
                ));
            }
        } else if !seating.is_placed(preferred.id) {
            if let Some(result) =
                try_relocation(ctx, matrix, guest, preferred, allowance, pref.is_mutual, seating)
            {
                return Some(result);
            }
        }

        if pref.is_mutual && matrix.is_seated(preferred.id) {
            let larger = allowance * ctx.policy.move_others_factor;
            if let Some(result) = try_move_others(ctx, matrix, guest, preferred, larger) {
                return Some(result);
            }
        }
    }
    None
}

/// Блок сразу слева, потом сразу справа от соседа
pub fn try_adjacent(
    matrix: &mut SeatMatrix,
    guest: &Guest,
    preferred: GuestId,
    allowance: f64,
    mutual: bool,
) -> Option<SeatBlock> {
    let anchor = matrix.locate(preferred)?;
    let n = guest.tickets as usize;

    for block in side_blocks(&anchor, n) {
        if !matrix.block_is_free(&block) {
            continue;
        }
        match matrix.average_priority(&block) {
            Some(avg) if avg <= allowance => {}
            _ => continue,
        }
        matrix.assign(&block, guest.id, mutual);
        if mutual {
            matrix.mark_together(preferred, true);
        }
        return Some(block);
    }
    None
}

fn side_blocks(anchor: &SeatBlock, n: usize) -> Vec<SeatBlock> {
    let mut blocks = Vec::with_capacity(2);
    if anchor.start >= n {
        blocks.push(SeatBlock::new(anchor.row, anchor.start - n, n));
    }
    blocks.push(SeatBlock::new(anchor.row, anchor.end(), n));
    blocks
}

#[derive(Debug, Clone)]
struct JointCandidate {
    block: SeatBlock,
    movers: Vec<(GuestId, u32)>,
    score: f64,
}

/// Кого придётся пересадить ради блока. None, если блок трогать нельзя:
/// есть заблокированное кресло, VIP, пара "вместе" или неизвестный гость.
fn movers_for(
    ctx: &SeatingContext,
    matrix: &SeatMatrix,
    block: &SeatBlock,
    seat_counts: &BTreeMap<GuestId, u32>,
    exclude: &[GuestId],
) -> Option<Vec<(GuestId, u32)>> {
    if matrix.block_has_blocked(block) {
        return None;
    }
    matrix
        .occupants_in(block)
        .keys()
        .map(|id| {
            if exclude.contains(id) || !ctx.is_movable(*id) || matrix.is_together(*id) {
                None
            } else {
                Some((*id, seat_counts.get(id).copied().unwrap_or(0)))
            }
        })
        .collect()
}

fn joint_candidates(
    ctx: &SeatingContext,
    matrix: &SeatMatrix,
    total: usize,
    exclude: &[GuestId],
) -> Vec<JointCandidate> {
    let seat_counts = matrix.occupants();
    let max_moves = ctx.settings.max_moves_for_preference as usize;
    let mut candidates = Vec::new();

    for (r, row) in matrix.rows.iter().enumerate() {
        let len = row.seats.len();
        if total == 0 || total > len {
            continue;
        }
        for start in 0..=len - total {
            let block = SeatBlock::new(r, start, total);
            let Some(movers) = movers_for(ctx, matrix, &block, &seat_counts, exclude) else {
                continue;
            };
            if movers.len() > max_moves {
                continue;
            }
            candidates.push(JointCandidate {
                block,
                movers,
                score: seat_score(&ctx.settings, r, row.balcony, start, len),
            });
        }
    }

    candidates.sort_by(|a, b| {
        a.movers
            .len()
            .cmp(&b.movers.len())
            .then(b.score.total_cmp(&a.score))
    });
    candidates
}

/// Пересаживает вытесненных на пробной копии; блок `reserved` на это время занят гостем
fn reseat_movers(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    reserved: &SeatBlock,
    holder: GuestId,
    movers: &[(GuestId, u32)],
    max_priority: f64,
) -> bool {
    for (id, _) in movers {
        matrix.vacate(*id);
    }
    matrix.assign(reserved, holder, false);

    let ok = movers.iter().all(|(id, count)| match ctx.guest(*id) {
        Some(mover) => {
            try_normal_seating(ctx, matrix, mover, *count, max_priority, SearchScope::AllRows).is_some()
        }
        None => false,
    });
    matrix.vacate(holder);
    ok
}

/// Сосед ещё нигде не сидит: ищем общий блок на двоих, при необходимости
/// пересаживая не более `maxMovesForPreference` обычных гостей.
pub fn try_relocation(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    preferred: &Guest,
    allowance: f64,
    mutual: bool,
    seating: &DaySeating,
) -> Option<SeatingResult> {
    let day = matrix.day;
    let (n, m) = (guest.tickets, preferred.tickets);
    if seating.remaining(day) < n + m || matrix.is_seated(preferred.id) {
        return None;
    }

    let exclude = [guest.id, preferred.id];
    let reseat_max = allowance * ctx.policy.displaced_reseat_factor;

    for candidate in joint_candidates(ctx, matrix, (n + m) as usize, &exclude) {
        let mut scratch = Scratch::begin(matrix);
        let work = scratch.matrix();
        if !reseat_movers(ctx, work, &candidate.block, guest.id, &candidate.movers, reseat_max) {
            debug!(
                "Relocation for {} at row {} abandoned: displaced guests do not fit",
                guest.full_name(),
                candidate.block.row_number()
            );
            continue;
        }

        // Сначала сосед, потом гость
        let row = candidate.block.row;
        let start = candidate.block.start;
        let preferred_block = SeatBlock::new(row, start, m as usize);
        let guest_block = SeatBlock::new(row, start + m as usize, n as usize);
        work.assign(&preferred_block, preferred.id, mutual);
        work.assign(&guest_block, guest.id, mutual);
        scratch.commit();

        let moved: Vec<GuestId> = candidate.movers.iter().map(|(id, _)| *id).collect();
        debug!(
            "Relocated {} next to {} in row {} moving {:?}",
            guest.full_name(),
            preferred.full_name(),
            guest_block.row_number(),
            moved
        );
        return Some(SeatingResult {
            kind: PlacementKind::Relocated {
                preferred: preferred.id,
                moved,
            },
            block: guest_block,
            seated: vec![(preferred.id, m), (guest.id, n)],
            evicted: Vec::new(),
        });
    }
    None
}

/// Последний шанс для взаимной пары: освободить блок рядом с соседом,
/// пересадив обычных гостей
pub fn try_move_others(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    preferred: &Guest,
    allowance: f64,
) -> Option<SeatingResult> {
    let anchor = matrix.locate(preferred.id)?;
    let n = guest.tickets as usize;
    let seat_counts = matrix.occupants();
    let exclude = [guest.id, preferred.id];
    let reseat_max = allowance * ctx.policy.displaced_reseat_factor;

    for block in side_blocks(&anchor, n) {
        if block.end() > matrix.row_len(block.row) {
            continue;
        }
        match matrix.average_priority(&block) {
            Some(avg) if avg <= allowance => {}
            _ => continue,
        }
        let Some(movers) = movers_for(ctx, matrix, &block, &seat_counts, &exclude) else {
            continue;
        };

        let mut scratch = Scratch::begin(matrix);
        let work = scratch.matrix();
        if !reseat_movers(ctx, work, &block, guest.id, &movers, reseat_max) {
            continue;
        }
        work.assign(&block, guest.id, true);
        work.mark_together(preferred.id, true);
        scratch.commit();

        return Some(SeatingResult::single(
            PlacementKind::MovedOthers {
                preferred: preferred.id,
                moved: movers.iter().map(|(id, _)| *id).collect(),
            },
            guest,
            block,
        ));
    }
    None
}

/// Ряды для пары преподавателей (индексы с 0): идеальная полоса со сдвигом на два ряда назад
/// от дальнего к ближнему, затем ряды отклонения вокруг центра полосы
pub fn teacher_pair_rows(settings: &Settings, row_count: usize) -> Vec<usize> {
    let start = settings.ideal_row_start as i64;
    let end = settings.ideal_row_end as i64;
    let center = (start + end) / 2;

    let shifted = (start..=end).rev().map(|r| r + 2);
    let deviation = (0..settings.max_vip_row_deviation as i64 * 2).map(|i| {
        let offset = i / 2 + 1;
        if i % 2 == 0 {
            center + offset + 1
        } else {
            center - offset + 1
        }
    });

    let mut rows = Vec::new();
    for number in shifted.chain(deviation) {
        if number < 1 || number as usize > row_count {
            continue;
        }
        let idx = number as usize - 1;
        if !rows.contains(&idx) {
            rows.push(idx);
        }
    }
    rows
}

/// Взаимная пара преподавателей сажается одним блоком, первый слева
pub fn try_teacher_pair(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    first: &Guest,
    second: &Guest,
) -> Option<SeatBlock> {
    if first.id == second.id || matrix.is_seated(first.id) || matrix.is_seated(second.id) {
        return None;
    }
    let total = (first.tickets + second.tickets) as usize;

    for r in teacher_pair_rows(&ctx.settings, matrix.rows.len()) {
        let len = matrix.row_len(r);
        if total == 0 || total > len {
            continue;
        }
        let center = len / 2;
        let half = total / 2;
        for offset in 0..=center {
            let left = center.checked_sub(half + offset);
            let right = center + offset;
            let starts = left
                .into_iter()
                .chain((right + total <= len).then_some(right));
            for start in starts {
                let block = SeatBlock::new(r, start, total);
                if !matrix.block_is_free(&block) {
                    continue;
                }
                let split = first.tickets as usize;
                matrix.assign(&SeatBlock::new(r, start, split), first.id, true);
                matrix.assign(&SeatBlock::new(r, start + split, total - split), second.id, true);
                return Some(block);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockedSeat, Day};
    use crate::seating::priority::PriorityMatrix;
    use crate::venue::{RowLayout, Venue};
    use chrono::NaiveDate;

    fn guest(id: GuestId, tickets: u32) -> Guest {
        let registered = NaiveDate::from_ymd_opt(2024, 2, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        let mut g = Guest::new(id, "Guest", id.to_string(), tickets, Day::Wednesday, registered);
        g.student_number = Some(1000 + id);
        g
    }

    fn prefers(mut g: Guest, other: GuestId) -> Guest {
        g.preferred_student = Some((1000 + other).to_string());
        g
    }

    fn setup(rows: Vec<RowLayout>, guests: &[Guest]) -> (SeatingContext, SeatMatrix) {
        let settings = Settings {
            ideal_row_start: 1,
            ideal_row_end: 1,
            ..Settings::default()
        };
        let venue = Venue::new(rows);
        let matrix = PriorityMatrix::generate(&venue, &settings).to_matrix(Day::Wednesday, &venue);
        (SeatingContext::new(settings, venue, guests), matrix)
    }

    #[test]
    fn adjacent_tries_left_then_right() {
        let (_, mut m) = setup(vec![RowLayout::ground(10)], &[]);
        m.assign(&SeatBlock::new(0, 4, 2), 1, false);
        let left = try_adjacent(&mut m, &guest(2, 2), 1, 10.0, false).unwrap();
        assert_eq!(left, SeatBlock::new(0, 2, 2));
        let right = try_adjacent(&mut m, &guest(3, 2), 1, 10.0, true).unwrap();
        assert_eq!(right, SeatBlock::new(0, 6, 2));
        assert!(m.is_together(1) && m.is_together(3) && !m.is_together(2));
    }

    #[test]
    fn adjacent_rejects_blocked_side() {
        let (_, mut m) = setup(vec![RowLayout::ground(6)], &[]);
        m.assign(&SeatBlock::new(0, 2, 2), 1, false);
        m.paint_blocked(&[
            BlockedSeat::new(Day::Wednesday, 1, 2, None),
            BlockedSeat::new(Day::Wednesday, 1, 5, None),
        ]);
        assert!(try_adjacent(&mut m, &guest(2, 2), 1, 10.0, false).is_none());
    }

    #[test]
    fn relocation_seats_both_and_moves_a_stranger() {
        let a = prefers(guest(1, 2), 2);
        let b = guest(2, 2);
        let stranger = guest(3, 1);
        let (ctx, mut m) = setup(
            vec![RowLayout::ground(4), RowLayout::ground(3)],
            &[a.clone(), b.clone(), stranger],
        );
        m.assign(&SeatBlock::new(0, 1, 1), 3, false);
        let seating = DaySeating::new(7);

        let result = try_relocation(&ctx, &mut m, &a, &b, 50.0, false, &seating).unwrap();
        assert_eq!(result.seated, vec![(2, 2), (1, 2)]);
        assert_eq!(m.locate(2), Some(SeatBlock::new(0, 0, 2)));
        assert_eq!(m.locate(1), Some(SeatBlock::new(0, 2, 2)));
        assert_eq!(m.locate(3).map(|b| b.row), Some(1));
        assert!(!m.is_together(1));
    }

    #[test]
    fn relocation_never_uses_blocked_target() {
        let a = prefers(guest(1, 2), 2);
        let b = guest(2, 2);
        let (ctx, mut m) = setup(vec![RowLayout::ground(4)], &[a.clone(), b.clone()]);
        m.paint_blocked(&[BlockedSeat::new(Day::Wednesday, 1, 3, Some("pillar".into()))]);
        let before = m.clone();

        assert!(try_relocation(&ctx, &mut m, &a, &b, 50.0, false, &DaySeating::new(4)).is_none());
        assert_eq!(m, before);
    }

    #[test]
    fn relocation_abandons_when_displaced_guest_cannot_move() {
        let a = prefers(guest(1, 2), 2);
        let b = guest(2, 2);
        let stranger = guest(3, 2);
        let (ctx, mut m) = setup(vec![RowLayout::ground(4)], &[a.clone(), b.clone(), stranger]);
        m.assign(&SeatBlock::new(0, 1, 2), 3, false);
        let before = m.clone();

        assert!(try_relocation(&ctx, &mut m, &a, &b, 50.0, false, &DaySeating::new(4)).is_none());
        assert_eq!(m, before);
    }

    #[test]
    fn move_others_frees_side_block_for_mutual_pair() {
        let a = prefers(guest(1, 1), 2);
        let b = prefers(guest(2, 1), 1);
        let stranger = guest(3, 1);
        let (ctx, mut m) = setup(
            vec![RowLayout::ground(3), RowLayout::ground(2)],
            &[a.clone(), b.clone(), stranger],
        );
        m.assign(&SeatBlock::new(0, 0, 1), 3, false);
        m.assign(&SeatBlock::new(0, 1, 1), 2, false);
        m.paint_blocked(&[BlockedSeat::new(Day::Wednesday, 1, 3, None)]);

        let result = try_move_others(&ctx, &mut m, &a, &b, 50.0).unwrap();
        assert_eq!(result.block, SeatBlock::new(0, 0, 1));
        assert!(m.is_together(1) && m.is_together(2));
        assert_eq!(m.locate(3).map(|b| b.row), Some(1));
    }

    #[test]
    fn teacher_rows_start_behind_ideal_band() {
        let settings = Settings::default();
        // полоса 3..6 -> 8,7,6,5, затем центр 4: 6,4,7,3
        assert_eq!(teacher_pair_rows(&settings, 22), vec![7, 6, 5, 4, 3, 2]);
        assert_eq!(teacher_pair_rows(&settings, 6), vec![5, 4, 3, 2]);
    }

    #[test]
    fn teacher_pair_sits_together_in_one_block() {
        let mut t1 = guest(1, 2);
        let mut t2 = guest(2, 1);
        t1.is_teacher = true;
        t2.is_teacher = true;
        let rows = (0..8).map(|_| RowLayout::ground(6)).collect();
        let (ctx, mut m) = setup(rows, &[t1.clone(), t2.clone()]);

        let block = try_teacher_pair(&ctx, &mut m, &t1, &t2).unwrap();
        // полоса 1..1 со сдвигом -> ряд 3
        assert_eq!(block, SeatBlock::new(2, 2, 3));
        assert_eq!(m.locate(1), Some(SeatBlock::new(2, 2, 2)));
        assert_eq!(m.locate(2), Some(SeatBlock::new(2, 4, 1)));
        assert!(m.is_together(1) && m.is_together(2));
        assert!(try_teacher_pair(&ctx, &mut m, &t1, &t2).is_none());
    }
}
