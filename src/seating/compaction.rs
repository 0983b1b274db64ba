//! Уплотнение ряда: когда свободных кресел в ряду хватает, но они разбросаны,
//! обычные группы сдвигаются к краю участка и освобождают непрерывный блок.
//! Гости остаются в том же ряду и в тот же день. Блок для гостя подчиняется
//! тому же порогу среднего приоритета, что и эскалация, и балкон берётся
//! только если в партере ничего не нашлось.

use tracing::debug;

use super::matrix::{Scratch, SeatBlock};
use super::placement::{seat_score, PlacementKind, SeatingResult};
use super::SeatingContext;
use crate::models::{Guest, GuestId, SeatMatrix, SeatRow};

#[derive(Debug, Clone, PartialEq)]
struct Layout {
    /// (гость, старое начало, новое начало, размер)
    groups: Vec<(GuestId, usize, usize, usize)>,
    guest: SeatBlock,
    distance: usize,
}

pub fn try_compact_row(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    max_priority: f64,
) -> Option<SeatingResult> {
    if matrix.is_seated(guest.id) || guest.tickets == 0 {
        return None;
    }
    let n = guest.tickets as usize;

    // Сначала партер, потом балкон; внутри по оценке ряда
    let mut order: Vec<(usize, bool, f64)> = matrix
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.seats.len() >= n)
        .map(|(r, row)| {
            let len = row.seats.len();
            let start = (len / 2).saturating_sub(n / 2);
            (r, row.balcony, seat_score(&ctx.settings, r, row.balcony, start, len))
        })
        .collect();
    order.sort_by(|a, b| a.1.cmp(&b.1).then(b.2.total_cmp(&a.2)));

    let seat_counts = matrix.occupants();
    for (r, _, _) in order {
        let Some(layout) = plan_row(ctx, &matrix.rows[r], r, n, guest.id, max_priority, |id| {
            seat_counts.get(&id).copied().unwrap_or(0) as usize
        }) else {
            continue;
        };

        let mut scratch = Scratch::begin(matrix);
        let work = scratch.matrix();
        let mut moved = Vec::new();
        for (id, old_start, new_start, _) in &layout.groups {
            if old_start != new_start {
                moved.push(*id);
            }
            work.vacate(*id);
        }
        for (id, _, new_start, size) in &layout.groups {
            work.assign(&SeatBlock::new(r, *new_start, *size), *id, false);
        }
        work.assign(&layout.guest, guest.id, false);
        scratch.commit();

        debug!(
            "Compacted row {} for {}, moved {:?}",
            layout.guest.row_number(),
            guest.full_name(),
            moved
        );
        return Some(SeatingResult::single(PlacementKind::Compacted { moved }, guest, layout.guest));
    }
    None
}

/// Участки ряда между неподвижными креслами: заблокированные, VIP, пары "вместе"
fn segments(ctx: &SeatingContext, row: &SeatRow) -> Vec<(usize, usize)> {
    let fixed = |i: usize| {
        let seat = &row.seats[i];
        seat.blocked
            || seat.together
            || seat.occupant.map(|id| !ctx.is_movable(id)).unwrap_or(false)
    };
    let mut result = Vec::new();
    let mut start = None;
    for i in 0..row.seats.len() {
        match (fixed(i), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                result.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        result.push((s, row.seats.len()));
    }
    result
}

fn plan_row(
    ctx: &SeatingContext,
    row: &SeatRow,
    r: usize,
    n: usize,
    guest: GuestId,
    max_priority: f64,
    seats_of: impl Fn(GuestId) -> usize,
) -> Option<Layout> {
    let len = row.seats.len();
    let ideal = (len / 2).saturating_sub(n / 2);
    let mut best: Option<Layout> = None;

    for (a, b) in segments(ctx, row) {
        let seats = &row.seats[a..b];
        let free = seats.iter().filter(|s| s.occupant.is_none()).count();
        if free < n {
            continue;
        }

        // Группы участка по порядку; группа должна целиком лежать в участке
        let mut groups: Vec<(GuestId, usize, usize)> = Vec::new();
        let mut i = a;
        let mut whole = true;
        while i < b {
            match row.seats[i].occupant {
                Some(id) => {
                    let mut j = i;
                    while j < b && row.seats[j].occupant == Some(id) {
                        j += 1;
                    }
                    if id == guest || seats_of(id) != j - i {
                        whole = false;
                        break;
                    }
                    groups.push((id, i, j - i));
                    i = j;
                }
                None => i += 1,
            }
        }
        if !whole {
            continue;
        }
        let used: usize = groups.iter().map(|g| g.2).sum();

        // Два варианта: группы прижаты влево или вправо
        for pack_left in [true, false] {
            let (mut cursor, run_start) = if pack_left { (a, a + used) } else { (b - used, a) };
            let run_end = run_start + free;
            let placed: Vec<(GuestId, usize, usize, usize)> = groups
                .iter()
                .map(|(id, old, size)| {
                    let new = cursor;
                    cursor += size;
                    (*id, *old, new, *size)
                })
                .collect();
            // Ближайшее к центру начало, чей средний приоритет укладывается в порог
            let within = |start: usize| {
                row.seats[start..start + n].iter().map(|s| s.priority).sum::<f64>() / n as f64 <= max_priority
            };
            let Some(start) = (run_start..=run_end - n)
                .filter(|s| within(*s))
                .min_by_key(|s| s.abs_diff(ideal))
            else {
                continue;
            };
            let layout = Layout {
                groups: placed,
                guest: SeatBlock::new(r, start, n),
                distance: start.abs_diff(ideal),
            };
            if best.as_ref().map(|b| layout.distance < b.distance).unwrap_or(true) {
                best = Some(layout);
            }
        }
    }
    best
}
