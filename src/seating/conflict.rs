//! Разрешение конфликта, когда гостя не посадить только из-за заблокированных кресел.
//!
//! Сессия - это конечный автомат: `prompt()` отдаёт текущий вопрос оператору,
//! `resume(choice)` двигает автомат и возвращает либо следующий вопрос, либо итог.
//! Пока итог не применён движком, хранилище не меняется.

use serde::Serialize;
use tracing::{debug, info};

use super::operator::{Choice, Prompt, PromptKind};
use super::placement::{try_assign_seats, try_normal_seating, PlacementKind, SearchScope, SeatingResult};
use super::SeatingContext;
use crate::models::{BlockedSeat, Guest, GuestId, SeatMatrix};

const FIRST_PASS_SHARE: f64 = 0.95;
const ACCEPTABLE_SHARE: f64 = 0.9;
const MAX_WINDOW_GROUPS: usize = 8;
const GROUP_LIMITS: [usize; 2] = [12, 16];
const MOVABLE_GROUP_FACTOR: f64 = 1.5;
const SMALL_GROUP_ON_FIRST_DAY: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictState {
    Checking,
    AwaitingChoice,
    TryingBlocked,
    Reordering,
    TrySecondDay,
    Cancelled,
    Resolved,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictOutcome {
    /// Посадили на заблокированные кресла; `result.kind` содержит снятые блокировки
    UsedBlockedSeats { matrix: SeatMatrix, result: SeatingResult },
    /// Посадили, пересадив другие группы; `result.evicted` - кого пересадить не удалось
    Reordered { matrix: SeatMatrix, result: SeatingResult },
    TrySecondDay,
    Cancelled,
    Declined,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictStep {
    Pending(Prompt),
    Finished(ConflictOutcome),
}

#[derive(Debug, Clone, PartialEq)]
struct ReorderTrial {
    matrix: SeatMatrix,
    result: SeatingResult,
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    Choose,
    ConfirmBlocked,
    ConfirmReorder(Vec<(GuestId, u32)>),
    ConfirmPartial(ReorderTrial),
    Done(ConflictState),
}

pub struct ConflictSession<'c> {
    ctx: &'c SeatingContext,
    guest: &'c Guest,
    matrix: SeatMatrix,
    stage: Stage,
}

impl<'c> ConflictSession<'c> {
    /// Конфликт есть, только если мешают именно блокировки: с порогом пробной посадки
    /// гость не садится на матрицу как есть и садится на неё же со снятыми
    /// блокировками, причём хотя бы на одно бывшее заблокированное кресло
    pub fn detect(ctx: &'c SeatingContext, matrix: &SeatMatrix, guest: &'c Guest) -> Option<Self> {
        if !matrix.has_blocked() {
            return None;
        }
        let trial = |m: &mut SeatMatrix| {
            try_assign_seats(ctx, m, guest, ctx.policy.conflict_trial, SearchScope::AllRows, None)
        };
        if trial(&mut matrix.clone()).is_some() {
            debug!(
                "{} fits on {} without blocked seats, not a blocked seat conflict",
                guest.full_name(),
                matrix.day
            );
            return None;
        }

        let mut cleared_matrix = matrix.clone();
        let cleared = cleared_matrix.clear_blocked_flags();
        let block = trial(&mut cleared_matrix)?.block;
        if !cleared
            .iter()
            .any(|c| c.row == block.row && block.seats().contains(&c.seat))
        {
            return None;
        }
        info!(
            "Blocked seats are the only obstacle for {} on {}",
            guest.full_name(),
            matrix.day
        );
        Some(Self {
            ctx,
            guest,
            matrix: matrix.clone(),
            stage: Stage::Choose,
        })
    }

    pub fn state(&self) -> ConflictState {
        match &self.stage {
            Stage::Choose => ConflictState::AwaitingChoice,
            Stage::ConfirmBlocked => ConflictState::TryingBlocked,
            Stage::ConfirmReorder(_) | Stage::ConfirmPartial(_) => ConflictState::Reordering,
            Stage::Done(state) => *state,
        }
    }

    pub fn prompt(&self) -> Option<Prompt> {
        let name = self.guest.full_name();
        let tickets = self.guest.tickets;
        let day = self.matrix.day;
        match &self.stage {
            Stage::Choose => Some(Prompt {
                kind: PromptKind::Conflict,
                title: "Blocked seats".into(),
                message: format!("{name} ({tickets} tickets) only fits on {day} if blocked seats are used."),
                detail: "Try the second preference day, reorder other groups, use the blocked seats or cancel.".into(),
                choices: vec![
                    Choice::TrySecondDay,
                    Choice::ReorderGroups,
                    Choice::UseBlockedSeats,
                    Choice::Cancel,
                ],
                default: Choice::TrySecondDay,
            }),
            Stage::ConfirmBlocked => Some(Prompt::confirmation(
                "Use blocked seats",
                format!("Seat {name} on blocked seats on {day}?"),
                "Only the seats actually used will be unblocked.",
            )),
            Stage::ConfirmReorder(groups) => Some(Prompt::confirmation(
                "Reorder groups",
                format!("Move {} group(s) to make room for {name}?", groups.len()),
                describe_groups(self.ctx, groups),
            )),
            Stage::ConfirmPartial(trial) => Some(Prompt::confirmation(
                "Reorder incomplete",
                format!(
                    "{} group(s) could not be reseated on {day}. Proceed anyway?",
                    trial.result.evicted.len()
                ),
                describe_groups(
                    self.ctx,
                    &trial.result.evicted.iter().map(|id| (*id, 0)).collect::<Vec<_>>(),
                ),
            )),
            Stage::Done(_) => None,
        }
    }

    /// Ответ не из списка вариантов считается ответом по умолчанию
    pub fn resume(&mut self, choice: Choice) -> ConflictStep {
        let Some(prompt) = self.prompt() else {
            return ConflictStep::Finished(ConflictOutcome::Cancelled);
        };
        let choice = if prompt.allows(choice) { choice } else { prompt.default };
        let stage = std::mem::replace(&mut self.stage, Stage::Done(ConflictState::Cancelled));

        let outcome = match (stage, choice) {
            (Stage::Choose, Choice::TrySecondDay) => {
                self.stage = Stage::Done(ConflictState::TrySecondDay);
                return ConflictStep::Finished(ConflictOutcome::TrySecondDay);
            }
            (Stage::Choose, Choice::UseBlockedSeats) => {
                self.stage = Stage::ConfirmBlocked;
                return self.pending();
            }
            (Stage::Choose, Choice::ReorderGroups) => match self.find_reorder_groups() {
                Some(groups) => {
                    self.stage = Stage::ConfirmReorder(groups);
                    return self.pending();
                }
                None => ConflictOutcome::Failed("no suitable combination of groups to move".into()),
            },
            (Stage::Choose, _) => ConflictOutcome::Cancelled,

            (Stage::ConfirmBlocked, Choice::Confirm) => self.use_blocked_seats(),
            (Stage::ConfirmReorder(groups), Choice::Confirm) => match self.reorder(&groups) {
                Ok(trial) if trial.result.evicted.is_empty() => ConflictOutcome::Reordered {
                    matrix: trial.matrix,
                    result: trial.result,
                },
                Ok(trial) => {
                    self.stage = Stage::ConfirmPartial(trial);
                    return self.pending();
                }
                Err(reason) => ConflictOutcome::Failed(reason),
            },
            (Stage::ConfirmPartial(trial), Choice::Confirm) => ConflictOutcome::Reordered {
                matrix: trial.matrix,
                result: trial.result,
            },
            (_, _) => ConflictOutcome::Declined,
        };

        let state = match outcome {
            ConflictOutcome::UsedBlockedSeats { .. } | ConflictOutcome::Reordered { .. } => {
                ConflictState::Resolved
            }
            _ => ConflictState::Cancelled,
        };
        self.stage = Stage::Done(state);
        ConflictStep::Finished(outcome)
    }

    fn pending(&self) -> ConflictStep {
        match self.prompt() {
            Some(prompt) => ConflictStep::Pending(prompt),
            None => ConflictStep::Finished(ConflictOutcome::Cancelled),
        }
    }

    fn use_blocked_seats(&self) -> ConflictOutcome {
        let mut work = self.matrix.clone();
        let cleared = work.clear_blocked_flags();
        let Some(result) = try_assign_seats(
            self.ctx,
            &mut work,
            self.guest,
            self.ctx.policy.conflict_trial,
            SearchScope::AllRows,
            None,
        ) else {
            return ConflictOutcome::Failed("guest does not fit even on blocked seats".into());
        };

        // Блокировка снимается только с кресел, которые занял гость
        let block = result.block;
        let unblocked: Vec<BlockedSeat> = cleared
            .iter()
            .filter(|c| c.row == block.row && block.seats().contains(&c.seat))
            .map(|c| BlockedSeat::new(work.day, c.row as u32 + 1, c.seat as u32 + 1, c.reason.clone()))
            .collect();
        work.restore_blocked(&cleared);

        info!(
            "{} seated on {} formerly blocked seat(s)",
            self.guest.full_name(),
            unblocked.len()
        );
        ConflictOutcome::UsedBlockedSeats {
            matrix: work,
            result: SeatingResult::single(PlacementKind::BlockedSeatsUsed { unblocked }, self.guest, block),
        }
    }

    /// Группы, которые можно подвинуть: не VIP, не "вместе", не больше 1.5 запроса;
    /// в свой первый день только маленькие. Сначала те, кто не в свой первый день, затем по размеру.
    fn find_reorder_groups(&self) -> Option<Vec<(GuestId, u32)>> {
        let day = self.matrix.day;
        let limit = self.guest.tickets as f64 * MOVABLE_GROUP_FACTOR;
        let mut groups: Vec<(GuestId, u32, bool)> = self
            .matrix
            .occupants()
            .into_iter()
            .filter_map(|(id, count)| {
                let g = self.ctx.guest(id)?;
                if g.is_vip() || count as f64 > limit || self.matrix.is_together(id) {
                    return None;
                }
                let first_day = g.first_day == day;
                if first_day && count > SMALL_GROUP_ON_FIRST_DAY {
                    return None;
                }
                Some((id, count, first_day))
            })
            .collect();
        groups.sort_by_key(|(_, count, first_day)| (*first_day, *count));
        let groups: Vec<(GuestId, u32)> = groups.into_iter().map(|(id, c, _)| (id, c)).collect();

        let target = self.guest.tickets;
        for max_groups in GROUP_LIMITS {
            let (combination, total) = best_combination(&groups, target, max_groups);
            if !combination.is_empty() && total as f64 >= target as f64 * ACCEPTABLE_SHARE {
                debug!("Reorder candidates for {}: {:?}", self.guest.full_name(), combination);
                return Some(combination);
            }
        }
        None
    }

    fn reorder(&self, groups: &[(GuestId, u32)]) -> Result<ReorderTrial, String> {
        let mut work = self.matrix.clone();
        for (id, _) in groups {
            work.vacate(*id);
        }

        let Some(mut result) = try_assign_seats(
            self.ctx,
            &mut work,
            self.guest,
            self.ctx.policy.conflict_trial,
            SearchScope::AllRows,
            None,
        ) else {
            return Err("guest does not fit after moving the selected groups".into());
        };

        let mut moved = Vec::new();
        let mut evicted = Vec::new();
        for (id, count) in groups {
            let reseated = self.ctx.guest(*id).is_some_and(|g| {
                self.ctx
                    .policy
                    .reorder_reseat
                    .iter()
                    .any(|t| try_normal_seating(self.ctx, &mut work, g, *count, *t, SearchScope::AllRows).is_some())
            });
            if reseated {
                moved.push(*id);
            } else {
                evicted.push(*id);
            }
        }

        result.kind = PlacementKind::Reordered {
            moved,
            evicted: evicted.clone(),
        };
        result.evicted = evicted;
        Ok(ReorderTrial { matrix: work, result })
    }
}

fn describe_groups(ctx: &SeatingContext, groups: &[(GuestId, u32)]) -> String {
    groups
        .iter()
        .map(|(id, count)| match ctx.guest(*id) {
            Some(g) if *count > 0 => format!("{} ({} seats)", g.full_name(), count),
            Some(g) => g.full_name(),
            None => format!("guest {id}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Жадно набирает группы до >= 95% цели не превышая её; иначе лучшее окно
/// подряд идущих групп (до восьми), покрывающее хотя бы 90%
fn best_combination(groups: &[(GuestId, u32)], target: u32, max_groups: usize) -> (Vec<(GuestId, u32)>, u32) {
    let target_f = target as f64;
    for start in 0..groups.len() {
        let mut combination = Vec::new();
        let mut total = 0;
        for group in &groups[start..] {
            if combination.len() >= max_groups {
                break;
            }
            if total + group.1 <= target {
                combination.push(*group);
                total += group.1;
                if total as f64 >= target_f * FIRST_PASS_SHARE {
                    return (combination, total);
                }
            }
        }
    }

    let mut best: &[(GuestId, u32)] = &[];
    let mut best_total = 0;
    'outer: for start in 0..groups.len() {
        let widest = MAX_WINDOW_GROUPS.min(groups.len() - start);
        for width in (1..=widest).rev() {
            let window = &groups[start..start + width];
            let total: u32 = window.iter().map(|g| g.1).sum();
            if total > best_total && total as f64 >= target_f * ACCEPTABLE_SHARE {
                best = window;
                best_total = total;
                if best_total >= target {
                    break 'outer;
                }
            }
        }
    }
    (best.to_vec(), best_total)
}
