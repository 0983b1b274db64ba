//! Оркестратор: полный прогон рассадки и посадка одного гостя на один день.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;
use validator::Validate;

use super::compaction::try_compact_row;
use super::conflict::{ConflictOutcome, ConflictSession, ConflictStep};
use super::operator::Operator;
use super::placement::{try_assign_seats, PlacementKind, SearchScope, SeatingResult};
use super::policy::{Escalation, PolicyTable};
use super::priority::PriorityMatrix;
use super::together::try_teacher_pair;
use super::SeatingContext;
use crate::error::{SeatingError, Severity};
use crate::models::{Day, DayRank, DaySeating, Guest, GuestId, SeatMatrix, SeatingStatus, Tier};
use crate::store::SeatStore;
use crate::venue::Venue;

/// Итог попытки посадить гостя на конкретный день
#[derive(Debug)]
pub enum Placement {
    Placed(SeatingResult),
    NotPlaced(SeatingError),
    /// Оператор выбрал второй день при конфликте с блокировками
    RetrySecondDay,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedGuest {
    pub guest_id: GuestId,
    pub name: String,
    pub code: &'static str,
    pub severity: Severity,
    pub reason: String,
}

impl UnplacedGuest {
    fn new(guest: &Guest, error: &SeatingError) -> Self {
        Self {
            guest_id: guest.id,
            name: guest.full_name(),
            code: error.code(),
            severity: error.severity(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOccupancy {
    pub day: Day,
    pub assigned: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub placed: usize,
    pub unplaced: Vec<UnplacedGuest>,
    pub days: Vec<DayOccupancy>,
    /// Гости, посаженные не в один из своих дней
    pub off_preference: Vec<GuestId>,
    pub elapsed_ms: u64,
}

enum Step<'g> {
    Single(&'g Guest),
    TeacherPair(&'g Guest, &'g Guest),
}

pub struct SeatingEngine {
    store: Arc<dyn SeatStore>,
    operator: Arc<dyn Operator>,
    venue: Venue,
}

impl SeatingEngine {
    pub fn new(store: Arc<dyn SeatStore>, operator: Arc<dyn Operator>, venue: Venue) -> Self {
        Self { store, operator, venue }
    }

    pub fn store(&self) -> &Arc<dyn SeatStore> {
        &self.store
    }

    /// Настройки из хранилища (проверенные) и предпочтения по переданному списку гостей
    pub async fn context(&self, guests: &[Guest]) -> Result<SeatingContext, SeatingError> {
        let settings = self.store.get_settings().await?;
        settings.validate()?;
        Ok(SeatingContext::new(settings, self.venue.clone(), guests))
    }

    /// Пустые матрицы всех дней с приоритетами и блокировками, обнулённые итоги
    pub async fn reset_days(&self, ctx: &SeatingContext) -> Result<DaySeating, SeatingError> {
        let overrides = self.store.get_priority_overrides().await?;
        let priority = PriorityMatrix::generate(&ctx.venue, &ctx.settings).with_overrides(&overrides);
        let blocked = self.store.get_blocked_seats(None).await?;

        for day in Day::ALL {
            let mut matrix = priority.to_matrix(day, &ctx.venue);
            matrix.paint_blocked(&blocked);
            self.store.set_seats_for_day(&matrix).await?;
        }
        let seating = DaySeating::new(ctx.venue.total_capacity());
        self.store.update_day_assignments(&seating).await?;
        debug!("Reset {} day matrices, {} blocked seats", Day::ALL.len(), blocked.len());
        Ok(seating)
    }

    async fn load_matrix(&self, ctx: &SeatingContext, day: Day) -> Result<SeatMatrix, SeatingError> {
        if let Some(matrix) = self.store.get_seats_for_day(day).await? {
            return Ok(matrix);
        }
        debug!("No stored matrix for {}, starting from an empty hall", day);
        let overrides = self.store.get_priority_overrides().await?;
        let blocked = self.store.get_blocked_seats(Some(day)).await?;
        let mut matrix = PriorityMatrix::generate(&ctx.venue, &ctx.settings)
            .with_overrides(&overrides)
            .to_matrix(day, &ctx.venue);
        matrix.paint_blocked(&blocked);
        Ok(matrix)
    }

    pub async fn place_guest_on_day(
        &self,
        ctx: &SeatingContext,
        guest: &Guest,
        day: Day,
        seating: &mut DaySeating,
    ) -> Result<bool, SeatingError> {
        let placement = self.try_place_guest_on_day(ctx, guest, day, seating).await?;
        Ok(matches!(placement, Placement::Placed(_)))
    }

    /// Одна попытка на один день. Ошибки хранилища пробрасываются,
    /// неудачи самого гостя возвращаются как `Placement::NotPlaced`.
    pub async fn try_place_guest_on_day(
        &self,
        ctx: &SeatingContext,
        guest: &Guest,
        day: Day,
        seating: &mut DaySeating,
    ) -> Result<Placement, SeatingError> {
        if guest.tickets == 0 {
            return Ok(Placement::NotPlaced(SeatingError::InvalidGuest {
                guest: guest.id,
                reason: "ticket count is zero".into(),
            }));
        }
        if !seating.fits(day, guest.tickets) {
            let available = seating.remaining(day);
            warn!(
                "CAPACITY_EXCEEDED: {} needs {} seats on {}, {} left",
                guest.full_name(),
                guest.tickets,
                day,
                available
            );
            return Ok(Placement::NotPlaced(SeatingError::CapacityExceeded {
                day,
                requested: guest.tickets,
                available,
            }));
        }
        if !guest.prefers(day) {
            warn!("{} is placed on {} which is not one of their days", guest.full_name(), day);
        }

        let mut matrix = self.load_matrix(ctx, day).await?;
        if matrix.is_seated(guest.id) || seating.is_placed(guest.id) {
            return Ok(Placement::NotPlaced(SeatingError::InvalidGuest {
                guest: guest.id,
                reason: "already seated".into(),
            }));
        }

        let found = escalate(ctx, &mut matrix, guest, seating)
            .or_else(|| try_compact_row(ctx, &mut matrix, guest, escalation_ceiling(ctx, guest, day)));
        let result = match found {
            Some(result) => result,
            None => match self.resolve_conflict(ctx, &matrix, guest).await {
                Resolution::Placed(resolved, result) => {
                    matrix = resolved;
                    result
                }
                Resolution::RetrySecondDay => return Ok(Placement::RetrySecondDay),
                Resolution::NotPlaced(err) => return Ok(Placement::NotPlaced(err)),
            },
        };

        self.commit(ctx, &matrix, guest, &result, seating).await?;
        Ok(Placement::Placed(result))
    }

    async fn resolve_conflict(&self, ctx: &SeatingContext, matrix: &SeatMatrix, guest: &Guest) -> Resolution {
        let day = matrix.day;
        let Some(mut session) = ConflictSession::detect(ctx, matrix, guest) else {
            return Resolution::NotPlaced(SeatingError::NoSeatsAvailable { guest: guest.id, day });
        };
        warn!("BLOCKED_SEAT_CONFLICT: {} on {}", guest.full_name(), day);

        let Some(mut prompt) = session.prompt() else {
            return Resolution::NotPlaced(SeatingError::BlockedSeatConflict { guest: guest.id, day });
        };
        let outcome = loop {
            let choice = self.operator.choose(&prompt).await;
            match session.resume(choice) {
                ConflictStep::Pending(next) => prompt = next,
                ConflictStep::Finished(outcome) => break outcome,
            }
        };

        match outcome {
            ConflictOutcome::UsedBlockedSeats { matrix, result } | ConflictOutcome::Reordered { matrix, result } => {
                Resolution::Placed(matrix, result)
            }
            ConflictOutcome::TrySecondDay => Resolution::RetrySecondDay,
            ConflictOutcome::Failed(reason) => {
                warn!("Conflict for {} on {} not resolved: {}", guest.full_name(), day, reason);
                Resolution::NotPlaced(SeatingError::BlockedSeatConflict { guest: guest.id, day })
            }
            ConflictOutcome::Cancelled | ConflictOutcome::Declined => {
                info!("Conflict for {} on {} cancelled by operator", guest.full_name(), day);
                Resolution::NotPlaced(SeatingError::BlockedSeatConflict { guest: guest.id, day })
            }
        }
    }

    /// Запись матрицы целиком, итоги дня, снятие использованных блокировок
    async fn commit(
        &self,
        ctx: &SeatingContext,
        matrix: &SeatMatrix,
        guest: &Guest,
        result: &SeatingResult,
        seating: &mut DaySeating,
    ) -> Result<(), SeatingError> {
        let day = matrix.day;
        for (id, seats) in &result.seated {
            seating.record(day, *id, *seats);
        }
        for id in &result.evicted {
            if let Some(seats) = seating.remove(day, *id) {
                warn!("Guest {} lost {} seat(s) on {} during reorder", id, seats, day);
            }
        }
        if let PlacementKind::BlockedSeatsUsed { unblocked } = &result.kind {
            for seat in unblocked {
                self.store.unblock_seat(seat.day, seat.row, seat.seat_number).await?;
            }
        }
        self.store.set_seats_for_day(matrix).await?;

        if result.kind == PlacementKind::Normal && !guest.is_vip() {
            if let Some(pref) = ctx.preferences.for_guest(guest.id).next() {
                let err = SeatingError::PreferenceConflict {
                    guest: guest.id,
                    preferred: pref.preferred,
                };
                warn!("{}: {}", err.code(), err);
            }
        }
        info!(
            "{} ({} tickets) seated on {}, row {}",
            guest.full_name(),
            guest.tickets,
            day,
            result.block.row_number()
        );
        Ok(())
    }

    async fn place_teacher_pair(
        &self,
        ctx: &SeatingContext,
        first: &Guest,
        second: &Guest,
        seating: &mut DaySeating,
    ) -> Result<bool, SeatingError> {
        let mut days = Vec::new();
        if first.first_day == second.first_day {
            days.push(first.first_day);
        }
        for day in first.preferred_days().chain(second.preferred_days()) {
            if first.prefers(day) && second.prefers(day) && !days.contains(&day) {
                days.push(day);
            }
        }

        let total = first.tickets + second.tickets;
        for day in days {
            if !seating.fits(day, total) {
                continue;
            }
            let mut matrix = self.load_matrix(ctx, day).await?;
            if let Some(block) = try_teacher_pair(ctx, &mut matrix, first, second) {
                self.store.set_seats_for_day(&matrix).await?;
                seating.record(day, first.id, first.tickets);
                seating.record(day, second.id, second.tickets);
                info!(
                    "Teachers {} and {} seated together on {}, row {}",
                    first.full_name(),
                    second.full_name(),
                    day,
                    block.row_number()
                );
                return Ok(true);
            }
        }
        debug!(
            "Teacher pair {} / {} falls back to individual seating",
            first.full_name(),
            second.full_name()
        );
        Ok(false)
    }

    /// Первый день, затем второй. Неудача записывается в `unplaced`.
    async fn seat_guest(
        &self,
        ctx: &SeatingContext,
        guest: &Guest,
        seating: &mut DaySeating,
        unplaced: &mut Vec<UnplacedGuest>,
    ) -> Result<(), SeatingError> {
        if seating.is_placed(guest.id) {
            return Ok(());
        }
        let mut days = vec![guest.first_day];
        if let Some(second) = guest.second_day.filter(|d| *d != guest.first_day) {
            days.push(second);
        }

        let mut last_error = None;
        for day in days {
            match self.try_place_guest_on_day(ctx, guest, day, seating).await? {
                Placement::Placed(result) => {
                    for id in &result.evicted {
                        if let Some(evicted) = ctx.guest(*id) {
                            let err = SeatingError::NoSeatsAvailable { guest: *id, day };
                            unplaced.push(UnplacedGuest::new(evicted, &err));
                        }
                    }
                    return Ok(());
                }
                Placement::NotPlaced(err) => last_error = Some(err),
                Placement::RetrySecondDay => {
                    last_error = Some(SeatingError::BlockedSeatConflict { guest: guest.id, day });
                }
            }
        }

        let err = last_error.unwrap_or(SeatingError::NoSeatsAvailable {
            guest: guest.id,
            day: guest.first_day,
        });
        warn!("{} not placed: {} ({})", guest.full_name(), err, err.solution());
        unplaced.push(UnplacedGuest::new(guest, &err));
        Ok(())
    }

    /// Полный прогон по списку гостей. Предыдущая рассадка стирается.
    pub async fn auto_assign_seating(&self, guests: &[Guest]) -> Result<RunSummary, SeatingError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("seating_run", %run_id);
        self.run(run_id, guests).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, guests: &[Guest]) -> Result<RunSummary, SeatingError> {
        let started = Instant::now();
        let ctx = self.context(guests).await?;

        let mut status = SeatingStatus::started(guests.len());
        self.store.set_seating_status(&status).await?;
        let mut seating = self.reset_days(&ctx).await?;
        info!(
            "🎭 Seating run started: {} guests, {} preference edges",
            guests.len(),
            ctx.preferences.len()
        );

        let mut unplaced = Vec::new();
        let (valid, invalid): (Vec<&Guest>, Vec<&Guest>) = guests.iter().partition(|g| g.tickets > 0);
        for guest in invalid {
            let err = SeatingError::InvalidGuest {
                guest: guest.id,
                reason: "ticket count is zero".into(),
            };
            warn!("{}: {}", err.code(), err);
            unplaced.push(UnplacedGuest::new(guest, &err));
        }

        let steps = plan_order(&ctx, &valid);
        for (processed, step) in steps.iter().enumerate() {
            match step {
                Step::Single(guest) => {
                    self.seat_guest(&ctx, guest, &mut seating, &mut unplaced).await?;
                }
                Step::TeacherPair(first, second) => {
                    if !seating.is_placed(first.id) && !seating.is_placed(second.id) {
                        self.place_teacher_pair(&ctx, first, second, &mut seating).await?;
                    }
                }
            }
            status.advance(processed + 1);
            self.store.set_seating_status(&status).await?;
        }

        seating.check().map_err(SeatingError::unknown)?;
        self.store.update_day_assignments(&seating).await?;
        status.finish();
        self.store.set_seating_status(&status).await?;

        // Гость мог попасть в список и позже быть посажен как сосед
        let mut reported = HashSet::new();
        unplaced.retain(|u| !seating.is_placed(u.guest_id) && reported.insert(u.guest_id));

        let mut placed = 0;
        let mut off_preference = Vec::new();
        let mut days = Vec::new();
        for (day, entry) in &seating.days {
            placed += entry.records.len();
            off_preference.extend(
                entry
                    .records
                    .iter()
                    .filter(|r| ctx.guest(r.guest_id).is_some_and(|g| !g.prefers(*day)))
                    .map(|r| r.guest_id),
            );
            days.push(DayOccupancy {
                day: *day,
                assigned: entry.assigned,
                capacity: entry.capacity,
            });
        }

        let summary = RunSummary {
            run_id,
            placed,
            unplaced,
            days,
            off_preference,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        for day in &summary.days {
            info!("{}: {}/{} seats", day.day, day.assigned, day.capacity);
        }
        if !summary.off_preference.is_empty() {
            warn!("{} guest(s) seated outside their days", summary.off_preference.len());
        }
        info!(
            "🏁 Seating run finished in {}ms: {} placed, {} unplaced",
            summary.elapsed_ms,
            summary.placed,
            summary.unplaced.len()
        );
        Ok(summary)
    }
}

enum Resolution {
    Placed(SeatMatrix, SeatingResult),
    RetrySecondDay,
    NotPlaced(SeatingError),
}

/// Лестницы порогов: VIP в свой день сначала в полосе рядов, потом по всему залу,
/// затем все по стандартной лестнице с поправкой на день
fn escalate(
    ctx: &SeatingContext,
    matrix: &mut SeatMatrix,
    guest: &Guest,
    seating: &DaySeating,
) -> Option<SeatingResult> {
    let day = matrix.day;
    let policy = &ctx.policy;

    if guest.is_vip() && guest.prefers(day) {
        let band = SearchScope::vip_band(&ctx.settings);
        for threshold in policy.vip_band.thresholds() {
            if let Some(result) = try_assign_seats(ctx, matrix, guest, threshold, band, Some(seating)) {
                return Some(result);
            }
        }
        for threshold in policy.vip_any.thresholds() {
            if let Some(result) = try_assign_seats(ctx, matrix, guest, threshold, SearchScope::AllRows, Some(seating)) {
                return Some(result);
            }
        }
    }

    let rank = guest.day_rank(day);
    let factor = policy.day_factor(guest, rank);
    for threshold in day_ladder(policy, guest, day).thresholds() {
        let adjusted = threshold * factor;
        if let Some(result) = try_assign_seats(ctx, matrix, guest, adjusted, SearchScope::AllRows, Some(seating)) {
            return Some(result);
        }
    }
    None
}

fn day_ladder<'p>(policy: &'p PolicyTable, guest: &Guest, day: Day) -> &'p Escalation {
    if guest.tier() == Tier::Performer && guest.day_rank(day) == DayRank::First && day == Day::last() {
        &policy.performer_last_day
    } else {
        &policy.standard
    }
}

/// Самый мягкий порог, до которого доходит `escalate` для гостя в этот день,
/// уже с поправкой на категорию. Выше него уплотнение ряда не садит.
fn escalation_ceiling(ctx: &SeatingContext, guest: &Guest, day: Day) -> f64 {
    let policy = &ctx.policy;
    let mut ceiling = day_ladder(policy, guest, day).ceiling().unwrap_or(0.0)
        * policy.day_factor(guest, guest.day_rank(day));
    if guest.is_vip() && guest.prefers(day) {
        ceiling = ceiling.max(policy.vip_any.ceiling().unwrap_or(0.0));
    }
    ceiling * policy.tier_factor(guest.tier())
}

/// Порядок обработки: категории по убыванию, внутри "с предпочтением" раньше "без",
/// взаимные пары преподавателей отдельным шагом. Внутри списка по времени регистрации и id.
fn plan_order<'g>(ctx: &SeatingContext, guests: &[&'g Guest]) -> Vec<Step<'g>> {
    let mut sorted = guests.to_vec();
    sorted.sort_by_key(|g| (g.registered_at, g.id));
    let with_preference = |g: &Guest| ctx.preferences.has_preference(g.id) || g.has_raw_preference();
    let by_id: HashMap<GuestId, &'g Guest> = sorted.iter().map(|g| (g.id, *g)).collect();

    let group = |tier: Tier, preference: bool| -> Vec<Step<'g>> {
        sorted
            .iter()
            .filter(|g| g.tier() == tier && with_preference(**g) == preference)
            .map(|g| Step::Single(*g))
            .collect()
    };

    let mut steps = Vec::with_capacity(sorted.len());
    steps.extend(group(Tier::Honoree, true));
    steps.extend(group(Tier::Honoree, false));
    steps.extend(group(Tier::Performer, true));
    steps.extend(group(Tier::Performer, false));
    for (a, b) in ctx.preferences.teacher_mutual_pairs() {
        if let (Some(first), Some(second)) = (by_id.get(&a), by_id.get(&b)) {
            if first.tier() == Tier::Teacher && second.tier() == Tier::Teacher {
                steps.push(Step::TeacherPair(*first, *second));
            }
        }
    }
    steps.extend(group(Tier::Teacher, true));
    steps.extend(group(Tier::Teacher, false));
    steps.extend(group(Tier::Regular, true));
    steps.extend(group(Tier::Regular, false));
    steps
}
