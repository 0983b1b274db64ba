mod common;

use std::sync::Arc;

use common::{front_row_settings, guest, harness};
use seat_planner::config::OperatorPolicy;
use seat_planner::models::{BlockedSeat, Day, Settings};
use seat_planner::seating::{
    Choice, PlacementKind, Placement, PolicyOperator, PriorityOverrides, ScriptedOperator, SeatBlock,
};
use seat_planner::venue::{RowLayout, Venue};

fn cancel() -> Arc<PolicyOperator> {
    Arc::new(PolicyOperator::new(OperatorPolicy::Cancel))
}

/// Первые `seats` кресел первого ряда с одинаковым приоритетом
fn flat_front_row(seats: u32, priority: f64) -> PriorityOverrides {
    PriorityOverrides::from([(1, (1..=seats).map(|s| (s, priority)).collect())])
}

#[tokio::test]
async fn two_pairs_fill_a_single_row() {
    let h = harness(vec![RowLayout::ground(4)], front_row_settings(), cancel()).await;
    let guests = vec![guest(1, 2, Day::Wednesday, 0), guest(2, 2, Day::Wednesday, 1)];

    let summary = h.engine.auto_assign_seating(&guests).await.unwrap();

    assert_eq!(summary.placed, 2);
    assert!(summary.unplaced.is_empty());
    let seating = h.store.get_day_assignments().await.unwrap().unwrap();
    let wednesday = seating.day(Day::Wednesday).unwrap();
    assert_eq!((wednesday.assigned, wednesday.capacity), (4, 4));

    let matrix = h.store.get_seats_for_day(Day::Wednesday).await.unwrap().unwrap();
    assert!(matrix.rows[0].seats.iter().all(|s| s.occupant.is_some()));
    let status = h.store.get_seating_status().await.unwrap();
    assert!(status.is_done);
    assert_eq!(status.processed_guests, 2);
}

#[tokio::test]
async fn capacity_shortfall_returns_false_without_mutation() {
    let h = harness(vec![RowLayout::ground(3)], front_row_settings(), cancel()).await;
    let first = guest(1, 2, Day::Wednesday, 0);
    let second = guest(2, 2, Day::Wednesday, 1);
    let roster = vec![first.clone(), second.clone()];

    let ctx = h.engine.context(&roster).await.unwrap();
    let mut seating = h.engine.reset_days(&ctx).await.unwrap();
    assert!(h.engine.place_guest_on_day(&ctx, &first, Day::Wednesday, &mut seating).await.unwrap());

    let matrix_before = h.store.get_seats_for_day(Day::Wednesday).await.unwrap();
    let seating_before = seating.clone();

    let placement = h
        .engine
        .try_place_guest_on_day(&ctx, &second, Day::Wednesday, &mut seating)
        .await
        .unwrap();
    match placement {
        Placement::NotPlaced(err) => assert_eq!(err.code(), "CAPACITY_EXCEEDED"),
        other => panic!("unexpected placement {other:?}"),
    }
    assert_eq!(seating, seating_before);
    assert_eq!(h.store.get_seats_for_day(Day::Wednesday).await.unwrap(), matrix_before);
}

#[tokio::test]
async fn one_directional_preference_seats_guests_side_by_side() {
    let h = harness(
        vec![RowLayout::ground(6), RowLayout::ground(6)],
        front_row_settings(),
        cancel(),
    )
    .await;
    let mut a = guest(1, 2, Day::Wednesday, 0);
    a.student_number = Some(100);
    a.preferred_student = Some("200".into());
    let mut b = guest(2, 2, Day::Wednesday, 1);
    b.student_number = Some(200);
    b.preferred_student = Some("300".into());
    let mut c = guest(3, 2, Day::Wednesday, 2);
    c.student_number = Some(300);

    let summary = h.engine.auto_assign_seating(&[a, b, c]).await.unwrap();
    assert_eq!(summary.placed, 3);

    let matrix = h.store.get_seats_for_day(Day::Wednesday).await.unwrap().unwrap();
    let block_a = matrix.locate(1).unwrap();
    let block_b = matrix.locate(2).unwrap();
    assert_eq!(block_a.row, block_b.row);
    assert!(block_a.end() == block_b.start || block_b.end() == block_a.start);
    assert!(!matrix.is_together(1));
    assert!(!matrix.is_together(2));
}

#[tokio::test]
async fn mutual_pair_is_marked_together() {
    let h = harness(
        vec![RowLayout::ground(8), RowLayout::ground(8)],
        front_row_settings(),
        cancel(),
    )
    .await;
    let mut a = guest(1, 2, Day::Thursday, 0);
    a.student_number = Some(10);
    a.preferred_student = Some("20".into());
    let mut b = guest(2, 3, Day::Thursday, 1);
    b.student_number = Some(20);
    b.preferred_student = Some("10".into());

    h.engine.auto_assign_seating(&[a, b]).await.unwrap();

    let matrix = h.store.get_seats_for_day(Day::Thursday).await.unwrap().unwrap();
    let block_a = matrix.locate(1).unwrap();
    let block_b = matrix.locate(2).unwrap();
    assert_eq!(block_a.row, block_b.row);
    assert!(block_a.end() == block_b.start || block_b.end() == block_a.start);
    assert!(matrix.is_together(1));
    assert!(matrix.is_together(2));
}

#[tokio::test]
async fn honoree_on_second_day_falls_back_to_balcony() {
    let h = harness(
        vec![RowLayout::ground(2), RowLayout::balcony(4)],
        front_row_settings(),
        cancel(),
    )
    .await;
    let regular = guest(1, 2, Day::Thursday, 0);
    let mut honoree = guest(2, 2, Day::Wednesday, 1);
    honoree.is_honoree = true;
    honoree.second_day = Some(Day::Thursday);
    let roster = vec![regular.clone(), honoree.clone()];

    let ctx = h.engine.context(&roster).await.unwrap();
    let mut seating = h.engine.reset_days(&ctx).await.unwrap();
    assert!(h.engine.place_guest_on_day(&ctx, &regular, Day::Thursday, &mut seating).await.unwrap());
    assert!(h.engine.place_guest_on_day(&ctx, &honoree, Day::Thursday, &mut seating).await.unwrap());

    let matrix = h.store.get_seats_for_day(Day::Thursday).await.unwrap().unwrap();
    let block = matrix.locate(2).unwrap();
    assert!(matrix.rows[block.row].balcony);
    assert_eq!(seating.day(Day::Thursday).unwrap().assigned, 4);
}

async fn blocked_row_harness(
    operator: Arc<dyn seat_planner::seating::Operator>,
) -> (common::Harness, Vec<seat_planner::models::Guest>) {
    let h = harness(vec![RowLayout::ground(4)], front_row_settings(), operator).await;
    h.store
        .block_seat(BlockedSeat::new(Day::Wednesday, 1, 2, Some("camera".into())))
        .await
        .unwrap();
    // [ G2 B G1 G1 ] и третьему гостю остаётся только заблокированное кресло
    let guests = vec![
        guest(1, 2, Day::Wednesday, 0),
        guest(2, 1, Day::Wednesday, 1),
        guest(3, 1, Day::Wednesday, 2),
    ];
    (h, guests)
}

#[tokio::test]
async fn blocked_seat_stays_empty_when_operator_cancels() {
    let (h, guests) = blocked_row_harness(cancel()).await;

    let summary = h.engine.auto_assign_seating(&guests).await.unwrap();

    assert_eq!(summary.placed, 2);
    assert_eq!(summary.unplaced.len(), 1);
    assert_eq!(summary.unplaced[0].guest_id, 3);
    assert_eq!(summary.unplaced[0].code, "BLOCKED_SEAT_CONFLICT");

    let matrix = h.store.get_seats_for_day(Day::Wednesday).await.unwrap().unwrap();
    let seat = &matrix.rows[0].seats[1];
    assert!(seat.blocked);
    assert!(seat.occupant.is_none());
    assert_eq!(h.store.get_blocked_seats(Some(Day::Wednesday)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_conflict_leaves_matrix_untouched() {
    let operator = Arc::new(ScriptedOperator::new([Choice::Cancel]));
    let (h, guests) = blocked_row_harness(operator.clone()).await;

    let ctx = h.engine.context(&guests).await.unwrap();
    let mut seating = h.engine.reset_days(&ctx).await.unwrap();
    for g in &guests[..2] {
        assert!(h.engine.place_guest_on_day(&ctx, g, Day::Wednesday, &mut seating).await.unwrap());
    }
    let before = h.store.get_seats_for_day(Day::Wednesday).await.unwrap();
    let seating_before = seating.clone();

    let placed = h
        .engine
        .place_guest_on_day(&ctx, &guests[2], Day::Wednesday, &mut seating)
        .await
        .unwrap();

    assert!(!placed);
    assert_eq!(h.store.get_seats_for_day(Day::Wednesday).await.unwrap(), before);
    assert_eq!(seating, seating_before);
    assert_eq!(operator.prompts().await.len(), 1);
}

#[tokio::test]
async fn force_use_unblocks_only_the_consumed_seat() {
    let operator = Arc::new(ScriptedOperator::new([Choice::UseBlockedSeats, Choice::Confirm]));
    let (h, guests) = blocked_row_harness(operator.clone()).await;
    h.store
        .block_seat(BlockedSeat::new(Day::Thursday, 1, 1, None))
        .await
        .unwrap();

    let summary = h.engine.auto_assign_seating(&guests).await.unwrap();

    assert_eq!(summary.placed, 3);
    let matrix = h.store.get_seats_for_day(Day::Wednesday).await.unwrap().unwrap();
    let seat = &matrix.rows[0].seats[1];
    assert_eq!(seat.occupant, Some(3));
    assert!(!seat.blocked);

    let remaining = h.store.get_blocked_seats(None).await.unwrap();
    assert_eq!(remaining, vec![BlockedSeat::new(Day::Thursday, 1, 1, None)]);
    assert_eq!(operator.prompts().await.len(), 2);
}

#[tokio::test]
async fn second_day_choice_moves_guest_to_the_other_day() {
    let operator = Arc::new(ScriptedOperator::new([Choice::TrySecondDay]));
    let (h, mut guests) = blocked_row_harness(operator).await;
    guests[2].second_day = Some(Day::Friday);

    let summary = h.engine.auto_assign_seating(&guests).await.unwrap();

    assert_eq!(summary.placed, 3);
    let seating = h.store.get_day_assignments().await.unwrap().unwrap();
    assert_eq!(seating.placed_day(3), Some(Day::Friday));
    assert!(summary.off_preference.is_empty());
}

#[tokio::test]
async fn repeated_runs_produce_identical_matrices() {
    let settings = Settings::default();
    let h = harness(Venue::theater().rows().to_vec(), settings, cancel()).await;
    h.store
        .block_seat(BlockedSeat::new(Day::Friday, 4, 10, Some("sound desk".into())))
        .await
        .unwrap();

    let days = [Day::Wednesday, Day::Thursday, Day::Friday];
    let mut guests = Vec::new();
    for id in 1..=60 {
        let mut g = guest(id, (id % 5 + 1) as u32, days[id as usize % 3], id as u32);
        g.second_day = Some(days[(id as usize + 1) % 3]);
        g.student_number = Some(1000 + id);
        if id % 7 == 0 {
            g.preferred_student = Some((1000 + id - 1).to_string());
        }
        g.is_performer = id % 11 == 0;
        g.is_teacher = id % 13 == 0;
        guests.push(g);
    }

    h.engine.auto_assign_seating(&guests).await.unwrap();
    let mut first = Vec::new();
    for day in days {
        first.push(h.store.get_seats_for_day(day).await.unwrap());
    }
    let totals = h.store.get_day_assignments().await.unwrap();

    h.engine.auto_assign_seating(&guests).await.unwrap();
    for (day, matrix) in days.iter().zip(first) {
        assert_eq!(h.store.get_seats_for_day(*day).await.unwrap(), matrix);
    }
    assert_eq!(h.store.get_day_assignments().await.unwrap(), totals);
}

#[tokio::test]
async fn zero_tickets_is_reported_as_invalid() {
    let h = harness(vec![RowLayout::ground(4)], front_row_settings(), cancel()).await;
    let guests = vec![guest(1, 0, Day::Friday, 0), guest(2, 1, Day::Friday, 1)];

    let summary = h.engine.auto_assign_seating(&guests).await.unwrap();

    assert_eq!(summary.placed, 1);
    assert_eq!(summary.unplaced.len(), 1);
    assert_eq!(summary.unplaced[0].code, "INVALID_GUEST");
}

#[tokio::test]
async fn invalid_settings_abort_the_run() {
    let settings = Settings {
        ideal_row_start: 5,
        ideal_row_end: 2,
        ..Settings::default()
    };
    let h = harness(vec![RowLayout::ground(4)], settings, cancel()).await;

    let err = h
        .engine
        .auto_assign_seating(&[guest(1, 1, Day::Friday, 0)])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_SETTINGS");
}

#[tokio::test]
async fn relocation_result_records_both_guests() {
    let h = harness(vec![RowLayout::ground(6)], front_row_settings(), cancel()).await;
    let mut a = guest(1, 2, Day::Friday, 0);
    a.student_number = Some(1);
    a.preferred_student = Some("2".into());
    let mut b = guest(2, 1, Day::Friday, 5);
    b.student_number = Some(2);
    let roster = vec![a.clone(), b];

    let ctx = h.engine.context(&roster).await.unwrap();
    let mut seating = h.engine.reset_days(&ctx).await.unwrap();
    let placement = h
        .engine
        .try_place_guest_on_day(&ctx, &a, Day::Friday, &mut seating)
        .await
        .unwrap();

    let Placement::Placed(result) = placement else {
        panic!("expected placement")
    };
    assert!(matches!(result.kind, PlacementKind::Relocated { preferred: 2, .. }));
    assert_eq!(seating.day(Day::Friday).unwrap().assigned, 3);
    assert!(seating.is_placed(2));
}

#[tokio::test]
async fn guest_above_first_day_ceiling_moves_to_second_day() {
    let h = harness(vec![RowLayout::ground(10)], front_row_settings(), cancel()).await;
    // 15 дороже потолка первого дня (19 * 0.6) и дешевле второго (19 * 1.5)
    h.store.set_priority_overrides(&flat_front_row(10, 15.0)).await.unwrap();
    let mut g = guest(1, 2, Day::Wednesday, 0);
    g.second_day = Some(Day::Thursday);

    let summary = h.engine.auto_assign_seating(&[g]).await.unwrap();

    assert_eq!(summary.placed, 1);
    let seating = h.store.get_day_assignments().await.unwrap().unwrap();
    assert_eq!(seating.placed_day(1), Some(Day::Thursday));
    let wednesday = h.store.get_seats_for_day(Day::Wednesday).await.unwrap().unwrap();
    assert_eq!(wednesday.locate(1), None);
}

#[tokio::test]
async fn confirmed_partial_reorder_reports_evicted_group() {
    let operator = Arc::new(ScriptedOperator::new([
        Choice::TrySecondDay,
        Choice::ReorderGroups,
        Choice::Confirm,
        Choice::Confirm,
    ]));
    let h = harness(vec![RowLayout::ground(5)], front_row_settings(), operator.clone()).await;
    h.store.set_priority_overrides(&flat_front_row(4, 15.0)).await.unwrap();
    h.store
        .block_seat(BlockedSeat::new(Day::Wednesday, 1, 5, None))
        .await
        .unwrap();
    for seat in 1..=5 {
        h.store
            .block_seat(BlockedSeat::new(Day::Thursday, 1, seat, None))
            .await
            .unwrap();
    }
    // R уходит со своего заблокированного четверга на среду: [. R R . B].
    // N в свой первый день не укладывается в порог, перестановка сажает его
    // на место R, а самого R пересадить некуда.
    let mut mover = guest(1, 2, Day::Thursday, 0);
    mover.second_day = Some(Day::Wednesday);
    let newcomer = guest(2, 2, Day::Wednesday, 1);

    let summary = h.engine.auto_assign_seating(&[mover, newcomer]).await.unwrap();

    assert_eq!(summary.placed, 1);
    assert_eq!(summary.unplaced.len(), 1);
    assert_eq!(summary.unplaced[0].guest_id, 1);
    assert_eq!(summary.unplaced[0].code, "NO_SEATS_AVAILABLE");

    let seating = h.store.get_day_assignments().await.unwrap().unwrap();
    assert!(seating.check().is_ok());
    assert!(!seating.is_placed(1));
    assert_eq!(seating.day(Day::Wednesday).unwrap().assigned, 2);

    let matrix = h.store.get_seats_for_day(Day::Wednesday).await.unwrap().unwrap();
    assert_eq!(matrix.locate(2), Some(SeatBlock::new(0, 1, 2)));
    assert_eq!(matrix.locate(1), None);
    assert!(matrix.rows[0].seats[4].blocked);
    assert_eq!(operator.prompts().await.len(), 4);
}
