//! Инварианты полного прогона на случайных списках гостей:
//!
//! - итоги дня равны сумме записей и не превышают вместимость;
//! - каждый гость занимает один непрерывный блок в одном дне;
//! - матрицы и итоги описывают одних и тех же гостей с тем же числом мест;
//! - заблокированное кресло всегда пустое;
//! - каждый гость либо посажен, либо есть в списке непосаженных.

mod common;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use common::{guest, harness};
use seat_planner::config::OperatorPolicy;
use seat_planner::models::{BlockedSeat, Day, Guest, GuestId, Settings};
use seat_planner::seating::PolicyOperator;
use seat_planner::venue::RowLayout;

#[derive(Debug, Clone)]
struct GuestSpec {
    tickets: u32,
    first: usize,
    second: Option<usize>,
    tier: u8,
    prefers: Option<i64>,
}

fn guest_strategy() -> impl Strategy<Value = GuestSpec> {
    (1u32..=4, 0usize..3, proptest::option::of(0usize..3), 0u8..8, proptest::option::of(1i64..=14))
        .prop_map(|(tickets, first, second, tier, prefers)| GuestSpec {
            tickets,
            first,
            second,
            tier,
            prefers,
        })
}

fn blocked_strategy() -> impl Strategy<Value = Vec<(usize, u32, u32)>> {
    proptest::collection::vec((0usize..3, 1u32..=4, 1u32..=6), 0..5)
}

fn policy_strategy() -> impl Strategy<Value = OperatorPolicy> {
    prop_oneof![
        Just(OperatorPolicy::Cancel),
        Just(OperatorPolicy::SecondDay),
        Just(OperatorPolicy::UseBlocked),
        Just(OperatorPolicy::Reorder),
    ]
}

fn roster(specs: &[GuestSpec]) -> Vec<Guest> {
    specs
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let id = idx as GuestId + 1;
            let mut g = guest(id, spec.tickets, Day::ALL[spec.first], idx as u32);
            g.second_day = spec.second.map(|d| Day::ALL[d]);
            g.student_number = Some(100 + id);
            match spec.tier {
                0 => g.is_honoree = true,
                1 => g.is_performer = true,
                2 => {
                    g.is_teacher = true;
                    g.email = Some(format!("t{id}@school.nl"));
                    g.preferred_emails = spec.prefers.map(|p| format!("t{p}@school.nl"));
                }
                _ => {}
            }
            if !g.is_teacher {
                g.preferred_student = spec.prefers.map(|p| (100 + p).to_string());
            }
            g
        })
        .collect()
}

fn small_hall() -> Vec<RowLayout> {
    vec![
        RowLayout::ground(6),
        RowLayout::ground(6),
        RowLayout::ground(6),
        RowLayout::balcony(6),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn full_run_keeps_matrices_and_totals_consistent(
        specs in proptest::collection::vec(guest_strategy(), 1..14),
        blocked in blocked_strategy(),
        policy in policy_strategy(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let guests = roster(&specs);

        let (summary, matrices, seating) = runtime.block_on(async {
            let settings = Settings { ideal_row_start: 1, ideal_row_end: 2, ..Settings::default() };
            let h = harness(small_hall(), settings, Arc::new(PolicyOperator::new(policy))).await;
            for (day, row, seat) in &blocked {
                h.store
                    .block_seat(BlockedSeat::new(Day::ALL[*day], *row, *seat, None))
                    .await
                    .unwrap();
            }
            let summary = h.engine.auto_assign_seating(&guests).await.unwrap();
            let mut matrices = Vec::new();
            for day in Day::ALL {
                matrices.push(h.store.get_seats_for_day(day).await.unwrap().unwrap());
            }
            let seating = h.store.get_day_assignments().await.unwrap().unwrap();
            (summary, matrices, seating)
        });

        prop_assert!(seating.check().is_ok(), "{:?}", seating.check());

        let mut seen_days: HashSet<GuestId> = HashSet::new();
        for matrix in &matrices {
            let occupants = matrix.occupants();
            let recorded: BTreeMap<GuestId, u32> = seating
                .day(matrix.day)
                .map(|d| d.records.iter().map(|r| (r.guest_id, r.seats)).collect())
                .unwrap_or_default();
            prop_assert_eq!(&occupants, &recorded, "day {}", matrix.day);

            for (id, count) in &occupants {
                prop_assert!(seen_days.insert(*id), "guest {} seated on two days", id);
                let block = matrix.locate(*id).unwrap();
                prop_assert_eq!(block.len as u32, *count, "guest {} split on {}", id, matrix.day);
            }

            for seat in matrix.rows.iter().flat_map(|r| r.seats.iter()) {
                prop_assert!(!(seat.blocked && seat.occupant.is_some()));
            }
        }

        prop_assert_eq!(summary.placed + summary.unplaced.len(), guests.len());
    }
}
