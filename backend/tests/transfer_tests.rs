//! Transfer state machine tests
//!
//! Tests for the transfer lifecycle including:
//! - Legal transition matrix
//! - Terminal and editable states
//! - String round-tripping for database storage
//! - Execution deduction and cancellation restock arithmetic

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::sourcing::{plan_draws, AvailableBatch, BatchDraw};
use shared::TransferStatus;

fn batch(qty: i32, exp: Option<&str>, created_secs: i64) -> AvailableBatch {
    AvailableBatch {
        batch_id: Uuid::new_v4(),
        quantity: qty,
        expiration_date: exp.map(|d| d.parse().unwrap()),
        created_at: Utc.timestamp_opt(1_750_000_000 + created_secs, 0).unwrap(),
    }
}

/// Apply execution to the ledger: deduct each draw from its source batch
fn deduct(batches: &mut [AvailableBatch], draws: &[BatchDraw]) {
    for draw in draws {
        if let Some(b) = batches.iter_mut().find(|b| b.batch_id == draw.batch_id) {
            b.quantity -= draw.quantity;
        }
    }
}

/// Reverse an in-transit cancellation: restock each draw into its batch
fn restock(batches: &mut [AvailableBatch], draws: &[BatchDraw]) {
    for draw in draws {
        if let Some(b) = batches.iter_mut().find(|b| b.batch_id == draw.batch_id) {
            b.quantity += draw.quantity;
        }
    }
}

const ALL_STATUSES: [TransferStatus; 5] = [
    TransferStatus::Draft,
    TransferStatus::InTransit,
    TransferStatus::InValidation,
    TransferStatus::Completed,
    TransferStatus::Cancelled,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The happy path: draft -> in_transit -> in_validation -> completed
    #[test]
    fn test_happy_path_transitions() {
        assert!(TransferStatus::Draft.can_transition(TransferStatus::InTransit));
        assert!(TransferStatus::InTransit.can_transition(TransferStatus::InValidation));
        assert!(TransferStatus::InValidation.can_transition(TransferStatus::Completed));
    }

    /// Cancellation is legal from draft and in_transit only
    #[test]
    fn test_cancellation_window() {
        assert!(TransferStatus::Draft.can_transition(TransferStatus::Cancelled));
        assert!(TransferStatus::InTransit.can_transition(TransferStatus::Cancelled));

        assert!(!TransferStatus::InValidation.can_transition(TransferStatus::Cancelled));
        assert!(!TransferStatus::Completed.can_transition(TransferStatus::Cancelled));
        assert!(!TransferStatus::Cancelled.can_transition(TransferStatus::Cancelled));
    }

    /// No skipping stages and no moving backwards
    #[test]
    fn test_no_shortcuts_or_reversals() {
        assert!(!TransferStatus::Draft.can_transition(TransferStatus::InValidation));
        assert!(!TransferStatus::Draft.can_transition(TransferStatus::Completed));
        assert!(!TransferStatus::InTransit.can_transition(TransferStatus::Draft));
        assert!(!TransferStatus::InTransit.can_transition(TransferStatus::Completed));
        assert!(!TransferStatus::InValidation.can_transition(TransferStatus::InTransit));
        assert!(!TransferStatus::Completed.can_transition(TransferStatus::InValidation));
    }

    /// Completed and cancelled admit nothing further
    #[test]
    fn test_terminal_states() {
        for s in [TransferStatus::Completed, TransferStatus::Cancelled] {
            assert!(s.is_terminal());
            for to in ALL_STATUSES {
                assert!(!s.can_transition(to), "{:?} -> {:?}", s, to);
            }
        }
    }

    /// Items can only change while the transfer is a draft
    #[test]
    fn test_editable_only_as_draft() {
        assert!(TransferStatus::Draft.is_editable());
        for s in [
            TransferStatus::InTransit,
            TransferStatus::InValidation,
            TransferStatus::Completed,
            TransferStatus::Cancelled,
        ] {
            assert!(!s.is_editable(), "{:?}", s);
        }
    }

    /// Exactly five transitions are legal
    #[test]
    fn test_transition_matrix_size() {
        let legal = ALL_STATUSES
            .iter()
            .flat_map(|from| ALL_STATUSES.iter().map(move |to| (from, to)))
            .filter(|(from, to)| from.can_transition(**to))
            .count();
        assert_eq!(legal, 5);
    }

    /// Stored strings parse back to the same status
    #[test]
    fn test_status_string_round_trip() {
        for s in ALL_STATUSES {
            assert_eq!(TransferStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(TransferStatus::from_str("shipped"), None);
    }

    /// Cancelling an in-transit transfer restores every source batch to
    /// its pre-execution quantity exactly
    #[test]
    fn test_cancel_restores_pre_execution_quantities() {
        let mut batches = vec![
            batch(5, Some("2026-03-01"), 0),
            batch(5, Some("2026-09-01"), 10),
        ];
        let before = batches.clone();

        let draws = plan_draws(&batches, 7).unwrap();
        deduct(&mut batches, &draws);
        assert_eq!(batches[0].quantity, 0);
        assert_eq!(batches[1].quantity, 3);

        restock(&mut batches, &draws);
        assert_eq!(batches, before);
    }

    /// A plan that cannot be satisfied produces no draws to apply
    #[test]
    fn test_failed_execution_touches_nothing() {
        let batches = vec![
            batch(5, Some("2026-03-01"), 0),
            batch(5, Some("2026-09-01"), 10),
        ];
        let before = batches.clone();

        assert!(plan_draws(&batches, 11).is_err());
        assert_eq!(batches, before);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_status() -> impl Strategy<Value = TransferStatus> {
        prop::sample::select(ALL_STATUSES.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// No status transitions to itself
        #[test]
        fn prop_no_self_transitions(s in arb_status()) {
            prop_assert!(!s.can_transition(s));
        }

        /// Any chain of legal transitions from draft reaches a terminal
        /// state in at most three steps
        #[test]
        fn prop_bounded_lifecycle(choices in prop::collection::vec(0usize..5, 0..8)) {
            let mut current = TransferStatus::Draft;
            let mut steps = 0;
            for c in choices {
                let next = ALL_STATUSES[c];
                if current.can_transition(next) {
                    current = next;
                    steps += 1;
                }
            }
            prop_assert!(steps <= 3);
            if steps == 3 {
                prop_assert!(current.is_terminal());
            }
        }

        /// serde and as_str agree on the wire representation
        #[test]
        fn prop_serde_matches_as_str(s in arb_status()) {
            let json = serde_json::to_string(&s).unwrap();
            prop_assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
    }

    fn arb_batches() -> impl Strategy<Value = Vec<AvailableBatch>> {
        prop::collection::vec(
            (0..100i32, prop::option::of(0u32..1000), 0i64..10_000),
            1..10,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .map(|(quantity, exp_offset, created)| AvailableBatch {
                    batch_id: Uuid::new_v4(),
                    quantity,
                    expiration_date: exp_offset.map(|d| {
                        chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
                            .unwrap()
                            .checked_add_days(chrono::Days::new(d as u64))
                            .unwrap()
                    }),
                    created_at: Utc.timestamp_opt(1_750_000_000 + created, 0).unwrap(),
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Deducting a plan and restocking it is the identity on every
        /// batch quantity, and the deduction never goes negative
        #[test]
        fn prop_deduct_then_restock_is_identity(
            batches in arb_batches(),
            requested in 1..300i32,
        ) {
            if let Ok(draws) = plan_draws(&batches, requested) {
                let before = batches.clone();
                let mut working = batches;

                deduct(&mut working, &draws);
                for b in &working {
                    prop_assert!(b.quantity >= 0);
                }
                let total_before: i64 = before.iter().map(|b| b.quantity as i64).sum();
                let total_after: i64 = working.iter().map(|b| b.quantity as i64).sum();
                prop_assert_eq!(total_before - total_after, requested as i64);

                restock(&mut working, &draws);
                prop_assert_eq!(working, before);
            }
        }
    }
}
