//! Movement lifecycle tests
//!
//! Tests for movement types and status transitions including:
//! - Inbound/outbound classification
//! - Pending-only execution and cancellation
//! - String round-tripping for database storage

use proptest::prelude::*;

use shared::{MovementStatus, MovementType};

const ALL_TYPES: [MovementType; 6] = [
    MovementType::Entry,
    MovementType::Exit,
    MovementType::AdjustmentIn,
    MovementType::AdjustmentOut,
    MovementType::TransferExecute,
    MovementType::TransferReceive,
];

const ALL_STATUSES: [MovementStatus; 3] = [
    MovementStatus::Pending,
    MovementStatus::Completed,
    MovementStatus::Cancelled,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Every movement type is either inbound or outbound, never both
    #[test]
    fn test_direction_partition() {
        for t in ALL_TYPES {
            assert_ne!(t.is_inbound(), t.is_outbound(), "{:?}", t);
        }
    }

    /// Entries, inbound adjustments and transfer receipts grow stock
    #[test]
    fn test_inbound_types() {
        assert!(MovementType::Entry.is_inbound());
        assert!(MovementType::AdjustmentIn.is_inbound());
        assert!(MovementType::TransferReceive.is_inbound());

        assert!(MovementType::Exit.is_outbound());
        assert!(MovementType::AdjustmentOut.is_outbound());
        assert!(MovementType::TransferExecute.is_outbound());
    }

    /// Only the transfer engine's audit types are transfer movements
    #[test]
    fn test_transfer_audit_types() {
        assert!(MovementType::TransferExecute.is_transfer_audit());
        assert!(MovementType::TransferReceive.is_transfer_audit());
        assert!(!MovementType::Entry.is_transfer_audit());
        assert!(!MovementType::Exit.is_transfer_audit());
        assert!(!MovementType::AdjustmentIn.is_transfer_audit());
        assert!(!MovementType::AdjustmentOut.is_transfer_audit());
    }

    /// Only pending movements can be executed or cancelled
    #[test]
    fn test_pending_only_transitions() {
        assert!(MovementStatus::Pending.can_execute());
        assert!(MovementStatus::Pending.can_cancel());
        assert!(!MovementStatus::Pending.is_terminal());

        for s in [MovementStatus::Completed, MovementStatus::Cancelled] {
            assert!(!s.can_execute());
            assert!(!s.can_cancel());
            assert!(s.is_terminal());
        }
    }

    /// Stored strings are snake_case and parse back to the same value
    #[test]
    fn test_type_string_round_trip() {
        for t in ALL_TYPES {
            let s = t.as_str();
            assert!(s.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
            assert_eq!(MovementType::from_str(s), Some(t));
        }
        assert_eq!(MovementType::from_str("teleport"), None);
    }

    #[test]
    fn test_status_string_round_trip() {
        for s in ALL_STATUSES {
            assert_eq!(MovementStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(MovementStatus::from_str("limbo"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_type() -> impl Strategy<Value = MovementType> {
        prop::sample::select(ALL_TYPES.to_vec())
    }

    fn arb_status() -> impl Strategy<Value = MovementStatus> {
        prop::sample::select(ALL_STATUSES.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// serde and as_str agree on the wire representation
        #[test]
        fn prop_serde_matches_as_str(t in arb_type()) {
            let json = serde_json::to_string(&t).unwrap();
            prop_assert_eq!(json, format!("\"{}\"", t.as_str()));
        }

        /// A terminal status admits no further action
        #[test]
        fn prop_terminal_statuses_are_frozen(s in arb_status()) {
            if s.is_terminal() {
                prop_assert!(!s.can_execute());
                prop_assert!(!s.can_cancel());
            } else {
                prop_assert!(s.can_execute() && s.can_cancel());
            }
        }

        /// Unknown strings never parse
        #[test]
        fn prop_unknown_strings_rejected(s in "[A-Z]{1,12}") {
            prop_assert_eq!(MovementType::from_str(&s), None);
            prop_assert_eq!(MovementStatus::from_str(&s), None);
        }
    }
}
