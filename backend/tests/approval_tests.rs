//! Supply transaction approval tests
//!
//! Tests for the approval workflow including:
//! - pending -> approved and pending -> rejected
//! - Terminal states refuse further decisions
//! - Rejection notes
//! - Subtype and direction rules

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use shared::{
    append_rejection_note, ApprovalError, ApprovalStatus, SupplyTransaction, TransactionSubtype,
    TransactionType,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 14, 0, 0).unwrap()
}

fn pending(notes: Option<&str>) -> SupplyTransaction {
    let created = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();
    SupplyTransaction {
        id: 42,
        supply_id: 3,
        stock_level_id: Some(9),
        transaction_type: TransactionType::Out,
        subtype: TransactionSubtype::Damaged,
        quantity: 4,
        unit_cost: None,
        lot_number: Some("LOT-7".to_string()),
        expiry_date: None,
        notes: notes.map(str::to_string),
        recorded_by: 11,
        approval_status: ApprovalStatus::Pending,
        approved_by: None,
        approved_at: None,
        created_at: created,
        updated_at: created,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Rejecting records the approver and the reason
    #[test]
    fn test_reject_pending_transaction() {
        let mut tx = pending(None);
        tx.reject(7, "damaged", now()).unwrap();

        assert_eq!(tx.approval_status, ApprovalStatus::Rejected);
        assert_eq!(tx.approved_by, Some(7));
        assert_eq!(tx.approved_at, Some(now()));
        assert!(tx.notes.as_deref().unwrap().contains("Rejected: damaged"));
    }

    /// Existing notes are kept in front of the rejection reason
    #[test]
    fn test_reject_appends_to_notes() {
        let mut tx = pending(Some("Box crushed in transit"));
        tx.reject(7, "damaged", now()).unwrap();

        assert_eq!(
            tx.notes.as_deref(),
            Some("Box crushed in transit\nRejected: damaged")
        );
    }

    #[test]
    fn test_approve_pending_transaction() {
        let mut tx = pending(None);
        tx.approve(5, now()).unwrap();

        assert_eq!(tx.approval_status, ApprovalStatus::Approved);
        assert_eq!(tx.approved_by, Some(5));
        assert_eq!(tx.approved_at, Some(now()));
        assert_eq!(tx.updated_at, now());
        assert_eq!(tx.notes, None);
    }

    /// Decisions are final
    #[test]
    fn test_terminal_states() {
        let mut approved = pending(None);
        approved.approve(5, now()).unwrap();
        assert_eq!(
            approved.reject(5, "late", now()),
            Err(ApprovalError::AlreadyDecided(ApprovalStatus::Approved))
        );
        assert_eq!(
            approved.approve(5, now()),
            Err(ApprovalError::AlreadyDecided(ApprovalStatus::Approved))
        );

        let mut rejected = pending(None);
        rejected.reject(5, "count mismatch", now()).unwrap();
        let snapshot = rejected.clone();
        assert_eq!(
            rejected.approve(5, now()),
            Err(ApprovalError::AlreadyDecided(ApprovalStatus::Rejected))
        );
        assert_eq!(rejected, snapshot);
    }

    /// A blank reason is refused and the record stays pending
    #[test]
    fn test_reject_requires_reason() {
        let mut tx = pending(None);
        assert_eq!(tx.reject(7, "   ", now()), Err(ApprovalError::MissingReason));
        assert_eq!(tx.approval_status, ApprovalStatus::Pending);
        assert_eq!(tx.notes, None);
    }

    #[test]
    fn test_rejection_note_formatting() {
        assert_eq!(append_rejection_note(None, "expired"), "Rejected: expired");
        assert_eq!(append_rejection_note(Some(""), "expired"), "Rejected: expired");
        assert_eq!(
            append_rejection_note(Some("Checked by pharmacy\n"), "expired"),
            "Checked by pharmacy\nRejected: expired"
        );
    }

    /// Direction decides the sign of the ledger delta
    #[test]
    fn test_signed_delta() {
        let mut tx = pending(None);
        assert_eq!(tx.signed_delta(), -4);
        tx.transaction_type = TransactionType::In;
        assert_eq!(tx.signed_delta(), 4);
    }

    #[test]
    fn test_subtype_direction_rules() {
        assert!(TransactionSubtype::Received.allowed_for(TransactionType::In));
        assert!(!TransactionSubtype::Received.allowed_for(TransactionType::Out));
        assert!(TransactionSubtype::Consumed.allowed_for(TransactionType::Out));
        assert!(!TransactionSubtype::Consumed.allowed_for(TransactionType::In));
        assert!(TransactionSubtype::Adjustment.allowed_for(TransactionType::In));
        assert!(TransactionSubtype::Adjustment.allowed_for(TransactionType::Out));
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApprovalStatus::parse("cancelled"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum Decision {
        Approve(i64),
        Reject(i64, String),
    }

    fn decision_strategy() -> impl Strategy<Value = Decision> {
        prop_oneof![
            (1i64..100).prop_map(Decision::Approve),
            (1i64..100, "[a-z]{1,20}").prop_map(|(id, r)| Decision::Reject(id, r)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Only the first decision sticks; status never returns to pending
        #[test]
        fn prop_first_decision_wins(
            decisions in prop::collection::vec(decision_strategy(), 1..10)
        ) {
            let mut tx = pending(None);
            let mut applied = 0;

            for decision in &decisions {
                let result = match decision {
                    Decision::Approve(id) => tx.approve(*id, now()),
                    Decision::Reject(id, reason) => tx.reject(*id, reason, now()),
                };
                if result.is_ok() {
                    applied += 1;
                }
                prop_assert_ne!(tx.approval_status, ApprovalStatus::Pending);
            }

            prop_assert_eq!(applied, 1);
            let expected = match &decisions[0] {
                Decision::Approve(_) => ApprovalStatus::Approved,
                Decision::Reject(_, _) => ApprovalStatus::Rejected,
            };
            prop_assert_eq!(tx.approval_status, expected);
        }
    }
}
