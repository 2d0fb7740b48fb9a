//! Appointment request tests
//!
//! Tests for the pending appointment workflow including:
//! - Slot validation
//! - Approval and decline transitions
//! - Admin event payloads

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use shared::{
    validate_requested_slot, AdminEvent, AppointmentError, EventEnvelope, PendingAppointment,
    PendingStatus, TransactionType,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn request() -> PendingAppointment {
    PendingAppointment {
        id: 8,
        patient_id: 21,
        specialist_id: 4,
        requested_date: date(2024, 6, 20),
        requested_time: time(14, 0),
        reason: Some("Follow-up".to_string()),
        status: PendingStatus::Pending,
        decided_by: None,
        decided_at: None,
        decline_reason: None,
        appointment_id: None,
        created_at: now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_slot_must_be_in_future() {
        assert!(validate_requested_slot(date(2024, 6, 15), time(10, 0), now()).is_ok());
        assert_eq!(
            validate_requested_slot(date(2024, 6, 15), time(9, 30), now()),
            Err(AppointmentError::SlotInPast)
        );
        assert_eq!(
            validate_requested_slot(date(2024, 6, 14), time(16, 0), now()),
            Err(AppointmentError::SlotInPast)
        );
    }

    #[test]
    fn test_scheduled_at() {
        assert_eq!(
            request().scheduled_at(),
            Utc.with_ymd_and_hms(2024, 6, 20, 14, 0, 0).unwrap()
        );
    }

    /// Approval links the created appointment
    #[test]
    fn test_approve_links_appointment() {
        let mut req = request();
        req.approve(1, 300, now()).unwrap();

        assert_eq!(req.status, PendingStatus::Approved);
        assert_eq!(req.decided_by, Some(1));
        assert_eq!(req.decided_at, Some(now()));
        assert_eq!(req.appointment_id, Some(300));
    }

    #[test]
    fn test_decline_records_reason() {
        let mut req = request();
        req.decline(1, "  Specialist on leave ", now()).unwrap();

        assert_eq!(req.status, PendingStatus::Declined);
        assert_eq!(req.decline_reason.as_deref(), Some("Specialist on leave"));
        assert_eq!(req.appointment_id, None);
    }

    /// Only pending requests can be decided
    #[test]
    fn test_decisions_are_final() {
        let mut req = request();
        req.decline(1, "Fully booked", now()).unwrap();

        assert_eq!(
            req.approve(1, 301, now()),
            Err(AppointmentError::AlreadyDecided(PendingStatus::Declined))
        );
        assert_eq!(req.appointment_id, None);

        let mut approved = request();
        approved.approve(1, 302, now()).unwrap();
        assert_eq!(
            approved.decline(1, "Changed mind", now()),
            Err(AppointmentError::AlreadyDecided(PendingStatus::Approved))
        );
    }

    #[test]
    fn test_decline_requires_reason() {
        let mut req = request();
        assert_eq!(req.decline(1, "", now()), Err(AppointmentError::MissingReason));
        assert_eq!(req.status, PendingStatus::Pending);
    }

    /// Webhook payload carries the event tag and its fields at the top level
    #[test]
    fn test_event_envelope_shape() {
        let event = AdminEvent::AppointmentRequested {
            pending_appointment_id: 8,
            patient_name: "Jose Rizal".to_string(),
            requested_date: date(2024, 6, 20),
        };
        assert_eq!(event.entity(), ("pending_appointment", 8));

        let json = serde_json::to_value(EventEnvelope::new(event, now())).unwrap();
        assert_eq!(json["event"], "appointment_requested");
        assert_eq!(json["pending_appointment_id"], 8);
        assert_eq!(json["title"], "New appointment request");
        assert!(json["message"].as_str().unwrap().contains("Jose Rizal"));
    }

    #[test]
    fn test_transaction_event_message() {
        let event = AdminEvent::TransactionAwaitingApproval {
            transaction_id: 42,
            supply_name: "Nitrile gloves".to_string(),
            transaction_type: TransactionType::Out,
            quantity: 4,
        };

        assert_eq!(event.kind(), "transaction_awaiting_approval");
        assert_eq!(event.entity(), ("supply_transaction", 42));
        assert!(event.message().contains("#42"));
    }
}
