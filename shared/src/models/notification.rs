//! Events pushed to clinic administrators

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransactionType;

/// Something an administrator should look at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AdminEvent {
    TransactionAwaitingApproval {
        transaction_id: i64,
        supply_name: String,
        transaction_type: TransactionType,
        quantity: i32,
    },
    AppointmentRequested {
        pending_appointment_id: i64,
        patient_name: String,
        requested_date: NaiveDate,
    },
}

impl AdminEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AdminEvent::TransactionAwaitingApproval { .. } => "transaction_awaiting_approval",
            AdminEvent::AppointmentRequested { .. } => "appointment_requested",
        }
    }

    pub fn title(&self) -> String {
        match self {
            AdminEvent::TransactionAwaitingApproval { .. } => {
                "Supply transaction awaiting approval".to_string()
            }
            AdminEvent::AppointmentRequested { .. } => "New appointment request".to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AdminEvent::TransactionAwaitingApproval {
                transaction_id,
                supply_name,
                transaction_type,
                quantity,
            } => format!(
                "Transaction #{} ({} {} x {}) needs review",
                transaction_id,
                transaction_type.as_str(),
                quantity,
                supply_name
            ),
            AdminEvent::AppointmentRequested {
                pending_appointment_id,
                patient_name,
                requested_date,
            } => format!(
                "{} requested an appointment on {} (request #{})",
                patient_name,
                requested_date.format("%Y-%m-%d"),
                pending_appointment_id
            ),
        }
    }

    /// Entity the notification links to
    pub fn entity(&self) -> (&'static str, i64) {
        match self {
            AdminEvent::TransactionAwaitingApproval { transaction_id, .. } => {
                ("supply_transaction", *transaction_id)
            }
            AdminEvent::AppointmentRequested {
                pending_appointment_id,
                ..
            } => ("pending_appointment", *pending_appointment_id),
        }
    }
}

/// Webhook payload wrapping an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    #[serde(flatten)]
    pub event: AdminEvent,
}

impl EventEnvelope {
    pub fn new(event: AdminEvent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            title: event.title(),
            message: event.message(),
            event,
        }
    }
}
