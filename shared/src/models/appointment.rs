//! Appointment requests and confirmed appointments

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Review state of an appointment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    Pending,
    Approved,
    Declined,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Approved => "approved",
            PendingStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PendingStatus::Pending),
            "approved" => Some(PendingStatus::Approved),
            "declined" => Some(PendingStatus::Declined),
            _ => None,
        }
    }
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a confirmed appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppointmentError {
    #[error("Appointment request is already {0}")]
    AlreadyDecided(PendingStatus),

    #[error("Requested slot is in the past")]
    SlotInPast,

    #[error("A decline reason is required")]
    MissingReason,
}

/// An appointment request awaiting administrative approval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingAppointment {
    pub id: i64,
    pub patient_id: i64,
    pub specialist_id: i64,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub reason: Option<String>,
    pub status: PendingStatus,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub appointment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl PendingAppointment {
    /// Requested slot as an instant (clinic times are stored in UTC)
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        slot_instant(self.requested_date, self.requested_time)
    }

    pub fn ensure_pending(&self) -> Result<(), AppointmentError> {
        match self.status {
            PendingStatus::Pending => Ok(()),
            other => Err(AppointmentError::AlreadyDecided(other)),
        }
    }

    /// pending -> approved, linked to the appointment created for it
    pub fn approve(
        &mut self,
        admin_id: i64,
        appointment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        self.ensure_pending()?;
        self.status = PendingStatus::Approved;
        self.decided_by = Some(admin_id);
        self.decided_at = Some(now);
        self.appointment_id = Some(appointment_id);
        Ok(())
    }

    /// pending -> declined
    pub fn decline(
        &mut self,
        admin_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        self.ensure_pending()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppointmentError::MissingReason);
        }
        self.status = PendingStatus::Declined;
        self.decided_by = Some(admin_id);
        self.decided_at = Some(now);
        self.decline_reason = Some(reason.to_string());
        Ok(())
    }
}

/// A confirmed appointment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub specialist_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn slot_instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

/// Requests must be for a slot that has not started yet
pub fn validate_requested_slot(
    date: NaiveDate,
    time: NaiveTime,
    now: DateTime<Utc>,
) -> Result<(), AppointmentError> {
    if slot_instant(date, time) <= now {
        return Err(AppointmentError::SlotInPast);
    }
    Ok(())
}
