//! Appointment requests and their approval

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    AdminEvent, Appointment, AppointmentStatus, PendingAppointment, PendingStatus,
};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::NotificationService;

/// Appointment service
#[derive(Clone)]
pub struct AppointmentService {
    db: PgPool,
    notifier: NotificationService,
}

const PENDING_COLUMNS: &str = "id, patient_id, specialist_id, requested_date, requested_time, \
     reason, status, decided_by, decided_at, decline_reason, appointment_id, created_at";

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, specialist_id, scheduled_at, status, reason, created_at";

#[derive(Debug, FromRow)]
struct PendingAppointmentRow {
    id: i64,
    patient_id: i64,
    specialist_id: i64,
    requested_date: NaiveDate,
    requested_time: NaiveTime,
    reason: Option<String>,
    status: String,
    decided_by: Option<i64>,
    decided_at: Option<DateTime<Utc>>,
    decline_reason: Option<String>,
    appointment_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PendingAppointmentRow> for PendingAppointment {
    type Error = AppError;

    fn try_from(row: PendingAppointmentRow) -> Result<Self, Self::Error> {
        let status = PendingStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown status '{}' on appointment request {}",
                row.status, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            patient_id: row.patient_id,
            specialist_id: row.specialist_id,
            requested_date: row.requested_date,
            requested_time: row.requested_time,
            reason: row.reason,
            status,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
            decline_reason: row.decline_reason,
            appointment_id: row.appointment_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AppointmentRow {
    id: i64,
    patient_id: i64,
    specialist_id: i64,
    scheduled_at: DateTime<Utc>,
    status: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = AppError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown status '{}' on appointment {}",
                row.status, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            patient_id: row.patient_id,
            specialist_id: row.specialist_id,
            scheduled_at: row.scheduled_at,
            status,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

/// Input for requesting an appointment
#[derive(Debug, Deserialize, Validate)]
pub struct RequestAppointmentInput {
    pub patient_id: i64,
    pub specialist_id: i64,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Input for declining a request
#[derive(Debug, Deserialize)]
pub struct DeclineAppointmentInput {
    pub reason: String,
}

/// An approved request together with the appointment created for it
#[derive(Debug, Serialize)]
pub struct ApprovedAppointment {
    pub request: PendingAppointment,
    pub appointment: Appointment,
}

impl AppointmentService {
    /// Create a new AppointmentService instance
    pub fn new(db: PgPool, notifier: NotificationService) -> Self {
        Self { db, notifier }
    }

    /// File a request for an administrator to approve
    pub async fn request(&self, input: RequestAppointmentInput) -> AppResult<PendingAppointment> {
        input.validate()?;
        shared::validate_requested_slot(input.requested_date, input.requested_time, Utc::now())?;

        let specialist_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM specialists WHERE specialist_id = $1",
        )
        .bind(input.specialist_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Specialist".to_string()))?;
        if !specialist_active {
            return Err(AppError::validation(
                "specialist_id",
                "Specialist is not accepting appointments",
            ));
        }

        let patient_name = sqlx::query_scalar::<_, String>(
            "SELECT first_name || ' ' || last_name FROM patients WHERE id = $1",
        )
        .bind(input.patient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient".to_string()))?;

        let row = sqlx::query_as::<_, PendingAppointmentRow>(&format!(
            r#"
            INSERT INTO pending_appointments (
                patient_id, specialist_id, requested_date, requested_time, reason, status
            )
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING {}
            "#,
            PENDING_COLUMNS
        ))
        .bind(input.patient_id)
        .bind(input.specialist_id)
        .bind(input.requested_date)
        .bind(input.requested_time)
        .bind(input.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()))
        .fetch_one(&self.db)
        .await?;

        let request = PendingAppointment::try_from(row)?;
        tracing::info!(
            request_id = request.id,
            specialist_id = request.specialist_id,
            "Appointment requested"
        );

        self.notifier
            .notify_admins(AdminEvent::AppointmentRequested {
                pending_appointment_id: request.id,
                patient_name,
                requested_date: request.requested_date,
            })
            .await;

        Ok(request)
    }

    /// Requests still awaiting a decision, earliest slot first
    pub async fn list_pending(&self) -> AppResult<Vec<PendingAppointment>> {
        let rows = sqlx::query_as::<_, PendingAppointmentRow>(&format!(
            r#"
            SELECT {}
            FROM pending_appointments
            WHERE status = 'pending'
            ORDER BY requested_date ASC, requested_time ASC, id ASC
            "#,
            PENDING_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(PendingAppointment::try_from).collect()
    }

    /// Approve a request: create the appointment and link it, atomically
    pub async fn approve(&self, request_id: i64, admin_id: i64) -> AppResult<ApprovedAppointment> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut request = self.lock_request(&mut tx, request_id).await?;
        request.ensure_pending()?;

        let appointment_row = sqlx::query_as::<_, AppointmentRow>(&format!(
            r#"
            INSERT INTO appointments (patient_id, specialist_id, scheduled_at, status, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            APPOINTMENT_COLUMNS
        ))
        .bind(request.patient_id)
        .bind(request.specialist_id)
        .bind(request.scheduled_at())
        .bind(AppointmentStatus::Scheduled.as_str())
        .bind(&request.reason)
        .fetch_one(&mut *tx)
        .await?;
        let appointment = Appointment::try_from(appointment_row)?;

        request.approve(admin_id, appointment.id, now)?;
        self.save_decision(&mut tx, &request).await?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            appointment_id = appointment.id,
            admin_id,
            "Appointment request approved"
        );

        Ok(ApprovedAppointment {
            request,
            appointment,
        })
    }

    /// Decline a request with a reason
    pub async fn decline(
        &self,
        request_id: i64,
        admin_id: i64,
        input: DeclineAppointmentInput,
    ) -> AppResult<PendingAppointment> {
        shared::validate_reason(&input.reason).map_err(|m| AppError::validation("reason", m))?;

        let mut tx = self.db.begin().await?;
        let mut request = self.lock_request(&mut tx, request_id).await?;
        request.decline(admin_id, &input.reason, Utc::now())?;
        self.save_decision(&mut tx, &request).await?;
        tx.commit().await?;

        tracing::info!(request_id, admin_id, "Appointment request declined");
        Ok(request)
    }

    /// Confirmed appointments, optionally bounded by scheduled date (inclusive)
    pub async fn list_appointments(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            r#"
            SELECT {}
            FROM appointments
            WHERE ($1::date IS NULL OR scheduled_at::date >= $1)
              AND ($2::date IS NULL OR scheduled_at::date <= $2)
            ORDER BY scheduled_at ASC, id ASC
            "#,
            APPOINTMENT_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn lock_request(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        request_id: i64,
    ) -> AppResult<PendingAppointment> {
        sqlx::query_as::<_, PendingAppointmentRow>(&format!(
            "SELECT {} FROM pending_appointments WHERE id = $1 FOR UPDATE",
            PENDING_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment request".to_string()))?
        .try_into()
    }

    async fn save_decision(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        request: &PendingAppointment,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE pending_appointments
            SET status = $1, decided_by = $2, decided_at = $3,
                decline_reason = $4, appointment_id = $5
            WHERE id = $6
            "#,
        )
        .bind(request.status.as_str())
        .bind(request.decided_by)
        .bind(request.decided_at)
        .bind(&request.decline_reason)
        .bind(request.appointment_id)
        .bind(request.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
