//! HTTP handlers for appointment requests

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{ApiResponse, Appointment, PendingAppointment};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::appointment::{
    ApprovedAppointment, DeclineAppointmentInput, RequestAppointmentInput,
};
use crate::services::AppointmentService;
use crate::AppState;

fn appointment_service(state: &AppState) -> AppointmentService {
    AppointmentService::new(state.db.clone(), state.notifier())
}

/// Query parameters for listing appointments
#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ListAppointmentsQuery {
    fn validate(&self) -> AppResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(AppError::validation(
                    "end_date",
                    "End date must not be before start date",
                ));
            }
        }
        Ok(())
    }
}

/// Request an appointment
pub async fn request_appointment(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<RequestAppointmentInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<PendingAppointment>>)> {
    let request = appointment_service(&state).request(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Appointment request submitted", request)),
    ))
}

/// Requests awaiting approval
pub async fn list_pending_appointments(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<PendingAppointment>>>> {
    let requests = appointment_service(&state).list_pending().await?;
    Ok(Json(ApiResponse::ok("Pending appointments retrieved", requests)))
}

/// Approve a request (admin only)
pub async fn approve_appointment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<i64>,
) -> AppResult<Json<ApiResponse<ApprovedAppointment>>> {
    current_user.0.require_admin()?;
    let approved = appointment_service(&state)
        .approve(request_id, current_user.0.user_id)
        .await?;
    Ok(Json(ApiResponse::ok("Appointment approved", approved)))
}

/// Decline a request with a reason (admin only)
pub async fn decline_appointment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<i64>,
    Json(input): Json<DeclineAppointmentInput>,
) -> AppResult<Json<ApiResponse<PendingAppointment>>> {
    current_user.0.require_admin()?;
    let request = appointment_service(&state)
        .decline(request_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok("Appointment request declined", request)))
}

/// Confirmed appointments
pub async fn list_appointments(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListAppointmentsQuery>,
) -> AppResult<Json<ApiResponse<Vec<Appointment>>>> {
    query.validate()?;
    let appointments = appointment_service(&state)
        .list_appointments(query.start_date, query.end_date)
        .await?;
    Ok(Json(ApiResponse::ok("Appointments retrieved", appointments)))
}
