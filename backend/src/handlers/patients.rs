//! HTTP handlers for patient records

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{ApiResponse, FieldFixCount, NewPatient, PaginatedResponse, Pagination, Patient};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::patient::PatientFilter;
use crate::services::PatientService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPatientsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

/// Register a patient
pub async fn create_patient(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<NewPatient>,
) -> AppResult<(StatusCode, Json<ApiResponse<Patient>>)> {
    let patient = PatientService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Patient registered", patient)),
    ))
}

pub async fn get_patient(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Patient>>> {
    let patient = PatientService::new(state.db).get(patient_id).await?;
    Ok(Json(ApiResponse::ok("Patient retrieved", patient)))
}

pub async fn list_patients(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListPatientsQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Patient>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let filter = PatientFilter {
        search: query.search,
    };
    let page = PatientService::new(state.db)
        .list(&filter, &pagination)
        .await?;
    Ok(Json(ApiResponse::ok("Patients retrieved", page)))
}

/// Fill missing patient fields with their defaults (admin only)
pub async fn fix_missing_patient_fields(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<FieldFixCount>>>> {
    current_user.0.require_admin()?;
    let counts = PatientService::new(state.db).fix_missing_fields().await?;
    let total: u64 = counts.iter().map(|c| c.rows_updated).sum();
    Ok(Json(ApiResponse::ok(
        format!("Filled {} missing patient fields", total),
        counts,
    )))
}
