//! Stock report handlers

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::ApiResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::StockReportService;
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshExpiryResult {
    pub rows_changed: u64,
}

fn report_service(state: &AppState) -> StockReportService {
    StockReportService::new(
        state.db.clone(),
        state.ledger(),
        state.config.inventory.expiring_window_days,
    )
}

fn report_response<T: Serialize>(
    format: Option<&str>,
    filename: &str,
    message: &str,
    data: Vec<T>,
) -> AppResult<Response> {
    if format == Some("csv") {
        let csv = StockReportService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(ApiResponse::ok(message, data)).into_response())
    }
}

/// Supplies at or below their minimum stock level
pub async fn get_low_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let items = report_service(&state).low_stock().await?;
    report_response(
        query.format.as_deref(),
        "low_stock.csv",
        "Low stock report",
        items,
    )
}

/// Stocked lots expiring within the window
pub async fn get_expiring_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Response> {
    let items = report_service(&state).expiring_soon(query.days).await?;
    report_response(
        query.format.as_deref(),
        "expiring_stock.csv",
        "Expiring stock report",
        items,
    )
}

/// Stocked lots past their expiry date
pub async fn get_expired_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let items = report_service(&state).expired().await?;
    report_response(
        query.format.as_deref(),
        "expired_stock.csv",
        "Expired stock report",
        items,
    )
}

/// Recompute expiry flags on every dated stock row (admin only)
pub async fn refresh_expiry(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<RefreshExpiryResult>>> {
    current_user.0.require_admin()?;
    let rows_changed = report_service(&state).refresh_expiry().await?;
    Ok(Json(ApiResponse::ok(
        "Expiry flags refreshed",
        RefreshExpiryResult { rows_changed },
    )))
}
