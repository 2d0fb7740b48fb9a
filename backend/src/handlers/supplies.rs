//! HTTP handlers for the supply catalogue

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{ApiResponse, PaginatedResponse, Pagination, Supply, SupplyStock};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::supply::{CreateSupplyInput, SupplyFilter, UpdateSupplyInput};
use crate::services::SupplyService;
use crate::AppState;

/// Query parameters for listing supplies
#[derive(Debug, Deserialize)]
pub struct ListSuppliesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub active_only: Option<bool>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Add a supply to the catalogue
pub async fn create_supply(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplyInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Supply>>)> {
    current_user.0.require_admin()?;
    let supply = SupplyService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Supply created", supply)),
    ))
}

/// Get a supply by ID
pub async fn get_supply(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(supply_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Supply>>> {
    let supply = SupplyService::new(state.db).get(supply_id).await?;
    Ok(Json(ApiResponse::ok("Supply retrieved", supply)))
}

/// List supplies
pub async fn list_supplies(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListSuppliesQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Supply>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let filter = SupplyFilter {
        active_only: query.active_only,
        category: query.category,
        search: query.search,
    };

    let page = SupplyService::new(state.db)
        .list(&filter, &pagination)
        .await?;
    Ok(Json(ApiResponse::ok("Supplies retrieved", page)))
}

/// Update a supply
pub async fn update_supply(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supply_id): Path<i64>,
    Json(input): Json<UpdateSupplyInput>,
) -> AppResult<Json<ApiResponse<Supply>>> {
    current_user.0.require_admin()?;
    let supply = SupplyService::new(state.db).update(supply_id, input).await?;
    Ok(Json(ApiResponse::ok("Supply updated", supply)))
}

/// Deactivate a supply; its history stays
pub async fn deactivate_supply(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supply_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.0.require_admin()?;
    SupplyService::new(state.db.clone()).deactivate(supply_id).await?;
    Ok(Json(ApiResponse::message("Supply deactivated")))
}

/// A supply with every lot and its totals
pub async fn get_supply_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(supply_id): Path<i64>,
) -> AppResult<Json<ApiResponse<SupplyStock>>> {
    let ledger = state.ledger();
    let stock = SupplyService::new(state.db)
        .stock(&ledger, supply_id)
        .await?;
    Ok(Json(ApiResponse::ok("Supply stock retrieved", stock)))
}
