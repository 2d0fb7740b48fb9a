//! HTTP handlers for supply transactions and their approval

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{
    ApiResponse, ApprovalStatus, PaginatedResponse, Pagination, SupplyTransaction, TransactionType,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::supply_transaction::{
    RecordTransactionInput, RejectTransactionInput, TransactionFilter,
};
use crate::services::SupplyTransactionService;
use crate::AppState;

fn transaction_service(state: &AppState) -> SupplyTransactionService {
    SupplyTransactionService::new(state.db.clone(), state.ledger(), state.notifier())
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ApprovalStatus>,
    pub supply_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
}

/// Record a stock movement
pub async fn record_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordTransactionInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<SupplyTransaction>>)> {
    let transaction = transaction_service(&state)
        .record(current_user.0.user_id, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Transaction recorded and awaiting approval",
            transaction,
        )),
    ))
}

/// Get a transaction by ID
pub async fn get_transaction(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transaction_id): Path<i64>,
) -> AppResult<Json<ApiResponse<SupplyTransaction>>> {
    let transaction = transaction_service(&state).get(transaction_id).await?;
    Ok(Json(ApiResponse::ok("Transaction retrieved", transaction)))
}

/// List transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListTransactionsQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<SupplyTransaction>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let filter = TransactionFilter {
        status: query.status,
        supply_id: query.supply_id,
        transaction_type: query.transaction_type,
    };

    let page = transaction_service(&state)
        .list(&filter, &pagination)
        .await?;
    Ok(Json(ApiResponse::ok("Transactions retrieved", page)))
}

/// Approve a pending transaction (admin only)
pub async fn approve_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<i64>,
) -> AppResult<Json<ApiResponse<SupplyTransaction>>> {
    current_user.0.require_admin()?;
    let transaction = transaction_service(&state)
        .approve(transaction_id, current_user.0.user_id)
        .await?;
    Ok(Json(ApiResponse::ok("Transaction approved", transaction)))
}

/// Reject a pending transaction with a reason (admin only)
pub async fn reject_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<i64>,
    Json(input): Json<RejectTransactionInput>,
) -> AppResult<Json<ApiResponse<SupplyTransaction>>> {
    current_user.0.require_admin()?;
    let transaction = transaction_service(&state)
        .reject(transaction_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok("Transaction rejected", transaction)))
}
