//! Supply transaction service
//!
//! Recording a transaction moves stock immediately and leaves the record
//! pending. Approval and rejection are an audit decision on the record only:
//! neither touches stock, and a rejected movement is corrected by recording
//! a compensating adjustment.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    AdminEvent, ApprovalStatus, PaginatedResponse, Pagination, PaginationMeta, SupplyTransaction,
    TransactionSubtype, TransactionType,
};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{NotificationService, StockLedgerService, StockMovement};

/// Supply transaction service
#[derive(Clone)]
pub struct SupplyTransactionService {
    db: PgPool,
    ledger: StockLedgerService,
    notifier: NotificationService,
}

const TRANSACTION_COLUMNS: &str = "id, supply_id, stock_level_id, transaction_type, subtype, \
     quantity, unit_cost, lot_number, expiry_date, notes, recorded_by, approval_status, \
     approved_by, approved_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct SupplyTransactionRow {
    id: i64,
    supply_id: i64,
    stock_level_id: Option<i64>,
    transaction_type: String,
    subtype: String,
    quantity: i32,
    unit_cost: Option<Decimal>,
    lot_number: Option<String>,
    expiry_date: Option<NaiveDate>,
    notes: Option<String>,
    recorded_by: i64,
    approval_status: String,
    approved_by: Option<i64>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SupplyTransactionRow> for SupplyTransaction {
    type Error = AppError;

    fn try_from(row: SupplyTransactionRow) -> Result<Self, Self::Error> {
        let unknown = |column: &str, value: &str| {
            AppError::Internal(format!("Unknown {} '{}' on transaction {}", column, value, row.id))
        };

        Ok(Self {
            transaction_type: TransactionType::parse(&row.transaction_type)
                .ok_or_else(|| unknown("transaction_type", &row.transaction_type))?,
            subtype: TransactionSubtype::parse(&row.subtype)
                .ok_or_else(|| unknown("subtype", &row.subtype))?,
            approval_status: ApprovalStatus::parse(&row.approval_status)
                .ok_or_else(|| unknown("approval_status", &row.approval_status))?,
            id: row.id,
            supply_id: row.supply_id,
            stock_level_id: row.stock_level_id,
            quantity: row.quantity,
            unit_cost: row.unit_cost,
            lot_number: row.lot_number,
            expiry_date: row.expiry_date,
            notes: row.notes,
            recorded_by: row.recorded_by,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for recording a stock movement
#[derive(Debug, Deserialize, Validate)]
pub struct RecordTransactionInput {
    pub supply_id: i64,
    pub transaction_type: TransactionType,
    pub subtype: TransactionSubtype,
    pub quantity: i32,
    pub unit_cost: Option<Decimal>,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl RecordTransactionInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        shared::validate_quantity(self.quantity)
            .map_err(|m| AppError::validation("quantity", m))?;
        shared::validate_unit_cost(self.unit_cost)
            .map_err(|m| AppError::validation("unit_cost", m))?;
        if let Some(lot) = self.lot() {
            shared::validate_lot_number(lot).map_err(|m| AppError::validation("lot_number", m))?;
        }
        if !self.subtype.allowed_for(self.transaction_type) {
            return Err(AppError::validation(
                "subtype",
                format!(
                    "Subtype '{}' is not allowed for '{}' transactions",
                    self.subtype.as_str(),
                    self.transaction_type.as_str()
                ),
            ));
        }
        Ok(())
    }

    /// Lot number with blanks treated as "no lot"
    fn lot(&self) -> Option<&str> {
        self.lot_number.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Input for rejecting a transaction
#[derive(Debug, Deserialize)]
pub struct RejectTransactionInput {
    pub reason: String,
}

/// Transaction listing filter
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<ApprovalStatus>,
    pub supply_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
}

impl SupplyTransactionService {
    /// Create a new SupplyTransactionService instance
    pub fn new(db: PgPool, ledger: StockLedgerService, notifier: NotificationService) -> Self {
        Self {
            db,
            ledger,
            notifier,
        }
    }

    /// Record a movement: update the ledger and store the pending record atomically
    pub async fn record(
        &self,
        recorded_by: i64,
        input: RecordTransactionInput,
    ) -> AppResult<SupplyTransaction> {
        input.check()?;

        let supply = sqlx::query_as::<_, (String, bool)>(
            "SELECT name, is_active FROM supplies WHERE id = $1",
        )
        .bind(input.supply_id)
        .fetch_optional(&self.db)
        .await?;

        let (supply_name, is_active) =
            supply.ok_or_else(|| AppError::NotFound("Supply".to_string()))?;
        if !is_active {
            return Err(AppError::validation(
                "supply_id",
                "Transactions cannot be recorded for an inactive supply",
            ));
        }

        let lot = input.lot();
        let delta = input.transaction_type.signed_quantity(input.quantity);

        let mut tx = self.db.begin().await?;

        let level = self
            .ledger
            .apply_delta(
                &mut tx,
                StockMovement {
                    supply_id: input.supply_id,
                    lot_number: lot,
                    expiry_date: input.expiry_date,
                    delta,
                    unit_cost: input.unit_cost,
                },
            )
            .await?;

        let row = sqlx::query_as::<_, SupplyTransactionRow>(&format!(
            r#"
            INSERT INTO supply_transactions (
                supply_id, stock_level_id, transaction_type, subtype, quantity,
                unit_cost, lot_number, expiry_date, notes, recorded_by, approval_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(input.supply_id)
        .bind(level.id)
        .bind(input.transaction_type.as_str())
        .bind(input.subtype.as_str())
        .bind(input.quantity)
        .bind(input.unit_cost)
        .bind(lot)
        .bind(input.expiry_date)
        .bind(input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()))
        .bind(recorded_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let transaction = SupplyTransaction::try_from(row)?;
        tracing::info!(
            transaction_id = transaction.id,
            supply_id = transaction.supply_id,
            transaction_type = transaction.transaction_type.as_str(),
            quantity = transaction.quantity,
            "Supply transaction recorded"
        );

        self.notifier
            .notify_admins(AdminEvent::TransactionAwaitingApproval {
                transaction_id: transaction.id,
                supply_name,
                transaction_type: transaction.transaction_type,
                quantity: transaction.quantity,
            })
            .await;

        Ok(transaction)
    }

    /// Get a transaction by id
    pub async fn get(&self, transaction_id: i64) -> AppResult<SupplyTransaction> {
        let row = sqlx::query_as::<_, SupplyTransactionRow>(&format!(
            "SELECT {} FROM supply_transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supply transaction".to_string()))?;

        row.try_into()
    }

    /// List transactions, newest first
    pub async fn list(
        &self,
        filter: &TransactionFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<SupplyTransaction>> {
        let status = filter.status.map(|s| s.as_str());
        let transaction_type = filter.transaction_type.map(|t| t.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM supply_transactions
            WHERE ($1::text IS NULL OR approval_status = $1)
              AND ($2::bigint IS NULL OR supply_id = $2)
              AND ($3::text IS NULL OR transaction_type = $3)
            "#,
        )
        .bind(status)
        .bind(filter.supply_id)
        .bind(transaction_type)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SupplyTransactionRow>(&format!(
            r#"
            SELECT {}
            FROM supply_transactions
            WHERE ($1::text IS NULL OR approval_status = $1)
              AND ($2::bigint IS NULL OR supply_id = $2)
              AND ($3::text IS NULL OR transaction_type = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(status)
        .bind(filter.supply_id)
        .bind(transaction_type)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(SupplyTransaction::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, u64::try_from(total).unwrap_or(0)),
        })
    }

    /// pending -> approved
    pub async fn approve(&self, transaction_id: i64, approver_id: i64) -> AppResult<SupplyTransaction> {
        self.decide(transaction_id, |transaction, now| {
            transaction.approve(approver_id, now)
        })
        .await
    }

    /// pending -> rejected, with the reason appended to the notes
    pub async fn reject(
        &self,
        transaction_id: i64,
        approver_id: i64,
        input: RejectTransactionInput,
    ) -> AppResult<SupplyTransaction> {
        shared::validate_reason(&input.reason).map_err(|m| AppError::validation("reason", m))?;

        self.decide(transaction_id, |transaction, now| {
            transaction.reject(approver_id, &input.reason, now)
        })
        .await
    }

    /// Lock the record, run the state transition, persist it
    async fn decide<F>(&self, transaction_id: i64, transition: F) -> AppResult<SupplyTransaction>
    where
        F: FnOnce(&mut SupplyTransaction, DateTime<Utc>) -> Result<(), shared::ApprovalError>,
    {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, SupplyTransactionRow>(&format!(
            "SELECT {} FROM supply_transactions WHERE id = $1 FOR UPDATE",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Supply transaction".to_string()))?;

        let mut transaction = SupplyTransaction::try_from(row)?;
        transition(&mut transaction, now)?;

        let saved = sqlx::query_as::<_, SupplyTransactionRow>(&format!(
            r#"
            UPDATE supply_transactions
            SET approval_status = $1, approved_by = $2, approved_at = $3,
                notes = $4, updated_at = $5
            WHERE id = $6
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(transaction.approval_status.as_str())
        .bind(transaction.approved_by)
        .bind(transaction.approved_at)
        .bind(&transaction.notes)
        .bind(transaction.updated_at)
        .bind(transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id,
            status = %transaction.approval_status,
            decided_by = ?transaction.approved_by,
            "Supply transaction decided"
        );

        saved.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> RecordTransactionInput {
        RecordTransactionInput {
            supply_id: 1,
            transaction_type: TransactionType::In,
            subtype: TransactionSubtype::Received,
            quantity: 10,
            unit_cost: Some(Decimal::new(1250, 2)),
            lot_number: Some(" LOT-2024-07 ".to_string()),
            expiry_date: None,
            notes: None,
        }
    }

    fn field_of(result: AppResult<()>) -> Option<String> {
        match result {
            Err(AppError::Validation { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn valid_receipt_passes() {
        let input = receipt();
        assert!(input.check().is_ok());
        assert_eq!(input.lot(), Some("LOT-2024-07"));
    }

    #[test]
    fn blank_lot_means_no_lot() {
        let input = RecordTransactionInput {
            lot_number: Some("   ".to_string()),
            ..receipt()
        };
        assert!(input.check().is_ok());
        assert_eq!(input.lot(), None);
    }

    #[test]
    fn subtype_must_match_direction() {
        let input = RecordTransactionInput {
            subtype: TransactionSubtype::Consumed,
            ..receipt()
        };
        assert_eq!(field_of(input.check()).as_deref(), Some("subtype"));
    }

    #[test]
    fn quantity_and_cost_are_checked() {
        let zero = RecordTransactionInput {
            quantity: 0,
            ..receipt()
        };
        assert_eq!(field_of(zero.check()).as_deref(), Some("quantity"));

        let negative = RecordTransactionInput {
            unit_cost: Some(Decimal::new(-1, 0)),
            ..receipt()
        };
        assert_eq!(field_of(negative.check()).as_deref(), Some("unit_cost"));
    }
}
