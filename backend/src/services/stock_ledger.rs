//! Stock ledger service: persists quantity movements against stock_levels rows
//!
//! The arithmetic lives in `shared::StockLevel::apply_delta`. This service
//! finds (or creates) the row for a supply/lot, locks it for the rest of the
//! database transaction, applies the delta and writes the result back, so two
//! concurrent movements on one lot are serialized instead of overwriting
//! each other.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{LedgerPolicy, StockLevel};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::error::AppResult;

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
    policy: LedgerPolicy,
}

const STOCK_LEVEL_COLUMNS: &str = "id, supply_id, lot_number, expiry_date, \
     current_stock, reserved_stock, available_stock, average_cost, total_value, \
     is_expired, is_near_expiry, updated_at";

/// Row for stock level queries
#[derive(Debug, FromRow)]
struct StockLevelRow {
    id: i64,
    supply_id: i64,
    lot_number: Option<String>,
    expiry_date: Option<NaiveDate>,
    current_stock: i32,
    reserved_stock: i32,
    available_stock: i32,
    average_cost: Decimal,
    total_value: Decimal,
    is_expired: bool,
    is_near_expiry: bool,
    updated_at: DateTime<Utc>,
}

impl From<StockLevelRow> for StockLevel {
    fn from(row: StockLevelRow) -> Self {
        Self {
            id: row.id,
            supply_id: row.supply_id,
            lot_number: row.lot_number,
            expiry_date: row.expiry_date,
            current_stock: row.current_stock,
            reserved_stock: row.reserved_stock,
            available_stock: row.available_stock,
            average_cost: row.average_cost,
            total_value: row.total_value,
            is_expired: row.is_expired,
            is_near_expiry: row.is_near_expiry,
            updated_at: row.updated_at,
        }
    }
}

/// One stock movement to apply
#[derive(Debug, Clone)]
pub struct StockMovement<'a> {
    pub supply_id: i64,
    pub lot_number: Option<&'a str>,
    pub expiry_date: Option<NaiveDate>,
    pub delta: i32,
    pub unit_cost: Option<Decimal>,
}

impl StockLedgerService {
    /// Create a new StockLedgerService instance
    pub fn new(db: PgPool, policy: LedgerPolicy) -> Self {
        Self { db, policy }
    }

    /// Apply a movement inside a caller's database transaction.
    ///
    /// The stock row stays locked until that transaction ends.
    pub async fn apply_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        movement: StockMovement<'_>,
    ) -> AppResult<StockLevel> {
        let now = Utc::now();
        let mut level = self.lock_or_create(tx, &movement).await?;

        // The first movement that names an expiry date sets it for the lot
        if level.expiry_date.is_none() {
            level.expiry_date = movement.expiry_date;
        }

        level.apply_delta(movement.delta, movement.unit_cost, now, &self.policy)?;

        let saved = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            UPDATE stock_levels
            SET expiry_date = $1, current_stock = $2, available_stock = $3,
                average_cost = $4, total_value = $5, is_expired = $6,
                is_near_expiry = $7, updated_at = $8
            WHERE id = $9
            RETURNING {}
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .bind(level.expiry_date)
        .bind(level.current_stock)
        .bind(level.available_stock)
        .bind(level.average_cost)
        .bind(level.total_value)
        .bind(level.is_expired)
        .bind(level.is_near_expiry)
        .bind(level.updated_at)
        .bind(level.id)
        .fetch_one(&mut **tx)
        .await?;

        tracing::info!(
            supply_id = movement.supply_id,
            stock_level_id = saved.id,
            delta = movement.delta,
            current_stock = saved.current_stock,
            average_cost = %saved.average_cost,
            "Stock level updated"
        );

        Ok(saved.into())
    }

    async fn lock_or_create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        movement: &StockMovement<'_>,
    ) -> AppResult<StockLevel> {
        sqlx::query(
            r#"
            INSERT INTO stock_levels (supply_id, lot_number, expiry_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (supply_id, (COALESCE(lot_number, ''))) DO NOTHING
            "#,
        )
        .bind(movement.supply_id)
        .bind(movement.lot_number)
        .bind(movement.expiry_date)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            SELECT {}
            FROM stock_levels
            WHERE supply_id = $1 AND COALESCE(lot_number, '') = COALESCE($2, '')
            FOR UPDATE
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .bind(movement.supply_id)
        .bind(movement.lot_number)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.into())
    }

    /// All lots of one supply, soonest expiry first
    pub async fn levels_for_supply(&self, supply_id: i64) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            SELECT {}
            FROM stock_levels
            WHERE supply_id = $1
            ORDER BY expiry_date ASC NULLS LAST, id ASC
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .bind(supply_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLevel::from).collect())
    }

    /// Every stock row
    pub async fn all_levels(&self) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(&format!(
            "SELECT {} FROM stock_levels ORDER BY supply_id, id",
            STOCK_LEVEL_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLevel::from).collect())
    }

    /// Stocked rows carrying an expiry date, the input of the expiry reports
    pub async fn dated_stocked_levels(&self) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            SELECT {}
            FROM stock_levels
            WHERE expiry_date IS NOT NULL AND current_stock > 0
            ORDER BY expiry_date ASC, id ASC
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLevel::from).collect())
    }

    /// Recompute expiry flags on every dated row. Flags otherwise only change
    /// when a movement touches the row. Returns the number of rows changed.
    pub async fn refresh_expiry_flags(&self) -> AppResult<u64> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let rows = sqlx::query_as::<_, StockLevelRow>(&format!(
            "SELECT {} FROM stock_levels WHERE expiry_date IS NOT NULL FOR UPDATE",
            STOCK_LEVEL_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;

        let mut changed = 0;
        for row in rows {
            let mut level = StockLevel::from(row);
            let (was_expired, was_near) = (level.is_expired, level.is_near_expiry);
            level.refresh_expiry(now, self.policy.near_expiry_days);

            if level.is_expired != was_expired || level.is_near_expiry != was_near {
                sqlx::query(
                    "UPDATE stock_levels SET is_expired = $1, is_near_expiry = $2, updated_at = $3 WHERE id = $4",
                )
                .bind(level.is_expired)
                .bind(level.is_near_expiry)
                .bind(now)
                .bind(level.id)
                .execute(&mut *tx)
                .await?;
                changed += 1;
            }
        }

        tx.commit().await?;
        tracing::info!(changed, "Expiry flags refreshed");
        Ok(changed)
    }
}
