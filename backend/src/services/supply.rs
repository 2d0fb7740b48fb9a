//! Supply catalogue service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{PaginatedResponse, Pagination, PaginationMeta, Supply, SupplyStock};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::StockLedgerService;

/// Supply service for managing the catalogue
#[derive(Clone)]
pub struct SupplyService {
    db: PgPool,
}

const SUPPLY_COLUMNS: &str =
    "id, code, name, category, unit, minimum_stock_level, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct SupplyRow {
    id: i64,
    code: String,
    name: String,
    category: String,
    unit: String,
    minimum_stock_level: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplyRow> for Supply {
    fn from(row: SupplyRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
            category: row.category,
            unit: row.unit,
            minimum_stock_level: row.minimum_stock_level,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a supply
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplyInput {
    pub code: String,
    #[validate(length(min = 1, max = 150, message = "Name must be 1-150 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "Category must be 1-60 characters"))]
    pub category: String,
    #[validate(length(min = 1, max = 20, message = "Unit must be 1-20 characters"))]
    pub unit: String,
    #[validate(range(min = 0, message = "Minimum stock level cannot be negative"))]
    pub minimum_stock_level: Option<i32>,
}

/// Input for updating a supply
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSupplyInput {
    #[validate(length(min = 1, max = 150, message = "Name must be 1-150 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 60, message = "Category must be 1-60 characters"))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Unit must be 1-20 characters"))]
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "Minimum stock level cannot be negative"))]
    pub minimum_stock_level: Option<i32>,
    pub is_active: Option<bool>,
}

/// Catalogue listing filter
#[derive(Debug, Default, Deserialize)]
pub struct SupplyFilter {
    pub active_only: Option<bool>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl SupplyService {
    /// Create a new SupplyService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supply
    pub async fn create(&self, input: CreateSupplyInput) -> AppResult<Supply> {
        input.validate()?;
        let code = input.code.trim().to_ascii_uppercase();
        shared::validate_supply_code(&code).map_err(|m| AppError::validation("code", m))?;

        let row = sqlx::query_as::<_, SupplyRow>(&format!(
            r#"
            INSERT INTO supplies (code, name, category, unit, minimum_stock_level)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SUPPLY_COLUMNS
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(input.unit.trim())
        .bind(input.minimum_stock_level.unwrap_or(0))
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "code"))?;

        tracing::info!(supply_id = row.id, code = %row.code, "Supply created");
        Ok(row.into())
    }

    /// Get a supply by id
    pub async fn get(&self, supply_id: i64) -> AppResult<Supply> {
        sqlx::query_as::<_, SupplyRow>(&format!(
            "SELECT {} FROM supplies WHERE id = $1",
            SUPPLY_COLUMNS
        ))
        .bind(supply_id)
        .fetch_optional(&self.db)
        .await?
        .map(Supply::from)
        .ok_or_else(|| AppError::NotFound("Supply".to_string()))
    }

    /// List supplies, paginated
    pub async fn list(
        &self,
        filter: &SupplyFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Supply>> {
        let active_only = filter.active_only.unwrap_or(false);
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM supplies
            WHERE ($1 = false OR is_active)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR code ILIKE $3)
            "#,
        )
        .bind(active_only)
        .bind(&filter.category)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SupplyRow>(&format!(
            r#"
            SELECT {}
            FROM supplies
            WHERE ($1 = false OR is_active)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR code ILIKE $3)
            ORDER BY name ASC, id ASC
            LIMIT $4 OFFSET $5
            "#,
            SUPPLY_COLUMNS
        ))
        .bind(active_only)
        .bind(&filter.category)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Supply::from).collect(),
            pagination: PaginationMeta::new(pagination, u64::try_from(total).unwrap_or(0)),
        })
    }

    /// Every supply, for report aggregation
    pub async fn all(&self) -> AppResult<Vec<Supply>> {
        let rows = sqlx::query_as::<_, SupplyRow>(&format!(
            "SELECT {} FROM supplies ORDER BY id",
            SUPPLY_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Supply::from).collect())
    }

    /// Update a supply
    pub async fn update(&self, supply_id: i64, input: UpdateSupplyInput) -> AppResult<Supply> {
        input.validate()?;
        let existing = self.get(supply_id).await?;

        let row = sqlx::query_as::<_, SupplyRow>(&format!(
            r#"
            UPDATE supplies
            SET name = $1, category = $2, unit = $3, minimum_stock_level = $4,
                is_active = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            SUPPLY_COLUMNS
        ))
        .bind(input.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(input.category.as_deref().map(str::trim).unwrap_or(&existing.category))
        .bind(input.unit.as_deref().map(str::trim).unwrap_or(&existing.unit))
        .bind(input.minimum_stock_level.unwrap_or(existing.minimum_stock_level))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(supply_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Deactivate a supply. Stock rows and transactions are kept for the audit trail.
    pub async fn deactivate(&self, supply_id: i64) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE supplies SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(supply_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supply".to_string()));
        }

        tracing::info!(supply_id, "Supply deactivated");
        Ok(())
    }

    /// A supply with all of its lots and aggregate figures
    pub async fn stock(&self, ledger: &StockLedgerService, supply_id: i64) -> AppResult<SupplyStock> {
        let supply = self.get(supply_id).await?;
        let lots = ledger.levels_for_supply(supply_id).await?;
        Ok(SupplyStock::new(supply, lots))
    }
}
