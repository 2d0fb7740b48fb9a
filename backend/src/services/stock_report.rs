//! Stock reports: low stock, expiring soon, expired

use chrono::Utc;
use serde::Serialize;
use shared::{ExpiryReportItem, LowStockItem};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::{StockLedgerService, SupplyService};

/// Stock report service
#[derive(Clone)]
pub struct StockReportService {
    supplies: SupplyService,
    ledger: StockLedgerService,
    default_window_days: i64,
}

impl StockReportService {
    /// Create a new StockReportService instance
    pub fn new(db: PgPool, ledger: StockLedgerService, default_window_days: i64) -> Self {
        Self {
            supplies: SupplyService::new(db),
            ledger,
            default_window_days,
        }
    }

    /// Active supplies at or below their minimum across all lots
    pub async fn low_stock(&self) -> AppResult<Vec<LowStockItem>> {
        let supplies = self.supplies.all().await?;
        let levels = self.ledger.all_levels().await?;
        Ok(shared::low_stock_report(&supplies, &levels))
    }

    /// Stocked lots expiring within `days` (or the configured window)
    pub async fn expiring_soon(&self, days: Option<i64>) -> AppResult<Vec<ExpiryReportItem>> {
        let days = days.unwrap_or(self.default_window_days);
        shared::validate_expiry_window(days).map_err(|m| AppError::validation("days", m))?;

        let supplies = self.supplies.all().await?;
        let levels = self.ledger.dated_stocked_levels().await?;
        Ok(shared::expiring_soon_report(&supplies, &levels, Utc::now(), days))
    }

    /// Stocked lots already past expiry
    pub async fn expired(&self) -> AppResult<Vec<ExpiryReportItem>> {
        let supplies = self.supplies.all().await?;
        let levels = self.ledger.dated_stocked_levels().await?;
        Ok(shared::expired_report(&supplies, &levels, Utc::now()))
    }

    /// Recompute stored expiry flags; returns rows changed
    pub async fn refresh_expiry(&self) -> AppResult<u64> {
        self.ledger.refresh_expiry_flags().await
    }

    /// Export report data to CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
