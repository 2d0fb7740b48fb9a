//! Read-only stock reports: low stock, expiring soon, expired

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{expiry_instant, is_below_minimum, StockLevel, Supply};

/// A supply whose stock across all lots is at or below its minimum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowStockItem {
    pub supply_id: i64,
    pub supply_code: String,
    pub supply_name: String,
    pub unit: String,
    pub total_stock: i64,
    pub minimum_stock_level: i32,
    pub shortfall: i64,
}

/// A stocked lot listed by an expiry report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiryReportItem {
    pub stock_level_id: i64,
    pub supply_id: i64,
    pub supply_code: String,
    pub supply_name: String,
    pub lot_number: Option<String>,
    pub expiry_date: NaiveDate,
    pub current_stock: i32,
    /// Negative once the lot has expired
    pub days_until_expiry: i64,
}

/// Sum stock per supply across lots and keep the supplies at or below their minimum.
///
/// Active supplies with no stock rows count as zero stock. Output is ordered by
/// largest shortfall first, then by code.
pub fn low_stock_report(supplies: &[Supply], levels: &[StockLevel]) -> Vec<LowStockItem> {
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for level in levels {
        *totals.entry(level.supply_id).or_default() += i64::from(level.current_stock);
    }

    let mut items: Vec<LowStockItem> = supplies
        .iter()
        .filter(|s| s.is_active)
        .filter_map(|s| {
            let total_stock = totals.get(&s.id).copied().unwrap_or(0);
            is_below_minimum(total_stock, s.minimum_stock_level).then(|| LowStockItem {
                supply_id: s.id,
                supply_code: s.code.clone(),
                supply_name: s.name.clone(),
                unit: s.unit.clone(),
                total_stock,
                minimum_stock_level: s.minimum_stock_level,
                shortfall: i64::from(s.minimum_stock_level) - total_stock,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.shortfall
            .cmp(&a.shortfall)
            .then_with(|| a.supply_code.cmp(&b.supply_code))
    });
    items
}

/// Stocked lots expiring between now and now + `days`, soonest first
pub fn expiring_soon_report(
    supplies: &[Supply],
    levels: &[StockLevel],
    now: DateTime<Utc>,
    days: i64,
) -> Vec<ExpiryReportItem> {
    expiry_items(supplies, levels, now, |l| l.is_expiring_within(now, days))
}

/// Stocked lots already past expiry, oldest first
pub fn expired_report(
    supplies: &[Supply],
    levels: &[StockLevel],
    now: DateTime<Utc>,
) -> Vec<ExpiryReportItem> {
    expiry_items(supplies, levels, now, |l| l.is_expired_stock(now))
}

fn expiry_items<F>(
    supplies: &[Supply],
    levels: &[StockLevel],
    now: DateTime<Utc>,
    include: F,
) -> Vec<ExpiryReportItem>
where
    F: Fn(&StockLevel) -> bool,
{
    let by_id: HashMap<i64, &Supply> = supplies.iter().map(|s| (s.id, s)).collect();

    let mut items: Vec<ExpiryReportItem> = levels
        .iter()
        .filter(|l| include(l))
        .filter_map(|l| {
            let expiry_date = l.expiry_date?;
            let (supply_code, supply_name) = by_id
                .get(&l.supply_id)
                .map(|s| (s.code.clone(), s.name.clone()))
                .unwrap_or_default();

            Some(ExpiryReportItem {
                stock_level_id: l.id,
                supply_id: l.supply_id,
                supply_code,
                supply_name,
                lot_number: l.lot_number.clone(),
                expiry_date,
                current_stock: l.current_stock,
                days_until_expiry: (expiry_instant(expiry_date) - now).num_days(),
            })
        })
        .collect();

    items.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.stock_level_id.cmp(&b.stock_level_id))
    });
    items
}
