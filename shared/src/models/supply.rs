//! Supply catalogue models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::StockLevel;

/// A stocked supply item (medicine, consumable, equipment part)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supply {
    pub id: i64,
    /// Unique catalogue code (e.g., "GLV-NTR-M")
    pub code: String,
    pub name: String,
    pub category: String,
    /// Unit of issue, e.g. "box", "piece", "vial"
    pub unit: String,
    pub minimum_stock_level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// All lots of one supply with aggregate figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyStock {
    #[serde(flatten)]
    pub supply: Supply,
    pub lots: Vec<StockLevel>,
    pub total_stock: i64,
    pub total_value: Decimal,
    pub is_low_stock: bool,
}

impl SupplyStock {
    pub fn new(supply: Supply, lots: Vec<StockLevel>) -> Self {
        let total_stock: i64 = lots.iter().map(|l| i64::from(l.current_stock)).sum();
        let total_value: Decimal = lots.iter().map(|l| l.total_value).sum();
        let is_low_stock = is_below_minimum(total_stock, supply.minimum_stock_level);

        Self {
            supply,
            lots,
            total_stock,
            total_value,
            is_low_stock,
        }
    }
}

/// Low stock means at or below a positive minimum. A minimum of zero disables the check.
pub fn is_below_minimum(total_stock: i64, minimum_stock_level: i32) -> bool {
    minimum_stock_level > 0 && total_stock <= i64::from(minimum_stock_level)
}
