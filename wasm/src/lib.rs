//! WebAssembly module for the clinic operations front end
//!
//! Provides client-side computation for:
//! - Previewing a stock movement before it is recorded
//! - Expiry status of a lot
//! - Transaction form validation
//! - Patient field placeholders

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&"clinic-wasm initialized".into());
}

fn js_error(message: impl AsRef<str>) -> JsValue {
    js_sys::Error::new(message.as_ref()).into()
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| format!("{} must be a decimal number", field))
}

fn instant_from_millis(now_millis: f64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(now_millis as i64).ok_or_else(|| "Invalid timestamp".to_string())
}

fn parse_policy(policy: &str) -> Result<NegativeStockPolicy, String> {
    match policy {
        "allow" => Ok(NegativeStockPolicy::Allow),
        "reject" => Ok(NegativeStockPolicy::Reject),
        other => Err(format!("Unknown negative stock policy '{}'", other)),
    }
}

fn parse_window(near_expiry_days: i64) -> Result<i64, String> {
    validate_expiry_window(near_expiry_days).map_err(str::to_string)?;
    Ok(near_expiry_days)
}

fn preview(
    level_json: &str,
    delta: i32,
    unit_cost: Option<String>,
    now_millis: f64,
    negative_stock: &str,
    near_expiry_days: i64,
) -> Result<String, String> {
    let mut level: StockLevel =
        serde_json::from_str(level_json).map_err(|e| format!("Invalid stock level JSON: {}", e))?;
    let unit_cost = unit_cost
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(|c| parse_decimal("unit_cost", c))
        .transpose()?;
    let policy = LedgerPolicy {
        negative_stock: parse_policy(negative_stock)?,
        near_expiry_days: parse_window(near_expiry_days)?,
    };

    level
        .apply_delta(delta, unit_cost, instant_from_millis(now_millis)?, &policy)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&level).map_err(|e| e.to_string())
}

/// Apply a signed delta to a stock level (JSON) and return the resulting level as JSON
#[wasm_bindgen]
pub fn preview_stock_delta(
    level_json: &str,
    delta: i32,
    unit_cost: Option<String>,
    now_millis: f64,
    negative_stock: &str,
    near_expiry_days: i64,
) -> Result<String, JsValue> {
    preview(
        level_json,
        delta,
        unit_cost,
        now_millis,
        negative_stock,
        near_expiry_days,
    )
    .map_err(js_error)
}

/// Weighted average cost after a receipt, as a decimal string
#[wasm_bindgen]
pub fn preview_average_cost(
    current_qty: i32,
    current_avg: &str,
    incoming_qty: i32,
    incoming_cost: &str,
) -> Result<String, JsValue> {
    average_cost(current_qty, current_avg, incoming_qty, incoming_cost).map_err(js_error)
}

fn average_cost(
    current_qty: i32,
    current_avg: &str,
    incoming_qty: i32,
    incoming_cost: &str,
) -> Result<String, String> {
    let current_avg = parse_decimal("current_avg", current_avg)?;
    let incoming_cost = parse_decimal("incoming_cost", incoming_cost)?;
    validate_unit_cost(Some(incoming_cost)).map_err(str::to_string)?;
    weighted_average_cost(current_qty, current_avg, incoming_qty, incoming_cost)
        .map(|avg| avg.to_string())
        .map_err(|e| e.to_string())
}

/// "expired", "near_expiry" or "fresh" for a YYYY-MM-DD expiry date
#[wasm_bindgen]
pub fn lot_expiry_status(
    expiry_date: &str,
    now_millis: f64,
    near_expiry_days: i64,
) -> Result<String, JsValue> {
    expiry_label(expiry_date, now_millis, near_expiry_days)
        .map(str::to_string)
        .map_err(js_error)
}

fn expiry_label(
    expiry_date: &str,
    now_millis: f64,
    near_expiry_days: i64,
) -> Result<&'static str, String> {
    let expiry = NaiveDate::parse_from_str(expiry_date, "%Y-%m-%d")
        .map_err(|_| "Expiry date must be YYYY-MM-DD".to_string())?;
    let now = instant_from_millis(now_millis)?;

    Ok(match expiry_status(expiry, now, parse_window(near_expiry_days)?) {
        ExpiryStatus::Expired => "expired",
        ExpiryStatus::NearExpiry => "near_expiry",
        ExpiryStatus::Fresh => "fresh",
    })
}

/// Validate a transaction form; returns the first problem, or None when valid
#[wasm_bindgen]
pub fn validate_transaction_form(
    transaction_type: &str,
    subtype: &str,
    quantity: i32,
    unit_cost: Option<String>,
    lot_number: Option<String>,
) -> Option<String> {
    let transaction_type = match TransactionType::parse(transaction_type) {
        Some(t) => t,
        None => return Some("Unknown transaction type".to_string()),
    };
    let subtype = match TransactionSubtype::parse(subtype) {
        Some(s) => s,
        None => return Some("Unknown transaction subtype".to_string()),
    };
    if !subtype.allowed_for(transaction_type) {
        return Some(format!(
            "Subtype '{}' is not allowed for '{}' transactions",
            subtype.as_str(),
            transaction_type.as_str()
        ));
    }
    if let Err(msg) = validate_quantity(quantity) {
        return Some(msg.to_string());
    }
    if let Some(cost) = unit_cost.as_deref().filter(|c| !c.trim().is_empty()) {
        match parse_decimal("unit_cost", cost) {
            Ok(cost) => {
                if let Err(msg) = validate_unit_cost(Some(cost)) {
                    return Some(msg.to_string());
                }
            }
            Err(msg) => return Some(msg),
        }
    }
    if let Some(lot) = lot_number.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        if let Err(msg) = validate_lot_number(lot) {
            return Some(msg.to_string());
        }
    }
    None
}

/// Placeholder a blank patient field will be saved with
#[wasm_bindgen]
pub fn patient_field_placeholder(column: &str) -> Option<String> {
    default_for(column).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-06-15T12:00:00Z
    const NOON_MS: f64 = 1_718_452_800_000.0;

    fn empty_level_json() -> String {
        let now = instant_from_millis(NOON_MS).unwrap();
        serde_json::to_string(&StockLevel::empty(1, Some("LOT-1".into()), None, now)).unwrap()
    }

    #[test]
    fn test_preview_receipt_sets_cost_and_value() {
        let json = preview(&empty_level_json(), 10, Some("12.50".into()), NOON_MS, "allow", 30)
            .unwrap();
        let level: StockLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(level.current_stock, 10);
        assert_eq!(level.average_cost, Decimal::new(1250, 2));
        assert_eq!(level.total_value, Decimal::new(12500, 2));
    }

    #[test]
    fn test_preview_respects_reject_policy() {
        let err = preview(&empty_level_json(), -1, None, NOON_MS, "reject", 30).unwrap_err();
        assert!(err.contains("Insufficient stock"));
    }

    #[test]
    fn test_preview_average_cost() {
        // (10 * 10.00 + 10 * 20.00) / 20
        let avg: Decimal = preview_average_cost(10, "10.00", 10, "20.00")
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(avg, Decimal::new(15, 0));
    }

    #[test]
    fn test_preview_rejects_out_of_range_cost_and_window() {
        let err = preview(
            &empty_level_json(),
            1_000_000_000,
            Some("100000000000000000000".into()),
            NOON_MS,
            "allow",
            30,
        )
        .unwrap_err();
        assert!(err.contains("Unit cost"));

        let err = preview(&empty_level_json(), 1, None, NOON_MS, "allow", 10_000_000_000_000)
            .unwrap_err();
        assert!(err.contains("Expiry window"));
        assert!(average_cost(1, "1.00", 1, "100000000000000000000").is_err());
    }

    #[test]
    fn test_expiry_label_rejects_bad_window() {
        assert_eq!(expiry_label("2024-07-01", NOON_MS, 30), Ok("near_expiry"));
        assert!(expiry_label("2024-07-01", NOON_MS, 0).is_err());
        assert!(expiry_label("2024-07-01", NOON_MS, i64::MAX).is_err());
    }

    #[test]
    fn test_lot_expiry_status() {
        assert_eq!(lot_expiry_status("2024-06-01", NOON_MS, 30).unwrap(), "expired");
        assert_eq!(lot_expiry_status("2024-07-01", NOON_MS, 30).unwrap(), "near_expiry");
        assert_eq!(lot_expiry_status("2025-01-01", NOON_MS, 30).unwrap(), "fresh");
    }

    #[test]
    fn test_validate_transaction_form() {
        assert_eq!(
            validate_transaction_form("in", "received", 5, Some("3.25".into()), None),
            None
        );
        assert!(validate_transaction_form("in", "consumed", 5, None, None).is_some());
        assert!(validate_transaction_form("out", "consumed", 0, None, None).is_some());
        assert!(validate_transaction_form("out", "damaged", 1, None, Some("bad lot!".into()))
            .is_some());
    }

    #[test]
    fn test_patient_field_placeholder() {
        assert_eq!(patient_field_placeholder("allergies").as_deref(), Some("NONE"));
        assert_eq!(patient_field_placeholder("first_name"), None);
    }
}
