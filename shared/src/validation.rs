//! Validation utilities for the clinic operations platform

use rust_decimal::Decimal;

use crate::models::MAX_UNIT_COST;

/// Longest look-ahead accepted for expiry windows
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 365;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Transaction quantities are whole units and strictly positive; direction carries the sign
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Unit cost is optional but never negative
pub fn validate_unit_cost(unit_cost: Option<Decimal>) -> Result<(), &'static str> {
    match unit_cost {
        Some(cost) if cost < Decimal::ZERO => Err("Unit cost cannot be negative"),
        Some(cost) if cost > MAX_UNIT_COST => Err("Unit cost cannot exceed 999999999999.99"),
        Some(cost) if cost.scale() > 2 && cost.round_dp(2) != cost => {
            Err("Unit cost supports at most two decimal places")
        }
        _ => Ok(()),
    }
}

/// Lot numbers: 1-50 characters of letters, digits, '-', '_' or '/'
pub fn validate_lot_number(lot: &str) -> Result<(), &'static str> {
    if lot.is_empty() || lot.len() > 50 {
        return Err("Lot number must be 1-50 characters");
    }
    if !lot
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
    {
        return Err("Lot number may only contain letters, digits, '-', '_' and '/'");
    }
    Ok(())
}

/// Supply codes: 2-30 uppercase alphanumerics, '-' allowed between them
pub fn validate_supply_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 || code.len() > 30 {
        return Err("Supply code must be 2-30 characters");
    }
    if code.starts_with('-') || code.ends_with('-') {
        return Err("Supply code cannot start or end with '-'");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Supply code must be uppercase alphanumeric");
    }
    Ok(())
}

/// Expiry windows, in days, run from 1 to a year
pub fn validate_expiry_window(days: i64) -> Result<(), &'static str> {
    if !(1..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
        return Err("Expiry window must be between 1 and 365 days");
    }
    Ok(())
}

/// Rejection and decline reasons are free text, required, at most 500 characters
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err("Reason is required");
    }
    if trimmed.chars().count() > 500 {
        return Err("Reason must be at most 500 characters");
    }
    Ok(())
}

// ============================================================================
// Patient Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate a Philippine mobile number.
/// Accepts: 09171234567, 0917-123-4567, +639171234567
pub fn validate_mobile_number(phone: &str) -> Result<(), &'static str> {
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
    {
        return Err("Invalid mobile number format");
    }
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 && digits.starts_with("09") {
        return Ok(());
    }
    if digits.len() == 12 && digits.starts_with("639") {
        return Ok(());
    }

    Err("Invalid mobile number format")
}

pub fn validate_blood_type(blood_type: &str) -> Result<(), &'static str> {
    const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
    if BLOOD_TYPES.contains(&blood_type.trim().to_ascii_uppercase().as_str()) {
        Ok(())
    } else {
        Err("Unknown blood type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_unit_cost() {
        assert!(validate_unit_cost(None).is_ok());
        assert!(validate_unit_cost(Some(Decimal::ZERO)).is_ok());
        assert!(validate_unit_cost(Some(Decimal::new(1250, 2))).is_ok());
        assert!(validate_unit_cost(Some(Decimal::new(12500, 3))).is_ok());
        assert!(validate_unit_cost(Some(Decimal::new(12501, 3))).is_err());
        assert!(validate_unit_cost(Some(Decimal::new(-1, 2))).is_err());
        assert!(validate_unit_cost(Some(MAX_UNIT_COST)).is_ok());
        assert!(validate_unit_cost(Some(Decimal::new(100_000_000_000_000, 2))).is_err());
        let huge: Decimal = "100000000000000000000".parse().unwrap();
        assert!(validate_unit_cost(Some(huge)).is_err());
    }

    #[test]
    fn test_validate_expiry_window() {
        assert!(validate_expiry_window(1).is_ok());
        assert!(validate_expiry_window(MAX_EXPIRY_WINDOW_DAYS).is_ok());
        assert!(validate_expiry_window(0).is_err());
        assert!(validate_expiry_window(-30).is_err());
        assert!(validate_expiry_window(10_000_000_000_000).is_err());
    }

    #[test]
    fn test_validate_lot_number() {
        assert!(validate_lot_number("LOT-2024/07_A").is_ok());
        assert!(validate_lot_number("").is_err());
        assert!(validate_lot_number("lot 1").is_err());
        assert!(validate_lot_number(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_supply_code() {
        assert!(validate_supply_code("GLV-NTR-M").is_ok());
        assert!(validate_supply_code("PCM500").is_ok());
        assert!(validate_supply_code("g").is_err());
        assert!(validate_supply_code("glv").is_err());
        assert!(validate_supply_code("-GLV").is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("damaged").is_ok());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_mobile_number() {
        assert!(validate_mobile_number("09171234567").is_ok());
        assert!(validate_mobile_number("0917-123-4567").is_ok());
        assert!(validate_mobile_number("+639171234567").is_ok());
        assert!(validate_mobile_number("12345").is_err());
        assert!(validate_mobile_number(&format!("09171234567{}", "x".repeat(30))).is_err());
    }

    #[test]
    fn test_validate_blood_type() {
        assert!(validate_blood_type("ab+").is_ok());
        assert!(validate_blood_type("O-").is_ok());
        assert!(validate_blood_type("C+").is_err());
    }
}
