//! Stock levels per supply and lot, and the ledger arithmetic that keeps them current

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Days ahead of expiry at which a lot is flagged as near expiry
pub const NEAR_EXPIRY_DAYS: i64 = 30;

/// Largest unit or average cost a stock row can hold, NUMERIC(14,2)
pub const MAX_UNIT_COST: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Largest stock value a stock row can hold, NUMERIC(16,2)
pub const MAX_STOCK_VALUE: Decimal = Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, 2);

/// Stock on hand for one supply, optionally narrowed to a single lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: i64,
    pub supply_id: i64,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub current_stock: i32,
    /// Stored for reporting only, nothing reserves stock yet
    pub reserved_stock: i32,
    pub available_stock: i32,
    pub average_cost: Decimal,
    pub total_value: Decimal,
    pub is_expired: bool,
    pub is_near_expiry: bool,
    pub updated_at: DateTime<Utc>,
}

/// What to do when an outgoing delta would take stock below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeStockPolicy {
    /// Apply the delta anyway and let the balance go negative
    #[default]
    Allow,
    /// Refuse the delta
    Reject,
}

/// Knobs the ledger consults while applying a delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub negative_stock: NegativeStockPolicy,
    pub near_expiry_days: i64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            negative_stock: NegativeStockPolicy::Allow,
            near_expiry_days: NEAR_EXPIRY_DAYS,
        }
    }
}

/// Errors raised by the stock ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient stock: {on_hand} on hand, {requested} requested")]
    InsufficientStock { on_hand: i32, requested: i32 },

    #[error("Unit cost cannot be negative")]
    NegativeUnitCost,

    #[error("Unit cost cannot exceed 999999999999.99")]
    UnitCostTooLarge,

    #[error("Stock quantity out of range")]
    Overflow,

    #[error("Stock value out of range")]
    ValueOverflow,
}

/// Expiry classification of a dated lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    NearExpiry,
    Fresh,
}

impl StockLevel {
    /// An empty stock row, as created the first time a transaction touches a supply/lot
    pub fn empty(
        supply_id: i64,
        lot_number: Option<String>,
        expiry_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            supply_id,
            lot_number,
            expiry_date,
            current_stock: 0,
            reserved_stock: 0,
            available_stock: 0,
            average_cost: Decimal::ZERO,
            total_value: Decimal::ZERO,
            is_expired: false,
            is_near_expiry: false,
            updated_at: now,
        }
    }

    /// Apply a signed quantity movement to this row.
    ///
    /// Incoming stock (`delta > 0`) is blended into the weighted average cost;
    /// when no unit cost is supplied the current average is used, which leaves
    /// the average unchanged. Outgoing stock never touches the average.
    /// `current_stock` and `available_stock` move together.
    pub fn apply_delta(
        &mut self,
        delta: i32,
        unit_cost: Option<Decimal>,
        now: DateTime<Utc>,
        policy: &LedgerPolicy,
    ) -> Result<(), LedgerError> {
        match unit_cost {
            Some(cost) if cost < Decimal::ZERO => return Err(LedgerError::NegativeUnitCost),
            Some(cost) if cost > MAX_UNIT_COST => return Err(LedgerError::UnitCostTooLarge),
            _ => {}
        }

        let new_current = self
            .current_stock
            .checked_add(delta)
            .ok_or(LedgerError::Overflow)?;
        let new_available = self
            .available_stock
            .checked_add(delta)
            .ok_or(LedgerError::Overflow)?;

        if delta < 0
            && new_current < 0
            && policy.negative_stock == NegativeStockPolicy::Reject
        {
            return Err(LedgerError::InsufficientStock {
                on_hand: self.current_stock,
                requested: delta.saturating_neg(),
            });
        }

        let average_cost = if delta > 0 {
            let incoming_cost = unit_cost.unwrap_or(self.average_cost);
            weighted_average_cost(self.current_stock, self.average_cost, delta, incoming_cost)?
        } else {
            self.average_cost
        };
        let total_value = stock_value(average_cost, new_current)?;

        self.average_cost = average_cost;
        self.current_stock = new_current;
        self.available_stock = new_available;
        self.total_value = total_value;
        self.refresh_expiry(now, policy.near_expiry_days);
        self.updated_at = now;

        Ok(())
    }

    /// Recompute the expiry flags. Rows without an expiry date are left alone.
    pub fn refresh_expiry(&mut self, now: DateTime<Utc>, near_expiry_days: i64) {
        if let Some(expiry) = self.expiry_date {
            let status = expiry_status(expiry, now, near_expiry_days);
            self.is_expired = status == ExpiryStatus::Expired;
            self.is_near_expiry = status == ExpiryStatus::NearExpiry;
        }
    }

    /// Dated, still stocked, and expiring between now and now + `days`
    pub fn is_expiring_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        match self.expiry_date {
            Some(expiry) if self.current_stock > 0 => {
                let at = expiry_instant(expiry);
                at >= now && within_window(at, now, days)
            }
            _ => false,
        }
    }

    /// Dated, still stocked, and past its expiry
    pub fn is_expired_stock(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date {
            Some(expiry) if self.current_stock > 0 => now > expiry_instant(expiry),
            _ => false,
        }
    }
}

/// Weighted average cost after receiving `incoming_qty` units at `incoming_cost`.
///
/// Only the non-negative part of the current stock counts as the existing base,
/// so receiving into a negative balance prices the lot at the incoming cost.
pub fn weighted_average_cost(
    current_qty: i32,
    current_avg: Decimal,
    incoming_qty: i32,
    incoming_cost: Decimal,
) -> Result<Decimal, LedgerError> {
    let base = Decimal::from(current_qty.max(0));
    let incoming = Decimal::from(incoming_qty);
    let total_qty = base + incoming;

    if total_qty.is_zero() {
        return Ok(round_money(incoming_cost));
    }

    let existing = current_avg
        .checked_mul(base)
        .ok_or(LedgerError::ValueOverflow)?;
    let received = incoming_cost
        .checked_mul(incoming)
        .ok_or(LedgerError::ValueOverflow)?;
    let average = existing
        .checked_add(received)
        .and_then(|sum| sum.checked_div(total_qty))
        .ok_or(LedgerError::ValueOverflow)?;

    Ok(round_money(average))
}

/// Value of the stock on hand; negative balances are worth nothing
pub fn stock_value(average_cost: Decimal, current_stock: i32) -> Result<Decimal, LedgerError> {
    let value = average_cost
        .checked_mul(Decimal::from(current_stock.max(0)))
        .map(round_money)
        .ok_or(LedgerError::ValueOverflow)?;

    if value > MAX_STOCK_VALUE {
        return Err(LedgerError::ValueOverflow);
    }
    Ok(value)
}

/// Round to two places, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The instant a lot expires: midnight UTC at the start of its expiry date
pub fn expiry_instant(expiry: NaiveDate) -> DateTime<Utc> {
    expiry.and_time(NaiveTime::MIN).and_utc()
}

/// Whether `at` falls no later than `days` after `now`.
///
/// A positive window that runs past the end of the calendar covers every later instant.
fn within_window(at: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> bool {
    match Duration::try_days(days).and_then(|window| now.checked_add_signed(window)) {
        Some(end) => at <= end,
        None => days > 0,
    }
}

/// Classify an expiry date relative to `now`. Expired and near expiry never overlap.
pub fn expiry_status(expiry: NaiveDate, now: DateTime<Utc>, near_expiry_days: i64) -> ExpiryStatus {
    let at = expiry_instant(expiry);
    if now > at {
        ExpiryStatus::Expired
    } else if at > now && within_window(at, now, near_expiry_days) {
        ExpiryStatus::NearExpiry
    } else {
        ExpiryStatus::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn receiving_into_empty_row_takes_incoming_cost() {
        let mut level = StockLevel::empty(1, None, None, noon());
        level
            .apply_delta(100, Some(dec("10.00")), noon(), &LedgerPolicy::default())
            .unwrap();

        assert_eq!(level.current_stock, 100);
        assert_eq!(level.available_stock, 100);
        assert_eq!(level.average_cost, dec("10.00"));
        assert_eq!(level.total_value, dec("1000.00"));
    }

    #[test]
    fn receiving_without_cost_keeps_average() {
        let mut level = StockLevel::empty(1, None, None, noon());
        let policy = LedgerPolicy::default();
        level.apply_delta(10, Some(dec("4.25")), noon(), &policy).unwrap();
        level.apply_delta(5, None, noon(), &policy).unwrap();

        assert_eq!(level.average_cost, dec("4.25"));
        assert_eq!(level.total_value, dec("63.75"));
    }

    #[test]
    fn receiving_into_negative_balance_uses_incoming_cost() {
        let mut level = StockLevel::empty(1, None, None, noon());
        let policy = LedgerPolicy::default();
        level.apply_delta(-5, None, noon(), &policy).unwrap();
        assert_eq!(level.current_stock, -5);
        assert_eq!(level.total_value, Decimal::ZERO);

        level.apply_delta(10, Some(dec("3.00")), noon(), &policy).unwrap();
        assert_eq!(level.current_stock, 5);
        assert_eq!(level.average_cost, dec("3.00"));
        assert_eq!(level.total_value, dec("15.00"));
    }

    #[test]
    fn reject_policy_refuses_overdraw() {
        let mut level = StockLevel::empty(1, None, None, noon());
        let policy = LedgerPolicy {
            negative_stock: NegativeStockPolicy::Reject,
            ..LedgerPolicy::default()
        };
        level.apply_delta(3, Some(dec("1.00")), noon(), &policy).unwrap();

        let err = level.apply_delta(-4, None, noon(), &policy).unwrap_err();
        assert_eq!(err, LedgerError::InsufficientStock { on_hand: 3, requested: 4 });
        assert_eq!(level.current_stock, 3);
    }

    #[test]
    fn negative_unit_cost_is_refused() {
        let mut level = StockLevel::empty(1, None, None, noon());
        let err = level
            .apply_delta(1, Some(dec("-0.01")), noon(), &LedgerPolicy::default())
            .unwrap_err();
        assert_eq!(err, LedgerError::NegativeUnitCost);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_money(dec("2.345")), dec("2.35"));
        assert_eq!(round_money(dec("2.344")), dec("2.34"));
        // 1 @ 1.00 + 2 @ 1.01 = 3.02 / 3 = 1.00666...
        assert_eq!(weighted_average_cost(1, dec("1.00"), 2, dec("1.01")), Ok(dec("1.01")));
    }

    #[test]
    fn expiry_boundaries() {
        let now = noon();
        let today = now.date_naive();

        assert_eq!(expiry_status(today, now, 30), ExpiryStatus::Expired);
        assert_eq!(
            expiry_status(today + Duration::days(1), now, 30),
            ExpiryStatus::NearExpiry
        );
        assert_eq!(
            expiry_status(today + Duration::days(30), now, 30),
            ExpiryStatus::NearExpiry
        );
        assert_eq!(
            expiry_status(today + Duration::days(31), now, 30),
            ExpiryStatus::Fresh
        );
    }

    #[test]
    fn cost_limits_match_column_range() {
        assert_eq!(MAX_UNIT_COST, dec("999999999999.99"));
        assert_eq!(MAX_STOCK_VALUE, dec("99999999999999.99"));
    }

    #[test]
    fn oversized_cost_is_refused_without_touching_the_row() {
        let mut level = StockLevel::empty(1, None, None, noon());
        let huge = Some(dec("100000000000000000000"));
        let err = level
            .apply_delta(1_000_000_000, huge, noon(), &LedgerPolicy::default())
            .unwrap_err();
        assert_eq!(err, LedgerError::UnitCostTooLarge);
        assert_eq!(level, StockLevel::empty(1, None, None, noon()));
    }

    #[test]
    fn huge_expiry_window_does_not_panic() {
        let now = noon();
        let today = now.date_naive();
        assert_eq!(
            expiry_status(today + Duration::days(5), now, 10_000_000_000_000),
            ExpiryStatus::NearExpiry
        );
        assert_eq!(
            expiry_status(today + Duration::days(5), now, i64::MIN),
            ExpiryStatus::Fresh
        );
    }

    #[test]
    fn rows_without_expiry_keep_flags_clear() {
        let mut level = StockLevel::empty(1, Some("LOT-1".into()), None, noon());
        level.refresh_expiry(noon(), 30);
        assert!(!level.is_expired);
        assert!(!level.is_near_expiry);
        assert!(!level.is_expired_stock(noon()));
    }
}
