//! Stock report tests
//!
//! Tests for the read-only stock reports including:
//! - Low stock aggregation across lots
//! - Expiring-soon window
//! - Expired stock listing

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    expired_report, expiring_soon_report, is_below_minimum, low_stock_report, StockLevel, Supply,
    SupplyStock,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
}

fn today() -> NaiveDate {
    now().date_naive()
}

fn supply(id: i64, code: &str, minimum: i32) -> Supply {
    Supply {
        id,
        code: code.to_string(),
        name: format!("Supply {}", code),
        category: "consumables".to_string(),
        unit: "box".to_string(),
        minimum_stock_level: minimum,
        is_active: true,
        created_at: now(),
        updated_at: now(),
    }
}

fn lot(id: i64, supply_id: i64, stock: i32, expiry: Option<NaiveDate>) -> StockLevel {
    StockLevel {
        id,
        current_stock: stock,
        available_stock: stock,
        average_cost: Decimal::new(250, 2),
        total_value: Decimal::new(250, 2) * Decimal::from(stock.max(0)),
        ..StockLevel::empty(supply_id, Some(format!("LOT-{}", id)), expiry, now())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Lots are summed before comparing with the minimum
    #[test]
    fn test_low_stock_sums_lots() {
        let supplies = vec![supply(1, "GLV-M", 20), supply(2, "SYR-5ML", 10)];
        let levels = vec![
            lot(1, 1, 8, None),
            lot(2, 1, 7, None),
            lot(3, 2, 6, None),
            lot(4, 2, 9, None),
        ];

        let report = low_stock_report(&supplies, &levels);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].supply_code, "GLV-M");
        assert_eq!(report[0].total_stock, 15);
        assert_eq!(report[0].shortfall, 5);
    }

    /// Stock equal to the minimum counts as low
    #[test]
    fn test_low_stock_at_minimum() {
        let supplies = vec![supply(1, "GAUZE", 10)];
        let levels = vec![lot(1, 1, 10, None)];
        assert_eq!(low_stock_report(&supplies, &levels).len(), 1);
    }

    /// Active supplies without any stock row are reported at zero
    #[test]
    fn test_low_stock_without_rows() {
        let supplies = vec![supply(1, "IV-SET", 4)];
        let report = low_stock_report(&supplies, &[]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].total_stock, 0);
        assert_eq!(report[0].shortfall, 4);
    }

    /// Zero minimum and inactive supplies are skipped
    #[test]
    fn test_low_stock_skips_unmonitored() {
        let mut inactive = supply(2, "OLD-KIT", 50);
        inactive.is_active = false;
        let supplies = vec![supply(1, "MASK", 0), inactive];

        assert!(low_stock_report(&supplies, &[]).is_empty());
    }

    /// Largest shortfall first
    #[test]
    fn test_low_stock_order() {
        let supplies = vec![supply(1, "A-1", 10), supply(2, "B-2", 30), supply(3, "C-3", 10)];
        let report = low_stock_report(&supplies, &[lot(1, 1, 2, None)]);

        let codes: Vec<&str> = report.iter().map(|i| i.supply_code.as_str()).collect();
        assert_eq!(codes, vec!["B-2", "C-3", "A-1"]);
    }

    /// Expired lots with stock appear in the expired report
    #[test]
    fn test_expired_report() {
        let supplies = vec![supply(1, "AMOX-500", 0)];
        let levels = vec![
            lot(1, 1, 5, Some(today() - Duration::days(1))),
            lot(2, 1, 0, Some(today() - Duration::days(3))),
            lot(3, 1, 5, Some(today() + Duration::days(3))),
            lot(4, 1, 5, None),
        ];

        let report = expired_report(&supplies, &levels, now());
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].stock_level_id, 1);
        assert_eq!(report[0].current_stock, 5);
        assert_eq!(report[0].supply_name, "Supply AMOX-500");
        assert_eq!(report[0].days_until_expiry, -1);
    }

    /// Only stocked lots inside the window, soonest first
    #[test]
    fn test_expiring_soon_report() {
        let supplies = vec![supply(1, "PARA-500", 0)];
        let levels = vec![
            lot(1, 1, 5, Some(today() + Duration::days(20))),
            lot(2, 1, 5, Some(today() + Duration::days(5))),
            lot(3, 1, 5, Some(today() + Duration::days(45))),
            lot(4, 1, 0, Some(today() + Duration::days(2))),
            lot(5, 1, 5, Some(today() - Duration::days(2))),
        ];

        let report = expiring_soon_report(&supplies, &levels, now(), 30);
        let ids: Vec<i64> = report.iter().map(|i| i.stock_level_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(report[0].days_until_expiry, 4);
    }

    /// Per-supply view totals every lot
    #[test]
    fn test_supply_stock_totals() {
        let stock = SupplyStock::new(
            supply(1, "GLV-M", 20),
            vec![lot(1, 1, 8, None), lot(2, 1, 4, None)],
        );

        assert_eq!(stock.total_stock, 12);
        assert_eq!(stock.total_value, Decimal::new(3000, 2));
        assert!(stock.is_low_stock);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The report lists exactly the monitored supplies at or below minimum
        #[test]
        fn prop_low_stock_matches_rule(
            minimum in 0i32..100,
            stocks in prop::collection::vec(-20i32..100, 0..6)
        ) {
            let supplies = vec![supply(1, "ITEM-1", minimum)];
            let levels: Vec<StockLevel> = stocks
                .iter()
                .enumerate()
                .map(|(i, s)| lot(i as i64 + 1, 1, *s, None))
                .collect();
            let total: i64 = stocks.iter().map(|s| i64::from(*s)).sum();

            let report = low_stock_report(&supplies, &levels);
            prop_assert_eq!(report.len() == 1, is_below_minimum(total, minimum));
            if let Some(item) = report.first() {
                prop_assert_eq!(item.total_stock, total);
                prop_assert!(item.shortfall >= 0);
            }
        }

        /// A lot is never in both the expired and expiring-soon reports
        #[test]
        fn prop_expiry_reports_disjoint(
            offsets in prop::collection::vec(-60i64..60, 1..10),
            window in 1i64..60
        ) {
            let supplies = vec![supply(1, "ITEM-1", 0)];
            let levels: Vec<StockLevel> = offsets
                .iter()
                .enumerate()
                .map(|(i, d)| lot(i as i64 + 1, 1, 3, Some(today() + Duration::days(*d))))
                .collect();

            let expired = expired_report(&supplies, &levels, now());
            let expiring = expiring_soon_report(&supplies, &levels, now(), window);

            for item in &expired {
                prop_assert!(expiring.iter().all(|e| e.stock_level_id != item.stock_level_id));
            }
        }
    }
}
