//! Point-of-sale allocation tests
//!
//! Tests for sale line allocation across lots:
//! - earliest expiry depletes first, missing expiry last
//! - a line that cannot be covered fails whole, before any depletion
//! - sale totals price each slice at its lot's unit price

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[derive(Debug, Clone)]
struct Lot {
    expiry: Option<NaiveDate>,
    units: i64,
    unit_price: Decimal,
}

/// Allocate one requested quantity across lots, earliest expiry first with
/// NULL expiry last. `taken` carries units already claimed by earlier lines
/// of the same sale. Returns per-lot slices or None when the remaining
/// stock cannot cover the request.
fn allocate_with_taken(
    lots: &[Lot],
    requested: i64,
    taken: &mut Vec<i64>,
) -> Option<Vec<(usize, i64)>> {
    let available: i64 = lots
        .iter()
        .enumerate()
        .map(|(i, l)| (l.units - taken[i]).max(0))
        .sum();
    if available < requested {
        return None;
    }

    let mut order: Vec<usize> = (0..lots.len()).collect();
    order.sort_by_key(|&i| match lots[i].expiry {
        Some(d) => (0, d),
        None => (1, NaiveDate::MAX),
    });

    let mut remaining = requested;
    let mut slices = Vec::new();
    for i in order {
        if remaining == 0 {
            break;
        }
        let take = remaining.min((lots[i].units - taken[i]).max(0));
        if take > 0 {
            taken[i] += take;
            slices.push((i, take));
            remaining -= take;
        }
    }
    Some(slices)
}

/// Single-line allocation against untouched lots.
fn allocate(lots: &[Lot], requested: i64) -> Option<Vec<(usize, i64)>> {
    let mut taken = vec![0i64; lots.len()];
    allocate_with_taken(lots, requested, &mut taken)
}

/// Allocate a whole sale: each line sees only the stock the earlier lines
/// left behind, so a sale cannot sell the same units twice.
fn allocate_sale(lots: &[Lot], lines: &[i64]) -> Option<Vec<(usize, i64)>> {
    let mut taken = vec![0i64; lots.len()];
    let mut slices = Vec::new();
    for &requested in lines {
        slices.extend(allocate_with_taken(lots, requested, &mut taken)?);
    }
    Some(slices)
}

fn total(lots: &[Lot], slices: &[(usize, i64)]) -> Decimal {
    slices
        .iter()
        .map(|(i, q)| lots[*i].unit_price * Decimal::from(*q))
        .sum()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_earliest_expiry_depletes_first() {
        let lots = vec![
            Lot { expiry: Some(date("2027-01-01")), units: 50, unit_price: dec("2") },
            Lot { expiry: Some(date("2026-06-01")), units: 30, unit_price: dec("3") },
        ];
        let slices = allocate(&lots, 40).unwrap();
        // The June lot drains before the January one is touched
        assert_eq!(slices, vec![(1, 30), (0, 10)]);
    }

    #[test]
    fn test_missing_expiry_goes_last() {
        let lots = vec![
            Lot { expiry: None, units: 100, unit_price: dec("2") },
            Lot { expiry: Some(date("2026-06-01")), units: 10, unit_price: dec("2") },
        ];
        let slices = allocate(&lots, 15).unwrap();
        assert_eq!(slices, vec![(1, 10), (0, 5)]);
    }

    #[test]
    fn test_insufficient_stock_fails_whole() {
        let lots = vec![
            Lot { expiry: None, units: 10, unit_price: dec("2") },
            Lot { expiry: None, units: 5, unit_price: dec("2") },
        ];
        assert!(allocate(&lots, 16).is_none());
        // Exactly the available amount still succeeds
        assert!(allocate(&lots, 15).is_some());
    }

    /// Two lines naming the same medicine share one pool of stock: the
    /// second line only sees what the first left behind.
    #[test]
    fn test_duplicate_medicine_lines_cannot_oversell() {
        let lots = vec![
            Lot { expiry: Some(date("2026-06-01")), units: 100, unit_price: dec("2") },
        ];
        // 60 + 60 against 100 fails, even though each line alone would fit
        assert!(allocate_sale(&lots, &[60, 60]).is_none());
        // 60 + 40 drains the lot exactly
        let slices = allocate_sale(&lots, &[60, 40]).unwrap();
        assert_eq!(slices, vec![(0, 60), (0, 40)]);
    }

    /// The second line of a sale spills into a later-expiring lot once the
    /// first line has drained the earliest one.
    #[test]
    fn test_later_line_spills_into_next_lot() {
        let lots = vec![
            Lot { expiry: Some(date("2026-06-01")), units: 50, unit_price: dec("3") },
            Lot { expiry: Some(date("2027-01-01")), units: 50, unit_price: dec("2") },
        ];
        let slices = allocate_sale(&lots, &[50, 30]).unwrap();
        assert_eq!(slices, vec![(0, 50), (1, 30)]);
    }

    #[test]
    fn test_total_prices_each_slice_at_its_lot() {
        let lots = vec![
            Lot { expiry: Some(date("2026-01-01")), units: 10, unit_price: dec("2.5") },
            Lot { expiry: Some(date("2027-01-01")), units: 10, unit_price: dec("4") },
        ];
        let slices = allocate(&lots, 14).unwrap();
        // 10 units at 2.50 plus 4 units at 4.00
        assert_eq!(total(&lots, &slices), dec("41"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// A successful allocation always covers exactly the requested quantity
    /// and never overdraws any lot.
    #[test]
    fn prop_allocation_exact_and_bounded(
        units in prop::collection::vec(0i64..500, 1..10),
        requested in 0i64..2_000,
    ) {
        let lots: Vec<Lot> = units
            .iter()
            .map(|&u| Lot { expiry: None, units: u, unit_price: dec("1") })
            .collect();

        match allocate(&lots, requested) {
            Some(slices) => {
                let allocated: i64 = slices.iter().map(|(_, q)| q).sum();
                prop_assert_eq!(allocated, requested);
                for (i, q) in slices {
                    prop_assert!(q <= lots[i].units);
                    prop_assert!(q > 0);
                }
            }
            None => {
                let available: i64 = lots.iter().map(|l| l.units).sum();
                prop_assert!(available < requested);
            }
        }
    }

    /// Across all lines of a sale, no lot is ever drawn past its units.
    #[test]
    fn prop_sale_lines_never_overdraw_any_lot(
        units in prop::collection::vec(0i64..500, 1..6),
        lines in prop::collection::vec(1i64..400, 1..5),
    ) {
        let lots: Vec<Lot> = units
            .iter()
            .map(|&u| Lot { expiry: None, units: u, unit_price: dec("1") })
            .collect();

        match allocate_sale(&lots, &lines) {
            Some(slices) => {
                let mut drawn = vec![0i64; lots.len()];
                for (i, q) in slices {
                    drawn[i] += q;
                }
                for (i, lot) in lots.iter().enumerate() {
                    prop_assert!(drawn[i] <= lot.units);
                }
            }
            None => {
                let available: i64 = lots.iter().map(|l| l.units).sum();
                let requested: i64 = lines.iter().sum();
                prop_assert!(available < requested);
            }
        }
    }

    /// At a uniform unit price the total is quantity times price.
    #[test]
    fn prop_uniform_price_total(
        units in prop::collection::vec(1i64..500, 1..8),
        price in 1u32..1_000,
    ) {
        let lots: Vec<Lot> = units
            .iter()
            .map(|&u| Lot { expiry: None, units: u, unit_price: Decimal::from(price) })
            .collect();
        let available: i64 = units.iter().sum();

        let slices = allocate(&lots, available).unwrap();
        prop_assert_eq!(total(&lots, &slices), Decimal::from(price) * Decimal::from(available));
    }
}
