//! Pack/unit arithmetic and ledger math for the stock engine
//!
//! A lot is purchased in packs and sold in units (`units_per_pack`
//! conversion). `total_units` is the authoritative counter; `packs` is an
//! approximation re-derived by floor division whenever units change, so
//! partial-pack remainders are discarded.

use rust_decimal::Decimal;

/// Apply a delta to a unit counter, clamping the result at zero.
pub fn clamp_units(current: i64, delta: i64) -> i64 {
    (current + delta).max(0)
}

/// Re-derive the pack count from units. Floor division: a lot with 75 units
/// at 10 per pack reports 7 packs, the loose 5 units live only in
/// `total_units`.
pub fn derive_packs(total_units: i64, units_per_pack: i32) -> i32 {
    if units_per_pack <= 0 {
        return 0;
    }
    (total_units.max(0) / units_per_pack as i64) as i32
}

/// Per-unit buy price, fixed when the lot is created.
pub fn unit_buy_price(buy_price_per_pack: Decimal, units_per_pack: i32) -> Decimal {
    if units_per_pack <= 0 {
        return Decimal::ZERO;
    }
    buy_price_per_pack / Decimal::from(units_per_pack)
}

/// Per-unit sale price.
pub fn unit_sale_price(sale_price_per_pack: Decimal, units_per_pack: i32) -> Decimal {
    unit_buy_price(sale_price_per_pack, units_per_pack)
}

/// Margin per unit.
pub fn profit_per_unit(unit_sale: Decimal, unit_buy: Decimal) -> Decimal {
    unit_sale - unit_buy
}

/// Purchase amount recorded in history: price per pack times whole packs.
pub fn total_purchase_amount(buy_price_per_pack: Decimal, packs: i32) -> Decimal {
    buy_price_per_pack * Decimal::from(packs)
}

/// Outstanding supplier balance, floored at zero so overpayment never shows
/// as a negative payable.
pub fn pending_payments(total_purchases: Decimal, total_paid: Decimal) -> Decimal {
    (total_purchases - total_paid).max(Decimal::ZERO)
}

/// Subtract a refund from a money amount, floored at zero.
pub fn clamp_money(current: Decimal, refund: Decimal) -> Decimal {
    (current - refund).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_clamp_units_never_negative() {
        assert_eq!(clamp_units(10, -30), 0);
        assert_eq!(clamp_units(10, -10), 0);
        assert_eq!(clamp_units(10, 5), 15);
        assert_eq!(clamp_units(0, -1), 0);
    }

    #[test]
    fn test_derive_packs_floor() {
        assert_eq!(derive_packs(100, 10), 10);
        assert_eq!(derive_packs(75, 10), 7);
        assert_eq!(derive_packs(9, 10), 0);
        assert_eq!(derive_packs(-5, 10), 0);
        assert_eq!(derive_packs(100, 0), 0);
    }

    #[test]
    fn test_unit_prices() {
        assert_eq!(unit_buy_price(dec("120"), 12), dec("10"));
        assert_eq!(unit_sale_price(dec("150"), 12), dec("12.5"));
        assert_eq!(unit_buy_price(dec("120"), 0), Decimal::ZERO);
    }

    #[test]
    fn test_profit_per_unit() {
        assert_eq!(profit_per_unit(dec("12.5"), dec("10")), dec("2.5"));
        // Selling below cost is allowed, the margin just goes negative
        assert_eq!(profit_per_unit(dec("8"), dec("10")), dec("-2"));
    }

    #[test]
    fn test_total_purchase_amount() {
        assert_eq!(total_purchase_amount(dec("120"), 10), dec("1200"));
        assert_eq!(total_purchase_amount(dec("120"), 0), Decimal::ZERO);
    }

    #[test]
    fn test_pending_payments_floored() {
        assert_eq!(pending_payments(dec("1000"), dec("400")), dec("600"));
        assert_eq!(pending_payments(dec("400"), dec("1000")), Decimal::ZERO);
    }

    #[test]
    fn test_clamp_money() {
        assert_eq!(clamp_money(dec("100"), dec("30")), dec("70"));
        assert_eq!(clamp_money(dec("100"), dec("130")), Decimal::ZERO);
    }
}
