// Integer-quantised price/quantity arithmetic.
//
// Unlike a fixed-point type with a compile-time scale, this engine reads
// `price_scale` and `qty_scale` from the snapshot header at runtime (every
// venue/instrument may quantise differently), so the helpers here take the
// active scale as an explicit argument rather than baking in a constant.
// All math is integer; 128-bit intermediates avoid i64 overflow on
// notional and fee computation.

/// Notional value of `qty_q` units at `price_q`, in the same cash scale as
/// `price_q`. Uses a widened i128 intermediate and truncates toward zero,
/// per the round-toward-zero convention pinned for this engine.
pub fn notional_q(price_q: i64, qty_q: i64, price_scale: i64) -> i64 {
    let raw = (price_q as i128) * (qty_q as i128);
    (raw / price_scale as i128) as i64
}

/// Fee on a notional amount, in parts-per-million, rounded toward zero.
pub fn fee_q(notional_cash_q: i64, fee_ppm: i64) -> i64 {
    let raw = (notional_cash_q as i128) * (fee_ppm as i128);
    (raw / 1_000_000i128) as i64
}

/// Applies `alpha_ppm` as a crossing-tolerance multiplier on displayed
/// depth: `level_qty_q * (1_000_000 + alpha_ppm) / 1_000_000`. This is the
/// resolved reading of the open question in Design Notes — additional
/// crossing tolerance, never a price adjustment.
pub fn tolerant_depth_q(level_qty_q: i64, alpha_ppm: i64) -> i64 {
    let raw = (level_qty_q as i128) * (1_000_000i128 + alpha_ppm as i128);
    (raw / 1_000_000i128) as i64
}

/// Midpoint of two quantised prices, truncated toward negative infinity to
/// match integer `//` semantics used throughout the reference runner
/// (`(bid + ask) / 2`). Both inputs are assumed already scale-consistent.
pub fn mid_q(bid_q: i64, ask_q: i64) -> i64 {
    (bid_q + ask_q) / 2
}

/// True if `|position_qty_q| * |mid_q|` would not fit in an i64 — the
/// overflow-risk flag the accounting checker must surface.
pub fn overflow_risk(position_qty_q: i64, mid_q: i64) -> bool {
    if position_qty_q == 0 || mid_q == 0 {
        return false;
    }
    let product = (position_qty_q as i128) * (mid_q as i128);
    product.unsigned_abs() > i64::MAX as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notional_exact() {
        // price_q = 100.00 at scale 1e8, qty_q = 50 -> 5000.00 at the same scale
        let price_scale = 100_000_000i64;
        let price_q = 100 * price_scale;
        let qty_q = 50;
        assert_eq!(notional_q(price_q, qty_q, price_scale), 5000 * price_scale);
    }

    #[test]
    fn notional_truncates_toward_zero() {
        // 7 / 2 in notional terms should truncate, not round
        assert_eq!(notional_q(7, 1, 2), 3);
        assert_eq!(notional_q(-7, 1, 2), -3);
    }

    #[test]
    fn fee_rounds_toward_zero() {
        assert_eq!(fee_q(1_000_000, 2500), 2500); // 0.25% of 1,000,000
        assert_eq!(fee_q(3, 1), 0); // truncates
    }

    #[test]
    fn fee_on_negative_notional_truncates_toward_zero() {
        assert_eq!(fee_q(-3, 333_333), 0);
    }

    #[test]
    fn tolerant_depth_adds_ppm_allowance() {
        assert_eq!(tolerant_depth_q(1_000_000, 1_000), 1_001_000);
        assert_eq!(tolerant_depth_q(1_000_000, 0), 1_000_000);
    }

    #[test]
    fn mid_is_floor_divided() {
        assert_eq!(mid_q(99, 100), 99);
        assert_eq!(mid_q(100, 100), 100);
    }

    #[test]
    fn overflow_risk_detects_large_products() {
        assert!(overflow_risk(i64::MAX / 2, 4));
        assert!(!overflow_risk(1_000, 1_000));
        assert!(!overflow_risk(0, 1_000));
    }
}
