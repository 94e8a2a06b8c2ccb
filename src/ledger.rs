// Integer-quantised cash/position ledger with lockable sub-balances.
//
// `cash_q` and `position_qty_q` are TOTAL balances; `locked_cash_q` and
// `locked_position_qty_q` are encumbered sub-balances that must never
// exceed the corresponding total. Available = total - locked.

use thiserror::Error;

use crate::types::Side;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum LedgerError {
    #[error("insufficient cash: have {available} available, need {requested}")]
    InsufficientCash { available: i64, requested: i64 },
    #[error("insufficient position: have {available} available, need {requested}")]
    InsufficientPosition { available: i64, requested: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ledger {
    pub cash_q: i64,
    pub position_qty_q: i64,
    pub locked_cash_q: i64,
    pub locked_position_qty_q: i64,
}

impl Ledger {
    pub fn new(
        cash_q: i64,
        position_qty_q: i64,
        locked_cash_q: i64,
        locked_position_qty_q: i64,
    ) -> Self {
        Ledger {
            cash_q,
            position_qty_q,
            locked_cash_q,
            locked_position_qty_q,
        }
    }

    pub fn available_cash_q(&self) -> i64 {
        self.cash_q - self.locked_cash_q
    }

    pub fn available_position_qty_q(&self) -> i64 {
        self.position_qty_q - self.locked_position_qty_q
    }

    pub fn lock_cash(&mut self, n: i64) -> Result<(), LedgerError> {
        if self.locked_cash_q + n > self.cash_q {
            return Err(LedgerError::InsufficientCash {
                available: self.available_cash_q(),
                requested: n,
            });
        }
        self.locked_cash_q += n;
        Ok(())
    }

    pub fn unlock_cash(&mut self, n: i64) {
        self.locked_cash_q -= n;
        debug_assert!(self.locked_cash_q >= 0);
    }

    pub fn lock_position(&mut self, n: i64) -> Result<(), LedgerError> {
        if self.locked_position_qty_q + n > self.position_qty_q {
            return Err(LedgerError::InsufficientPosition {
                available: self.available_position_qty_q(),
                requested: n,
            });
        }
        self.locked_position_qty_q += n;
        Ok(())
    }

    pub fn unlock_position(&mut self, n: i64) {
        self.locked_position_qty_q -= n;
        debug_assert!(self.locked_position_qty_q >= 0);
    }

    /// Applies a fill's cash/position delta per the side convention:
    /// Buy: cash -= notional + fee, position += qty.
    /// Sell: cash += notional - fee, position -= qty.
    pub fn apply_fill(&mut self, side: Side, qty_q: i64, notional_cash_q: i64, fee_cash_q: i64) {
        match side {
            Side::Buy => {
                self.cash_q -= notional_cash_q + fee_cash_q;
                self.position_qty_q += qty_q;
            }
            Side::Sell => {
                self.cash_q += notional_cash_q - fee_cash_q;
                self.position_qty_q -= qty_q;
            }
        }
    }

    /// `0 <= locked_cash_q <= cash_q` and `0 <= locked_position_qty_q <=
    /// position_qty_q` — the invariant (P1) that must hold at every
    /// externally observable instant.
    pub fn check_invariants(&self) -> bool {
        self.locked_cash_q >= 0
            && self.locked_cash_q <= self.cash_q
            && self.locked_position_qty_q >= 0
            && self.locked_position_qty_q <= self.position_qty_q
    }

    /// Signed cash/position delta a fill of this shape would apply, without
    /// mutating anything — used by the conservation checker to replay
    /// expected totals independently of the live ledger.
    pub fn fill_deltas(side: Side, qty_q: i64, notional_cash_q: i64, fee_cash_q: i64) -> (i64, i64) {
        let sign = side.sign();
        let cash_delta = match side {
            Side::Buy => -(notional_cash_q + fee_cash_q),
            Side::Sell => notional_cash_q - fee_cash_q,
        };
        (cash_delta, sign * qty_q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_unlock_cash_respects_bound() {
        let mut l = Ledger::new(1000, 0, 0, 0);
        l.lock_cash(400).unwrap();
        assert_eq!(l.available_cash_q(), 600);
        assert!(l.lock_cash(700).is_err());
        l.unlock_cash(400);
        assert_eq!(l.locked_cash_q, 0);
    }

    #[test]
    fn lock_unlock_position_respects_bound() {
        let mut l = Ledger::new(0, 100, 0, 0);
        l.lock_position(60).unwrap();
        assert!(l.lock_position(50).is_err());
        l.unlock_position(60);
        assert_eq!(l.locked_position_qty_q, 0);
    }

    #[test]
    fn apply_fill_buy_decreases_cash_increases_position() {
        let mut l = Ledger::new(10_000, 0, 0, 0);
        l.apply_fill(Side::Buy, 5, 1000, 10);
        assert_eq!(l.cash_q, 10_000 - 1010);
        assert_eq!(l.position_qty_q, 5);
    }

    #[test]
    fn apply_fill_sell_increases_cash_decreases_position() {
        let mut l = Ledger::new(10_000, 20, 0, 0);
        l.apply_fill(Side::Sell, 5, 1000, 10);
        assert_eq!(l.cash_q, 10_000 + 990);
        assert_eq!(l.position_qty_q, 15);
    }

    #[test]
    fn invariant_check_catches_over_locked_state() {
        let mut l = Ledger::new(100, 0, 0, 0);
        l.locked_cash_q = 150;
        assert!(!l.check_invariants());
    }

    #[test]
    fn fill_deltas_match_apply_fill() {
        let mut l = Ledger::new(10_000, 0, 0, 0);
        let (cash_delta, pos_delta) = Ledger::fill_deltas(Side::Buy, 5, 1000, 10);
        l.apply_fill(Side::Buy, 5, 1000, 10);
        assert_eq!(l.cash_q, 10_000 + cash_delta);
        assert_eq!(l.position_qty_q, pos_delta);
    }
}
