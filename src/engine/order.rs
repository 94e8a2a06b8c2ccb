// Order lifecycle: the state machine and request/response types.

use crate::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tif {
    /// Good-till-cancelled: unfilled remainder rests in the book.
    Gtc,
    /// Immediate-or-cancel: unfilled remainder is cancelled at end of step.
    Ioc,
    /// Fill-or-kill: the whole order must fill in one step or none of it does.
    Fok,
}

impl Tif {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "gtc" => Ok(Tif::Gtc),
            "ioc" => Ok(Tif::Ioc),
            "fok" => Ok(Tif::Fok),
            _ => Err(format!("unknown TIF: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    New,
    Accepted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderState::New => "New",
            OrderState::Accepted => "Accepted",
            OrderState::PartiallyFilled => "PartiallyFilled",
            OrderState::Filled => "Filled",
            OrderState::Cancelled => "Cancelled",
            OrderState::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CapacityExceeded,
    InvalidPrice,
    InvalidQuantity,
    InvalidTif,
    InsufficientCash,
    InsufficientPosition,
}

impl RejectReason {
    pub fn name(&self) -> &'static str {
        match self {
            RejectReason::CapacityExceeded => "CapacityExceeded",
            RejectReason::InvalidPrice => "InvalidPrice",
            RejectReason::InvalidQuantity => "InvalidQuantity",
            RejectReason::InvalidTif => "InvalidTif",
            RejectReason::InsufficientCash => "InsufficientCash",
            RejectReason::InsufficientPosition => "InsufficientPosition",
        }
    }
}

/// A request to place a new limit order. Submitted to
/// [`crate::engine::MatchingEngine::place_limit`], which reserves an id
/// synchronously and defers entry into the book by `outbound_latency_ns`.
#[derive(Debug, Clone, Copy)]
pub struct PlaceLimitRequest {
    pub side: Side,
    pub price_q: i64,
    pub qty_q: i64,
    pub tif: Tif,
}

/// An order owned exclusively by the engine's arena. External code holds
/// stable `id`s, never references into this struct.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub id: u64,
    pub side: Side,
    pub price_q: i64,
    pub qty_q: i64,
    pub tif: Tif,
    pub submit_ts_ns: i64,
    pub accepted_ts_ns: Option<i64>,
    pub filled_qty_q: i64,
    pub state: OrderState,
    pub reject_reason: Option<RejectReason>,
    /// Displayed market depth ahead of this order at the price it entered
    /// at, decremented as the market consumes that level. Once it reaches
    /// zero the order begins absorbing marketable flow as a maker.
    pub queue_ahead_q: i64,
    /// Remaining cash (Buy) or position (Sell) still encumbered by this
    /// order's own lock; drawn down per-fill, zeroed on cancel/reject.
    pub locked_q: i64,
    /// Set once at entry: true if the order's limit was NOT marketable
    /// against the depth prevailing at the moment it was dispatched, i.e.
    /// it genuinely rested rather than crossing immediately. Fixed for the
    /// order's lifetime — it decides whether later fills are Maker
    /// (resting order the market traded into) or Taker (order that crossed
    /// the book itself), per the liquidity-provider/taker distinction.
    pub resting_at_entry: bool,
}

impl Order {
    pub fn remaining_qty_q(&self) -> i64 {
        self.qty_q - self.filled_qty_q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tif_parses_case_insensitively() {
        assert_eq!(Tif::from_str("GTC").unwrap(), Tif::Gtc);
        assert_eq!(Tif::from_str("ioc").unwrap(), Tif::Ioc);
        assert_eq!(Tif::from_str("Fok").unwrap(), Tif::Fok);
        assert!(Tif::from_str("xyz").is_err());
    }

    #[test]
    fn terminal_states_are_correctly_classified() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(!OrderState::Accepted.is_terminal());
        assert!(!OrderState::PartiallyFilled.is_terminal());
        assert!(!OrderState::New.is_terminal());
    }
}
