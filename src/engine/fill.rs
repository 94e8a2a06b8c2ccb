use crate::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liquidity {
    Maker = 0,
    Taker = 1,
}

impl Liquidity {
    pub fn name(&self) -> &'static str {
        match self {
            Liquidity::Maker => "Maker",
            Liquidity::Taker => "Taker",
        }
    }
}

/// An immutable fill record. Appended in strict submission/match order;
/// never mutated or removed once emitted.
#[derive(Debug, Clone, Copy)]
pub struct Fill {
    pub ts_ns: i64,
    pub order_id: u64,
    pub liq: Liquidity,
    pub side: Side,
    pub price_q: i64,
    pub qty_q: i64,
    pub notional_cash_q: i64,
    pub fee_cash_q: i64,
}
