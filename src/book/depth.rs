// The anonymous market depth ladder: the last-known aggregate (price, qty)
// per level on each side, as read from the replayed snapshot record. This
// is distinct from the participant resting-order book — it represents
// liquidity in front of (or behind) the participant's own orders.

use crate::snapshot::RecordView;

#[derive(Debug, Clone, Default)]
pub struct MarketDepth {
    bids: Vec<(i64, i64)>,
    asks: Vec<(i64, i64)>,
}

impl MarketDepth {
    pub fn new(depth: usize) -> Self {
        MarketDepth {
            bids: vec![(0, 0); depth],
            asks: vec![(0, 0); depth],
        }
    }

    pub fn update_from_record(&mut self, record: &RecordView<'_>) {
        for i in 0..self.bids.len() {
            self.bids[i] = record.bid(i);
        }
        for i in 0..self.asks.len() {
            self.asks[i] = record.ask(i);
        }
    }

    pub fn best_bid(&self) -> Option<(i64, i64)> {
        self.level(true, 0)
    }

    pub fn best_ask(&self) -> Option<(i64, i64)> {
        self.level(false, 0)
    }

    /// Level `i` on the requested side, or `None` if that slot holds the
    /// null-price sentinel.
    pub fn level(&self, is_bid: bool, i: usize) -> Option<(i64, i64)> {
        let levels = if is_bid { &self.bids } else { &self.asks };
        let (p, q) = *levels.get(i)?;
        let is_null = if is_bid {
            p == crate::snapshot::BID_NULL_PRICE_Q
        } else {
            p == crate::snapshot::ASK_NULL_PRICE_Q
        };
        if is_null {
            None
        } else {
            Some((p, q))
        }
    }

    /// Displayed quantity at an exact price on the requested side, summed
    /// across any levels that happen to carry that price (normally at most
    /// one). Returns 0 if the price is not currently displayed.
    pub fn qty_at_price(&self, is_bid: bool, price_q: i64) -> i64 {
        let levels = if is_bid { &self.bids } else { &self.asks };
        levels
            .iter()
            .filter(|(p, _)| *p == price_q)
            .map(|(_, q)| *q)
            .sum()
    }

    pub fn mid_q(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) if bid < ask => {
                Some(crate::types::scale::mid_q(bid, ask))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(bids: &[(i64, i64)], asks: &[(i64, i64)]) -> Vec<u8> {
        let depth = bids.len();
        let mut buf = vec![0u8; 16 + 32 * depth];
        for (i, (p, q)) in bids.iter().chain(asks.iter()).enumerate() {
            let base = 16 + i * 16;
            buf[base..base + 8].copy_from_slice(&p.to_le_bytes());
            buf[base + 8..base + 16].copy_from_slice(&q.to_le_bytes());
        }
        buf
    }

    #[test]
    fn updates_from_record_and_reports_best_levels() {
        let bytes = record_bytes(&[(100, 5), (99, 10)], &[(101, 4), (102, 8)]);
        let rec = RecordView::new(&bytes, 2);
        let mut depth = MarketDepth::new(2);
        depth.update_from_record(&rec);
        assert_eq!(depth.best_bid(), Some((100, 5)));
        assert_eq!(depth.best_ask(), Some((101, 4)));
        assert_eq!(depth.qty_at_price(true, 99), 10);
        assert_eq!(depth.qty_at_price(true, 50), 0);
        assert_eq!(depth.mid_q(), Some(100));
    }
}
