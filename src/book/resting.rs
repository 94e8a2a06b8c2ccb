// Price-sorted store of resting participant orders. Orders themselves live
// in the engine's arena (a `Vec<Order>` indexed by `order_id - 1`); this
// book only stores order indices, preserving FIFO arrival order within a
// price level (price-time priority, per Design Notes §9's arena pattern).

use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Default)]
pub struct RestingBook {
    /// price_q -> FIFO queue of order indices. Best bid = highest key.
    bids: BTreeMap<i64, VecDeque<usize>>,
    /// price_q -> FIFO queue of order indices. Best ask = lowest key.
    asks: BTreeMap<i64, VecDeque<usize>>,
}

impl RestingBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_map(&mut self, is_bid: bool) -> &mut BTreeMap<i64, VecDeque<usize>> {
        if is_bid {
            &mut self.bids
        } else {
            &mut self.asks
        }
    }

    pub fn insert(&mut self, is_bid: bool, price_q: i64, order_idx: usize) {
        self.side_map(is_bid)
            .entry(price_q)
            .or_default()
            .push_back(order_idx);
    }

    /// Removes a specific order index from its price level (used by cancel
    /// and by full-fill/terminal cleanup). Drops the level if it empties.
    pub fn remove(&mut self, is_bid: bool, price_q: i64, order_idx: usize) {
        let map = self.side_map(is_bid);
        if let Some(queue) = map.get_mut(&price_q) {
            queue.retain(|&idx| idx != order_idx);
            if queue.is_empty() {
                map.remove(&price_q);
            }
        }
    }

}
