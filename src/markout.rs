// Mark-out tracker: records horizon-indexed signed mid-price deltas after
// each fill. Ported from the reference runner's `PendingMarkout`/
// `MarkoutTracker`.

use std::collections::BTreeMap;

use crate::engine::{Fill, Liquidity};
use crate::types::Side;

struct PendingMarkout {
    fill_idx: u64,
    fill_ts_ns: i64,
    order_id: u64,
    liq: Liquidity,
    side: Side,
    qty_q: i64,
    fill_price_q: i64,
    mid0_q: i64,
    step0: u64,
    horizons: Vec<u64>,
    done: BTreeMap<u64, i64>,
}

pub struct CompletedMarkout {
    pub fill_idx: u64,
    pub fill_ts_ns: i64,
    pub order_id: u64,
    pub liq: Liquidity,
    pub side: Side,
    pub qty_q: i64,
    pub fill_price_q: i64,
    pub mid0_q: i64,
    pub step0: u64,
    /// `(horizon_steps, markout_price_q)` pairs, in ascending horizon order.
    pub markouts: Vec<(u64, i64)>,
}

pub struct MarkoutTracker {
    horizons: Vec<u64>,
    pending: Vec<PendingMarkout>,
    completed: Vec<CompletedMarkout>,
    fill_counter: u64,
}

impl MarkoutTracker {
    pub fn new(mut horizons_steps: Vec<u64>) -> Self {
        horizons_steps.retain(|h| *h > 0);
        horizons_steps.sort_unstable();
        horizons_steps.dedup();
        MarkoutTracker {
            horizons: horizons_steps,
            pending: Vec::new(),
            completed: Vec::new(),
            fill_counter: 0,
        }
    }

    pub fn on_fill(&mut self, fill: &Fill, step: u64, mid_q: i64) {
        let entry = PendingMarkout {
            fill_idx: self.fill_counter,
            fill_ts_ns: fill.ts_ns,
            order_id: fill.order_id,
            liq: fill.liq,
            side: fill.side,
            qty_q: fill.qty_q,
            fill_price_q: fill.price_q,
            mid0_q: mid_q,
            step0: step,
            horizons: self.horizons.clone(),
            done: BTreeMap::new(),
        };
        self.fill_counter += 1;
        self.pending.push(entry);
    }

    /// Advances all pending entries against the current step/mid; any that
    /// complete every horizon move into `completed()`.
    pub fn update(&mut self, step: u64, mid_q: i64) {
        let mut still = Vec::with_capacity(self.pending.len());
        for mut entry in self.pending.drain(..) {
            let sign = entry.side.sign();
            for &h in &entry.horizons {
                if entry.done.contains_key(&h) {
                    continue;
                }
                if step.saturating_sub(entry.step0) >= h {
                    entry.done.insert(h, sign * (mid_q - entry.mid0_q));
                }
            }
            if entry.done.len() == entry.horizons.len() {
                let markouts = entry.horizons.iter().map(|h| (*h, entry.done[h])).collect();
                self.completed.push(CompletedMarkout {
                    fill_idx: entry.fill_idx,
                    fill_ts_ns: entry.fill_ts_ns,
                    order_id: entry.order_id,
                    liq: entry.liq,
                    side: entry.side,
                    qty_q: entry.qty_q,
                    fill_price_q: entry.fill_price_q,
                    mid0_q: entry.mid0_q,
                    step0: entry.step0,
                    markouts,
                });
            } else {
                still.push(entry);
            }
        }
        self.pending = still;
    }

    /// Drains and returns all completed mark-out rows since the last call.
    pub fn completed(&mut self) -> Vec<CompletedMarkout> {
        std::mem::take(&mut self.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(side: Side) -> Fill {
        Fill {
            ts_ns: 0,
            order_id: 1,
            liq: Liquidity::Taker,
            side,
            price_q: 100,
            qty_q: 5,
            notional_cash_q: 500,
            fee_cash_q: 0,
        }
    }

    #[test]
    fn completes_once_all_horizons_reached() {
        let mut tracker = MarkoutTracker::new(vec![2, 5]);
        tracker.on_fill(&fill(Side::Buy), 0, 100);
        tracker.update(1, 101);
        assert!(tracker.completed().is_empty());
        tracker.update(2, 102);
        assert!(tracker.completed().is_empty()); // horizon 2 recorded, horizon 5 still pending
        tracker.update(5, 99);
        let rows = tracker.completed();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].markouts, vec![(2, 2), (5, -1)]);
    }

    #[test]
    fn sell_side_flips_markout_sign() {
        let mut tracker = MarkoutTracker::new(vec![1]);
        tracker.on_fill(&fill(Side::Sell), 0, 100);
        tracker.update(1, 105);
        let rows = tracker.completed();
        assert_eq!(rows[0].markouts, vec![(1, -5)]);
    }

    #[test]
    fn horizons_are_deduped_and_sorted() {
        let tracker = MarkoutTracker::new(vec![5, 1, 1, 10]);
        assert_eq!(tracker.horizons, vec![1, 5, 10]);
    }
}
