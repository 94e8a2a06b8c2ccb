// The Matching Engine.
//
// Participant orders are matched against an ANONYMOUS MARKET DEPTH FEED —
// the replayed L2 ladder — never against each other. Maker/taker is decided
// once, at entry: an order whose limit price already crosses the opposing
// best when it's dispatched fills as a taker, against `alpha_ppm`-tolerant
// displayed depth. An order that entered behind the spread is a maker for
// its whole life — its queue position is the displayed depth ahead of it at
// the price it entered, drawn down as that depth is consumed; once
// exhausted (or if the market later trades straight through its price)
// further fills are still tagged maker, since it provided liquidity rather
// than taking it.
//
// Single-threaded, cooperative: `step()` is the only place the clock
// advances, and it does so synchronously to `record.ts_recv_ns()`.

pub mod event;
pub mod fill;
pub mod order;
pub mod params;

pub use event::{Event, EventType};
pub use fill::{Fill, Liquidity};
pub use order::{Order, OrderState, PlaceLimitRequest, RejectReason, Tif};
pub use params::SimulatorParams;

use std::collections::VecDeque;

use thiserror::Error;

use crate::book::{MarketDepth, RestingBook};
use crate::ledger::Ledger;
use crate::snapshot::RecordView;
use crate::types::{scale, Side};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("time went backwards: now={now} record_ts_recv_ns={record_ts}")]
    TimeWentBackwards { now: i64, record_ts: i64 },
}

struct PendingPlace {
    dispatch_ts_ns: i64,
    submit_ts_ns: i64,
    req: PlaceLimitRequest,
    id: u64,
}

struct PendingCancel {
    dispatch_ts_ns: i64,
    order_id: u64,
}

enum Inbound {
    Place(PendingPlace),
    Cancel(PendingCancel),
}

impl Inbound {
    fn dispatch_ts_ns(&self) -> i64 {
        match self {
            Inbound::Place(p) => p.dispatch_ts_ns,
            Inbound::Cancel(c) => c.dispatch_ts_ns,
        }
    }
}

/// Orders live here, indexed by `id - 1` — the arena pattern from Design
/// Notes §9, avoiding the original's cyclic engine/ledger/order references.
pub struct MatchingEngine {
    params: SimulatorParams,
    price_scale: i64,
    qty_scale: i64,

    arena: Vec<Order>,
    resting: RestingBook,
    depth: MarketDepth,
    ledger: Ledger,
    now: i64,

    next_order_id: u64,
    pending_inbound: VecDeque<Inbound>,

    fills_visible: Vec<Fill>,
    events_visible: Vec<Event>,
    fills_pending: VecDeque<(i64, Fill)>,
    events_pending: VecDeque<(i64, Event)>,
}

impl MatchingEngine {
    pub fn new(params: SimulatorParams, depth_levels: usize, price_scale: i64, qty_scale: i64) -> Self {
        MatchingEngine {
            params,
            price_scale,
            qty_scale,
            arena: Vec::new(),
            resting: RestingBook::new(),
            depth: MarketDepth::new(depth_levels),
            ledger: Ledger::default(),
            now: 0,
            next_order_id: 1,
            pending_inbound: VecDeque::new(),
            fills_visible: Vec::new(),
            events_visible: Vec::new(),
            fills_pending: VecDeque::new(),
            events_pending: VecDeque::new(),
        }
    }

    /// Clears all state, seeds the wall clock and initial ledger.
    pub fn reset(&mut self, start_ts_ns: i64, ledger: Ledger) {
        self.arena.clear();
        self.resting = RestingBook::new();
        self.now = start_ts_ns;
        self.next_order_id = 1;
        self.pending_inbound.clear();
        self.fills_visible.clear();
        self.events_visible.clear();
        self.fills_pending.clear();
        self.events_pending.clear();
        self.ledger = ledger;
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn depth(&self) -> &MarketDepth {
        &self.depth
    }

    pub fn orders(&self) -> &[Order] {
        &self.arena
    }

    pub fn order(&self, id: u64) -> Option<&Order> {
        self.arena.get((id - 1) as usize)
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills_visible
    }

    pub fn events(&self) -> &[Event] {
        &self.events_visible
    }

    fn validate(req: &PlaceLimitRequest) -> Result<(), RejectReason> {
        if req.price_q <= 0 {
            return Err(RejectReason::InvalidPrice);
        }
        if req.qty_q <= 0 {
            return Err(RejectReason::InvalidQuantity);
        }
        Ok(())
    }

    /// Synchronously reserves an `order_id` and enqueues entry into the
    /// book at `now + outbound_latency_ns`. Returns 0 on capacity or
    /// validation failure — no order is created in that case, but a
    /// `Reject` event (order_id 0) is still emitted immediately per §7's
    /// "reported via Reject events" contract.
    pub fn place_limit(&mut self, req: PlaceLimitRequest) -> u64 {
        if let Err(reason) = Self::validate(&req) {
            self.emit_event(0, EventType::Reject, OrderState::Rejected, Some(reason));
            self.promote_visible();
            return 0;
        }
        // Gate on orders *reserved* so far, not orders admitted into the
        // arena — admission only happens later, in dispatch_place, so
        // checking arena.len() here would let outbound_latency_ns-delayed
        // placements blow straight through the cap.
        if self.next_order_id - 1 >= self.params.max_orders {
            self.emit_event(0, EventType::Reject, OrderState::Rejected, Some(RejectReason::CapacityExceeded));
            self.promote_visible();
            return 0;
        }
        let id = self.next_order_id;
        self.next_order_id += 1;
        self.pending_inbound.push_back(Inbound::Place(PendingPlace {
            dispatch_ts_ns: self.now + self.params.outbound_latency_ns,
            submit_ts_ns: self.now,
            req,
            id,
        }));
        id
    }

    /// Enqueues a cancellation; returns `true` if the order is known and
    /// currently non-terminal.
    pub fn cancel(&mut self, order_id: u64) -> bool {
        let Some(order) = self.order(order_id) else {
            return false;
        };
        if order.state.is_terminal() {
            return false;
        }
        self.pending_inbound.push_back(Inbound::Cancel(PendingCancel {
            dispatch_ts_ns: self.now + self.params.outbound_latency_ns,
            order_id,
        }));
        true
    }

    fn lock_amount_q(&self, side: Side, price_q: i64, qty_q: i64) -> i64 {
        match side {
            Side::Buy => scale::notional_q(price_q, qty_q, self.price_scale),
            Side::Sell => qty_q,
        }
    }

    fn emit_event(&mut self, order_id: u64, kind: EventType, state: OrderState, reason: Option<RejectReason>) {
        let ev = Event {
            ts_ns: self.now,
            order_id,
            kind,
            state,
            reject_reason: reason,
        };
        let visible_ts = self.now + self.params.observation_latency_ns;
        self.events_pending.push_back((visible_ts, ev));
    }

    fn emit_fill(&mut self, order_id: u64, liq: Liquidity, side: Side, price_q: i64, qty_q: i64) {
        let notional_cash_q = scale::notional_q(price_q, qty_q, self.price_scale);
        let fee_ppm = match liq {
            Liquidity::Maker => self.params.maker_fee_ppm,
            Liquidity::Taker => self.params.taker_fee_ppm,
        };
        let fee_cash_q = scale::fee_q(notional_cash_q, fee_ppm);
        self.ledger.apply_fill(side, qty_q, notional_cash_q, fee_cash_q);
        let fill = Fill {
            ts_ns: self.now,
            order_id,
            liq,
            side,
            price_q,
            qty_q,
            notional_cash_q,
            fee_cash_q,
        };
        let visible_ts = self.now + self.params.observation_latency_ns;
        self.fills_pending.push_back((visible_ts, fill));
    }

    fn unlock_remaining(&mut self, idx: usize) {
        let order = &mut self.arena[idx];
        let amount = order.locked_q;
        order.locked_q = 0;
        match order.side {
            Side::Buy => self.ledger.unlock_cash(amount),
            Side::Sell => self.ledger.unlock_position(amount),
        }
    }

    fn unlock_partial(&mut self, idx: usize, filled_qty_q: i64) {
        let order = &mut self.arena[idx];
        let share = self.lock_amount_q(order.side, order.price_q, filled_qty_q).min(order.locked_q);
        order.locked_q -= share;
        match order.side {
            Side::Buy => self.ledger.unlock_cash(share),
            Side::Sell => self.ledger.unlock_position(share),
        }
    }

    // -- inbound gating -----------------------------------------------------

    fn process_inbound(&mut self) {
        while let Some(front_ts) = self.pending_inbound.front().map(|a| a.dispatch_ts_ns()) {
            if front_ts > self.now {
                break;
            }
            match self.pending_inbound.pop_front().unwrap() {
                Inbound::Place(p) => self.dispatch_place(p),
                Inbound::Cancel(c) => self.dispatch_cancel(c),
            }
        }
    }

    fn dispatch_place(&mut self, p: PendingPlace) {
        let is_bid = p.req.side == Side::Buy;
        let lock_amount = self.lock_amount_q(p.req.side, p.req.price_q, p.req.qty_q);
        let lock_result = match p.req.side {
            Side::Buy => self.ledger.lock_cash(lock_amount),
            Side::Sell => self.ledger.lock_position(lock_amount),
        };

        let queue_ahead_q = self.depth.qty_at_price(is_bid, p.req.price_q);
        let resting_at_entry = match p.req.side {
            Side::Buy => self.depth.best_ask().map_or(true, |(ask, _)| p.req.price_q < ask),
            Side::Sell => self.depth.best_bid().map_or(true, |(bid, _)| p.req.price_q > bid),
        };

        let insufficient_reason = match p.req.side {
            Side::Buy => RejectReason::InsufficientCash,
            Side::Sell => RejectReason::InsufficientPosition,
        };
        let (state, reject_reason, locked_q) = if lock_result.is_err() {
            (OrderState::Rejected, Some(insufficient_reason), 0)
        } else {
            (OrderState::Accepted, None, lock_amount)
        };

        let order = Order {
            id: p.id,
            side: p.req.side,
            price_q: p.req.price_q,
            qty_q: p.req.qty_q,
            tif: p.req.tif,
            submit_ts_ns: p.submit_ts_ns,
            accepted_ts_ns: Some(self.now),
            filled_qty_q: 0,
            state,
            reject_reason,
            queue_ahead_q,
            locked_q: 0,
            resting_at_entry,
        };
        debug_assert_eq!(self.arena.len() as u64 + 1, p.id);
        self.arena.push(order);
        let idx = self.arena.len() - 1;
        self.arena[idx].locked_q = locked_q;

        if state == OrderState::Accepted {
            self.resting.insert(is_bid, p.req.price_q, idx);
            self.emit_event(p.id, EventType::Accept, OrderState::Accepted, None);
        } else {
            self.emit_event(p.id, EventType::Reject, OrderState::Rejected, reject_reason);
        }
    }

    fn dispatch_cancel(&mut self, c: PendingCancel) {
        let idx = (c.order_id - 1) as usize;
        if idx >= self.arena.len() {
            return;
        }
        if self.arena[idx].state.is_terminal() {
            return;
        }
        let is_bid = self.arena[idx].side == Side::Buy;
        let price_q = self.arena[idx].price_q;
        self.resting.remove(is_bid, price_q, idx);
        self.unlock_remaining(idx);
        self.arena[idx].state = OrderState::Cancelled;
        self.emit_event(c.order_id, EventType::Cancel, OrderState::Cancelled, None);
    }

    // -- matching -------------------------------------------------------

    fn record_fill(&mut self, idx: usize, liq: Liquidity, price_q: i64, qty_q: i64) {
        let (side, order_id) = {
            let o = &self.arena[idx];
            (o.side, o.id)
        };
        self.unlock_partial(idx, qty_q);
        self.emit_fill(order_id, liq, side, price_q, qty_q);
        let order = &mut self.arena[idx];
        order.filled_qty_q += qty_q;
        let remaining = order.remaining_qty_q();
        if remaining == 0 {
            order.state = OrderState::Filled;
            self.emit_event(order_id, EventType::Fill, OrderState::Filled, None);
            let (is_bid, price_q) = (order.side == Side::Buy, order.price_q);
            self.resting.remove(is_bid, price_q, idx);
        } else {
            order.state = OrderState::PartiallyFilled;
            self.emit_event(order_id, EventType::Partial, OrderState::PartiallyFilled, None);
        }
    }

    fn cancel_remainder(&mut self, idx: usize) {
        let order_id = self.arena[idx].id;
        let (is_bid, price_q) = (self.arena[idx].side == Side::Buy, self.arena[idx].price_q);
        self.resting.remove(is_bid, price_q, idx);
        self.unlock_remaining(idx);
        self.arena[idx].state = OrderState::Cancelled;
        self.emit_event(order_id, EventType::Cancel, OrderState::Cancelled, None);
    }

    fn active_indices(&self) -> Vec<usize> {
        self.arena
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.state.is_terminal())
            .map(|(i, _)| i)
            .collect()
    }

    /// FOK orders live or die in the same step they're accepted: full
    /// requested quantity must be immediately fillable against tolerant
    /// depth, or the whole order is cancelled with zero fills.
    fn process_fok(&mut self) {
        for idx in self.active_indices() {
            let order = &self.arena[idx];
            if order.tif != Tif::Fok || order.state != OrderState::Accepted {
                continue;
            }
            let (side, price_q, qty_q) = (order.side, order.price_q, order.qty_q);
            let available = match side {
                Side::Buy => self.depth.best_ask().filter(|(ask, _)| price_q >= *ask).map(|(ask, qty)| {
                    (ask, scale::tolerant_depth_q(qty, self.params.alpha_ppm))
                }),
                Side::Sell => self.depth.best_bid().filter(|(bid, _)| price_q <= *bid).map(|(bid, qty)| {
                    (bid, scale::tolerant_depth_q(qty, self.params.alpha_ppm))
                }),
            };
            match available {
                Some((cross_price, avail_qty)) if avail_qty >= qty_q => {
                    self.record_fill(idx, Liquidity::Taker, cross_price, qty_q);
                }
                _ => {
                    self.cancel_remainder(idx);
                }
            }
        }
    }

    /// Orders that were already marketable the moment they entered the
    /// book (`!resting_at_entry`): taker fills against `alpha_ppm`-tolerant
    /// displayed depth at the crossing price. Orders that genuinely rested
    /// are handled by `process_makers` instead, even once the market moves
    /// into their price — §8 scenario 1 tags those fills as Maker, not
    /// Taker.
    fn process_takers(&mut self) {
        for idx in self.active_indices() {
            let order = &self.arena[idx];
            if order.tif == Tif::Fok || order.state.is_terminal() || order.resting_at_entry {
                continue;
            }
            let (side, price_q, remaining) = (order.side, order.price_q, order.remaining_qty_q());
            if remaining <= 0 {
                continue;
            }
            let crossing = match side {
                Side::Buy => self.depth.best_ask().filter(|(ask, _)| price_q >= *ask),
                Side::Sell => self.depth.best_bid().filter(|(bid, _)| price_q <= *bid),
            };
            if let Some((cross_price, level_qty)) = crossing {
                let avail = scale::tolerant_depth_q(level_qty, self.params.alpha_ppm);
                let fill_qty = remaining.min(avail);
                if fill_qty > 0 {
                    self.record_fill(idx, Liquidity::Taker, cross_price, fill_qty);
                }
            }
        }
    }

    /// Orders that genuinely rested at entry (`resting_at_entry`): queue-
    /// ahead is drawn down by observed consumption of the displayed depth
    /// at their own price, and once exhausted, further consumption fills
    /// the order as a maker. If the market instead trades straight through
    /// a resting order's price (best opposing price crosses it outright),
    /// the order fills as a maker against the available tolerant depth at
    /// the crossing price — it provided liquidity the whole time, even
    /// though its own limit now also happens to cross.
    fn process_makers(&mut self, prev_depth: &MarketDepth) {
        for idx in self.active_indices() {
            let order = &self.arena[idx];
            if order.tif == Tif::Fok || order.state.is_terminal() || !order.resting_at_entry {
                continue;
            }
            let (side, price_q, remaining) = (order.side, order.price_q, order.remaining_qty_q());
            if remaining <= 0 {
                continue;
            }
            let is_bid = side == Side::Buy;
            let crossing = match side {
                Side::Buy => self.depth.best_ask().filter(|(ask, _)| price_q >= *ask),
                Side::Sell => self.depth.best_bid().filter(|(bid, _)| price_q <= *bid),
            };
            if let Some((cross_price, level_qty)) = crossing {
                let avail = scale::tolerant_depth_q(level_qty, self.params.alpha_ppm);
                let fill_qty = remaining.min(avail);
                if fill_qty > 0 {
                    self.record_fill(idx, Liquidity::Maker, cross_price, fill_qty);
                }
                continue;
            }
            let prev_qty = prev_depth.qty_at_price(is_bid, price_q);
            let new_qty = self.depth.qty_at_price(is_bid, price_q);
            let consumption = (prev_qty - new_qty).max(0);
            if consumption == 0 {
                continue;
            }
            let order = &mut self.arena[idx];
            let ahead = order.queue_ahead_q;
            let absorbed_by_queue = consumption.min(ahead);
            order.queue_ahead_q -= absorbed_by_queue;
            let excess = consumption - absorbed_by_queue;
            if excess > 0 {
                let fill_qty = remaining.min(excess);
                if fill_qty > 0 {
                    self.record_fill(idx, Liquidity::Maker, price_q, fill_qty);
                }
            }
        }
    }

    fn process_ioc_remainders(&mut self) {
        for idx in self.active_indices() {
            let order = &self.arena[idx];
            if order.tif == Tif::Ioc && !order.state.is_terminal() {
                self.cancel_remainder(idx);
            }
        }
    }

    fn promote_visible(&mut self) {
        while let Some((ts, _)) = self.fills_pending.front() {
            if *ts > self.now {
                break;
            }
            let (_, fill) = self.fills_pending.pop_front().unwrap();
            self.fills_visible.push(fill);
        }
        while let Some((ts, _)) = self.events_pending.front() {
            if *ts > self.now {
                break;
            }
            let (_, ev) = self.events_pending.pop_front().unwrap();
            self.events_visible.push(ev);
        }
    }

    /// Advances the clock to `record.ts_recv_ns()`, processes pending
    /// inbound actions, applies the market record, runs matching, and
    /// promotes any observation-ready fills/events.
    pub fn step(&mut self, record: &RecordView<'_>) -> Result<(), EngineError> {
        let record_ts = record.ts_recv_ns();
        if record_ts < self.now {
            return Err(EngineError::TimeWentBackwards {
                now: self.now,
                record_ts,
            });
        }
        self.now = record_ts;

        self.process_inbound();

        let prev_depth = self.depth.clone();
        self.depth.update_from_record(record);

        self.process_fok();
        self.process_takers();
        self.process_makers(&prev_depth);
        self.process_ioc_remainders();

        self.promote_visible();
        Ok(())
    }

    pub fn qty_scale(&self) -> i64 {
        self.qty_scale
    }

    pub fn price_scale(&self) -> i64 {
        self.price_scale
    }
}
