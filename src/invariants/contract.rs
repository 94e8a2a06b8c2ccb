// Every Reject event requires the corresponding order to end in state
// Rejected with a non-None reject_reason. Ported from the reference
// runner's `InvariantChecker.observe_event`/`check_reject_implies_terminal`.

use std::collections::HashSet;

use crate::engine::{Event, EventType, Order, OrderState};

#[derive(Default)]
pub struct ContractChecker {
    rejected_order_ids: HashSet<u64>,
}

impl ContractChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_event(&mut self, event: &Event) {
        // order_id 0 marks a capacity/validation reject emitted before any
        // order was created — there is no arena entry to cross-check.
        if event.kind == EventType::Reject && event.order_id != 0 {
            self.rejected_order_ids.insert(event.order_id);
        }
    }

    /// Checks every order referenced by a past Reject event is terminal in
    /// state `Rejected` with a reason attached. Returns up to 10 violation
    /// messages.
    pub fn check(&self, orders: &[Order]) -> Vec<String> {
        let mut problems = Vec::new();
        for &id in &self.rejected_order_ids {
            if problems.len() >= 10 {
                break;
            }
            let Some(order) = orders.get((id - 1) as usize) else {
                problems.push(format!("order {id}: referenced by Reject event but not found"));
                continue;
            };
            if order.state != OrderState::Rejected {
                problems.push(format!(
                    "order {id}: Reject event implies state=Rejected, found {:?}",
                    order.state
                ));
            } else if order.reject_reason.is_none() {
                problems.push(format!("order {id}: Rejected with no reject_reason"));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RejectReason;
    use crate::types::Side;

    fn rejected_order(id: u64) -> Order {
        Order {
            id,
            side: Side::Buy,
            price_q: 1,
            qty_q: 1,
            tif: crate::engine::Tif::Gtc,
            submit_ts_ns: 0,
            accepted_ts_ns: None,
            filled_qty_q: 0,
            state: OrderState::Rejected,
            reject_reason: Some(RejectReason::InvalidPrice),
            queue_ahead_q: 0,
            locked_q: 0,
            resting_at_entry: false,
        }
    }

    #[test]
    fn passes_when_rejected_order_has_reason() {
        let mut checker = ContractChecker::new();
        checker.observe_event(&Event {
            ts_ns: 0,
            order_id: 1,
            kind: EventType::Reject,
            state: OrderState::Rejected,
            reject_reason: Some(RejectReason::InvalidPrice),
        });
        let orders = vec![rejected_order(1)];
        assert!(checker.check(&orders).is_empty());
    }

    #[test]
    fn flags_reject_event_for_order_not_actually_rejected() {
        let mut checker = ContractChecker::new();
        checker.observe_event(&Event {
            ts_ns: 0,
            order_id: 1,
            kind: EventType::Reject,
            state: OrderState::Rejected,
            reject_reason: Some(RejectReason::InvalidPrice),
        });
        let mut order = rejected_order(1);
        order.state = OrderState::Accepted;
        order.reject_reason = None;
        let problems = checker.check(&[order]);
        assert_eq!(problems.len(), 1);
    }
}
