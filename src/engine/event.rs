use super::order::{OrderState, RejectReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Accept,
    Partial,
    Fill,
    Cancel,
    Reject,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            EventType::Accept => "Accept",
            EventType::Partial => "Partial",
            EventType::Fill => "Fill",
            EventType::Cancel => "Cancel",
            EventType::Reject => "Reject",
        }
    }
}

/// An immutable lifecycle event. One per accept/partial/fill/cancel/reject
/// transition, in the order they occur.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub ts_ns: i64,
    pub order_id: u64,
    pub kind: EventType,
    pub state: OrderState,
    pub reject_reason: Option<RejectReason>,
}
