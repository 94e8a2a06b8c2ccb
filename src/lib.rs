// microstructure_sim/src/lib.rs
//
// A deterministic, integer-exact L2 limit-order-book microstructure
// simulator. Participant orders are matched against a replayed anonymous
// market depth feed, never against each other; the whole pipeline —
// snapshot decode, matching, invariant checking, mark-out attribution and
// the scenario runner — runs single-threaded with a monotonic logical
// clock so that two runs over the same spec and data are byte-identical.

pub mod artifacts;
pub mod book;
pub mod canonical;
pub mod engine;
pub mod fingerprint;
pub mod invariants;
pub mod ledger;
pub mod markout;
pub mod runner;
pub mod snapshot;
pub mod spec_model;
pub mod types;

pub use book::{MarketDepth, RestingBook};
pub use engine::{
    Event, EventType, Fill, Liquidity, MatchingEngine, Order, OrderState, PlaceLimitRequest,
    RejectReason, SimulatorParams, Tif,
};
pub use fingerprint::{fingerprint_file, DataFingerprint};
pub use invariants::{AccountingResidual, AuditRow, ContractChecker, FillConservation};
pub use ledger::Ledger;
pub use markout::{CompletedMarkout, MarkoutTracker};
pub use runner::{run_scenario, RunnerError};
pub use snapshot::{CodecError, Header, ReplayKernel};
pub use spec_model::{ScenarioSpec, SpecError};
pub use types::Side;
