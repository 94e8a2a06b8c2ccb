// Invariant checkers: conservation, contract, and accounting-residual, run
// at configurable cadence by the scenario runner.

pub mod accounting;
pub mod conservation;
pub mod contract;

pub use accounting::{AccountingResidual, AccountingState, AuditRow};
pub use conservation::FillConservation;
pub use contract::ContractChecker;
