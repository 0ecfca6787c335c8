//! Execution Governance Engine
//!
//! Turns the append-only execution log into reconciled states and a pending
//! approvals view, and executes operator decisions:
//! - `reconciler`: event log -> one state per execution
//! - `approval`: approve/reject URL and signed payload codec
//! - `pending`: what needs a human decision right now
//! - `action`: performs the approve/reject call
//! - `service`: composition root used by the HTTP layer

pub mod action;
pub mod approval;
pub mod pending;
pub mod reconciler;
pub mod service;

pub use action::HttpActionExecutor;
pub use approval::{ApprovalPayload, Decision};
pub use pending::PendingApproval;
pub use reconciler::ExecutionState;
pub use service::{DecisionResult, GovernanceOptions, GovernanceService, NotifyResult};
