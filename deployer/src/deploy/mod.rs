//! Deployment module

pub mod executor;
pub mod fsm;
pub mod orchestrator;
pub mod outcome;
pub mod plan;
pub mod planner;
pub mod request;

pub use executor::PlanExecutor;
pub use fsm::{RunEvent, RunFsm, RunState};
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use outcome::{RoleOutcome, RoleStatus, RunOutcome, SkipReason};
pub use plan::{Operation, OperationGroup, OperationKind, Plan};
pub use request::{validate_tag, DeploymentRequest};
