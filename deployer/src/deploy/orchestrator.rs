//! Orchestration facade

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::deploy::executor::PlanExecutor;
use crate::deploy::fsm::{RunEvent, RunFsm};
use crate::deploy::outcome::RunOutcome;
use crate::deploy::plan::Plan;
use crate::deploy::planner;
use crate::deploy::request::{validate_tag, DeploymentRequest};
use crate::errors::DeployerError;
use crate::platform::PlatformGateway;
use crate::topology::{TopologyCatalog, TopologyShape};
use crate::utils::generate_tag;

/// Orchestrator options
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Re-draw a generated tag when applications already carry it
    pub check_tag_collisions: bool,
    /// Redraws allowed after the first generated tag collides
    pub max_tag_attempts: usize,
    /// Draws a tag for requests that carry none
    pub tag_source: fn() -> String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            check_tag_collisions: true,
            max_tag_attempts: 5,
            tag_source: generate_tag,
        }
    }
}

/// Entry point for one deployment run: catalog lookup, planning, execution
pub struct Orchestrator {
    catalog: &'static TopologyCatalog,
    executor: PlanExecutor,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn PlatformGateway>) -> Self {
        Self {
            catalog: TopologyCatalog::global(),
            executor: PlanExecutor::new(gateway),
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &'static TopologyCatalog {
        self.catalog
    }

    /// Build the plan without issuing anything
    pub fn preview(&self, request: &DeploymentRequest) -> Result<Plan, DeployerError> {
        let shape = self.catalog.lookup(&request.shape)?;
        let mut request = request.clone();
        if request.tag.is_empty() {
            request.tag = (self.options.tag_source)();
        }
        validate_tag(&request.tag)?;
        planner::plan(&request, shape)
    }

    /// Run the deployment described by `request`.
    ///
    /// Catalog and planner failures return `Err` before any remote call.
    /// Execution failures are role scoped and reported in the outcome.
    pub async fn deploy(
        &self,
        mut request: DeploymentRequest,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, DeployerError> {
        let started_at = Utc::now();
        let mut fsm = RunFsm::new();

        let (shape, plan) = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("Rejected request for shape '{}': {}", request.shape, e);
                fsm.process(RunEvent::PlanFailed(e.to_string()))
                    .map_err(DeployerError::Internal)?;
                return Err(e);
            }
        };
        fsm.process(RunEvent::Planned)
            .map_err(DeployerError::Internal)?;

        let generated = request.tag.is_empty();
        let plan = if generated {
            self.resolve_generated_tag(&mut request, shape, plan).await?
        } else {
            plan
        };

        info!(
            "Deploying shape {} with tag {} (version {}, {} groups)",
            shape.id,
            plan.tag,
            request.version,
            plan.groups.len()
        );
        info!("Resolved request: {:?}", request);

        fsm.process(RunEvent::Execute)
            .map_err(DeployerError::Internal)?;
        let roles = self.executor.execute(&plan, cancel).await;

        let mut outcome = RunOutcome {
            tag: plan.tag.clone(),
            shape: plan.shape.clone(),
            state: fsm.state(),
            roles,
            started_at,
            finished_at: Utc::now(),
        };

        let (planned, failed) = outcome.tally();
        outcome.state = fsm
            .process(RunEvent::Complete { planned, failed })
            .map_err(DeployerError::Internal)?;

        info!(
            "Run {} finished: {:?} ({}/{} roles succeeded)",
            outcome.tag,
            outcome.state,
            planned - failed,
            planned
        );
        Ok(outcome)
    }

    /// Look up the shape and plan with a provisional tag.
    ///
    /// An empty tag stays empty on the request so the caller knows it was generated.
    fn prepare(
        &self,
        request: &DeploymentRequest,
    ) -> Result<(&'static TopologyShape, Plan), DeployerError> {
        let shape = self.catalog.lookup(&request.shape)?;

        let plan = if request.tag.is_empty() {
            let mut provisional = request.clone();
            provisional.tag = (self.options.tag_source)();
            planner::plan(&provisional, shape)?
        } else {
            validate_tag(&request.tag)?;
            planner::plan(request, shape)?
        };
        Ok((shape, plan))
    }

    /// Settle on a generated tag that no existing application carries
    async fn resolve_generated_tag(
        &self,
        request: &mut DeploymentRequest,
        shape: &TopologyShape,
        mut plan: Plan,
    ) -> Result<Plan, DeployerError> {
        request.tag = plan.tag.clone();
        if !self.options.check_tag_collisions {
            return Ok(plan);
        }

        let existing = match self.executor.gateway().list_applications().await {
            Ok(apps) => apps,
            Err(e) => {
                warn!("Could not list applications, skipping tag collision check: {}", e);
                return Ok(plan);
            }
        };

        let mut redraws = 0;
        loop {
            let prefix = format!("{}-", request.tag);
            if !existing.iter().any(|app| app.starts_with(&prefix)) {
                return Ok(plan);
            }
            if redraws >= self.options.max_tag_attempts {
                return Err(DeployerError::InvalidRequest(format!(
                    "no unused tag after {} attempts",
                    redraws + 1
                )));
            }
            warn!("Generated tag {} is already in use, drawing another", request.tag);
            redraws += 1;
            request.tag = (self.options.tag_source)();
            plan = planner::plan(request, shape)?;
        }
    }
}
