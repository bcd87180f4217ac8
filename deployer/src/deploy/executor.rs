//! Plan executor

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::deploy::outcome::{step_label, RoleOutcome, RoleStatus, SkipReason};
use crate::deploy::plan::{OperationGroup, Plan};
use crate::errors::DeployerError;
use crate::platform::{self, PlatformGateway};

/// Drives every group of a plan against one gateway
pub struct PlanExecutor {
    gateway: Arc<dyn PlatformGateway>,
}

impl PlanExecutor {
    /// Create a new plan executor
    pub fn new(gateway: Arc<dyn PlatformGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn PlatformGateway> {
        &self.gateway
    }

    /// Run every group concurrently and collect one outcome per role.
    ///
    /// Planned roles come first in plan order, then the excluded ones.
    pub async fn execute(&self, plan: &Plan, cancel: &CancellationToken) -> Vec<RoleOutcome> {
        info!(
            "Executing {} groups for {} (tag {})",
            plan.groups.len(),
            plan.shape,
            plan.tag
        );

        let mut outcomes = join_all(plan.groups.iter().map(|group| self.run_group(group, cancel))).await;

        outcomes.extend(
            plan.excluded
                .iter()
                .map(|role| RoleOutcome::excluded(*role, &plan.tag)),
        );
        outcomes
    }

    async fn run_group(&self, group: &OperationGroup, cancel: &CancellationToken) -> RoleOutcome {
        let total = group.operations.len();

        if cancel.is_cancelled() {
            warn!("Skipping {}: run cancelled", group.app);
            return RoleOutcome {
                role: group.role,
                app: group.app.clone(),
                completed: 0,
                total,
                status: RoleStatus::NotAttempted {
                    reason: SkipReason::Cancelled,
                },
            };
        }

        for (step, operation) in group.operations.iter().enumerate() {
            debug!("[{}] {}: {}", group.role, step_label(step, total), operation);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(DeployerError::Cancelled),
                result = platform::dispatch(self.gateway.as_ref(), operation) => result,
            };

            if let Err(e) = result {
                error!(
                    "[{}] {} ({}) failed on {} with input '{}': {}",
                    group.role,
                    step_label(step, total),
                    operation.kind(),
                    group.app,
                    operation.input(),
                    e
                );
                return RoleOutcome {
                    role: group.role,
                    app: group.app.clone(),
                    completed: step,
                    total,
                    status: RoleStatus::Failed {
                        step,
                        kind: operation.kind(),
                        input: operation.input(),
                        error: e.to_string(),
                    },
                };
            }
        }

        info!("[{}] {} completed ({} operations)", group.role, group.app, total);
        RoleOutcome {
            role: group.role,
            app: group.app.clone(),
            completed: total,
            total,
            status: RoleStatus::Succeeded,
        }
    }
}
