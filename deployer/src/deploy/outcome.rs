//! Run outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::fsm::RunState;
use crate::deploy::plan::OperationKind;
use crate::topology::RoleId;

/// Human label for the zero-based `step` of a group of `total` operations.
///
/// Steps are numbered from 0 everywhere, matching `RoleStatus::Failed::step`.
pub fn step_label(step: usize, total: usize) -> String {
    format!("step {} (of 0..{})", step, total.saturating_sub(1))
}

/// Why a role's group never issued an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// Left out by the request's role subset
    Excluded,
    /// The run was cancelled before the group began
    Cancelled,
}

/// Terminal status of one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RoleStatus {
    Succeeded,
    Failed {
        /// Zero-based index of the failing step in the group
        step: usize,
        kind: OperationKind,
        input: String,
        error: String,
    },
    NotAttempted {
        reason: SkipReason,
    },
}

impl RoleStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RoleStatus::Succeeded)
    }

    pub fn failed_kind(&self) -> Option<OperationKind> {
        match self {
            RoleStatus::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// One role's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOutcome {
    pub role: RoleId,
    pub app: String,
    /// Operations that completed
    pub completed: usize,
    /// Operations the group held
    pub total: usize,
    #[serde(flatten)]
    pub status: RoleStatus,
}

impl RoleOutcome {
    pub fn excluded(role: RoleId, tag: &str) -> Self {
        Self {
            role,
            app: role.app_name(tag),
            completed: 0,
            total: 0,
            status: RoleStatus::NotAttempted {
                reason: SkipReason::Excluded,
            },
        }
    }

    /// Whether this role counts towards the run's result
    pub fn is_planned(&self) -> bool {
        !matches!(
            self.status,
            RoleStatus::NotAttempted {
                reason: SkipReason::Excluded
            }
        )
    }
}

/// Aggregate result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub tag: String,
    pub shape: String,
    pub state: RunState,
    pub roles: Vec<RoleOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Succeeded
    }

    pub fn role(&self, role: RoleId) -> Option<&RoleOutcome> {
        self.roles.iter().find(|outcome| outcome.role == role)
    }

    pub fn status(&self, role: RoleId) -> Option<&RoleStatus> {
        self.role(role).map(|outcome| &outcome.status)
    }

    /// Roles whose planned group did not complete
    pub fn failed_roles(&self) -> Vec<RoleId> {
        self.roles
            .iter()
            .filter(|outcome| outcome.is_planned() && !outcome.status.is_success())
            .map(|outcome| outcome.role)
            .collect()
    }

    /// (planned, failed) counts
    pub fn tally(&self) -> (usize, usize) {
        let planned = self.roles.iter().filter(|o| o.is_planned()).count();
        (planned, self.failed_roles().len())
    }
}
