//! Plan types: primitive operations grouped per role

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactRef;
use crate::topology::RoleId;

/// Kind of a primitive platform operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Deploy,
    SetEnvironmentVariable,
    BindService,
    MapRoute,
    UnmapRoute,
    Start,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deploy => "deploy",
            OperationKind::SetEnvironmentVariable => "setEnvironmentVariable",
            OperationKind::BindService => "bindService",
            OperationKind::MapRoute => "mapRoute",
            OperationKind::UnmapRoute => "unmapRoute",
            OperationKind::Start => "start",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive operation against one application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operation {
    Deploy {
        artifact: ArtifactRef,
        app: String,
        start_immediately: bool,
    },
    SetEnvironmentVariable {
        app: String,
        key: String,
        value: String,
    },
    BindService {
        app: String,
        instance: String,
    },
    MapRoute {
        app: String,
        domain: String,
        host: String,
    },
    UnmapRoute {
        app: String,
        domain: String,
        host: String,
    },
    Start {
        app: String,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Deploy { .. } => OperationKind::Deploy,
            Operation::SetEnvironmentVariable { .. } => OperationKind::SetEnvironmentVariable,
            Operation::BindService { .. } => OperationKind::BindService,
            Operation::MapRoute { .. } => OperationKind::MapRoute,
            Operation::UnmapRoute { .. } => OperationKind::UnmapRoute,
            Operation::Start { .. } => OperationKind::Start,
        }
    }

    /// Target application name
    pub fn app(&self) -> &str {
        match self {
            Operation::Deploy { app, .. }
            | Operation::SetEnvironmentVariable { app, .. }
            | Operation::BindService { app, .. }
            | Operation::MapRoute { app, .. }
            | Operation::UnmapRoute { app, .. }
            | Operation::Start { app } => app,
        }
    }

    /// The operation's input, for diagnostics
    pub fn input(&self) -> String {
        match self {
            Operation::Deploy {
                artifact,
                start_immediately,
                ..
            } => format!("{} (start: {})", artifact, start_immediately),
            Operation::SetEnvironmentVariable { key, value, .. } => format!("{}={}", key, value),
            Operation::BindService { instance, .. } => instance.clone(),
            Operation::MapRoute { domain, host, .. } | Operation::UnmapRoute { domain, host, .. } => {
                format!("{}.{}", host, domain)
            }
            Operation::Start { .. } => String::new(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let input = self.input();
        if input.is_empty() {
            write!(f, "{} {}", self.kind(), self.app())
        } else {
            write!(f, "{} {} {}", self.kind(), self.app(), input)
        }
    }
}

/// One role's strictly ordered operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationGroup {
    pub role: RoleId,
    pub app: String,
    pub operations: Vec<Operation>,
}

impl OperationGroup {
    pub fn new(role: RoleId, app: impl Into<String>) -> Self {
        Self {
            role,
            app: app.into(),
            operations: Vec::new(),
        }
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn kinds(&self) -> Vec<OperationKind> {
        self.operations.iter().map(Operation::kind).collect()
    }
}

/// A planned run: the groups to execute, plus the shape roles left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub tag: String,
    pub shape: String,
    pub groups: Vec<OperationGroup>,
    /// Roles of the shape excluded by the request's role subset
    pub excluded: Vec<RoleId>,
}

impl Plan {
    pub fn group(&self, role: RoleId) -> Option<&OperationGroup> {
        self.groups.iter().find(|group| group.role == role)
    }

    pub fn operation_count(&self) -> usize {
        self.groups.iter().map(|group| group.operations.len()).sum()
    }
}
