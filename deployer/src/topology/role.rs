//! Deployable roles

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a fixed participant in a topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleId {
    /// REST backend
    Api,
    /// Web front-end
    WebUi,
    /// Edge gateway fronting the UI and the API
    Edge,
    /// Database-backed API replacement
    Mysql,
    /// Cache-backed API replacement
    Redis,
    /// Look-aside caching application backend
    App,
}

impl RoleId {
    pub const ALL: [RoleId; 6] = [
        RoleId::Api,
        RoleId::WebUi,
        RoleId::Edge,
        RoleId::Mysql,
        RoleId::Redis,
        RoleId::App,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleId::Api => "api",
            RoleId::WebUi => "web-ui",
            RoleId::Edge => "edge",
            RoleId::Mysql => "mysql",
            RoleId::Redis => "redis",
            RoleId::App => "app",
        }
    }

    /// Application name for this role in the run identified by `tag`
    pub fn app_name(&self, tag: &str) -> String {
        format!("{}-{}", tag, self.as_str())
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(RoleId::Api),
            "web-ui" | "webui" => Ok(RoleId::WebUi),
            "edge" => Ok(RoleId::Edge),
            "mysql" => Ok(RoleId::Mysql),
            "redis" => Ok(RoleId::Redis),
            "app" => Ok(RoleId::App),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// How a role's application is brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPolicy {
    /// Deploy without starting, wire, then start
    Deferred,
    /// Start as part of the deploy; the role takes no wiring
    Immediate,
}

/// Static definition of a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    /// Artifact name; the deployable is `{artifact}-{version}`
    pub artifact: &'static str,
    pub start_policy: StartPolicy,
}

impl Role {
    /// The process-wide definition of `id`
    pub fn of(id: RoleId) -> Role {
        let artifact = match id {
            RoleId::Api => "todos-api",
            RoleId::WebUi => "todos-webui",
            RoleId::Edge => "todos-edge",
            RoleId::Mysql => "todos-mysql",
            RoleId::Redis => "todos-redis",
            RoleId::App => "todos-app",
        };

        Role {
            id,
            artifact,
            start_policy: StartPolicy::Deferred,
        }
    }
}
