//! Topology shapes: roles plus their wiring, as data

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::topology::role::{Role, RoleId};

/// Networking mode of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Networking {
    Public,
    Private,
}

/// An address the edge needs to know about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Ui,
    Api,
}

/// Named run parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKey {
    /// Public apps domain
    Domain,
    /// Domain for container-to-container routes
    InternalDomain,
    /// Platform API host, handed to registry clients as TRUST_CERTS
    PlatformApi,
    ConfigService,
    RegistryService,
    DatabaseService,
    CacheService,
    MessagingService,
}

impl ParamKey {
    pub const ALL: [ParamKey; 8] = [
        ParamKey::Domain,
        ParamKey::InternalDomain,
        ParamKey::PlatformApi,
        ParamKey::ConfigService,
        ParamKey::RegistryService,
        ParamKey::DatabaseService,
        ParamKey::CacheService,
        ParamKey::MessagingService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKey::Domain => "domain",
            ParamKey::InternalDomain => "internal-domain",
            ParamKey::PlatformApi => "platform-api",
            ParamKey::ConfigService => "config-service",
            ParamKey::RegistryService => "registry-service",
            ParamKey::DatabaseService => "database-service",
            ParamKey::CacheService => "cache-service",
            ParamKey::MessagingService => "messaging-service",
        }
    }

    /// Documented default, if the parameter has one
    pub fn default_value(&self) -> Option<&'static str> {
        match self {
            ParamKey::Domain | ParamKey::PlatformApi => None,
            ParamKey::InternalDomain => Some("apps.internal"),
            ParamKey::ConfigService => Some("todos-config"),
            ParamKey::RegistryService => Some("todos-registry"),
            ParamKey::DatabaseService => Some("todos-database"),
            ParamKey::CacheService => Some("todos-redis"),
            ParamKey::MessagingService => Some("todos-messaging"),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('_', "-");
        ParamKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| format!("Invalid parameter: {}", s))
    }
}

/// Value of an environment-variable wiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Literal(&'static str),
    Param(ParamKey),
    /// The role's own application name
    OwnAppName,
    /// Address of whichever role provides the endpoint
    AddressOf(Endpoint),
}

/// A wiring operation, declared in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wiring {
    SetEnv { key: &'static str, value: EnvValue },
    Bind(ParamKey),
}

/// A role's participation in a shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub role: Role,
    pub wiring: Vec<Wiring>,
    /// In private networking, swap the default public route for an internal one
    pub private_route: bool,
}

impl RoleSpec {
    pub fn new(id: RoleId) -> Self {
        Self {
            role: Role::of(id),
            wiring: Vec::new(),
            private_route: false,
        }
    }

    pub fn id(&self) -> RoleId {
        self.role.id
    }
}

/// A statically defined deployment topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyShape {
    pub id: &'static str,
    pub description: &'static str,
    pub networking: Networking,
    /// Participating roles, in planning order
    pub roles: Vec<RoleSpec>,
    /// Which role answers for each endpoint
    pub endpoints: Vec<(Endpoint, RoleId)>,
}

impl TopologyShape {
    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(RoleSpec::id).collect()
    }

    pub fn contains(&self, role: RoleId) -> bool {
        self.roles.iter().any(|spec| spec.id() == role)
    }

    pub fn role(&self, role: RoleId) -> Option<&RoleSpec> {
        self.roles.iter().find(|spec| spec.id() == role)
    }

    /// The role designated as the provider of `endpoint`
    pub fn endpoint_provider(&self, endpoint: Endpoint) -> Option<RoleId> {
        self.endpoints
            .iter()
            .find(|(ep, _)| *ep == endpoint)
            .map(|(_, role)| *role)
    }

    /// Whether `role` is reached over an internal route in this shape
    pub fn is_privately_routed(&self, role: RoleId) -> bool {
        self.networking == Networking::Private
            && self.role(role).map(|spec| spec.private_route).unwrap_or(false)
    }
}
