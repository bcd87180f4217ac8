//! Step planner
//!
//! Interprets a [`TopologyShape`] for one request. Every group is
//! `deploy(no-start) → [map internal, unmap public] → wiring → start`, and
//! addresses come from the naming convention, so no group waits on another.

use tracing::debug;

use crate::artifacts::ArtifactRef;
use crate::deploy::plan::{Operation, OperationGroup, Plan};
use crate::deploy::request::DeploymentRequest;
use crate::errors::DeployerError;
use crate::topology::{EnvValue, ParamKey, RoleId, RoleSpec, StartPolicy, TopologyShape, Wiring};

/// Container port reached over internal routes
pub const INTERNAL_PORT: u16 = 8080;

/// Build the plan for `request` against `shape`
pub fn plan(request: &DeploymentRequest, shape: &TopologyShape) -> Result<Plan, DeployerError> {
    if request.tag.is_empty() {
        return Err(DeployerError::UnresolvedParameter("tag".to_string()));
    }
    validate(request, shape)?;

    let planner = Planner { request, shape };
    let mut groups = Vec::new();
    let mut excluded = Vec::new();

    for spec in &shape.roles {
        if request.includes(spec.id()) {
            groups.push(planner.group(spec)?);
        } else {
            excluded.push(spec.id());
        }
    }

    debug!(
        "Planned {} groups ({} operations) for shape {} tag {}",
        groups.len(),
        groups.iter().map(|g| g.operations.len()).sum::<usize>(),
        shape.id,
        request.tag
    );

    Ok(Plan {
        tag: request.tag.clone(),
        shape: shape.id.to_string(),
        groups,
        excluded,
    })
}

fn validate(request: &DeploymentRequest, shape: &TopologyShape) -> Result<(), DeployerError> {
    for (endpoint, provider) in &shape.endpoints {
        if !shape.contains(*provider) {
            return Err(DeployerError::InvalidShape(format!(
                "{:?} endpoint provider {} is not a role of {}",
                endpoint, provider, shape.id
            )));
        }
    }

    if let Some(roles) = &request.roles {
        if roles.is_empty() {
            return Err(DeployerError::InvalidShape(format!(
                "empty role subset for {}",
                shape.id
            )));
        }
        if let Some(unknown) = roles.iter().find(|role| !shape.contains(**role)) {
            return Err(DeployerError::InvalidShape(format!(
                "role {} is not part of {} (roles: {})",
                unknown,
                shape.id,
                shape
                    .role_ids()
                    .iter()
                    .map(RoleId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }

    for spec in &shape.roles {
        if spec.role.start_policy == StartPolicy::Immediate
            && (!spec.wiring.is_empty() || shape.is_privately_routed(spec.id()))
        {
            return Err(DeployerError::InvalidShape(format!(
                "role {} starts immediately but declares wiring",
                spec.id()
            )));
        }
    }

    Ok(())
}

struct Planner<'a> {
    request: &'a DeploymentRequest,
    shape: &'a TopologyShape,
}

impl Planner<'_> {
    fn group(&self, spec: &RoleSpec) -> Result<OperationGroup, DeployerError> {
        let app = spec.id().app_name(&self.request.tag);
        let mut group = OperationGroup::new(spec.id(), app.clone());

        group.push(Operation::Deploy {
            artifact: ArtifactRef::new(spec.role.artifact, &self.request.version),
            app: app.clone(),
            start_immediately: spec.role.start_policy == StartPolicy::Immediate,
        });

        // The internal route must exist before the public one goes away.
        if self.shape.is_privately_routed(spec.id()) {
            group.push(Operation::MapRoute {
                app: app.clone(),
                domain: self.param(ParamKey::InternalDomain)?.to_string(),
                host: app.clone(),
            });
            group.push(Operation::UnmapRoute {
                app: app.clone(),
                domain: self.param(ParamKey::Domain)?.to_string(),
                host: app.clone(),
            });
        }

        for wiring in &spec.wiring {
            group.push(self.wiring(&app, wiring)?);
        }

        if spec.role.start_policy == StartPolicy::Deferred {
            group.push(Operation::Start { app });
        }

        Ok(group)
    }

    fn wiring(&self, app: &str, wiring: &Wiring) -> Result<Operation, DeployerError> {
        let operation = match wiring {
            Wiring::SetEnv { key, value } => Operation::SetEnvironmentVariable {
                app: app.to_string(),
                key: key.to_string(),
                value: self.env_value(app, value)?,
            },
            Wiring::Bind(instance) => Operation::BindService {
                app: app.to_string(),
                instance: self.param(*instance)?.to_string(),
            },
        };
        Ok(operation)
    }

    fn env_value(&self, app: &str, value: &EnvValue) -> Result<String, DeployerError> {
        match value {
            EnvValue::Literal(literal) => Ok(literal.to_string()),
            EnvValue::Param(key) => Ok(self.param(*key)?.to_string()),
            EnvValue::OwnAppName => Ok(app.to_string()),
            EnvValue::AddressOf(endpoint) => {
                let provider = self.shape.endpoint_provider(*endpoint).ok_or_else(|| {
                    DeployerError::InvalidShape(format!(
                        "{} has no provider for the {:?} endpoint",
                        self.shape.id, endpoint
                    ))
                })?;
                self.address(provider)
            }
        }
    }

    /// Address of `role` as seen from inside the platform
    fn address(&self, role: RoleId) -> Result<String, DeployerError> {
        let host = role.app_name(&self.request.tag);
        if self.shape.is_privately_routed(role) {
            Ok(format!(
                "http://{}.{}:{}",
                host,
                self.param(ParamKey::InternalDomain)?,
                INTERNAL_PORT
            ))
        } else {
            Ok(format!("http://{}.{}", host, self.param(ParamKey::Domain)?))
        }
    }

    fn param(&self, key: ParamKey) -> Result<&str, DeployerError> {
        self.request.resolve_param(key)
    }
}
