//! Deployment requests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;
use crate::topology::{ParamKey, RoleId};

/// Input to one orchestration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Run tag; empty means "generate one"
    pub tag: String,
    /// Artifact version shared by every role
    pub version: String,
    /// Shape id or alias
    pub shape: String,
    /// Named parameters; missing keys fall back to their documented defaults
    #[serde(default)]
    pub params: BTreeMap<ParamKey, String>,
    /// Restrict the run to these roles; `None` runs every role of the shape
    #[serde(default)]
    pub roles: Option<Vec<RoleId>>,
}

impl DeploymentRequest {
    pub fn new(shape: impl Into<String>, tag: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            version: version.into(),
            shape: shape.into(),
            params: BTreeMap::new(),
            roles: None,
        }
    }

    pub fn with_param(mut self, key: ParamKey, value: impl Into<String>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<RoleId>) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Set `key` only when the request does not already carry it
    pub fn param_or_insert(&mut self, key: ParamKey, value: impl Into<String>) {
        self.params.entry(key).or_insert_with(|| value.into());
    }

    /// Value of `key`, falling back to its documented default
    pub fn resolve_param(&self, key: ParamKey) -> Result<&str, DeployerError> {
        self.params
            .get(&key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .or_else(|| key.default_value())
            .ok_or_else(|| DeployerError::UnresolvedParameter(key.to_string()))
    }

    /// Whether `role` takes part in this run
    pub fn includes(&self, role: RoleId) -> bool {
        self.roles
            .as_ref()
            .map(|roles| roles.contains(&role))
            .unwrap_or(true)
    }
}

/// Check that a tag can prefix application names and route hosts
pub fn validate_tag(tag: &str) -> Result<(), DeployerError> {
    let valid = !tag.is_empty()
        && tag.len() <= 48
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !tag.starts_with('-')
        && !tag.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(DeployerError::InvalidRequest(format!(
            "tag '{}' must be 1-48 lowercase letters, digits or inner hyphens",
            tag
        )))
    }
}
