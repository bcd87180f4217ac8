//! API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A hyperlink in a v3 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Pagination block of a list response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub next: Option<Link>,
}

/// Paginated list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub pagination: Pagination,
    pub resources: Vec<T>,
}

/// Reference to another resource by guid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidRef {
    pub guid: String,
}

impl GuidRef {
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into() }
    }
}

/// To-one relationship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToOne {
    pub data: GuidRef,
}

impl ToOne {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            data: GuidRef::new(guid),
        }
    }
}

/// Root endpoint (`GET /`) links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootInfo {
    pub links: RootLinks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootLinks {
    #[serde(default)]
    pub login: Option<Link>,
    #[serde(default)]
    pub uaa: Option<Link>,
}

/// UAA token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Error entry returned by the Cloud Controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl ErrorResponse {
    /// Joined error details, or `None` when the body held no errors
    pub fn summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| format!("{} ({})", e.detail, e.title))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub guid: String,
    pub name: String,
}

/// Space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub guid: String,
    pub name: String,
}

/// Application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub state: AppState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppState {
    #[default]
    Stopped,
    Started,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRelationships {
    pub space: ToOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub relationships: AppRelationships,
}

/// Environment variable update; a `None` value unsets the variable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentVariables {
    pub var: BTreeMap<String, Option<String>>,
}

impl EnvironmentVariables {
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut var = BTreeMap::new();
        var.insert(key.into(), Some(value.into()));
        Self { var }
    }
}

/// Package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub guid: String,
    pub state: PackageState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageState {
    AwaitingUpload,
    ProcessingUpload,
    Ready,
    Failed,
    Copying,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRelationships {
    pub app: ToOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    #[serde(rename = "type")]
    pub package_type: String,
    pub relationships: PackageRelationships,
}

impl CreatePackageRequest {
    pub fn bits(app_guid: impl Into<String>) -> Self {
        Self {
            package_type: "bits".to_string(),
            relationships: PackageRelationships {
                app: ToOne::new(app_guid),
            },
        }
    }
}

/// Build (staging)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub guid: String,
    pub state: BuildState,
    #[serde(default)]
    pub droplet: Option<GuidRef>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildState {
    Staging,
    Staged,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuildRequest {
    pub package: GuidRef,
}

/// Process scale request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleProcessRequest {
    pub memory_in_mb: u32,
}

/// Service instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub guid: String,
    pub name: String,
}

/// Service credential binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCredentialBinding {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRelationships {
    pub service_instance: ToOne,
    pub app: ToOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBindingRequest {
    #[serde(rename = "type")]
    pub binding_type: String,
    pub relationships: BindingRelationships,
}

impl CreateBindingRequest {
    pub fn app(service_instance_guid: impl Into<String>, app_guid: impl Into<String>) -> Self {
        Self {
            binding_type: "app".to_string(),
            relationships: BindingRelationships {
                service_instance: ToOne::new(service_instance_guid),
                app: ToOne::new(app_guid),
            },
        }
    }
}

/// Domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub internal: bool,
}

/// Route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub guid: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRelationships {
    pub space: ToOne,
    pub domain: ToOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    pub host: String,
    pub relationships: RouteRelationships,
}

/// Route destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub app: GuidRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destinations {
    pub destinations: Vec<Destination>,
}

impl Destinations {
    pub fn for_app(app_guid: impl Into<String>) -> Self {
        Self {
            destinations: vec![Destination {
                guid: None,
                app: GuidRef::new(app_guid),
            }],
        }
    }
}

/// Asynchronous job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub guid: String,
    pub state: JobState,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Processing,
    Polling,
    Complete,
    Failed,
}
