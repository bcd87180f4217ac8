//! Recording gateway
//!
//! Records every invocation in issue order without touching a platform.
//! Backs `--dry-run` and the test suites, which can also make chosen
//! operations fail and slow down chosen applications.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::artifacts::ArtifactRef;
use crate::deploy::plan::{Operation, OperationKind};
use crate::errors::DeployerError;
use crate::platform::PlatformGateway;

/// Gateway stub that records invocations
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Operation>>,
    failures: Vec<(OperationKind, String)>,
    missing_artifacts: Vec<String>,
    delays: HashMap<String, Duration>,
    applications: Vec<String>,
    service_instances: Vec<String>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `kind` call against `app`
    pub fn fail_on(mut self, kind: OperationKind, app: impl Into<String>) -> Self {
        self.failures.push((kind, app.into()));
        self
    }

    /// Report `artifact` as unresolvable on deploy
    pub fn missing_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.missing_artifacts.push(artifact.into());
        self
    }

    /// Hold every call against `app` for `delay` before completing it
    pub fn delay(mut self, app: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(app.into(), delay);
        self
    }

    /// Applications reported by `list_applications`
    pub fn with_applications(mut self, apps: Vec<String>) -> Self {
        self.applications = apps;
        self
    }

    pub fn with_service_instances(mut self, instances: Vec<String>) -> Self {
        self.service_instances = instances;
        self
    }

    /// Every invocation so far, in issue order
    pub async fn calls(&self) -> Vec<Operation> {
        self.calls.lock().await.clone()
    }

    /// Invocations against `app`, in issue order
    pub async fn calls_for(&self, app: &str) -> Vec<Operation> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|op| op.app() == app)
            .cloned()
            .collect()
    }

    async fn record(&self, operation: Operation) -> Result<(), DeployerError> {
        let kind = operation.kind();
        let app = operation.app().to_string();
        debug!("Recorded {}", operation);
        self.calls.lock().await.push(operation);

        if let Some(delay) = self.delays.get(&app) {
            tokio::time::sleep(*delay).await;
        }

        if self
            .failures
            .iter()
            .any(|(failing_kind, failing_app)| *failing_kind == kind && *failing_app == app)
        {
            return Err(DeployerError::PlatformError {
                kind,
                app,
                message: "injected failure".to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl PlatformGateway for RecordingGateway {
    async fn deploy(
        &self,
        artifact: &ArtifactRef,
        app: &str,
        start_immediately: bool,
    ) -> Result<(), DeployerError> {
        if self.missing_artifacts.iter().any(|name| *name == artifact.name) {
            return Err(DeployerError::ArtifactNotFound {
                artifact: artifact.name.clone(),
                version: artifact.version.clone(),
            });
        }

        self.record(Operation::Deploy {
            artifact: artifact.clone(),
            app: app.to_string(),
            start_immediately,
        })
        .await
    }

    async fn set_environment_variable(
        &self,
        app: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DeployerError> {
        self.record(Operation::SetEnvironmentVariable {
            app: app.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
    }

    async fn bind_service(&self, app: &str, instance: &str) -> Result<(), DeployerError> {
        self.record(Operation::BindService {
            app: app.to_string(),
            instance: instance.to_string(),
        })
        .await
    }

    async fn map_route(&self, app: &str, domain: &str, host: &str) -> Result<(), DeployerError> {
        self.record(Operation::MapRoute {
            app: app.to_string(),
            domain: domain.to_string(),
            host: host.to_string(),
        })
        .await
    }

    async fn unmap_route(&self, app: &str, domain: &str, host: &str) -> Result<(), DeployerError> {
        self.record(Operation::UnmapRoute {
            app: app.to_string(),
            domain: domain.to_string(),
            host: host.to_string(),
        })
        .await
    }

    async fn start(&self, app: &str) -> Result<(), DeployerError> {
        self.record(Operation::Start {
            app: app.to_string(),
        })
        .await
    }

    async fn list_organizations(&self) -> Result<Vec<String>, DeployerError> {
        Ok(Vec::new())
    }

    async fn list_spaces(&self) -> Result<Vec<String>, DeployerError> {
        Ok(Vec::new())
    }

    async fn list_applications(&self) -> Result<Vec<String>, DeployerError> {
        Ok(self.applications.clone())
    }

    async fn list_service_instances(&self) -> Result<Vec<String>, DeployerError> {
        Ok(self.service_instances.clone())
    }
}
