//! Platform module
//!
//! The gateway is the only seam through which the orchestrator touches the
//! platform. Implementations must be safe to call concurrently for different
//! applications.

pub mod cf;
pub mod recording;

use async_trait::async_trait;

use crate::artifacts::ArtifactRef;
use crate::deploy::plan::Operation;
use crate::errors::DeployerError;

pub use cf::CloudFoundryGateway;
pub use recording::RecordingGateway;

/// Primitive platform operations
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Push the artifact as `app`; fails with `ArtifactNotFound` when it cannot be resolved
    async fn deploy(
        &self,
        artifact: &ArtifactRef,
        app: &str,
        start_immediately: bool,
    ) -> Result<(), DeployerError>;

    async fn set_environment_variable(
        &self,
        app: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DeployerError>;

    async fn bind_service(&self, app: &str, instance: &str) -> Result<(), DeployerError>;

    async fn map_route(&self, app: &str, domain: &str, host: &str) -> Result<(), DeployerError>;

    async fn unmap_route(&self, app: &str, domain: &str, host: &str) -> Result<(), DeployerError>;

    async fn start(&self, app: &str) -> Result<(), DeployerError>;

    async fn list_organizations(&self) -> Result<Vec<String>, DeployerError>;

    async fn list_spaces(&self) -> Result<Vec<String>, DeployerError>;

    /// Application names in the targeted space
    async fn list_applications(&self) -> Result<Vec<String>, DeployerError>;

    async fn list_service_instances(&self) -> Result<Vec<String>, DeployerError>;
}

/// Issue one planned operation through `gateway`.
///
/// Failures come back as `PlatformError` naming the operation kind and the
/// application, except `ArtifactNotFound` and `Cancelled`, which pass through.
pub async fn dispatch(
    gateway: &dyn PlatformGateway,
    operation: &Operation,
) -> Result<(), DeployerError> {
    let result = match operation {
        Operation::Deploy {
            artifact,
            app,
            start_immediately,
        } => gateway.deploy(artifact, app, *start_immediately).await,
        Operation::SetEnvironmentVariable { app, key, value } => {
            gateway.set_environment_variable(app, key, value).await
        }
        Operation::BindService { app, instance } => gateway.bind_service(app, instance).await,
        Operation::MapRoute { app, domain, host } => gateway.map_route(app, domain, host).await,
        Operation::UnmapRoute { app, domain, host } => {
            gateway.unmap_route(app, domain, host).await
        }
        Operation::Start { app } => gateway.start(app).await,
    };

    result.map_err(|e| match e {
        DeployerError::ArtifactNotFound { .. }
        | DeployerError::Cancelled
        | DeployerError::PlatformError { .. } => e,
        other => DeployerError::PlatformError {
            kind: operation.kind(),
            app: operation.app().to_string(),
            message: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::plan::OperationKind;

    /// Answers every call with a 502 from the cloud controller
    struct BadGateway;

    #[async_trait]
    impl PlatformGateway for BadGateway {
        async fn deploy(&self, artifact: &ArtifactRef, _: &str, _: bool) -> Result<(), DeployerError> {
            if artifact.name == "todos-edge" {
                return Err(DeployerError::ArtifactNotFound {
                    artifact: artifact.name.clone(),
                    version: artifact.version.clone(),
                });
            }
            Err(bad_gateway())
        }

        async fn set_environment_variable(&self, _: &str, _: &str, _: &str) -> Result<(), DeployerError> {
            Err(bad_gateway())
        }

        async fn bind_service(&self, _: &str, _: &str) -> Result<(), DeployerError> {
            Err(bad_gateway())
        }

        async fn map_route(&self, _: &str, _: &str, _: &str) -> Result<(), DeployerError> {
            Err(bad_gateway())
        }

        async fn unmap_route(&self, _: &str, _: &str, _: &str) -> Result<(), DeployerError> {
            Err(bad_gateway())
        }

        async fn start(&self, _: &str) -> Result<(), DeployerError> {
            Err(DeployerError::Timeout("staging".to_string()))
        }

        async fn list_organizations(&self) -> Result<Vec<String>, DeployerError> {
            Ok(Vec::new())
        }

        async fn list_spaces(&self) -> Result<Vec<String>, DeployerError> {
            Ok(Vec::new())
        }

        async fn list_applications(&self) -> Result<Vec<String>, DeployerError> {
            Ok(Vec::new())
        }

        async fn list_service_instances(&self) -> Result<Vec<String>, DeployerError> {
            Ok(Vec::new())
        }
    }

    fn bad_gateway() -> DeployerError {
        DeployerError::ApiError {
            status: 502,
            message: "bad gateway".to_string(),
        }
    }

    #[tokio::test]
    async fn test_api_error_names_kind_and_app() {
        let operation = Operation::BindService {
            app: "t3-web-ui".to_string(),
            instance: "todos-config".to_string(),
        };

        let err = dispatch(&BadGateway, &operation).await.unwrap_err();
        match &err {
            DeployerError::PlatformError { kind, app, message } => {
                assert_eq!(*kind, OperationKind::BindService);
                assert_eq!(app, "t3-web-ui");
                assert!(message.contains("502"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let text = err.to_string();
        assert!(text.contains("bindService") && text.contains("t3-web-ui"), "{}", text);
    }

    #[tokio::test]
    async fn test_timeout_is_wrapped() {
        let operation = Operation::Start {
            app: "t1-api".to_string(),
        };
        let err = dispatch(&BadGateway, &operation).await.unwrap_err();
        assert!(matches!(
            err,
            DeployerError::PlatformError {
                kind: OperationKind::Start,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_artifact_passes_through() {
        let operation = Operation::Deploy {
            artifact: ArtifactRef::new("todos-edge", "1.0.0.SNAP"),
            app: "t1-edge".to_string(),
            start_immediately: false,
        };
        let err = dispatch(&BadGateway, &operation).await.unwrap_err();
        assert!(matches!(err, DeployerError::ArtifactNotFound { .. }));
    }
}
