//! Error types for cfdeploy

use thiserror::Error;

use crate::deploy::plan::OperationKind;

/// Main error type for cfdeploy
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    /// A named parameter has neither a value nor a default
    #[error("Unresolved parameter: {0}")]
    UnresolvedParameter(String),

    /// The shape and the request disagree on the participating roles
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown shape: {0}")]
    ShapeNotFound(String),

    #[error("Artifact not found: {artifact} (version {version})")]
    ArtifactNotFound { artifact: String, version: String },

    /// A gateway call failed during execution
    #[error("Platform error during {kind} on {app}: {message}")]
    PlatformError {
        kind: OperationKind,
        app: String,
        message: String,
    },

    /// Non-success response from the platform API
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployerError {
    /// Whether this error happened before any remote call was issued
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            DeployerError::UnresolvedParameter(_)
                | DeployerError::InvalidShape(_)
                | DeployerError::InvalidRequest(_)
                | DeployerError::ShapeNotFound(_)
        )
    }
}
