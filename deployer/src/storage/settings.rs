//! Settings file management

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// cfdeploy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rolling log files under the storage home
    #[serde(default)]
    pub log_to_file: bool,

    /// Platform endpoint and target
    #[serde(default)]
    pub platform: PlatformSettings,

    /// Artifact folder configuration
    #[serde(default)]
    pub artifacts: ArtifactSettings,

    /// Names of the shared service instances roles bind to
    #[serde(default)]
    pub services: ServiceSettings,

    /// Domain of internal routes
    #[serde(default = "default_internal_domain")]
    pub internal_domain: String,

    /// Re-draw generated run tags that existing applications already carry
    #[serde(default = "default_true")]
    pub check_tag_collisions: bool,
}

fn default_true() -> bool {
    true
}

fn default_internal_domain() -> String {
    "apps.internal".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            platform: PlatformSettings::default(),
            artifacts: ArtifactSettings::default(),
            services: ServiceSettings::default(),
            internal_domain: default_internal_domain(),
            check_tag_collisions: true,
        }
    }
}

/// Platform API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Cloud controller URL
    #[serde(default = "default_api")]
    pub api: String,

    #[serde(default)]
    pub skip_ssl_validation: bool,

    #[serde(default)]
    pub username: String,

    /// Never written back to disk
    #[serde(default, skip_serializing, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub space: String,

    /// Apps domain for public routes
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,

    #[serde(default = "default_staging_timeout")]
    pub staging_timeout_secs: u64,
}

fn default_api() -> String {
    "https://api.run.pivotal.io".to_string()
}

fn default_memory_mb() -> u32 {
    1024
}

fn default_staging_timeout() -> u64 {
    300
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            api: default_api(),
            skip_ssl_validation: false,
            username: String::new(),
            password: None,
            organization: String::new(),
            space: String::new(),
            domain: None,
            memory_mb: default_memory_mb(),
            staging_timeout_secs: default_staging_timeout(),
        }
    }
}

/// Artifact folder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    #[serde(default = "default_artifact_folder")]
    pub folder: String,

    #[serde(default = "default_version")]
    pub default_version: String,
}

fn default_artifact_folder() -> String {
    "./artifacts".to_string()
}

fn default_version() -> String {
    "1.0.0.SNAP".to_string()
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            folder: default_artifact_folder(),
            default_version: default_version(),
        }
    }
}

/// Shared service instance names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_config_service")]
    pub config: String,

    #[serde(default = "default_registry_service")]
    pub registry: String,

    #[serde(default = "default_database_service")]
    pub database: String,

    #[serde(default = "default_cache_service")]
    pub cache: String,

    #[serde(default = "default_messaging_service")]
    pub messaging: String,
}

fn default_config_service() -> String {
    "todos-config".to_string()
}

fn default_registry_service() -> String {
    "todos-registry".to_string()
}

fn default_database_service() -> String {
    "todos-database".to_string()
}

fn default_cache_service() -> String {
    "todos-redis".to_string()
}

fn default_messaging_service() -> String {
    "todos-messaging".to_string()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            config: default_config_service(),
            registry: default_registry_service(),
            database: default_database_service(),
            cache: default_cache_service(),
            messaging: default_messaging_service(),
        }
    }
}

impl Settings {
    /// Apply `CFDEPLOY_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(level) = get("CFDEPLOY_LOG_LEVEL").and_then(|v| v.parse().ok()) {
            self.log_level = level;
        }
        if let Some(api) = get("CFDEPLOY_API") {
            self.platform.api = api;
        }
        if let Some(skip) = get("CFDEPLOY_SKIP_SSL_VALIDATION") {
            self.platform.skip_ssl_validation = matches!(skip.as_str(), "1" | "true" | "yes");
        }
        if let Some(username) = get("CFDEPLOY_USERNAME") {
            self.platform.username = username;
        }
        if let Some(password) = get("CFDEPLOY_PASSWORD") {
            self.platform.password = Some(SecretString::from(password));
        }
        if let Some(org) = get("CFDEPLOY_ORG") {
            self.platform.organization = org;
        }
        if let Some(space) = get("CFDEPLOY_SPACE") {
            self.platform.space = space;
        }
        if let Some(domain) = get("CFDEPLOY_DOMAIN") {
            self.platform.domain = Some(domain);
        }
        if let Some(folder) = get("CFDEPLOY_ARTIFACTS") {
            self.artifacts.folder = folder;
        }
        if let Some(internal) = get("CFDEPLOY_INTERNAL_DOMAIN") {
            self.internal_domain = internal;
        }
    }

    /// Check the fields every remote command needs
    pub fn require_credentials(&self) -> Result<(), DeployerError> {
        let mut missing = Vec::new();
        if self.platform.username.is_empty() {
            missing.push("platform.username");
        }
        if self.platform.password.is_none() {
            missing.push("platform.password");
        }
        if self.platform.organization.is_empty() {
            missing.push("platform.organization");
        }
        if self.platform.space.is_empty() {
            missing.push("platform.space");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DeployerError::ConfigError(format!(
                "missing settings: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Load settings from `file`, falling back to defaults when it does not exist
pub async fn load_settings(file: &File) -> Result<Settings, DeployerError> {
    if !file.exists().await {
        debug!("No settings file at {:?}, using defaults", file.path());
        return Ok(Settings::default());
    }
    file.read_json().await.map_err(|e| {
        DeployerError::ConfigError(format!("invalid settings file {:?}: {}", file.path(), e))
    })
}

/// Write settings to `file` (secrets are never serialized)
pub async fn save_settings(file: &File, settings: &Settings) -> Result<(), DeployerError> {
    file.write_json(settings).await?;
    file.set_permissions_600().await
}
