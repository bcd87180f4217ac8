//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::deploy::request::DeploymentRequest;
use crate::storage::Settings;
use crate::topology::{ParamKey, RoleId};

#[derive(Parser)]
#[command(name = "cfdeploy")]
#[command(version)]
#[command(about = "Deploy the todos topologies to Cloud Foundry", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Storage home holding settings.json and logs
    #[arg(long, global = true, env = "CFDEPLOY_HOME")]
    pub home: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy any catalog shape
    Push {
        /// Shape id or alias
        #[arg(short, long)]
        shape: String,

        #[command(flatten)]
        args: PushArgs,
    },

    /// Deploy simple/public: api, web-ui and edge on public routes
    PushApp(PushArgs),

    /// Deploy simple/private: api and web-ui behind internal routes
    PushInternal(PushArgs),

    /// Deploy registry/public: roles bound to config and registry services
    PushScs(PushArgs),

    /// Deploy registry/private
    PushScsInternal(PushArgs),

    /// Deploy mysql/public
    PushMysql(PushArgs),

    /// Deploy redis/public
    PushRedis(PushArgs),

    /// Deploy mysql+registry
    PushScsMysql(PushArgs),

    /// Deploy redis+registry
    PushScsRedis(PushArgs),

    /// Deploy the look-aside cache topology
    PushLookaside(PushArgs),

    /// Print the plan for a shape without executing it
    Plan {
        /// Shape id or alias
        #[arg(short, long)]
        shape: String,

        #[command(flatten)]
        args: PushArgs,
    },

    /// List catalog shapes
    Shapes,

    /// List organizations
    Orgs,

    /// List spaces in the targeted organization
    Spaces,

    /// List applications in the targeted space
    Apps,

    /// List service instances in the targeted space
    Services,

    /// List deployables in the artifact folder
    Artifacts,

    /// Manage the settings file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show version and build information
    Version,
}

impl Commands {
    /// Shape and push arguments for deployment commands
    pub fn push_target(&self) -> Option<(&str, &PushArgs)> {
        let target = match self {
            Commands::Push { shape, args } => (shape.as_str(), args),
            Commands::PushApp(args) => ("simple/public", args),
            Commands::PushInternal(args) => ("simple/private", args),
            Commands::PushScs(args) => ("registry/public", args),
            Commands::PushScsInternal(args) => ("registry/private", args),
            Commands::PushMysql(args) => ("mysql", args),
            Commands::PushRedis(args) => ("redis", args),
            Commands::PushScsMysql(args) => ("mysql+registry", args),
            Commands::PushScsRedis(args) => ("redis+registry", args),
            Commands::PushLookaside(args) => ("lookaside", args),
            _ => return None,
        };
        Some(target)
    }
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write a default settings file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective settings (secrets redacted)
    Show,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Debug, Default)]
pub struct PushArgs {
    /// Run tag prefixing every application name; generated when omitted
    #[arg(short, long, default_value = "")]
    pub tag: String,

    /// Artifact version (defaults to artifacts.default_version)
    #[arg(long)]
    pub artifact_version: Option<String>,

    /// Only deploy these roles (comma-separated), e.g. web-ui,edge
    #[arg(short, long, value_delimiter = ',')]
    pub roles: Option<Vec<RoleId>>,

    /// Apps domain for public routes
    #[arg(long)]
    pub domain: Option<String>,

    /// Domain of internal routes
    #[arg(long)]
    pub internal_domain: Option<String>,

    #[arg(long)]
    pub config_service: Option<String>,

    #[arg(long)]
    pub registry_service: Option<String>,

    #[arg(long)]
    pub database_service: Option<String>,

    #[arg(long)]
    pub redis_service: Option<String>,

    #[arg(long)]
    pub messaging_service: Option<String>,

    /// Extra named parameter, e.g. --param platform-api=api.example.com
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(ParamKey, String)>,

    /// Execute against a recording gateway instead of the platform
    #[arg(long)]
    pub dry_run: bool,

    /// Outcome format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

fn parse_param(raw: &str) -> Result<(ParamKey, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim().parse::<ParamKey>().map_err(|e| e.to_string())?;
    Ok((key, value.trim().to_string()))
}

impl PushArgs {
    /// Build the request: settings first, then flags, then `--param`
    pub fn to_request(&self, shape: &str, settings: &Settings) -> DeploymentRequest {
        let version = self
            .artifact_version
            .clone()
            .unwrap_or_else(|| settings.artifacts.default_version.clone());
        let mut request = DeploymentRequest::new(shape, self.tag.trim(), version);

        let flags = [
            (ParamKey::Domain, &self.domain),
            (ParamKey::InternalDomain, &self.internal_domain),
            (ParamKey::ConfigService, &self.config_service),
            (ParamKey::RegistryService, &self.registry_service),
            (ParamKey::DatabaseService, &self.database_service),
            (ParamKey::CacheService, &self.redis_service),
            (ParamKey::MessagingService, &self.messaging_service),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                request.params.insert(key, value.clone());
            }
        }
        for (key, value) in &self.params {
            request.params.insert(*key, value.clone());
        }

        if let Some(domain) = &settings.platform.domain {
            request.param_or_insert(ParamKey::Domain, domain.clone());
        }
        request.param_or_insert(ParamKey::PlatformApi, platform_host(&settings.platform.api));
        request.param_or_insert(ParamKey::InternalDomain, settings.internal_domain.clone());
        request.param_or_insert(ParamKey::ConfigService, settings.services.config.clone());
        request.param_or_insert(ParamKey::RegistryService, settings.services.registry.clone());
        request.param_or_insert(ParamKey::DatabaseService, settings.services.database.clone());
        request.param_or_insert(ParamKey::CacheService, settings.services.cache.clone());
        request.param_or_insert(ParamKey::MessagingService, settings.services.messaging.clone());

        if let Some(roles) = &self.roles {
            request = request.with_roles(roles.clone());
        }
        request
    }
}

/// Host part of the API URL, used for TRUST_CERTS
fn platform_host(api: &str) -> String {
    url::Url::parse(api)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| api.to_string())
}
