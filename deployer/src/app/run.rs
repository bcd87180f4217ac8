//! Command dispatch

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::output;
use crate::artifacts::{ArtifactResolver, LocalFolderResolver};
use crate::authn::{Credentials, TokenManager};
use crate::cli::{Cli, Commands, ConfigCommand, OutputFormat, PushArgs};
use crate::deploy::orchestrator::{Orchestrator, OrchestratorOptions};
use crate::errors::DeployerError;
use crate::http::client::HttpClient;
use crate::logs::{init_logging, LogLevel, LogOptions};
use crate::platform::cf::CloudFoundryOptions;
use crate::platform::{CloudFoundryGateway, PlatformGateway, RecordingGateway};
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{load_settings, save_settings, Settings};
use crate::topology::{ParamKey, TopologyCatalog};
use crate::utils::version_info;

/// Run one command; `Ok(false)` means the command ran but did not succeed
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<bool, DeployerError> {
    let layout = StorageLayout::resolve(cli.home.clone());
    let mut settings = load_settings(&layout.settings_file()).await?;
    settings.apply_env();

    let _log_guard = init_logging(log_options(&settings, &layout, cli.verbose).await?)?;
    debug!("Storage home: {:?}", layout.base_dir);

    if let Some((shape, args)) = cli.command.push_target() {
        return push(shape, args, &settings, &cancel).await;
    }

    match &cli.command {
        Commands::Plan { shape, args } => {
            let request = args.to_request(shape, &settings);
            let orchestrator = Orchestrator::new(Arc::new(RecordingGateway::new()));
            output::plan(&orchestrator.preview(&request)?, args.output)?;
        }
        Commands::Shapes => output::shapes(TopologyCatalog::global()),
        Commands::Orgs => {
            let orgs = platform_gateway(&settings, None)?.list_organizations().await?;
            output::names("Organizations", &orgs, OutputFormat::Text)?;
        }
        Commands::Spaces => {
            let spaces = platform_gateway(&settings, None)?.list_spaces().await?;
            output::names("Spaces", &spaces, OutputFormat::Text)?;
        }
        Commands::Apps => {
            let apps = platform_gateway(&settings, None)?.list_applications().await?;
            output::names("Applications", &apps, OutputFormat::Text)?;
        }
        Commands::Services => {
            let services = platform_gateway(&settings, None)?.list_service_instances().await?;
            output::names("Service instances", &services, OutputFormat::Text)?;
        }
        Commands::Artifacts => {
            let resolver = LocalFolderResolver::new(&settings.artifacts.folder);
            let artifacts = resolver.list().await?;
            output::names(
                &format!("Artifacts in {}", settings.artifacts.folder),
                &artifacts,
                OutputFormat::Text,
            )?;
        }
        Commands::Config(ConfigCommand::Init { force }) => {
            let file = layout.settings_file();
            if file.exists().await && !force {
                return Err(DeployerError::ConfigError(format!(
                    "{:?} already exists (use --force to overwrite)",
                    file.path()
                )));
            }
            layout.setup().await?;
            save_settings(&file, &Settings::default()).await?;
            output::success(&format!("Wrote {}", file.path().display()));
        }
        Commands::Config(ConfigCommand::Show) => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            let password = if settings.platform.password.is_some() {
                "(set)"
            } else {
                "(not set)"
            };
            println!("platform.password: {}", password);
        }
        Commands::Version => {
            println!("{}", serde_json::to_string_pretty(&version_info())?);
        }
        _ => {}
    }
    Ok(true)
}

async fn push(
    shape: &str,
    args: &PushArgs,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<bool, DeployerError> {
    let request = args.to_request(shape, settings);

    let recording = args.dry_run.then(|| Arc::new(RecordingGateway::new()));
    let gateway: Arc<dyn PlatformGateway> = match &recording {
        Some(recording) => {
            info!("Dry run: recording operations instead of calling the platform");
            recording.clone() as Arc<dyn PlatformGateway>
        }
        None => {
            let domain = request.resolve_param(ParamKey::Domain).ok().map(str::to_string);
            Arc::new(platform_gateway(settings, domain)?)
        }
    };

    let orchestrator = Orchestrator::new(gateway).with_options(OrchestratorOptions {
        check_tag_collisions: settings.check_tag_collisions,
        ..OrchestratorOptions::default()
    });
    let outcome = orchestrator.deploy(request, cancel).await?;
    output::outcome(&outcome, args.output)?;

    if let Some(recording) = recording {
        if args.output == OutputFormat::Text {
            output::header("Recorded operations");
            for operation in recording.calls().await {
                println!("  {}", operation);
            }
        }
    }
    Ok(outcome.is_success())
}

/// Gateway against the configured platform, with one process-wide token manager.
///
/// `route_domain` is the run's `domain` parameter, so default routes land
/// where private shapes later unmap them.
fn platform_gateway(
    settings: &Settings,
    route_domain: Option<String>,
) -> Result<CloudFoundryGateway, DeployerError> {
    settings.require_credentials()?;
    let platform = &settings.platform;

    let http = Arc::new(HttpClient::new(&platform.api, platform.skip_ssl_validation)?);
    let password = platform
        .password
        .clone()
        .ok_or_else(|| DeployerError::ConfigError("platform.password is not set".to_string()))?;
    let tokens = Arc::new(TokenManager::new(
        http.clone(),
        Credentials {
            username: platform.username.clone(),
            password,
        },
    ));
    let resolver = Arc::new(LocalFolderResolver::new(&settings.artifacts.folder));

    Ok(CloudFoundryGateway::new(
        http,
        tokens,
        resolver,
        cloud_foundry_options(settings, route_domain),
    ))
}

fn cloud_foundry_options(settings: &Settings, route_domain: Option<String>) -> CloudFoundryOptions {
    let platform = &settings.platform;
    CloudFoundryOptions {
        organization: platform.organization.clone(),
        space: platform.space.clone(),
        memory_mb: platform.memory_mb,
        route_domain: route_domain.or_else(|| platform.domain.clone()),
        staging_timeout: Duration::from_secs(platform.staging_timeout_secs),
    }
}

async fn log_options(
    settings: &Settings,
    layout: &StorageLayout,
    verbose: u8,
) -> Result<LogOptions, DeployerError> {
    let log_level = match verbose {
        0 => settings.log_level.clone(),
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let log_dir = if settings.log_to_file {
        let dir = layout.logs_dir();
        dir.create().await?;
        Some(dir.path().to_path_buf())
    } else {
        None
    };

    Ok(LogOptions {
        log_level,
        stderr: true,
        log_dir,
        json_format: settings.log_json,
    })
}
