//! Cloud Foundry gateway over the v3 API
//!
//! Every operation converges on the desired state instead of assuming a
//! clean space: existing apps are reused, bindings and destinations that are
//! already present are skipped, and unmapping a route that does not exist
//! succeeds. Re-running a role's group is therefore safe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use cf_models::{
    App, AppRelationships, AppState, Build, BuildState, CreateAppRequest, CreateBindingRequest,
    CreateBuildRequest, CreatePackageRequest, CreateRouteRequest, Destinations, Domain,
    EnvironmentVariables, GuidRef, Job, JobState, ListResponse, Organization, Package,
    PackageState, Route, RouteRelationships, ScaleProcessRequest, ServiceCredentialBinding,
    ServiceInstance, Space, ToOne,
};

use crate::artifacts::{ArtifactRef, ArtifactResolver};
use crate::authn::TokenManagerExt;
use crate::errors::DeployerError;
use crate::http::client::HttpClient;
use crate::platform::PlatformGateway;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Target and push settings
#[derive(Debug, Clone)]
pub struct CloudFoundryOptions {
    pub organization: String,
    pub space: String,
    pub memory_mb: u32,
    /// Domain of the default route mapped on deploy; the org's default
    /// domain when unset. Private shapes unmap the route on this domain.
    pub route_domain: Option<String>,
    /// Upper bound for one upload, staging or async job
    pub staging_timeout: Duration,
}

#[derive(Debug, Clone)]
struct Target {
    org_guid: String,
    space_guid: String,
}

/// Gateway backed by a Cloud Controller
pub struct CloudFoundryGateway {
    http: Arc<HttpClient>,
    tokens: Arc<dyn TokenManagerExt>,
    resolver: Arc<dyn ArtifactResolver>,
    options: CloudFoundryOptions,
    cooldown: CooldownOptions,
    target: OnceCell<Target>,
}

impl CloudFoundryGateway {
    pub fn new(
        http: Arc<HttpClient>,
        tokens: Arc<dyn TokenManagerExt>,
        resolver: Arc<dyn ArtifactResolver>,
        options: CloudFoundryOptions,
    ) -> Self {
        Self {
            http,
            tokens,
            resolver,
            options,
            cooldown: CooldownOptions::default(),
            target: OnceCell::new(),
        }
    }

    async fn token(&self) -> Result<String, DeployerError> {
        Ok(self.tokens.get_token().await?.raw)
    }

    /// Follow `next` links until every page is read
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, DeployerError> {
        let token = self.token().await?;
        let mut page: ListResponse<T> = self.http.get(path, &token).await?;
        let mut resources = std::mem::take(&mut page.resources);

        while let Some(next) = page.pagination.next.take() {
            page = self.http.get_url(&next.href, &token).await?;
            resources.append(&mut page.resources);
        }
        Ok(resources)
    }

    async fn first<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, DeployerError> {
        let token = self.token().await?;
        let page: ListResponse<T> = self.http.get(path, &token).await?;
        Ok(page.resources.into_iter().next())
    }

    /// Organization and space guids, resolved once
    async fn target(&self) -> Result<&Target, DeployerError> {
        self.target
            .get_or_try_init(|| async {
                let org: Organization = self
                    .first(&format!(
                        "/v3/organizations?{}",
                        query(&[("names", self.options.organization.as_str())])
                    ))
                    .await?
                    .ok_or_else(|| {
                        DeployerError::NotFound(format!("organization {}", self.options.organization))
                    })?;

                let space: Space = self
                    .first(&format!(
                        "/v3/spaces?{}",
                        query(&[
                            ("names", self.options.space.as_str()),
                            ("organization_guids", org.guid.as_str()),
                        ])
                    ))
                    .await?
                    .ok_or_else(|| DeployerError::NotFound(format!("space {}", self.options.space)))?;

                info!("Targeting org {} space {}", self.options.organization, self.options.space);
                Ok::<_, DeployerError>(Target {
                    org_guid: org.guid,
                    space_guid: space.guid,
                })
            })
            .await
    }

    async fn find_app(&self, name: &str) -> Result<Option<App>, DeployerError> {
        let target = self.target().await?;
        self.first(&format!(
            "/v3/apps?{}",
            query(&[("names", name), ("space_guids", target.space_guid.as_str())])
        ))
        .await
    }

    async fn app(&self, name: &str) -> Result<App, DeployerError> {
        self.find_app(name)
            .await?
            .ok_or_else(|| DeployerError::NotFound(format!("application {}", name)))
    }

    async fn create_or_reuse_app(&self, name: &str) -> Result<App, DeployerError> {
        if let Some(app) = self.find_app(name).await? {
            debug!("Reusing application {} ({})", name, app.guid);
            return Ok(app);
        }

        let target = self.target().await?;
        let token = self.token().await?;
        let request = CreateAppRequest {
            name: name.to_string(),
            relationships: AppRelationships {
                space: ToOne::new(&target.space_guid),
            },
        };
        let app: App = self.http.post("/v3/apps", &token, &request).await?;
        info!("Created application {} ({})", name, app.guid);
        Ok(app)
    }

    async fn domain(&self, name: &str) -> Result<Domain, DeployerError> {
        self.first(&format!("/v3/domains?{}", query(&[("names", name)])))
            .await?
            .ok_or_else(|| DeployerError::NotFound(format!("domain {}", name)))
    }

    /// Domain of the default route
    async fn route_domain(&self) -> Result<Domain, DeployerError> {
        if let Some(name) = &self.options.route_domain {
            return self.domain(name).await;
        }

        let target = self.target().await?;
        let token = self.token().await?;
        self.http
            .get(
                &format!("/v3/organizations/{}/domains/default", target.org_guid),
                &token,
            )
            .await
    }

    async fn find_route(&self, host: &str, domain: &Domain) -> Result<Option<Route>, DeployerError> {
        let target = self.target().await?;
        self.first(&format!(
            "/v3/routes?{}",
            query(&[
                ("hosts", host),
                ("domain_guids", domain.guid.as_str()),
                ("space_guids", target.space_guid.as_str()),
            ])
        ))
        .await
    }

    async fn ensure_route(&self, host: &str, domain: &Domain) -> Result<Route, DeployerError> {
        if let Some(route) = self.find_route(host, domain).await? {
            return Ok(route);
        }

        let target = self.target().await?;
        let token = self.token().await?;
        let request = CreateRouteRequest {
            host: host.to_string(),
            relationships: RouteRelationships {
                space: ToOne::new(&target.space_guid),
                domain: ToOne::new(&domain.guid),
            },
        };
        let route: Route = self.http.post("/v3/routes", &token, &request).await?;
        debug!("Created route {}.{}", host, domain.name);
        Ok(route)
    }

    async fn add_destination(&self, route: &Route, app: &App) -> Result<(), DeployerError> {
        let token = self.token().await?;
        let path = format!("/v3/routes/{}/destinations", route.guid);
        let current: Destinations = self.http.get(&path, &token).await?;

        if current.destinations.iter().any(|d| d.app.guid == app.guid) {
            debug!("Route {} already reaches {}", route.host, app.name);
            return Ok(());
        }

        let _: Destinations = self
            .http
            .post(&path, &token, &Destinations::for_app(&app.guid))
            .await?;
        Ok(())
    }

    /// Poll `check` until it reports done, within the staging timeout
    async fn wait_for<F, Fut>(&self, what: &str, mut check: F) -> Result<(), DeployerError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<bool, DeployerError>>,
    {
        let deadline = Instant::now() + self.options.staging_timeout;
        let mut attempt = 0;

        loop {
            if check().await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeployerError::Timeout(what.to_string()));
            }
            tokio::time::sleep(calc_exp_backoff(&self.cooldown, attempt)).await;
            attempt += 1;
        }
    }

    async fn upload_package(&self, app: &App, bits: &std::path::Path) -> Result<Package, DeployerError> {
        let token = self.token().await?;
        let package: Package = self
            .http
            .post("/v3/packages", &token, &CreatePackageRequest::bits(&app.guid))
            .await?;
        let _: Package = self
            .http
            .upload(&format!("/v3/packages/{}/upload", package.guid), &token, bits)
            .await?;

        let path = format!("/v3/packages/{}", package.guid);
        let path = path.as_str();
        self.wait_for(&format!("package upload for {}", app.name), move || async move {
            let token = self.token().await?;
            let package: Package = self.http.get(path, &token).await?;
            match package.state {
                PackageState::Ready => Ok(true),
                PackageState::Failed | PackageState::Expired => Err(DeployerError::ApiError {
                    status: 422,
                    message: format!("package {} is {:?}", package.guid, package.state),
                }),
                _ => Ok(false),
            }
        })
        .await?;
        Ok(package)
    }

    async fn stage(&self, app: &App, package: &Package) -> Result<String, DeployerError> {
        let token = self.token().await?;
        let build: Build = self
            .http
            .post(
                "/v3/builds",
                &token,
                &CreateBuildRequest {
                    package: GuidRef::new(&package.guid),
                },
            )
            .await?;

        let path = format!("/v3/builds/{}", build.guid);
        let path = path.as_str();
        let droplet_cell: OnceCell<String> = OnceCell::new();
        let droplet = &droplet_cell;
        self.wait_for(&format!("staging of {}", app.name), move || async move {
            let token = self.token().await?;
            let build: Build = self.http.get(path, &token).await?;
            match build.state {
                BuildState::Staged => {
                    let guid = build.droplet.map(|d| d.guid).ok_or_else(|| {
                        DeployerError::Internal(format!("build {} staged without a droplet", build.guid))
                    })?;
                    let _ = droplet.set(guid);
                    Ok(true)
                }
                BuildState::Failed => Err(DeployerError::ApiError {
                    status: 422,
                    message: build.error.unwrap_or_else(|| "staging failed".to_string()),
                }),
                BuildState::Staging => Ok(false),
            }
        })
        .await?;

        droplet_cell
            .get()
            .cloned()
            .ok_or_else(|| DeployerError::Internal("staging finished without a droplet".to_string()))
    }

    async fn wait_job(&self, url: &str) -> Result<(), DeployerError> {
        self.wait_for(&format!("job {}", url), move || async move {
            let token = self.token().await?;
            let job: Job = self.http.get_url(url, &token).await?;
            match job.state {
                JobState::Complete => Ok(true),
                JobState::Failed => Err(DeployerError::ApiError {
                    status: 422,
                    message: job
                        .errors
                        .iter()
                        .map(|e| e.detail.clone())
                        .collect::<Vec<_>>()
                        .join("; "),
                }),
                JobState::Processing | JobState::Polling => Ok(false),
            }
        })
        .await
    }

    /// Start `app`, or restart it when it already runs so the current
    /// droplet and environment take effect
    async fn start_app(&self, app: &App) -> Result<(), DeployerError> {
        let action = lifecycle_action(&app.state);
        let token = self.token().await?;
        let _: App = self
            .http
            .post_empty(&format!("/v3/apps/{}/actions/{}", app.guid, action), &token)
            .await?;
        info!("{} {}", if action == "restart" { "Restarted" } else { "Started" }, app.name);
        Ok(())
    }
}

fn lifecycle_action(state: &AppState) -> &'static str {
    if *state == AppState::Started {
        "restart"
    } else {
        "start"
    }
}

/// URL-encode query parameters
fn query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

#[async_trait]
impl PlatformGateway for CloudFoundryGateway {
    async fn deploy(
        &self,
        artifact: &ArtifactRef,
        app: &str,
        start_immediately: bool,
    ) -> Result<(), DeployerError> {
        let resolved = self.resolver.resolve(artifact).await?;
        info!("Pushing {} as {}", artifact, app);

        let app = self.create_or_reuse_app(app).await?;
        let package = self.upload_package(&app, &resolved.path).await?;
        let droplet = self.stage(&app, &package).await?;

        let token = self.token().await?;
        let _: serde_json::Value = self
            .http
            .patch(
                &format!("/v3/apps/{}/relationships/current_droplet", app.guid),
                &token,
                &ToOne::new(droplet),
            )
            .await?;
        let _: serde_json::Value = self
            .http
            .post(
                &format!("/v3/apps/{}/processes/web/actions/scale", app.guid),
                &token,
                &ScaleProcessRequest {
                    memory_in_mb: self.options.memory_mb,
                },
            )
            .await?;

        let domain = self.route_domain().await?;
        let route = self.ensure_route(&app.name, &domain).await?;
        self.add_destination(&route, &app).await?;

        if start_immediately {
            self.start_app(&app).await?;
        }
        Ok(())
    }

    async fn set_environment_variable(
        &self,
        app: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DeployerError> {
        let app = self.app(app).await?;
        let token = self.token().await?;
        let _: serde_json::Value = self
            .http
            .patch(
                &format!("/v3/apps/{}/environment_variables", app.guid),
                &token,
                &EnvironmentVariables::single(key, value),
            )
            .await?;
        debug!("Set {} on {}", key, app.name);
        Ok(())
    }

    async fn bind_service(&self, app: &str, instance: &str) -> Result<(), DeployerError> {
        let app = self.app(app).await?;
        let target = self.target().await?;
        let service: ServiceInstance = self
            .first(&format!(
                "/v3/service_instances?{}",
                query(&[("names", instance), ("space_guids", target.space_guid.as_str())])
            ))
            .await?
            .ok_or_else(|| DeployerError::NotFound(format!("service instance {}", instance)))?;

        let existing: Option<ServiceCredentialBinding> = self
            .first(&format!(
                "/v3/service_credential_bindings?{}",
                query(&[
                    ("app_guids", app.guid.as_str()),
                    ("service_instance_guids", service.guid.as_str()),
                ])
            ))
            .await?;
        if existing.is_some() {
            debug!("{} is already bound to {}", app.name, instance);
            return Ok(());
        }

        let token = self.token().await?;
        let job = self
            .http
            .post_accepted(
                "/v3/service_credential_bindings",
                &token,
                &CreateBindingRequest::app(&service.guid, &app.guid),
            )
            .await?;
        if let Some(job) = job {
            self.wait_job(&job).await?;
        }
        info!("Bound {} to {}", instance, app.name);
        Ok(())
    }

    async fn map_route(&self, app: &str, domain: &str, host: &str) -> Result<(), DeployerError> {
        let app = self.app(app).await?;
        let domain = self.domain(domain).await?;
        let route = self.ensure_route(host, &domain).await?;
        self.add_destination(&route, &app).await?;
        info!("Mapped {}.{} to {}", host, domain.name, app.name);
        Ok(())
    }

    async fn unmap_route(&self, app: &str, domain: &str, host: &str) -> Result<(), DeployerError> {
        let app = self.app(app).await?;
        let domain = self.domain(domain).await?;
        let Some(route) = self.find_route(host, &domain).await? else {
            warn!(
                "No route {}.{} to unmap from {}; its public route may use another domain",
                host, domain.name, app.name
            );
            return Ok(());
        };

        let token = self.token().await?;
        let path = format!("/v3/routes/{}/destinations", route.guid);
        let current: Destinations = self.http.get(&path, &token).await?;
        for destination in current.destinations.iter().filter(|d| d.app.guid == app.guid) {
            if let Some(guid) = &destination.guid {
                self.http.delete(&format!("{}/{}", path, guid), &token).await?;
            }
        }
        info!("Unmapped {}.{} from {}", host, domain.name, app.name);
        Ok(())
    }

    async fn start(&self, app: &str) -> Result<(), DeployerError> {
        let app = self.app(app).await?;
        self.start_app(&app).await
    }

    async fn list_organizations(&self) -> Result<Vec<String>, DeployerError> {
        let orgs: Vec<Organization> = self.list_all("/v3/organizations").await?;
        Ok(orgs.into_iter().map(|o| o.name).collect())
    }

    async fn list_spaces(&self) -> Result<Vec<String>, DeployerError> {
        let target = self.target().await?;
        let spaces: Vec<Space> = self
            .list_all(&format!(
                "/v3/spaces?{}",
                query(&[("organization_guids", target.org_guid.as_str())])
            ))
            .await?;
        Ok(spaces.into_iter().map(|s| s.name).collect())
    }

    async fn list_applications(&self) -> Result<Vec<String>, DeployerError> {
        let target = self.target().await?;
        let apps: Vec<App> = self
            .list_all(&format!("/v3/apps?{}", query(&[("space_guids", target.space_guid.as_str())])))
            .await?;
        Ok(apps.into_iter().map(|a| a.name).collect())
    }

    async fn list_service_instances(&self) -> Result<Vec<String>, DeployerError> {
        let target = self.target().await?;
        let instances: Vec<ServiceInstance> = self
            .list_all(&format!(
                "/v3/service_instances?{}",
                query(&[("space_guids", target.space_guid.as_str())])
            ))
            .await?;
        Ok(instances.into_iter().map(|s| s.name).collect())
    }
}
