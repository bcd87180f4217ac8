//! Token manager for platform authentication

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use cf_models::{RootInfo, TokenResponse};

use crate::authn::access_token::AccessToken;
use crate::errors::DeployerError;
use crate::http::client::HttpClient;

/// OAuth client used by the cf CLI
const CLIENT_ID: &str = "cf";

/// Renew tokens this many seconds before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token manager trait for testability
#[async_trait]
pub trait TokenManagerExt: Send + Sync {
    /// Get a token that is valid for at least the expiry margin
    async fn get_token(&self) -> Result<AccessToken, DeployerError>;

    /// Force a refresh
    async fn refresh_token(&self) -> Result<AccessToken, DeployerError>;
}

/// User credentials for the password grant
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Process-wide UAA token cache
pub struct TokenManager {
    http_client: Arc<HttpClient>,
    credentials: Credentials,
    token_endpoint: OnceCell<String>,
    cached_token: RwLock<Option<AccessToken>>,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(http_client: Arc<HttpClient>, credentials: Credentials) -> Self {
        Self {
            http_client,
            credentials,
            token_endpoint: OnceCell::new(),
            cached_token: RwLock::new(None),
        }
    }

    /// Discover the UAA token endpoint from the API root
    async fn token_endpoint(&self) -> Result<&str, DeployerError> {
        let endpoint = self
            .token_endpoint
            .get_or_try_init(|| async {
                let root: RootInfo = self
                    .http_client
                    .get_public(&format!("{}/", self.http_client.base_url()))
                    .await?;
                let login = root
                    .links
                    .login
                    .or(root.links.uaa)
                    .ok_or_else(|| DeployerError::AuthError("API root has no login link".to_string()))?;
                let endpoint = format!("{}/oauth/token", login.href.trim_end_matches('/'));
                debug!("Token endpoint: {}", endpoint);
                Ok::<_, DeployerError>(endpoint)
            })
            .await?;
        Ok(endpoint.as_str())
    }

    async fn password_grant(&self) -> Result<AccessToken, DeployerError> {
        info!("Authenticating as {}", self.credentials.username);
        let endpoint = self.token_endpoint().await?;

        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose_secret()),
        ];
        let response: TokenResponse = self.http_client.post_form(endpoint, CLIENT_ID, &form).await?;
        Ok(AccessToken::from_response(response))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<AccessToken, DeployerError> {
        let endpoint = self.token_endpoint().await?;

        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let response: TokenResponse = self.http_client.post_form(endpoint, CLIENT_ID, &form).await?;
        Ok(AccessToken::from_response(response))
    }

    /// Renew `current`, preferring its refresh token over the password grant
    async fn renew(&self, current: Option<&AccessToken>) -> Result<AccessToken, DeployerError> {
        if let Some(refresh_token) = current.and_then(|t| t.refresh_token.as_deref()) {
            match self.refresh_grant(refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => warn!("Token refresh failed, re-authenticating: {}", e),
            }
        }
        self.password_grant().await
    }
}

#[async_trait]
impl TokenManagerExt for TokenManager {
    async fn get_token(&self) -> Result<AccessToken, DeployerError> {
        // Try to get from cache first
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.expires_within(EXPIRY_MARGIN_SECS) {
                    return Ok(token.clone());
                }
            }
        }

        // Concurrent groups wait here for one renewal
        let mut cached = self.cached_token.write().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(EXPIRY_MARGIN_SECS) {
                return Ok(token.clone());
            }
        }

        let token = self.renew(cached.as_ref()).await?;
        info!("Token acquired, expires at: {}", token.expires_at());
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn refresh_token(&self) -> Result<AccessToken, DeployerError> {
        info!("Refreshing access token...");

        let mut cached = self.cached_token.write().await;
        let token = self.renew(cached.as_ref()).await?;
        *cached = Some(token.clone());

        info!("Token refreshed successfully, expires at: {}", token.expires_at());
        Ok(token)
    }
}
