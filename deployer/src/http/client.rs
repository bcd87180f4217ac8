//! HTTP client implementation

use std::path::Path;
use std::time::Duration;

use cf_models::ErrorResponse;
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::DeployerError;

/// HTTP client for the cloud controller
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, skip_ssl_validation: bool) -> Result<Self, DeployerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(skip_ssl_validation)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make an unauthenticated GET request against an absolute URL
    pub async fn get_public<T: DeserializeOwned>(&self, url: &str) -> Result<T, DeployerError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::json(response, "GET").await
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, DeployerError> {
        self.get_url(&self.url(path), token).await
    }

    /// Make a GET request against an absolute URL (pagination links)
    pub async fn get_url<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, DeployerError> {
        debug!("GET {}", url);
        let response = self.authorized(self.client.get(url), token).send().await?;
        Self::json(response, "GET").await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployerError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(&url), token)
            .json(body)
            .send()
            .await?;
        Self::json(response, "POST").await
    }

    /// Make a POST request with no body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, DeployerError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self.authorized(self.client.post(&url), token).send().await?;
        Self::json(response, "POST").await
    }

    /// Make a POST request that may be accepted as an async job.
    ///
    /// Returns the job URL from the `Location` header, if any.
    pub async fn post_accepted<B: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<Option<String>, DeployerError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(&url), token)
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, "POST").await?;

        if response.status() != reqwest::StatusCode::ACCEPTED {
            return Ok(None);
        }
        Ok(response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }

    /// Make a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployerError> {
        let url = self.url(path);
        debug!("PATCH {}", url);

        let response = self
            .authorized(self.client.patch(&url), token)
            .json(body)
            .send()
            .await?;
        Self::json(response, "PATCH").await
    }

    /// Make a DELETE request, ignoring any response body
    pub async fn delete(&self, path: &str, token: &str) -> Result<(), DeployerError> {
        let url = self.url(path);
        debug!("DELETE {}", url);

        let response = self.authorized(self.client.delete(&url), token).send().await?;
        Self::check(response, "DELETE").await?;
        Ok(())
    }

    /// Upload `file` as the `bits` part of a multipart POST
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        file: &Path,
    ) -> Result<T, DeployerError> {
        let url = self.url(path);
        debug!("POST {} (upload {:?})", url, file);

        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "bits.zip".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = multipart::Form::new().part("bits", part);

        let response = self
            .authorized(self.client.post(&url), token)
            .multipart(form)
            .timeout(Duration::from_secs(600))
            .send()
            .await?;
        Self::json(response, "POST").await
    }

    /// POST a form to an absolute URL with basic auth (UAA token endpoint)
    pub async fn post_form<T: DeserializeOwned, F: Serialize + ?Sized>(
        &self,
        url: &str,
        client_id: &str,
        form: &F,
    ) -> Result<T, DeployerError> {
        debug!("POST {} (token)", url);

        let response = self
            .client
            .post(url)
            .basic_auth(client_id, Some(""))
            .header(header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token request failed: {} - {}", status, body);
            return Err(DeployerError::AuthError(format!(
                "Token request failed: {} - {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::ACCEPT, "application/json")
    }

    async fn check(response: Response, method: &str) -> Result<Response, DeployerError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("HTTP {} failed: {} - {}", method, status, body);

        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.summary())
            .unwrap_or(body);
        Err(DeployerError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response, method: &str) -> Result<T, DeployerError> {
        let response = Self::check(response, method).await?;
        Ok(response.json().await?)
    }
}
