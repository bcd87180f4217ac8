//! UAA access tokens

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cf_models::TokenResponse;

use crate::errors::DeployerError;

/// Lifetime assumed when neither the claims nor the response carry one
const FALLBACK_LIFETIME_SECS: i64 = 600;

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Expiration timestamp
    pub exp: i64,

    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub scope: Vec<String>,
}

/// An access token with its refresh token
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Raw bearer token
    pub raw: String,

    pub refresh_token: Option<String>,

    /// Decoded claims, when the token is a JWT
    pub claims: Option<AccessTokenClaims>,

    exp: i64,
}

impl AccessToken {
    /// Build a token from a UAA response.
    ///
    /// Claims are decoded without validating the signature; the platform
    /// validates the token, this side only needs its expiry.
    pub fn from_response(response: TokenResponse) -> Self {
        let claims = Self::decode_claims(&response.access_token)
            .map_err(|e| debug!("Access token is not a readable JWT: {}", e))
            .ok();

        let now = Utc::now().timestamp();
        let exp = claims
            .as_ref()
            .map(|c| c.exp)
            .or_else(|| response.expires_in.map(|secs| now + secs))
            .unwrap_or(now + FALLBACK_LIFETIME_SECS);

        Self {
            raw: response.access_token,
            refresh_token: response.refresh_token,
            claims,
            exp,
        }
    }

    fn decode_claims(raw: &str) -> Result<AccessTokenClaims, DeployerError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let token_data = decode::<AccessTokenClaims>(raw, &DecodingKey::from_secret(b""), &validation)
            .map_err(|e| DeployerError::TokenError(format!("Failed to decode token: {}", e)))?;
        Ok(token_data.claims)
    }

    pub fn user_name(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|c| c.user_name.as_deref())
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }

    /// Check if the token expires within the given duration
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.exp < Utc::now().timestamp() + seconds
    }

    /// Get expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}
