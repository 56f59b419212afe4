use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::{credentials::ServiceAccountKey, recorder::RecorderError};

pub const SHEETS_SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets \
https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: SecretString,
    expires_at: i64,
}

/// Exchanges a signed service-account assertion for an OAuth2 access token
/// and reuses it until shortly before expiry.
pub struct ServiceAccountAuth {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scopes: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(
        client: Client,
        key: ServiceAccountKey,
        scopes: impl Into<String>,
    ) -> Result<Self, RecorderError> {
        let encoding_key = key.signing_key()?;
        Ok(Self { client, key, encoding_key, scopes: scopes.into(), cached: Mutex::new(None) })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub async fn access_token(&self) -> Result<SecretString, RecorderError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - REFRESH_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    pub(crate) fn assertion(&self, now: i64) -> Result<String, RecorderError> {
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.clone(),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key).map_err(RecorderError::Assertion)
    }

    async fn fetch_token(&self, now: i64) -> Result<CachedToken, RecorderError> {
        const OPERATION: &str = "oauth token exchange";

        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|source| RecorderError::Transport { operation: OPERATION, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecorderError::Status { operation: OPERATION, status: status.as_u16(), body });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|source| RecorderError::Decode { operation: OPERATION, source })?;

        info!(
            event_name = "integration.sheets.token_refreshed",
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "google access token refreshed"
        );

        Ok(CachedToken {
            value: SecretString::from(token.access_token),
            expires_at: now + token.expires_in,
        })
    }
}
