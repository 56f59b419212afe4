use std::{fmt, fs, path::Path};

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use crate::recorder::RecorderError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields promptbot needs from a Google service-account JSON key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, RecorderError> {
        let raw = fs::read_to_string(path).map_err(|source| RecorderError::ReadCredentials {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| RecorderError::ParseCredentials {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses `private_key` as an RSA PEM for RS256 signing.
    pub fn signing_key(&self) -> Result<EncodingKey, RecorderError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(RecorderError::InvalidPrivateKey)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
