//! Slack request signing (`X-Slack-Signature: v0=<hex hmac>`).
//!
//! The signed material is `v0:{timestamp}:{raw body}`, keyed with the app's
//! signing secret. Requests older or newer than the replay window are rejected
//! before any hashing happens.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_VERSION: &str = "v0";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const DEFAULT_REPLAY_WINDOW_SECS: i64 = 60 * 5;

const DIGEST_HEX_LEN: usize = 64;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing request timestamp header")]
    MissingTimestamp,
    #[error("request timestamp `{0}` is not an integer")]
    MalformedTimestamp(String),
    #[error("request timestamp is {skew_secs}s away from now (window {window_secs}s)")]
    StaleTimestamp { skew_secs: i64, window_secs: i64 },
    #[error("missing request signature header")]
    MissingSignature,
    #[error("request signature is not `v0=` followed by 64 lowercase hex digits")]
    MalformedSignature,
    #[error("request signature does not match")]
    Mismatch,
    #[error("signing secret cannot key HMAC-SHA256")]
    InvalidSecret,
}

#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
    replay_window_secs: i64,
}

impl SignatureVerifier {
    pub fn new(signing_secret: SecretString) -> Self {
        Self { signing_secret, replay_window_secs: DEFAULT_REPLAY_WINDOW_SECS }
    }

    /// Checks a request against the current wall clock.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), SignatureError> {
        self.verify_at(timestamp, body, signature, unix_now())
    }

    pub fn is_valid(&self, timestamp: Option<&str>, body: &[u8], signature: Option<&str>) -> bool {
        self.verify(timestamp, body, signature).is_ok()
    }

    pub fn verify_at(
        &self,
        timestamp: Option<&str>,
        body: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.map(str::trim).ok_or(SignatureError::MissingTimestamp)?;
        let issued_at = timestamp
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_string()))?;

        let skew_secs = now.saturating_sub(issued_at).saturating_abs();
        if skew_secs > self.replay_window_secs {
            return Err(SignatureError::StaleTimestamp {
                skew_secs,
                window_secs: self.replay_window_secs,
            });
        }

        let provided = signature.ok_or(SignatureError::MissingSignature)?;
        let digest = decode_signature(provided)?;

        self.mac_for(timestamp, body)?.verify_slice(&digest).map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the `X-Slack-Signature` value Slack would send for this body.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let digest = self.mac_for(timestamp, body)?.finalize().into_bytes();
        Ok(format!("{SIGNATURE_VERSION}={}", hex::encode(digest)))
    }

    fn mac_for(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(self.signing_secret.expose_secret().as_bytes())
                .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(SIGNATURE_VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}

fn decode_signature(provided: &str) -> Result<Vec<u8>, SignatureError> {
    let hex_digest = provided
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(SignatureError::MalformedSignature)?;

    let lowercase_hex =
        hex_digest.bytes().all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
    if hex_digest.len() != DIGEST_HEX_LEN || !lowercase_hex {
        return Err(SignatureError::MalformedSignature);
    }

    hex::decode(hex_digest).map_err(|_| SignatureError::MalformedSignature)
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
