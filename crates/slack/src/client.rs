use std::time::Duration;

use async_trait::async_trait;
use promptbot_core::config::SlackConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::blocks::{Block, MessageTemplate};

#[derive(Debug, Error)]
pub enum SlackClientError {
    #[error("failed to build slack http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("chat.postMessage request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Delivers a rendered message to a channel.
///
/// Only transport failures are errors. A non-2xx status or an `ok: false`
/// body from Slack is logged and otherwise ignored.
#[async_trait]
pub trait MessagePoster: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackClientError>;
}

#[derive(Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Block],
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SlackWebClient {
    client: Client,
    endpoint: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn from_config(config: &SlackConfig) -> Result<Self, SlackClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SlackClientError::ClientBuild)?;
        Ok(Self::new(client, &config.api_base_url, config.bot_token.clone()))
    }

    pub fn new(client: Client, api_base_url: &str, bot_token: SecretString) -> Self {
        let endpoint = format!("{}/chat.postMessage", api_base_url.trim_end_matches('/'));
        Self { client, endpoint, bot_token }
    }
}

#[async_trait]
impl MessagePoster for SlackWebClient {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackClientError> {
        let body =
            PostMessageBody { channel, text: &message.fallback_text, blocks: &message.blocks };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(SlackClientError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "integration.slack.post_rejected",
                channel = %channel,
                status = status.as_u16(),
                "chat.postMessage returned a non-success status"
            );
            return Ok(());
        }

        match response.json::<PostMessageResponse>().await {
            Ok(reply) if reply.ok => {
                debug!(
                    event_name = "integration.slack.posted",
                    channel = %channel,
                    ts = reply.ts.as_deref().unwrap_or_default(),
                    "message posted"
                );
            }
            Ok(reply) => {
                warn!(
                    event_name = "integration.slack.post_rejected",
                    channel = %channel,
                    error = reply.error.as_deref().unwrap_or("unknown"),
                    "chat.postMessage answered ok=false"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "integration.slack.post_unreadable",
                    channel = %channel,
                    error = %error,
                    "chat.postMessage response could not be decoded"
                );
            }
        }
        Ok(())
    }
}
