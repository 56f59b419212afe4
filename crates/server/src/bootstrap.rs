use std::{sync::Arc, time::Duration};

use promptbot_agent::{LlmError, OpenAiChatClient, PromptAgent};
use promptbot_core::{config::AppConfig, SignatureVerifier};
use promptbot_sheets::{GoogleSheetsRecorder, RecorderError};
use promptbot_slack::{EventRouter, SlackClientError, SlackWebClient};
use thiserror::Error;
use tracing::info;

use crate::{dedup::DeliveryGuard, pipeline::PromptPipeline, webhook::WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub webhook: WebhookState,
    pub recorder_kind: &'static str,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("spreadsheet recorder setup failed: {0}")]
    Recorder(#[from] RecorderError),
    #[error("slack client setup failed: {0}")]
    Slack(#[from] SlackClientError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        llm_model = %config.llm.model,
        "starting application bootstrap"
    );

    let agent = PromptAgent::new(Arc::new(OpenAiChatClient::from_config(&config.llm)?));
    let recorder = GoogleSheetsRecorder::from_config(&config.sheets)?;
    info!(
        event_name = "system.bootstrap.recorder_ready",
        correlation_id = "bootstrap",
        service_account = %recorder.service_account_email(),
        "spreadsheet recorder initialized"
    );
    let poster = SlackWebClient::from_config(&config.slack)?;

    let pipeline = PromptPipeline::new(
        agent,
        Arc::new(recorder),
        Arc::new(poster),
        config.slack.output_channel.clone(),
    );
    let recorder_kind = pipeline.recorder_kind();

    let guard = config
        .dedup
        .enabled
        .then(|| Arc::new(DeliveryGuard::new(Duration::from_secs(config.dedup.ttl_secs))));

    let webhook = WebhookState {
        verifier: Arc::new(SignatureVerifier::new(config.slack.signing_secret.clone())),
        router: EventRouter::new(Arc::new(pipeline)),
        guard,
    };

    Ok(Application { config, webhook, recorder_kind })
}
