use std::sync::Arc;

use async_trait::async_trait;
use promptbot_agent::PromptAgent;
use promptbot_core::{
    ApplicationError, IntegrationService, PromptRecord, PromptRequest, RegeneratePayload,
};
use promptbot_sheets::PromptRecorder;
use promptbot_slack::{
    blocks::prompt_result_message, EventContext, MessagePoster, PromptRequestService,
};
use tracing::{error, info};

/// Generate, score, record, notify. Each step runs only if the previous one succeeded.
pub struct PromptPipeline {
    agent: PromptAgent,
    recorder: Arc<dyn PromptRecorder>,
    poster: Arc<dyn MessagePoster>,
    output_channel: String,
}

impl PromptPipeline {
    pub fn new(
        agent: PromptAgent,
        recorder: Arc<dyn PromptRecorder>,
        poster: Arc<dyn MessagePoster>,
        output_channel: impl Into<String>,
    ) -> Self {
        Self { agent, recorder, poster, output_channel: output_channel.into() }
    }

    pub fn recorder_kind(&self) -> &'static str {
        self.recorder.kind()
    }
}

#[async_trait]
impl PromptRequestService for PromptPipeline {
    async fn handle_prompt_request(
        &self,
        request: &PromptRequest,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let prompt = self
            .agent
            .generate_prompt(&request.text)
            .await
            .map_err(|err| upstream(IntegrationService::Generation, err, ctx))?;
        let score = self
            .agent
            .score_prompt(&prompt)
            .await
            .map_err(|err| upstream(IntegrationService::Scoring, err, ctx))?;

        let record = PromptRecord::new(&request.user, &prompt, &score);
        self.recorder
            .append(&record)
            .await
            .map_err(|err| upstream(IntegrationService::Spreadsheet, err, ctx))?;

        let regenerate = RegeneratePayload::new(&request.text, &request.user);
        let message = prompt_result_message(&prompt, &score, &regenerate);
        self.poster
            .post_message(&self.output_channel, &message)
            .await
            .map_err(|err| upstream(IntegrationService::Chat, err, ctx))?;

        info!(
            event_name = "pipeline.prompt.completed",
            correlation_id = %ctx.correlation_id,
            origin = request.origin.as_str(),
            user = %request.user,
            score = %score,
            "prompt generated, recorded and posted"
        );
        Ok(())
    }
}

fn upstream(
    service: IntegrationService,
    err: impl std::fmt::Display,
    ctx: &EventContext,
) -> ApplicationError {
    error!(
        event_name = "pipeline.prompt.failed",
        correlation_id = %ctx.correlation_id,
        service = service.as_str(),
        error = %err,
        "prompt pipeline step failed"
    );
    ApplicationError::integration(service, err)
}
