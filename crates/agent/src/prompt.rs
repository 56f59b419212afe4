use std::sync::Arc;

use tracing::info;

use crate::llm::{ChatMessage, LlmClient, LlmError};

pub const GENERATOR_SYSTEM_PROMPT: &str = "You are a helpful AI prompt generator.";
pub const SCORER_SYSTEM_PROMPT: &str =
    "Rate this prompt from 1 (poor) to 5 (excellent) based on usefulness and clarity.";

#[derive(Clone)]
pub struct PromptAgent {
    client: Arc<dyn LlmClient>,
}

impl PromptAgent {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Asks the model to turn free text into a prompt. Returns the trimmed reply.
    pub async fn generate_prompt(&self, input: &str) -> Result<String, LlmError> {
        let messages = [ChatMessage::system(GENERATOR_SYSTEM_PROMPT), ChatMessage::user(input)];
        let prompt = self.client.complete(&messages).await?.trim().to_string();

        info!(
            event_name = "agent.prompt.generated",
            input_chars = input.chars().count(),
            prompt_chars = prompt.chars().count(),
            "prompt generated"
        );
        Ok(prompt)
    }

    /// Rates a prompt on the 1-5 rubric. The reply is trimmed but otherwise untouched.
    pub async fn score_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        let messages = [ChatMessage::system(SCORER_SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let score = self.client.complete(&messages).await?.trim().to_string();

        info!(event_name = "agent.prompt.scored", score = %score, "prompt scored");
        Ok(score)
    }
}
