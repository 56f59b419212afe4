use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the prompt log: who asked, what came back, and how it scored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptRecord {
    pub timestamp: DateTime<Local>,
    pub user: String,
    pub prompt: String,
    pub score: String,
}

impl PromptRecord {
    pub fn new(
        user: impl Into<String>,
        prompt: impl Into<String>,
        score: impl Into<String>,
    ) -> Self {
        Self::at(Local::now(), user, prompt, score)
    }

    pub fn at(
        timestamp: DateTime<Local>,
        user: impl Into<String>,
        prompt: impl Into<String>,
        score: impl Into<String>,
    ) -> Self {
        Self { timestamp, user: user.into(), prompt: prompt.into(), score: score.into() }
    }

    /// Cell values in sheet column order.
    pub fn to_row(&self) -> [String; 4] {
        [
            self.timestamp.format(RECORD_TIMESTAMP_FORMAT).to_string(),
            self.user.clone(),
            self.prompt.clone(),
            self.score.clone(),
        ]
    }
}

/// What the Regenerate button carries: the original input and who asked for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegeneratePayload {
    pub text: String,
    pub user: String,
}

impl RegeneratePayload {
    pub fn new(text: impl Into<String>, user: impl Into<String>) -> Self {
        Self { text: text.into(), user: user.into() }
    }

    pub fn to_value(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            serde_json::json!({ "text": self.text, "user": self.user }).to_string()
        })
    }

    pub fn from_value(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// A unit of work for the prompt pipeline, regardless of which event produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptRequest {
    pub text: String,
    pub user: String,
    pub origin: RequestOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOrigin {
    Message,
    Regenerate,
}

impl RequestOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Regenerate => "regenerate",
        }
    }
}
