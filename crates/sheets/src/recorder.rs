use std::path::PathBuf;

use async_trait::async_trait;
use promptbot_core::PromptRecord;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("could not read service account key `{path}`: {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse service account key `{path}`: {source}")]
    ParseCredentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("service account private key is not a valid RSA PEM: {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign service account assertion: {0}")]
    Assertion(#[source] jsonwebtoken::errors::Error),
    #[error("failed to build sheets http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("invalid google api url `{0}`")]
    InvalidUrl(String),
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned {status}: {body}")]
    Status { operation: &'static str, status: u16, body: String },
    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("no spreadsheet named `{0}` is visible to the service account")]
    SpreadsheetNotFound(String),
    #[error("spreadsheet `{0}` has no worksheets")]
    NoWorksheets(String),
}

/// Append-only sink for prompt results.
#[async_trait]
pub trait PromptRecorder: Send + Sync {
    async fn append(&self, record: &PromptRecord) -> Result<(), RecorderError>;

    /// Short backend name, reported by the health endpoint.
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct InMemoryPromptRecorder {
    rows: RwLock<Vec<PromptRecord>>,
}

impl InMemoryPromptRecorder {
    pub async fn records(&self) -> Vec<PromptRecord> {
        self.rows.read().await.clone()
    }

    pub async fn rows(&self) -> Vec<[String; 4]> {
        self.rows.read().await.iter().map(PromptRecord::to_row).collect()
    }
}

#[async_trait]
impl PromptRecorder for InMemoryPromptRecorder {
    async fn append(&self, record: &PromptRecord) -> Result<(), RecorderError> {
        self.rows.write().await.push(record.clone());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use promptbot_core::PromptRecord;

    use super::{InMemoryPromptRecorder, PromptRecorder};

    #[tokio::test]
    async fn in_memory_recorder_keeps_rows_in_append_order() {
        let recorder = InMemoryPromptRecorder::default();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("local time");

        recorder
            .append(&PromptRecord::at(at, "U1", "first prompt", "4"))
            .await
            .expect("append first");
        recorder
            .append(&PromptRecord::at(at, "U2", "second prompt", "2/5"))
            .await
            .expect("append second");

        let rows = recorder.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            [
                "2024-03-09 14:05:07".to_string(),
                "U1".to_string(),
                "first prompt".to_string(),
                "4".to_string()
            ]
        );
        assert_eq!(rows[1][3], "2/5");
        assert_eq!(recorder.kind(), "in_memory");
    }
}
