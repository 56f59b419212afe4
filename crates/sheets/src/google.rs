use std::time::Duration;

use async_trait::async_trait;
use promptbot_core::{config::SheetsConfig, PromptRecord};
use reqwest::{Client, RequestBuilder, Url};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{
    auth::{ServiceAccountAuth, SHEETS_SCOPES},
    credentials::ServiceAccountKey,
    recorder::{PromptRecorder, RecorderError},
};

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Clone, Debug, PartialEq, Eq)]
enum SpreadsheetLocator {
    Id(String),
    Name(String),
}

/// Resolved append destination: spreadsheet id plus the title of its first worksheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_title: String,
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Serialize)]
struct AppendBody<'a> {
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: [&'a [String; 4]; 1],
}

#[derive(Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRange", default)]
    updated_range: Option<String>,
}

pub struct GoogleSheetsRecorder {
    client: Client,
    auth: ServiceAccountAuth,
    sheets_api_base_url: String,
    drive_api_base_url: String,
    locator: SpreadsheetLocator,
    target: OnceCell<SheetTarget>,
}

impl GoogleSheetsRecorder {
    /// Reads the service-account key once; a missing or unusable key fails here
    /// instead of on the first append.
    pub fn from_config(config: &SheetsConfig) -> Result<Self, RecorderError> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RecorderError::ClientBuild)?;
        let auth = ServiceAccountAuth::new(client.clone(), key, SHEETS_SCOPES)?;

        let pinned_id =
            config.spreadsheet_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let locator = match pinned_id {
            Some(id) => SpreadsheetLocator::Id(id.to_string()),
            None => SpreadsheetLocator::Name(config.spreadsheet_name.clone()),
        };

        Ok(Self {
            client,
            auth,
            sheets_api_base_url: config.sheets_api_base_url.trim_end_matches('/').to_string(),
            drive_api_base_url: config.drive_api_base_url.trim_end_matches('/').to_string(),
            locator,
            target: OnceCell::new(),
        })
    }

    pub fn service_account_email(&self) -> &str {
        self.auth.client_email()
    }

    /// Looks the spreadsheet up on first use and caches the result for the
    /// life of the recorder.
    pub async fn target(&self) -> Result<&SheetTarget, RecorderError> {
        self.target.get_or_try_init(|| self.resolve_target()).await
    }

    async fn resolve_target(&self) -> Result<SheetTarget, RecorderError> {
        let spreadsheet_id = match &self.locator {
            SpreadsheetLocator::Id(id) => id.clone(),
            SpreadsheetLocator::Name(name) => self.find_spreadsheet_id(name).await?,
        };
        let sheet_title = self.first_sheet_title(&spreadsheet_id).await?;

        info!(
            event_name = "integration.sheets.target_resolved",
            spreadsheet_id = %spreadsheet_id,
            sheet_title = %sheet_title,
            "resolved spreadsheet append target"
        );
        Ok(SheetTarget { spreadsheet_id, sheet_title })
    }

    async fn find_spreadsheet_id(&self, name: &str) -> Result<String, RecorderError> {
        let mut url = parse_url(&format!("{}/files", self.drive_api_base_url))?;
        url.query_pairs_mut()
            .append_pair("q", &drive_name_query(name))
            .append_pair("fields", "files(id,name)")
            .append_pair("pageSize", "1")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        let listing: DriveFileList = self.send_json("drive file lookup", self.client.get(url)).await?;
        listing
            .files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| RecorderError::SpreadsheetNotFound(name.to_string()))
    }

    async fn first_sheet_title(&self, spreadsheet_id: &str) -> Result<String, RecorderError> {
        let mut url = spreadsheets_url(&self.sheets_api_base_url, &[spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties(title,index)");

        let metadata: SpreadsheetMetadata =
            self.send_json("spreadsheet metadata", self.client.get(url)).await?;
        metadata
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .min_by_key(|properties| properties.index)
            .map(|properties| properties.title)
            .ok_or_else(|| RecorderError::NoWorksheets(spreadsheet_id.to_string()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, RecorderError> {
        let token = self.auth.access_token().await?;
        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|source| RecorderError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecorderError::Status { operation, status: status.as_u16(), body });
        }

        response.json().await.map_err(|source| RecorderError::Decode { operation, source })
    }
}

#[async_trait]
impl PromptRecorder for GoogleSheetsRecorder {
    async fn append(&self, record: &PromptRecord) -> Result<(), RecorderError> {
        let target = self.target().await?;
        let range = format!("{}:append", a1_anchor(&target.sheet_title));
        let mut url =
            spreadsheets_url(&self.sheets_api_base_url, &[&target.spreadsheet_id, "values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let row = record.to_row();
        let body = AppendBody { major_dimension: "ROWS", values: [&row] };
        let response: AppendResponse =
            self.send_json("values append", self.client.post(url).json(&body)).await?;
        let updated_range =
            response.updates.and_then(|updates| updates.updated_range).unwrap_or_default();

        debug!(
            event_name = "integration.sheets.row_appended",
            spreadsheet_id = %target.spreadsheet_id,
            updated_range = %updated_range,
            "prompt row appended"
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "google_sheets"
    }
}

fn parse_url(raw: &str) -> Result<Url, RecorderError> {
    Url::parse(raw).map_err(|_| RecorderError::InvalidUrl(raw.to_string()))
}

fn spreadsheets_url(base: &str, segments: &[&str]) -> Result<Url, RecorderError> {
    let mut url = parse_url(&format!("{base}/spreadsheets"))?;
    url.path_segments_mut()
        .map_err(|_| RecorderError::InvalidUrl(base.to_string()))?
        .extend(segments);
    Ok(url)
}

/// Drive `files.list` query matching a spreadsheet by exact, non-trashed name.
fn drive_name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME_TYPE}' and trashed = false")
}

/// `'Title'!A1`, with embedded quotes doubled as A1 notation requires.
fn a1_anchor(sheet_title: &str) -> String {
    format!("'{}'!A1", sheet_title.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::{a1_anchor, drive_name_query, spreadsheets_url};

    #[test]
    fn drive_query_escapes_quotes_in_names() {
        assert_eq!(
            drive_name_query("Bob's prompts"),
            "name = 'Bob\\'s prompts' and mimeType = 'application/vnd.google-apps.spreadsheet' \
             and trashed = false"
        );
    }

    #[test]
    fn a1_anchor_quotes_sheet_titles() {
        assert_eq!(a1_anchor("Sheet1"), "'Sheet1'!A1");
        assert_eq!(a1_anchor("Q3 'final'"), "'Q3 ''final'''!A1");
    }

    #[test]
    fn spreadsheets_url_keeps_base_path_and_encodes_segments() {
        let url = spreadsheets_url(
            "https://sheets.googleapis.com/v4",
            &["abc123", "values", "'My Sheet'!A1:append"],
        )
        .expect("url");

        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'My%20Sheet'!A1:append"
        );
    }

    #[test]
    fn spreadsheets_url_rejects_garbage_base() {
        assert!(spreadsheets_url("not a url", &["x"]).is_err());
    }
}
