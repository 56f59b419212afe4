use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use promptbot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{CommandResult, EXIT_OK};

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("config", error),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    CommandResult { exit_code: EXIT_OK, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<ConfigField> {
    let field = |key, value: String, env_keys| ConfigField { key, value, env_keys };
    let secret_state = |present: bool| if present { "<redacted>" } else { "<unset>" }.to_string();

    vec![
        field(
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            &["PROMPTBOT_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
        ),
        field(
            "slack.signing_secret",
            secret_state(!config.slack.signing_secret.expose_secret().is_empty()),
            &["PROMPTBOT_SLACK_SIGNING_SECRET", "SLACK_SIGNING_SECRET"],
        ),
        field(
            "slack.output_channel",
            config.slack.output_channel.clone(),
            &["PROMPTBOT_SLACK_OUTPUT_CHANNEL", "OUTPUT_CHANNEL"],
        ),
        field(
            "slack.api_base_url",
            config.slack.api_base_url.clone(),
            &["PROMPTBOT_SLACK_API_BASE_URL"],
        ),
        field(
            "slack.timeout_secs",
            config.slack.timeout_secs.to_string(),
            &["PROMPTBOT_SLACK_TIMEOUT_SECS"],
        ),
        field(
            "llm.provider",
            config.llm.provider.as_str().to_string(),
            &["PROMPTBOT_LLM_PROVIDER"],
        ),
        field("llm.model", config.llm.model.clone(), &["PROMPTBOT_LLM_MODEL"]),
        field(
            "llm.base_url",
            config.llm.effective_base_url().to_string(),
            &["PROMPTBOT_LLM_BASE_URL"],
        ),
        field(
            "llm.api_key",
            secret_state(config.llm.api_key.is_some()),
            &["PROMPTBOT_LLM_API_KEY", "OPENAI_API_KEY"],
        ),
        field(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["PROMPTBOT_LLM_TIMEOUT_SECS"],
        ),
        field(
            "sheets.spreadsheet_name",
            config.sheets.spreadsheet_name.clone(),
            &["PROMPTBOT_SHEETS_SPREADSHEET_NAME", "GOOGLE_SHEET_NAME"],
        ),
        field(
            "sheets.spreadsheet_id",
            config.sheets.spreadsheet_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["PROMPTBOT_SHEETS_SPREADSHEET_ID"],
        ),
        field(
            "sheets.credentials_path",
            config.sheets.credentials_path.display().to_string(),
            &["PROMPTBOT_SHEETS_CREDENTIALS_PATH", "GOOGLE_APPLICATION_CREDENTIALS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["PROMPTBOT_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["PROMPTBOT_SERVER_PORT", "PORT"]),
        field("dedup.enabled", config.dedup.enabled.to_string(), &["PROMPTBOT_DEDUP_ENABLED"]),
        field("dedup.ttl_secs", config.dedup.ttl_secs.to_string(), &["PROMPTBOT_DEDUP_TTL_SECS"]),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["PROMPTBOT_LOGGING_LEVEL", "PROMPTBOT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["PROMPTBOT_LOGGING_FORMAT", "PROMPTBOT_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["promptbot.toml", "config/promptbot.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env_value_present(key)) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

/// Blank values are skipped by the loader, so they never count as the source.
fn env_value_present(key: &str) -> bool {
    env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
