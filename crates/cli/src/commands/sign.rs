use promptbot_core::{
    config::{AppConfig, LoadOptions},
    signature::{unix_now, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    SignatureVerifier,
};

use super::{CommandResult, EXIT_FAILURE, EXIT_OK};

/// Signs `body` with the configured signing secret and prints curl-ready headers.
pub fn run(body: &str, timestamp: Option<i64>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("sign", error),
    };

    let timestamp = timestamp.unwrap_or_else(unix_now).to_string();
    let verifier = SignatureVerifier::new(config.slack.signing_secret);
    match verifier.sign(&timestamp, body.as_bytes()) {
        Ok(signature) => CommandResult {
            exit_code: EXIT_OK,
            output: format!("{TIMESTAMP_HEADER}: {timestamp}\n{SIGNATURE_HEADER}: {signature}"),
        },
        Err(error) => CommandResult::failure("sign", "signing", error.to_string(), EXIT_FAILURE),
    }
}
