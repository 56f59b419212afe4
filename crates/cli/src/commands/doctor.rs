use promptbot_core::config::{AppConfig, LoadOptions};
use promptbot_sheets::ServiceAccountKey;
use serde::Serialize;

use super::{CommandResult, EXIT_CONFIG, EXIT_FAILURE, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = match report.checks.first() {
        Some(check) if check.status == CheckStatus::Fail => EXIT_CONFIG,
        _ if report.overall_status == CheckStatus::Pass => EXIT_OK,
        _ => EXIT_FAILURE,
    };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack(&config));
            checks.push(check_llm(&config));
            checks.push(check_service_account(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_settings", "llm_endpoint", "sheets_service_account"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "slack_settings",
        status: CheckStatus::Pass,
        details: format!(
            "bot token and signing secret present; posting to `{}` via {}",
            config.slack.output_channel, config.slack.api_base_url
        ),
    }
}

fn check_llm(config: &AppConfig) -> DoctorCheck {
    let key_state = if config.llm.api_key.is_some() { "api key set" } else { "no api key" };
    DoctorCheck {
        name: "llm_endpoint",
        status: CheckStatus::Pass,
        details: format!(
            "{} model `{}` at {} ({key_state})",
            config.llm.provider.as_str(),
            config.llm.model,
            config.llm.effective_base_url()
        ),
    }
}

fn check_service_account(config: &AppConfig) -> DoctorCheck {
    let path = &config.sheets.credentials_path;
    let result = ServiceAccountKey::from_file(path)
        .and_then(|key| key.signing_key().map(|_| key.client_email));

    match result {
        Ok(client_email) => DoctorCheck {
            name: "sheets_service_account",
            status: CheckStatus::Pass,
            details: format!("`{}` holds a usable key for {client_email}", path.display()),
        },
        Err(error) => DoctorCheck {
            name: "sheets_service_account",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
