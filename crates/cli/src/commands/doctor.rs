use glowie_agent::llm::OpenAiCompatClient;
use glowie_agent::prompts::PromptLibrary;
use glowie_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()).map_err(|e| e.to_string()));
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

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

pub fn build_report(config: Result<AppConfig, String>) -> DoctorReport {
    let mut checks = vec![check_prompt_templates()];

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_completion_provider(&config));
            checks.push(check_backend_url(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["completion_provider", "backend_url"] {
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

fn check_prompt_templates() -> DoctorCheck {
    match PromptLibrary::embedded() {
        Ok(_) => DoctorCheck {
            name: "prompt_templates",
            status: CheckStatus::Pass,
            details: "embedded prompt templates compiled".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "prompt_templates",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_completion_provider(config: &AppConfig) -> DoctorCheck {
    match OpenAiCompatClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck {
            name: "completion_provider",
            status: CheckStatus::Pass,
            details: format!(
                "{} model `{}` at {}",
                config.llm.provider.as_str(),
                client.model(),
                client.endpoint()
            ),
        },
        Err(error) => DoctorCheck {
            name: "completion_provider",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_backend_url(config: &AppConfig) -> DoctorCheck {
    let url = config.backend.base_url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        DoctorCheck {
            name: "backend_url",
            status: CheckStatus::Pass,
            details: format!("records stored at `{url}`"),
        }
    } else {
        DoctorCheck {
            name: "backend_url",
            status: CheckStatus::Fail,
            details: format!("backend.base_url `{url}` is not an http(s) URL"),
        }
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

#[cfg(test)]
mod tests {
    use glowie_core::config::AppConfig;

    use super::{build_report, render_human, CheckStatus};

    #[test]
    fn config_failure_skips_dependent_checks() {
        let report = build_report(Err("llm.api_key is required".to_string()));

        assert_eq!(report.overall_status, CheckStatus::Fail);
        let statuses: Vec<_> = report.checks.iter().map(|check| (check.name, check.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("prompt_templates", CheckStatus::Pass),
                ("config_validation", CheckStatus::Fail),
                ("completion_provider", CheckStatus::Skipped),
                ("backend_url", CheckStatus::Skipped),
            ]
        );
    }

    #[test]
    fn valid_config_passes_every_check() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_string().into());

        let report = build_report(Ok(config));

        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert!(render_human(&report).contains("- [ok] completion_provider: mistral model"));
    }

    #[test]
    fn non_http_backend_fails() {
        let mut config = AppConfig::default();
        config.backend.base_url = "localhost:8000".to_string();

        let report = build_report(Ok(config));

        let backend = report.checks.iter().find(|check| check.name == "backend_url").expect("check");
        assert_eq!(backend.status, CheckStatus::Fail);
    }
}
