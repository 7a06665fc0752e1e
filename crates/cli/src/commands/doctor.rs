use crate::commands::CommandResult;
use campusdesk_agent::llm::OpenAiCompatibleClient;
use campusdesk_core::config::{AppConfig, LoadOptions, RoutingStrategy};
use campusdesk_db::{connect_with_config, directory_counts};
use serde::Serialize;

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

/// Exit code 0 when every check passes, 8 otherwise.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 8 };

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
            checks.push(check_routing(&config));
            checks.push(check_directory(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["routing_readiness", "directory_readiness"] {
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

fn check_routing(config: &AppConfig) -> DoctorCheck {
    match config.router.strategy {
        RoutingStrategy::Keyword => DoctorCheck {
            name: "routing_readiness",
            status: CheckStatus::Pass,
            details: "keyword routing; no hosted model required".to_string(),
        },
        RoutingStrategy::Model => match OpenAiCompatibleClient::from_config(&config.llm) {
            Ok(client) => DoctorCheck {
                name: "routing_readiness",
                status: CheckStatus::Pass,
                details: format!("model routing via `{}` ({})", client.endpoint(), config.llm.model),
            },
            Err(error) => DoctorCheck {
                name: "routing_readiness",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
        },
    }
}

/// Connects and counts directory rows; an unmigrated database fails here.
fn check_directory(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "directory_readiness",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        let counts = directory_counts(&pool)
            .await
            .map_err(|error| format!("directory tables unavailable (run `campusdesk migrate`): {error}"));
        pool.close().await;
        counts
    });

    match result {
        Ok(counts) if counts.total() == 0 => DoctorCheck {
            name: "directory_readiness",
            status: CheckStatus::Fail,
            details: "directory tables are empty (run `campusdesk seed`)".to_string(),
        },
        Ok(counts) => DoctorCheck {
            name: "directory_readiness",
            status: CheckStatus::Pass,
            details: format!("{} directory rows via `{}`", counts.total(), config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "directory_readiness", status: CheckStatus::Fail, details: error }
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
