use std::env;
use std::sync::{Mutex, OnceLock};

use campusdesk_agent::runtime::AssistantRequest;
use campusdesk_cli::commands::{ask, config, doctor, migrate, seed};
use serde_json::Value;

const IN_MEMORY: &[(&str, &str)] = &[
    ("CAMPUSDESK_DATABASE_URL", "sqlite::memory:"),
    ("CAMPUSDESK_DATABASE_MAX_CONNECTIONS", "1"),
];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(IN_MEMORY, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("CAMPUSDESK_DATABASE_URL", "postgres://localhost/campus")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_every_directory_table() {
    with_env(IN_MEMORY, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("demo directory loaded (44 rows):"));
        assert!(message.contains("  - hostels: 4"));
    });
}

#[test]
fn seed_is_idempotent_against_a_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("campus.db").display());

    with_env(&[("CAMPUSDESK_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        let second = seed::run();

        assert_eq!(first.exit_code, 0);
        assert_eq!(second.exit_code, 0);
        assert_eq!(parse_payload(&first.output)["message"], parse_payload(&second.output)["message"]);

        let report = doctor::run(true);
        assert_eq!(report.exit_code, 0, "seeded database should pass doctor: {}", report.output);
        let payload = parse_payload(&report.output);
        assert_eq!(payload["overall_status"], "pass");
    });
}

#[test]
fn doctor_fails_on_an_unmigrated_database() {
    with_env(IN_MEMORY, || {
        let report = doctor::run(true);
        assert_eq!(report.exit_code, 8);

        let payload = parse_payload(&report.output);
        assert_eq!(payload["overall_status"], "fail");
        let directory = payload["checks"]
            .as_array()
            .and_then(|checks| checks.iter().find(|check| check["name"] == "directory_readiness"))
            .cloned()
            .unwrap_or_default();
        assert_eq!(directory["status"], "fail");
    });
}

#[test]
fn doctor_skips_checks_when_config_is_invalid() {
    with_env(&[("CAMPUSDESK_ROUTER_STRATEGY", "telepathy")], || {
        let report = doctor::run(false);
        assert_eq!(report.exit_code, 8);
        assert!(report.output.contains("- [fail] config_validation"));
        assert!(report.output.contains("- [skip] routing_readiness"));
    });
}

#[test]
fn ask_answers_from_seeded_directory() {
    let mut vars = IN_MEMORY.to_vec();
    vars.push(("CAMPUSDESK_DATABASE_SEED_DEMO_DATA", "true"));

    with_env(&vars, || {
        let result = ask::run(
            AssistantRequest::prompt("How much is school fees for 200 level?").with_session("cli-1"),
        );
        assert_eq!(result.exit_code, 0, "expected answer: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["session_id"], "cli-1");
        assert_eq!(payload["cached"], false);
        assert_eq!(payload["domains"], serde_json::json!(["financial"]));
        assert!(payload["response"].as_str().unwrap_or_default().contains("200-400 Level"));
    });
}

#[test]
fn ask_reports_validation_errors_with_exit_code() {
    with_env(IN_MEMORY, || {
        let result = ask::run(AssistantRequest::prompt("   "));
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "validation");
        assert!(payload.get("response").is_none());
    });
}

#[test]
fn config_attributes_sources_and_redacts_api_key() {
    with_env(
        &[
            ("CAMPUSDESK_DATABASE_URL", "sqlite::memory:"),
            ("CAMPUSDESK_LLM_API_KEY", "sk-live-secret-value"),
        ],
        || {
            let output = config::run();

            assert!(output
                .contains("- database.url = sqlite::memory: (source: env (CAMPUSDESK_DATABASE_URL))"));
            assert!(output.contains("- llm.api_key = sk-*** (source: env (CAMPUSDESK_LLM_API_KEY))"));
            assert!(output.contains("- cache.ttl_secs = 300 (source: default)"));
            assert!(!output.contains("secret-value"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CAMPUSDESK_DATABASE_URL",
        "CAMPUSDESK_DATABASE_MAX_CONNECTIONS",
        "CAMPUSDESK_DATABASE_TIMEOUT_SECS",
        "CAMPUSDESK_DATABASE_SEED_DEMO_DATA",
        "CAMPUSDESK_LLM_PROVIDER",
        "CAMPUSDESK_LLM_API_KEY",
        "CAMPUSDESK_LLM_BASE_URL",
        "CAMPUSDESK_LLM_MODEL",
        "CAMPUSDESK_LLM_TEMPERATURE",
        "CAMPUSDESK_LLM_TIMEOUT_SECS",
        "CAMPUSDESK_LLM_MAX_RETRIES",
        "CAMPUSDESK_ROUTER_STRATEGY",
        "CAMPUSDESK_ROUTER_TOOL_TIMEOUT_SECS",
        "CAMPUSDESK_ROUTER_MAX_TOOL_ROUNDS",
        "CAMPUSDESK_ROUTER_MAX_PROMPT_CHARS",
        "CAMPUSDESK_CACHE_TTL_SECS",
        "CAMPUSDESK_CACHE_MAX_ENTRIES",
        "CAMPUSDESK_TOOLS_DEFAULT_LIMIT",
        "CAMPUSDESK_TOOLS_MAX_LIMIT",
        "CAMPUSDESK_SERVER_BIND_ADDRESS",
        "CAMPUSDESK_SERVER_PORT",
        "CAMPUSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CAMPUSDESK_LOGGING_LEVEL",
        "CAMPUSDESK_LOGGING_FORMAT",
        "CAMPUSDESK_LOG_LEVEL",
        "CAMPUSDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
