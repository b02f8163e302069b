use std::env;
use std::sync::{Mutex, OnceLock};

use riskline_cli::commands::{doctor, migrate, promote, seed, summary, underwrite};
use serde_json::Value;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_env(vars: &[(&str, &str)], test: impl FnOnce()) {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    for (key, value) in vars {
        env::set_var(key, value);
    }
    test();
    for (key, _) in vars {
        env::remove_var(key);
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("RISKLINE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_with_non_sqlite_url() {
    with_env(&[("RISKLINE_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_stages_demo_policies() {
    with_env(&[("RISKLINE_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("P-1001"));
        assert!(message.contains("P-1006"));
    });
}

#[test]
fn underwrite_rejects_unknown_rule_set() {
    with_env(&[("RISKLINE_DATABASE_URL", "sqlite::memory:")], || {
        let result = underwrite::run(Some("vibes"));
        assert_eq!(result.exit_code, 2, "expected rule set parse failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "rule_set");
    });
}

#[test]
fn doctor_passes_without_source_credentials() {
    with_env(&[("RISKLINE_DATABASE_URL", "sqlite::memory:")], || {
        let output = doctor::run(false);
        assert!(output.contains("doctor: all readiness checks passed"), "output: {output}");
        assert!(output.contains("[skip] source_credentials"));
        assert!(output.contains("[ok] database_connectivity"));
    });
}

#[test]
fn pipeline_runs_end_to_end_on_a_shared_database() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let db_path = dir.path().join("riskline-test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    with_env(&[("RISKLINE_DATABASE_URL", db_url.as_str())], || {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "seed should succeed: {}", seeded.output);

        let promoted = promote::run();
        assert_eq!(promoted.exit_code, 0, "promote should succeed: {}", promoted.output);
        let payload = parse_payload(&promoted.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("Promoted 6"), "message: {message}");

        let underwritten = underwrite::run(None);
        assert_eq!(underwritten.exit_code, 0, "underwrite should succeed");
        let payload = parse_payload(&underwritten.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("rule set: hard_gate"), "message: {message}");
        assert!(message.contains("Total policies processed: 6"), "message: {message}");
        assert!(message.contains("SAFE: 2"), "message: {message}");
        assert!(message.contains("NOT SAFE: 4"), "message: {message}");

        let summarized = summary::run();
        assert_eq!(summarized.exit_code, 0, "summary should succeed");
        let payload = parse_payload(&summarized.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("Total policies: 6"), "message: {message}");
        assert!(message.contains("- P-1002 [NOT SAFE]:"), "message: {message}");
        assert!(message.contains("- P-1001 [SAFE]:"), "message: {message}");
    });
}

#[test]
fn re_underwriting_with_another_rule_set_replaces_decisions() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let db_path = dir.path().join("riskline-test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    with_env(&[("RISKLINE_DATABASE_URL", db_url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");
        assert_eq!(promote::run().exit_code, 0, "promote should succeed");
        assert_eq!(underwrite::run(None).exit_code, 0, "hard gate run should succeed");

        let rerun = underwrite::run(Some("risk_accumulation"));
        assert_eq!(rerun.exit_code, 0, "accumulation run should succeed");
        let payload = parse_payload(&rerun.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("rule set: risk_accumulation"), "message: {message}");
        // One decision per policy regardless of how many runs happened.
        assert!(message.contains("Total policies processed: 6"), "message: {message}");
        assert!(message.contains("SAFE: 1"), "message: {message}");
        assert!(message.contains("NOT SAFE: 5"), "message: {message}");

        let summarized = summary::run();
        let payload = parse_payload(&summarized.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("Total policies: 6"), "message: {message}");
    });
}
