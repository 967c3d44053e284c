use std::env;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use marketdesk_cli::commands::{config, doctor, totals};
use serde_json::Value;

const MANAGED_ENV_KEYS: &[&str] = &[
    "MARKETDESK_BACKEND_BASE_URL",
    "MARKETDESK_BACKEND_TIMEOUT_SECS",
    "MARKETDESK_BACKEND_API_TOKEN",
    "MARKETDESK_PRICING_DEBOUNCE_MS",
    "MARKETDESK_LOG_LEVEL",
    "MARKETDESK_LOG_FORMAT",
];

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_env(vars: &[(&str, &str)], test: impl FnOnce()) {
    let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
    let _guard = match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    for key in MANAGED_ENV_KEYS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test();

    for key in MANAGED_ENV_KEYS {
        env::remove_var(key);
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output is a json envelope")
}

#[test]
fn config_redacts_the_api_token_and_names_its_source() {
    with_env(&[("MARKETDESK_BACKEND_API_TOKEN", "tok-123")], || {
        let output = config::run();

        assert!(output.contains(
            "- backend.api_token = <redacted> (source: env (MARKETDESK_BACKEND_API_TOKEN))"
        ));
        assert!(!output.contains("tok-123"), "token value must never be printed");
        assert!(output.contains("- pricing.debounce_ms = 500 (source: default)"));
    });
}

#[test]
fn config_reports_env_overrides_for_plain_values() {
    with_env(&[("MARKETDESK_PRICING_DEBOUNCE_MS", "250")], || {
        let output = config::run();
        assert!(output
            .contains("- pricing.debounce_ms = 250 (source: env (MARKETDESK_PRICING_DEBOUNCE_MS))"));
    });
}

#[test]
fn config_reports_validation_failures_instead_of_partial_output() {
    with_env(&[("MARKETDESK_BACKEND_BASE_URL", "ftp://backend")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"));
    });
}

#[test]
fn doctor_without_a_token_fails_credentials_and_skips_reachability() {
    with_env(&[], || {
        let report: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "pass");
        assert_eq!(report["checks"][1]["name"], "credential_readiness");
        assert_eq!(report["checks"][1]["status"], "fail");
        assert_eq!(report["checks"][2]["name"], "backend_reachability");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_with_invalid_config_skips_the_downstream_checks() {
    with_env(&[("MARKETDESK_BACKEND_TIMEOUT_SECS", "not-a-number")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation:"));
        assert!(output.contains("- [skip] credential_readiness:"));
        assert!(output.contains("- [skip] backend_reachability:"));
    });
}

#[test]
fn totals_recomputes_the_worked_example() {
    let mut file = tempfile::NamedTempFile::new().expect("totals file");
    write!(
        file,
        r#"{{
            "items": [
                {{"item_name": "Deep cleaning", "quantity": 3, "rate": "100"}},
                {{"item_name": "Sofa shampoo", "quantity": 1, "rate": "250"}}
            ],
            "additional_costs": [
                {{"item_name": "Scaffolding rental", "quantity": 2, "unit_price": "150", "status": "approved"}},
                {{"item_name": "Extra crew", "quantity": 1, "unit_price": "500", "status": "pending"}}
            ]
        }}"#
    )
    .expect("write totals file");

    let result = totals::run(file.path());
    assert_eq!(result.exit_code, 0, "expected totals success: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "totals");
    assert_eq!(payload["status"], "ok");

    let message = payload["message"].as_str().unwrap_or("");
    assert!(message.contains("  - subtotal: 550"));
    assert!(message.contains("  - gst_amount: 99.00"));
    assert!(message.contains("  - total_amount: 649.00"));
    assert!(message.contains("  - approved_costs_total: 300"));
    assert!(message.contains("  - grand_total: 949.00"));
}

#[test]
fn totals_accepts_matching_declared_totals() {
    let mut file = tempfile::NamedTempFile::new().expect("totals file");
    write!(
        file,
        r#"{{
            "items": [{{"item_name": "Deep cleaning", "quantity": 2, "rate": "100"}}],
            "expected": {{"total_amount": "236.00", "grand_total": "236.00"}}
        }}"#
    )
    .expect("write totals file");

    let result = totals::run(file.path());
    assert_eq!(result.exit_code, 0, "expected matching totals: {}", result.output);
}

#[test]
fn totals_rejects_a_declared_total_that_does_not_match_the_factors() {
    let mut file = tempfile::NamedTempFile::new().expect("totals file");
    write!(
        file,
        r#"{{
            "items": [{{"item_name": "Deep cleaning", "quantity": 2, "rate": "100"}}],
            "expected": {{"total_amount": "200.00"}}
        }}"#
    )
    .expect("write totals file");

    let result = totals::run(file.path());
    assert_eq!(result.exit_code, 3, "expected a totals mismatch");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "totals_mismatch");
    let message = payload["message"].as_str().unwrap_or("");
    assert!(message.contains("total_amount: expected 200.00, computed 236.00"));
}

#[test]
fn totals_rejects_a_missing_or_malformed_file() {
    let result = totals::run(std::path::Path::new("does-not-exist.json"));
    assert_eq!(result.exit_code, 2);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "invalid_input");

    let mut file = tempfile::NamedTempFile::new().expect("totals file");
    write!(file, "{{not json").expect("write totals file");
    let result = totals::run(file.path());
    assert_eq!(result.exit_code, 2);

    let mut file = tempfile::NamedTempFile::new().expect("totals file");
    write!(file, r#"{{"items": []}}"#).expect("write totals file");
    let result = totals::run(file.path());
    assert_eq!(result.exit_code, 2);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "at least one line item is required");
}
