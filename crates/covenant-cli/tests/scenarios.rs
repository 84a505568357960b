//! # Scenario Replay Tests
//!
//! Drive `covenant run` through scenario files on disk, including the
//! samples shipped under `scenarios/`.

use std::path::{Path, PathBuf};

use covenant_cli::simulate::{parse_scenario, replay, run_scenario, RunArgs};
use serde_json::Value;

fn sample(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}

fn run_to_json(scenario: &Path) -> Value {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.json");
    let args = RunArgs {
        scenario: scenario.to_path_buf(),
        out: Some(out.clone()),
        pretty: true,
    };
    assert_eq!(run_scenario(&args).unwrap(), 0);
    serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap()
}

fn write_scenario(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("scenario.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

const HEADER: &str = "\
start: 2026-01-01T00:00:00Z
admin: ops
jurisdictions: [pk-sez]
identities:
  - { address: alice, jurisdiction: pk-sez }
  - { address: bob, jurisdiction: pk-sez }
";

// ---------------------------------------------------------------------------
// Shipped samples
// ---------------------------------------------------------------------------

#[test]
fn recurring_bill_sample_renews_on_payment() {
    let report = run_to_json(&sample("recurring_bill.yaml"));

    let obligations = report["obligations"].as_array().unwrap();
    assert_eq!(obligations.len(), 2);
    assert_eq!(obligations[0]["status"], "paid");
    assert_eq!(obligations[1]["status"], "created");

    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 5);
    assert!(steps[2]["error"].is_string());
    assert!(steps[4]["result"]["successor"].is_string());

    assert_eq!(report["payments"].as_array().unwrap().len(), 1);
    assert_eq!(report["payments"][0]["payer"], "alice");
}

#[test]
fn contract_sample_executes_and_rejects_oversized_bill() {
    let report = run_to_json(&sample("contract_signing.yaml"));

    let obligations = report["obligations"].as_array().unwrap();
    assert_eq!(obligations.len(), 1);
    assert_eq!(obligations[0]["status"], "executed");

    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps[3]["result"]["outcome"], "pending");
    assert_eq!(steps[4]["result"]["outcome"], "executed");
    assert!(steps[5]["error"].is_string());

    let actions: Vec<&str> = report["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["create", "finalize_draft", "sign", "sign", "execute"]);
}

// ---------------------------------------------------------------------------
// Expectations
// ---------------------------------------------------------------------------

#[test]
fn unexpected_failure_stops_the_replay() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "{HEADER}steps:
  - op: create_bill
    actor: alice
    save: inv
    bill: {{ payer: alice, payee: bob, amount: 10, due_date: 2026-01-02T00:00:00Z, reference: inv, jurisdiction: pk-sez }}
  - {{ op: act, actor: bob, target: inv, action: pay }}
"
    );
    let path = write_scenario(&dir, &body);
    let err = run_scenario(&RunArgs {
        scenario: path,
        out: None,
        pretty: false,
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("step 1 (act)"));
}

#[test]
fn expected_error_that_does_not_occur_fails() {
    let body = format!(
        "{HEADER}steps:
  - op: create_bill
    actor: alice
    save: inv
    expect: validation
    bill: {{ payer: alice, payee: bob, amount: 10, due_date: 2026-01-02T00:00:00Z, reference: inv, jurisdiction: pk-sez }}
"
    );
    let scenario = parse_scenario(&body).unwrap();
    let err = replay(&scenario).unwrap_err().to_string();
    assert!(err.contains("expected"));
}

#[test]
fn wrong_error_category_is_not_accepted() {
    let body = format!(
        "{HEADER}steps:
  - op: create_bill
    actor: alice
    save: inv
    expect: compliance
    bill: {{ payer: alice, payee: bob, amount: 10, due_date: 2025-12-01T00:00:00Z, reference: inv, jurisdiction: pk-sez }}
"
    );
    let scenario = parse_scenario(&body).unwrap();
    assert!(replay(&scenario).is_err());
}

#[test]
fn unknown_label_is_a_scenario_error() {
    let body = format!("{HEADER}steps:\n  - {{ op: act, actor: alice, target: ghost, action: pay }}\n");
    let scenario = parse_scenario(&body).unwrap();
    let err = format!("{:#}", replay(&scenario).unwrap_err());
    assert!(err.contains("ghost"));
}

#[test]
fn action_without_operation_is_rejected() {
    let body = format!(
        "{HEADER}steps:
  - op: create_bill
    actor: alice
    save: inv
    bill: {{ payer: alice, payee: bob, amount: 10, due_date: 2026-01-02T00:00:00Z, reference: inv, jurisdiction: pk-sez }}
  - {{ op: act, actor: alice, target: inv, action: sign }}
"
    );
    let scenario = parse_scenario(&body).unwrap();
    let err = format!("{:#}", replay(&scenario).unwrap_err());
    assert!(err.contains("no `sign` operation"));
}

// ---------------------------------------------------------------------------
// Other kinds
// ---------------------------------------------------------------------------

#[test]
fn subscription_and_claim_flow() {
    let body = "\
start: 2026-01-01T00:00:00Z
admin: ops
jurisdictions: [pk-sez]
identities:
  - { address: alice, jurisdiction: pk-sez }
  - { address: bob, jurisdiction: pk-sez }
  - { address: shield, jurisdiction: pk-sez }
steps:
  - op: create_subscription
    actor: alice
    save: sub
    subscription: { merchant: bob, amount: 25, interval: 2592000, first_due: 2026-01-02T00:00:00Z, reference: stream, jurisdiction: pk-sez }
  - { op: act, actor: bob, target: sub, action: process_cycle, expect: state }
  - { op: advance, days: 1 }
  - { op: act, actor: bob, target: sub, action: process_cycle }
  - op: create_policy
    actor: shield
    save: cover
    policy: { beneficiary: alice, policy_type: health, coverage: 5000, premium: 100, start: 2026-01-03T00:00:00Z, end: 2027-01-03T00:00:00Z, reference: hp-1, jurisdiction: pk-sez }
  - { op: act, actor: shield, target: cover, action: activate }
  - { op: submit_claim, actor: alice, save: c1, policy: cover, amount: 800, reference: c-1 }
  - { op: act, actor: shield, target: c1, action: reject, reason: not covered }
  - { op: act, actor: alice, target: c1, action: dispute }
";
    let report = replay(&parse_scenario(body).unwrap()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["steps"][3]["result"]["outcome"], "charged");
    let statuses: Vec<&str> = json["obligations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["active", "active", "disputed"]);
    assert_eq!(report.payments.len(), 1);
    assert!(report.labels.contains_key("c1"));
}

#[test]
fn payments_are_reported_in_dispatch_order() {
    let body = format!(
        "{HEADER}steps:
  - op: create_subscription
    actor: alice
    save: sub
    subscription: {{ merchant: bob, amount: 25, interval: 2592000, first_due: 2026-01-02T00:00:00Z, reference: stream, jurisdiction: pk-sez }}
  - op: create_bill
    actor: alice
    save: inv
    bill: {{ payer: alice, payee: bob, amount: 10, due_date: 2026-01-02T00:00:00Z, reference: inv, jurisdiction: pk-sez }}
  - {{ op: advance, days: 1 }}
  - {{ op: act, actor: alice, target: inv, action: pay }}
  - {{ op: act, actor: bob, target: sub, action: process_cycle }}
  - {{ op: advance, days: 30 }}
  - {{ op: act, actor: bob, target: sub, action: process_cycle }}
"
    );
    let report = replay(&parse_scenario(&body).unwrap()).unwrap();
    let settled: Vec<String> = report
        .payments
        .iter()
        .map(|p| p.request.obligation.to_string())
        .collect();
    let (inv, sub) = (&report.labels["inv"], &report.labels["sub"]);
    assert_eq!(settled, [inv.clone(), sub.clone(), sub.clone()]);
}

#[test]
fn template_and_verification_flow() {
    let body = "\
start: 2026-01-01T00:00:00Z
admin: ops
jurisdictions: [pk-sez]
identities:
  - { address: alice, jurisdiction: pk-sez }
  - { address: bob, jurisdiction: pk-sez }
  - { address: vera, jurisdiction: pk-sez }
items:
  - { id: lot-7, owner: alice, description: cotton bales }
steps:
  - op: register_template
    actor: bob
    save: nda
    template:
      name: nda
      jurisdiction: pk-sez
      required_signatories: 1
      body_digest: 0000000000000000000000000000000000000000000000000000000000000000
  - { op: create_from_template, actor: alice, save: c, template: nda, signatories: [bob], title: mutual nda, reference: nda-1 }
  - { op: deactivate_template, actor: bob, template: nda }
  - { op: create_from_template, actor: alice, save: d, template: nda, signatories: [bob], title: again, reference: nda-2, expect: state }
  - op: request_verification
    actor: alice
    save: v
    verification: { verifier: vera, item: lot-7, fee: 40, reference: v-1, jurisdiction: pk-sez }
  - { op: act, actor: vera, target: v, action: approve, findings: intact }
";
    let report = replay(&parse_scenario(body).unwrap()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["steps"][5]["result"]["status"], "verified");
    assert_eq!(report.obligations.len(), 2);
    assert_eq!(report.payments.len(), 1);
    assert_eq!(report.payments[0].request.payee.as_str(), "vera");
}
