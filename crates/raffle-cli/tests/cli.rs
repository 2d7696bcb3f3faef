use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

const GRAPH_ENV: [&str; 4] = ["TENANT_ID", "CLIENT_ID", "CLIENT_SECRET", "USER_EMAIL"];

fn amigo_secreto() -> Command {
    let mut cmd = Command::cargo_bin("amigo-secreto").unwrap();
    for key in GRAPH_ENV {
        cmd.env_remove(key);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn write_config(dir: &Path, groups: Value) -> PathBuf {
    let config = json!({
        "event": { "title": "Amigo Secreto 2025", "gift_budget": "$10.000 CLP" },
        "groups": groups,
        "delivery": { "batch_size": 2, "batch_delay_ms": 0 },
        "ledger": {
            "dir": dir.join("logs"),
            "recipient": "organizer@ecotranschile.cl"
        }
    });
    let path = dir.join("raffle.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn two_groups() -> Value {
    json!([
        {"name": "A", "participants": [
            {"name": "CARLOS ORELLANA", "email": "corellana@ecotranschile.cl"},
            {"name": "JOSE ZURITA", "email": "jzurita@ecotranschile.cl"},
            {"name": "LORENA SALINAS", "email": "lsalinas@ecotranschile.cl"}
        ]},
        {"name": "B", "participants": [
            {"name": "PEDRO MUNOZ", "email": "pmunoz@ecotranschile.cl"},
            {"name": "ANDREA SOTO", "email": "asoto@ecotranschile.cl"}
        ]}
    ])
}

fn setup() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), two_groups());
    (dir, config)
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn validate_lists_groups() {
    let (_dir, config) = setup();
    let out = stdout_json(amigo_secreto().arg("validate").arg("--config").arg(&config));
    assert_eq!(out["valid"], true);
    assert_eq!(out["total"], 5);
    assert_eq!(out["groups"][0], json!({"name": "A", "participants": 3}));
    assert_eq!(out["groups"][1], json!({"name": "B", "participants": 2}));
}

#[test]
fn validate_rejects_group_of_one() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        json!([{"name": "SOLO", "participants": [{"name": "ANA", "email": "a@x.cl"}]}]),
    );
    amigo_secreto()
        .arg("validate")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at least 2 participants"));
}

#[test]
fn missing_config_is_a_config_error() {
    let dir = tempdir().unwrap();
    amigo_secreto()
        .arg("validate")
        .arg("--config")
        .arg(dir.path().join("nope.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn seeded_draw_is_reproducible_and_has_no_self_matches() {
    let (_dir, config) = setup();
    let first = stdout_json(
        amigo_secreto()
            .args(["draw", "--seed", "42", "--config"])
            .arg(&config),
    );
    let second = stdout_json(
        amigo_secreto()
            .args(["draw", "--seed", "42", "--config"])
            .arg(&config),
    );
    assert_eq!(first, second);
    assert_eq!(first["total"], 5);
    for row in first["assignments"].as_array().unwrap() {
        assert_ne!(row["giver"], row["receiver"]);
    }
    let groups: Vec<&str> = first["assignments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["group"].as_str().unwrap())
        .collect();
    assert_eq!(groups, vec!["A", "A", "A", "B", "B"]);
}

#[test]
fn preview_writes_html_file() {
    let (dir, config) = setup();
    let out = dir.path().join("preview.html");
    amigo_secreto()
        .args(["preview", "--giver", "jose zurita", "--receiver", "ANDREA SOTO", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("JOSE ZURITA"));
    assert!(html.contains("ANDREA SOTO"));
    assert!(html.contains("$10.000 CLP"));
}

#[test]
fn preview_rejects_unknown_participant() {
    let (_dir, config) = setup();
    amigo_secreto()
        .args(["preview", "--giver", "NADIE", "--receiver", "ANDREA SOTO", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NADIE"));
}

#[test]
fn mock_send_records_ledger_and_calls() {
    let (dir, config) = setup();
    let out = stdout_json(
        amigo_secreto()
            .args(["send", "--mode", "mock", "--seed", "7", "--config"])
            .arg(&config),
    );
    assert_eq!(out["mode"], "mock");
    let report = &out["report"];
    assert_eq!(report["total"], 5);
    assert_eq!(report["sent"], 5);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["ledger_mail_sent"], true);
    assert_eq!(report["dry_run"], true);

    let ledger_file = PathBuf::from(report["ledger_file"].as_str().unwrap());
    assert!(ledger_file.starts_with(dir.path().join("logs")));
    let entry: Value = serde_json::from_str(&fs::read_to_string(&ledger_file).unwrap()).unwrap();
    assert_eq!(entry["total"], 5);
    assert_eq!(entry["dry_run"], true);
    assert!(dir.path().join("logs/historial-completo.json").exists());

    // token + five notifications + organizer summary
    let calls = out["http_calls"].as_array().unwrap();
    assert_eq!(calls.len(), 7);
    assert!(calls[0]["request"]["url"].as_str().unwrap().contains("/oauth2/"));
    assert!(calls[0]["request"].get("body_b64").unwrap().is_null());
}

#[test]
fn real_send_without_credentials_fails_before_drawing() {
    let (dir, config) = setup();
    amigo_secreto()
        .args(["send", "--mode", "real", "--config"])
        .arg(&config)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("TENANT_ID"));
    assert!(!dir.path().join("logs").exists());
}

#[test]
fn bundled_fixture_validates() {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/raffle.json");
    let out = stdout_json(amigo_secreto().arg("validate").arg("--config").arg(&fixture));
    assert_eq!(out["total"], 7);
    assert_eq!(out["ledger_recipient"], "lsalinas@ecotranschile.cl");
}
