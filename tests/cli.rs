use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn emprego(csv: &Path) -> Command {
    let mut cmd = Command::cargo_bin("emprego").unwrap();
    cmd.env_remove("MEU_EMPREGO_REMOTE_URI")
        .env_remove("MEU_EMPREGO_DB_NAME")
        .env_remove("RUST_LOG")
        .env("CANDIDATURAS_CSV_PATH", csv);
    cmd
}

fn add(csv: &Path, company: &str, date: &str) {
    emprego(csv)
        .args(["add", "--company", company, "--role", "Engineer", "--date", date])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend: local-only"));
}

#[test]
fn add_then_list_json_in_local_mode() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");

    emprego(&csv)
        .args([
            "add",
            "-c",
            "Acme",
            "-r",
            "Rust Developer",
            "-d",
            "2025-11-02",
            "-m",
            "remote",
            "-s",
            "interview",
            "-n",
            "async, tokio",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved Rust Developer @ Acme (02-11-2025)"));

    let output = emprego(&csv).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        records,
        serde_json::json!([{
            "empresa": "Acme",
            "cargo": "Rust Developer",
            "data": "02-11-2025",
            "tipo": "Remoto",
            "status": "Entrevista",
            "observacoes": "async, tokio",
            "link": "",
        }])
    );

    let content = fs::read_to_string(&csv).unwrap();
    assert!(content.starts_with("empresa,cargo,data,tipo,status,observacoes,link\n"));
}

#[test]
fn list_limit_orders_by_date() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");
    add(&csv, "Old", "2024-05-01");
    add(&csv, "Newest", "2025-11-02");
    add(&csv, "Middle", "2025-01-15");

    emprego(&csv)
        .args(["list", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Newest"))
        .stdout(predicate::str::contains("Middle"))
        .stdout(predicate::str::contains("Old").not());
}

#[test]
fn add_rejects_invalid_input() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");

    emprego(&csv)
        .args(["add", "-c", "Acme", "-r", "Dev", "-d", "02/11/2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));

    emprego(&csv)
        .args(["add", "-c", " ", "-r", "Dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("company must not be empty"));
}

#[test]
fn ping_without_uri_reports_local_mode() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");

    emprego(&csv)
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active backend: local"))
        .stdout(predicate::str::contains("no remote URI configured"));
}

#[test]
fn unreachable_remote_falls_back_to_local() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");

    emprego(&csv)
        .env("MEU_EMPREGO_REMOTE_URI", "http://127.0.0.1:9")
        .args(["add", "-c", "Acme", "-r", "Dev", "-d", "2025-11-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend: local-only"));

    emprego(&csv)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"empresa\": \"Acme\""));
}

#[test]
fn corrupt_header_is_reset() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");
    fs::write(&csv, "not,a,header\nAcme,Dev,02-11-2025\n").unwrap();

    emprego(&csv)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No applications found."));
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "empresa,cargo,data,tipo,status,observacoes,link\n"
    );
}

#[test]
fn stats_and_export() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");
    add(&csv, "Acme", "2025-11-02");
    add(&csv, "Beta", "2025-11-01");

    emprego(&csv)
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 2"))
        .stdout(predicate::str::contains("Inscrito"));

    let out = dir.path().join("export.csv");
    emprego(&csv)
        .arg("export")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 application(s)"));
    let exported = fs::read_to_string(&out).unwrap();
    assert!(exported.starts_with("\u{feff}empresa,"));
    assert!(exported.contains("Acme,Engineer,02-11-2025"));
}

#[test]
fn invalid_utf8_row_does_not_block_the_cli() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("candidaturas.csv");
    fs::write(
        &csv,
        b"empresa,cargo,data,tipo,status,observacoes,link\nBeta,Dev,01-11-2025,H\xedbrido,,,\n",
    )
    .unwrap();

    add(&csv, "Acme", "2025-11-02");
    emprego(&csv)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"empresa\": \"Beta\""))
        .stdout(predicate::str::contains("\"empresa\": \"Acme\""));
}
