use assert_cmd::Command;
use std::io::Write;

fn olmsys() -> Command {
    Command::cargo_bin("olmsys").unwrap()
}

#[test]
fn resolve_prints_hard_defaults() {
    let output = olmsys()
        .args(["resolve", "--product", "kafka"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("packageManifestId: kafka"), "{}", stdout);
    assert!(stdout.contains("catalogSourceName: community-operators"), "{}", stdout);
    assert!(stdout.contains("installPlanApproval: Automatic"), "{}", stdout);
    assert!(!stdout.contains("channel"), "{}", stdout);
}

#[test]
fn environment_overrides_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "kafka:\n  operators:\n    channel: stable\n    catalog_source: file-catalog\n"
    )
    .unwrap();

    let output = olmsys()
        .arg("--config")
        .arg(file.path())
        .args(["resolve", "--product", "kafka"])
        .env("OLMSYS_KAFKA_OPERATORS_CATALOG_SOURCE", "env-catalog")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("channel: stable"), "{}", stdout);
    assert!(stdout.contains("catalogSourceName: env-catalog"), "{}", stdout);
}

#[test]
fn invalid_approval_fails() {
    olmsys()
        .args(["resolve", "--product", "kafka"])
        .env("OLMSYS_KAFKA_OPERATORS_INSTALL_PLAN_APPROVAL", "Sometimes")
        .assert()
        .failure();
}

#[test]
fn missing_config_file_fails() {
    olmsys()
        .args(["--config", "/nonexistent/olmsys.yaml", "resolve", "--product", "kafka"])
        .assert()
        .failure();
}
