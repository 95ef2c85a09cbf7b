//! Tests for the apply and validate commands.

use predicates::prelude::*;

use crate::support::TestEnv;

const SERVER: &str = r#"
[policies]
ops = 'path "secret/*" { capabilities = ["read"] }'

[auth_methods.github]
type = "github"

[entities.jonathan]
policies = ["ops"]
aliases = [{ name = "mossblaser", auth_mount = "github" }]
"#;

#[test]
fn test_validate_accepts_toml() {
    let t = TestEnv::new();
    let path = t.write("server.toml", SERVER);

    t.cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_validate_accepts_json() {
    let t = TestEnv::new();
    let path = t.write("server.json", r#"{"policies": {"legacy": null}}"#);

    t.cmd().arg("validate").arg(&path).assert().success();
}

#[test]
fn test_validate_rejects_unknown_section() {
    let t = TestEnv::new();
    let path = t.write("server.toml", "[polices]\nops = 'path \"x\" {}'\n");

    t.cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}

#[test]
fn test_validate_rejects_unknown_extension() {
    let t = TestEnv::new();
    let path = t.write("server.yaml", "policies: {}\n");

    t.cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported manifest format"));
}

#[test]
fn test_validate_reports_missing_file() {
    let t = TestEnv::new();

    t.cmd()
        .args(["validate", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_bad_manifest_fails_before_token_lookup() {
    let t = TestEnv::new();
    let path = t.write(
        "server.toml",
        "[entities.jonathan]\naliases = [{ name = \"mossblaser\" }]\n",
    );

    t.cmd()
        .arg("apply")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("auth_mount or mount_accessor"))
        .stderr(predicate::str::contains("no vault token").not());
}

#[test]
fn test_apply_reads_token_file() {
    let t = TestEnv::new();
    t.login("s.from-file");
    let path = t.write("server.toml", SERVER);

    // Gets past token resolution and fails on the connection instead.
    t.cmd()
        .args(["--vault-url", "http://127.0.0.1:1", "--timeout", "2"])
        .arg("apply")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no vault token").not());
}
