//! Tests for error handling and CLI flags.

use predicates::prelude::*;

use crate::support::TestEnv;

#[test]
fn test_help_lists_commands() {
    let t = TestEnv::new();

    t.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("token"));
}

#[test]
fn test_version_flag() {
    let t = TestEnv::new();

    t.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vaultconf"));
}

#[test]
fn test_unknown_command_fails() {
    let t = TestEnv::new();

    t.cmd().arg("unknown-command").assert().failure();
}

#[test]
fn test_missing_token_hints_at_login() {
    let t = TestEnv::new();
    let path = t.write("server.toml", "[policies]\nops = 'path \"x\" {}'\n");

    t.cmd()
        .arg("apply")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no vault token"))
        .stderr(predicate::str::contains("VAULT_TOKEN"));
}

#[test]
fn test_blank_token_counts_as_missing() {
    let t = TestEnv::new();
    let path = t.write("server.toml", "[policies]\nops = 'path \"x\" {}'\n");

    t.cmd()
        .env("VAULT_TOKEN", "   ")
        .arg("apply")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no vault token"));
}

#[test]
fn test_unreachable_server_hints_at_address() {
    let t = TestEnv::new();
    let path = t.write("server.toml", "[policies]\nops = 'path \"x\" {}'\n");

    t.cmd()
        .args(["--vault-url", "http://127.0.0.1:1", "--token", "s.test", "--timeout", "2"])
        .arg("apply")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("VAULT_ADDR"));
}

#[test]
fn test_verbose_flag_accepted_after_subcommand() {
    let t = TestEnv::new();
    let path = t.write("server.toml", "");

    t.cmd()
        .arg("validate")
        .arg(&path)
        .arg("--verbose")
        .assert()
        .success();
}

#[test]
fn test_completions_bash_outputs_script() {
    let t = TestEnv::new();

    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_vaultconf"));
}

#[test]
fn test_completions_zsh() {
    let t = TestEnv::new();

    t.cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef vaultconf"));
}
