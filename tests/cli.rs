// tests/cli.rs — nonosh binary

use assert_cmd::Command;
use std::fs;

fn nonosh(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("nonosh").unwrap();
    cmd.arg("--config").arg(config);
    cmd.env_remove("NONOSH_PANEL_SECRET")
        .env_remove("NONOSH_AUTH_SECRET")
        .env_remove("NONOSH_ENV")
        .env("NO_COLOR", "1");
    cmd
}

fn write_config(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("nonosh.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn token_mint_then_verify() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "[capability]\nsecret = 'cli-secret'\n");

    let out = nonosh(&cfg).args(["token", "mint", "--subject", "p1"]).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("Set-Cookie: panel_access_token=p1:"));
    assert!(stdout.contains("HttpOnly"));
    assert!(stdout.contains("SameSite=Strict"));
    assert!(!stdout.contains("Secure;"));

    let value = stdout
        .trim()
        .trim_start_matches("Set-Cookie: panel_access_token=")
        .split(';')
        .next()
        .unwrap()
        .to_string();
    nonosh(&cfg)
        .args(["token", "verify", "--subject", "p1", "--cookie", &value])
        .assert()
        .success()
        .stdout("valid\n");
    nonosh(&cfg)
        .args(["token", "verify", "--subject", "p2", "--cookie", &value])
        .assert()
        .code(1)
        .stdout("invalid\n");
}

#[test]
fn production_without_secret_refuses_to_mint() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "[capability]\nproduction = true\nfallback_material = 'x'\n");
    nonosh(&cfg).args(["token", "mint", "--subject", "p1"]).assert().code(2);
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    nonosh(&dir.path().join("nope.toml")).arg("shell").assert().code(2);
}

#[test]
fn piped_shell_switches_users_and_persists_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state");
    let cfg = write_config(
        dir.path(),
        &format!("[storage]\nstate_dir = '{}'\n", state.display()),
    );

    let out = nonosh(&cfg)
        .arg("shell")
        .write_stdin("whoami\nsu adm\nunstable\nwhoami\nexit\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("operator"));
    assert!(stdout.contains("switched to adm"));
    assert!(!stdout.contains("unstable"));

    let saved = fs::read_to_string(state.join("privileges.json")).unwrap();
    assert!(saved.contains("\"current_user\":\"adm\""));

    let out = nonosh(&cfg).arg("shell").write_stdin("whoami\n").output().unwrap();
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.lines().any(|l| l.trim() == "adm"));
}
