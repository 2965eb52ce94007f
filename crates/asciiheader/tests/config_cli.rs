use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn asciiheader() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_asciiheader"));
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn config_print_emits_loadable_defaults() {
    let output = asciiheader()
        .args(["config", "print"])
        .output()
        .expect("failed to run asciiheader config print");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("[camera]"));
    assert!(text.contains("[[lights]]"));
    assert!(text.contains("resize_debounce"));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("defaults.toml");
    fs::write(&path, &text).unwrap();
    let status = asciiheader()
        .args(["config", "check"])
        .arg(&path)
        .status()
        .expect("failed to run asciiheader config check");
    assert!(status.success());
}

#[test]
fn config_check_reports_passes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("header.toml");
    fs::write(&path, "[effects]\npreset = \"ripple\"\n").unwrap();

    let output = asciiheader()
        .args(["config", "check"])
        .arg(&path)
        .output()
        .expect("failed to run asciiheader config check");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("preset:  ripple"));
    let passes = text
        .lines()
        .find(|line| line.trim_start().starts_with("passes:"))
        .expect("pass list printed");
    assert!(passes.contains("Ripple"));
    assert!(passes.contains("Ascii"));
    assert!(!passes.contains("Scan"));
}

#[test]
fn config_check_rejects_invalid_files() {
    let dir = TempDir::new().unwrap();

    let bad_version = dir.path().join("version.toml");
    fs::write(&bad_version, "version = 2\n").unwrap();
    let output = asciiheader()
        .args(["config", "check"])
        .arg(&bad_version)
        .output()
        .expect("failed to run asciiheader config check");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("version"));

    let malformed = dir.path().join("malformed.toml");
    fs::write(&malformed, "[camera\nfov_degrees = 40").unwrap();
    let status = asciiheader()
        .args(["config", "check"])
        .arg(&malformed)
        .status()
        .expect("failed to run asciiheader config check");
    assert!(!status.success());

    let missing = dir.path().join("missing.toml");
    let status = asciiheader()
        .args(["config", "check"])
        .arg(&missing)
        .status()
        .expect("failed to run asciiheader config check");
    assert!(!status.success());
}

#[test]
fn config_where_honours_env_override() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.toml"), "").unwrap();

    let output = asciiheader()
        .env("ASCIIHEADER_CONFIG_DIR", dir.path())
        .args(["config", "where"])
        .output()
        .expect("failed to run asciiheader config where");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains(&dir.path().display().to_string()));
    assert!(text.contains("(present)"));
}
