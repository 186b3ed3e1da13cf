#![forbid(unsafe_code)]

use std::process::Command;

#[test]
fn cli_help_exits_zero_and_does_not_create_a_store() {
    let exe = env!("CARGO_BIN_EXE_pm_server");
    let dir = tempfile::tempdir().expect("temp dir");

    let output = Command::new(exe)
        .arg("--help")
        .current_dir(dir.path())
        .output()
        .expect("run pm_server --help");

    assert!(
        output.status.success(),
        "expected zero exit (stderr={})",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE:"), "help must include USAGE");
    assert!(stdout.contains("PLANOMAP_STORAGE_DIR"));
    assert!(
        !dir.path().join(".planomap").exists(),
        "--help should not create the default storage dir"
    );
}

#[test]
fn cli_version_exits_zero_and_includes_pkg_version() {
    let exe = env!("CARGO_BIN_EXE_pm_server");
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .expect("run pm_server --version");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "version output must include crate version (got={stdout})"
    );
}

#[test]
fn invalid_config_fails_at_startup() {
    let exe = env!("CARGO_BIN_EXE_pm_server");
    let dir = tempfile::tempdir().expect("temp dir");
    let config = dir.path().join("planomap.yaml");
    std::fs::write(&config, "unknown_fields: sometimes\n").expect("write config");

    let output = Command::new(exe)
        .arg("--config")
        .arg(&config)
        .arg("--storage-dir")
        .arg(dir.path().join("store"))
        .env_remove("PLANOMAP_CONFIG")
        .env_remove("PLANOMAP_STORAGE_DIR")
        .output()
        .expect("run pm_server with bad config");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "stderr={stderr}");
    assert!(!dir.path().join("store").exists());
}
