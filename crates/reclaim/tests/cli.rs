use std::process::Command;

#[test]
fn help_exits_successfully() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reclaim"));
    cmd.arg("--help");

    // Act
    let output = cmd.output().expect("failed to execute reclaim");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("processes locking a file"));
}

#[test]
fn version_exits_successfully() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reclaim"));
    cmd.arg("--version");

    // Act
    let output = cmd.output().expect("failed to execute reclaim");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reclaim"));
}

#[test]
fn who_requires_at_least_one_file() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reclaim"));
    cmd.arg("who");

    // Act
    let output = cmd.output().expect("failed to execute reclaim");

    // Assert
    assert!(!output.status.success());
}

#[test]
fn who_reports_an_unlocked_file() {
    // Arrange: a fresh temp file nobody holds open.
    let path = std::env::temp_dir().join(format!("reclaim-cli-{}.tmp", std::process::id()));
    std::fs::write(&path, b"x").expect("failed to create temp file");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reclaim"));
    cmd.arg("who").arg(&path);

    // Act
    let output = cmd.output().expect("failed to execute reclaim");
    let _ = std::fs::remove_file(&path);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No processes are locking"));
}

#[test]
fn who_json_prints_an_empty_array() {
    // Arrange
    let path = std::env::temp_dir().join(format!("reclaim-cli-json-{}.tmp", std::process::id()));
    std::fs::write(&path, b"x").expect("failed to create temp file");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reclaim"));
    cmd.arg("who").arg(&path).arg("--json");

    // Act
    let output = cmd.output().expect("failed to execute reclaim");
    let _ = std::fs::remove_file(&path);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "[]");
}

#[test]
fn unlock_with_nothing_blocking_is_a_no_op() {
    // Arrange
    let path = std::env::temp_dir().join(format!("reclaim-cli-unlock-{}.tmp", std::process::id()));
    std::fs::write(&path, b"x").expect("failed to create temp file");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reclaim"));
    cmd.arg("unlock").arg(&path);

    // Act
    let output = cmd.output().expect("failed to execute reclaim");
    let _ = std::fs::remove_file(&path);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Nothing is locking"));
}
