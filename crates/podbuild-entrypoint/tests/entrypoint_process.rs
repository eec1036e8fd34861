//! Drives the built binary the way a pod unit would.

use std::process::Command;
use std::time::Duration;

const BIN: &str = env!("CARGO_BIN_EXE_podbuild-entrypoint");

/// Test: with neither signal file configured the step just runs
#[test]
fn test_no_signal_files_runs_step() {
    let status = Command::new(BIN)
        .env_remove("PODBUILD_WAIT_FILE")
        .env_remove("PODBUILD_POST_FILE")
        .args(["--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
}

/// Test: only a post file, as for the first unit of a sequence
#[test]
fn test_first_unit_needs_no_wait_file() {
    let dir = tempfile::tempdir().unwrap();
    let post = dir.path().join("0");

    let status = Command::new(BIN)
        .env_remove("PODBUILD_WAIT_FILE")
        .arg("--post-file")
        .arg(&post)
        .args(["--", "true"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(post.exists());
}

/// Test: only a wait file, as for the last unit of a sequence
#[test]
fn test_last_unit_needs_no_post_file() {
    let dir = tempfile::tempdir().unwrap();
    let wait = dir.path().join("3");
    std::fs::File::create(&wait).unwrap();

    let status = Command::new(BIN)
        .env_remove("PODBUILD_POST_FILE")
        .arg("--wait-file")
        .arg(&wait)
        .args(["--", "true"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
}

/// Test: a zero poll interval is rejected at argument parsing
#[test]
fn test_zero_poll_interval_rejected() {
    let status = Command::new(BIN)
        .args(["--wait-poll-interval-ms", "0", "--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}

/// Test: the poll interval can come from the environment
#[test]
fn test_poll_interval_from_env() {
    let status = Command::new(BIN)
        .env("PODBUILD_WAIT_POLL_INTERVAL_MS", "0")
        .args(["--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));

    let status = Command::new(BIN)
        .env("PODBUILD_WAIT_POLL_INTERVAL_MS", "10")
        .args(["--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
}

/// Test: the step's exit code becomes the runner's exit code
#[test]
fn test_exit_code_propagates() {
    let status = Command::new(BIN)
        .args(["--", "sh", "-c", "exit 7"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(7));
}

/// Test: a successful step posts its signal file
#[test]
fn test_success_posts_file() {
    let dir = tempfile::tempdir().unwrap();
    let post = dir.path().join("0");

    let status = Command::new(BIN)
        .arg("--post-file")
        .arg(&post)
        .args(["--entrypoint", "true", "--"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(post.exists());
}

/// Test: a failed step leaves no signal file for its successor
#[test]
fn test_failure_does_not_post() {
    let dir = tempfile::tempdir().unwrap();
    let post = dir.path().join("0");

    let status = Command::new(BIN)
        .arg("--post-file")
        .arg(&post)
        .args(["--", "sh", "-c", "exit 1"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!post.exists());
}

/// Test: failing to post is a runner fault, not the step's exit code
#[test]
fn test_post_fault_is_internal_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let post = dir.path().join("no-such-dir").join("0");

    let status = Command::new(BIN)
        .arg("--post-file")
        .arg(&post)
        .args(["--", "true"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(podbuild_entrypoint::INTERNAL_FAULT_EXIT_CODE));
}

/// Test: an unlaunchable program is a runner fault
#[test]
fn test_missing_program_is_internal_exit_code() {
    let status = Command::new(BIN)
        .args(["--", "/no/such/program"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(podbuild_entrypoint::INTERNAL_FAULT_EXIT_CODE));
}

/// Test: environment variables configure the signal files
#[test]
fn test_env_configures_files() {
    let dir = tempfile::tempdir().unwrap();
    let wait = dir.path().join("0");
    let post = dir.path().join("1");
    std::fs::File::create(&wait).unwrap();

    let status = Command::new(BIN)
        .env("PODBUILD_WAIT_FILE", &wait)
        .env("PODBUILD_POST_FILE", &post)
        .args(["--", "true"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(post.exists());
}

/// Test: two runners chained through a signal file execute in order
#[test]
fn test_chained_steps_respect_order() {
    let dir = tempfile::tempdir().unwrap();
    let signal = dir.path().join("0");
    let done = dir.path().join("1");
    let log = dir.path().join("order.txt");

    // The second step is started first and must block until the first posts.
    let mut second = Command::new(BIN)
        .arg("--wait-file")
        .arg(&signal)
        .arg("--post-file")
        .arg(&done)
        .args(["--wait-poll-interval-ms", "20", "--", "sh", "-c"])
        .arg(format!("echo second >> {}", log.display()))
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(200));
    assert!(!log.exists());

    let first = Command::new(BIN)
        .arg("--post-file")
        .arg(&signal)
        .args(["--", "sh", "-c"])
        .arg(format!("echo first >> {}", log.display()))
        .status()
        .unwrap();
    assert_eq!(first.code(), Some(0));

    assert_eq!(second.wait().unwrap().code(), Some(0));
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "first\nsecond\n");
    assert!(done.exists());
}

/// Test: RUST_LOG overrides the default warn-level logging
#[test]
fn test_rust_log_controls_verbosity() {
    let quiet = Command::new(BIN)
        .env_remove("RUST_LOG")
        .args(["--", "true"])
        .output()
        .unwrap();
    assert_eq!(quiet.status.code(), Some(0));
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("Starting step"));

    let loud = Command::new(BIN)
        .env("RUST_LOG", "info")
        .args(["--", "true"])
        .output()
        .unwrap();
    assert_eq!(loud.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&loud.stderr).contains("Starting step"));
}
