//! Checks which stream console logging lands on. The subscriber is global, so
//! the test re-runs its own binary in a child process and inspects the pipes.

use configuration::{init_logging, LoggingSettings};
use std::process::Command;

const CHILD_ENV: &str = "DOCBASE_CONSOLE_OUTPUT_CHILD";
const LOG_LINE: &str = "Connected to the document store.";
const RESULT_LINE: &str = r#"{"_id":"u1"}"#;

#[test]
fn console_logs_go_to_stderr_and_leave_stdout_clean() {
    if std::env::var_os(CHILD_ENV).is_some() {
        let _guard = init_logging(&LoggingSettings::default()).unwrap();
        tracing::info!("{LOG_LINE}");
        println!("{RESULT_LINE}");
        return;
    }

    let output = Command::new(std::env::current_exe().unwrap())
        .args([
            "--exact",
            "console_logs_go_to_stderr_and_leave_stdout_clean",
            "--nocapture",
        ])
        .env(CHILD_ENV, "1")
        .env("RUST_LOG", "info")
        .output()
        .unwrap();
    assert!(output.status.success(), "child failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stdout.contains(RESULT_LINE), "stdout: {stdout}");
    assert!(!stdout.contains(LOG_LINE), "log line leaked into stdout: {stdout}");
    assert!(stderr.contains(LOG_LINE), "stderr: {stderr}");
    // Piped stderr is not a terminal, so no colour codes.
    assert!(!stderr.contains('\u{1b}'), "ANSI escapes in piped stderr: {stderr}");
}
