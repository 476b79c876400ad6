#![cfg(unix)]

use demand_route::core::{ProcessRunner, ScriptInvocation, ScriptRunner};
use demand_route::DashboardError;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

fn write_script(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn invocation(script: &Path) -> ScriptInvocation {
    ScriptInvocation {
        name: "predict".to_string(),
        interpreter: "sh".to_string(),
        script: script.to_path_buf(),
        args: vec![],
        params: None,
        working_dir: None,
        timeout: None,
    }
}

#[tokio::test]
async fn test_params_are_passed_and_last_line_relayed() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "echo.sh",
        "echo 'Loading model...'\necho 'progress: 50%' >&2\nprintf '{\"status\": \"success\", \"echo\": %s}\\n' \"$1\"\n",
    );

    let mut inv = invocation(&script);
    inv.params = Some(json!({"store": "CA_1", "category": "FOODS"}));

    let output = assert_ok!(ProcessRunner::default().run(inv).await);
    assert_eq!(output.value["echo"]["store"], "CA_1");
    assert_eq!(output.value["echo"]["category"], "FOODS");
    assert!(output.stderr.contains("progress: 50%"));
}

#[tokio::test]
async fn test_extra_args_come_before_params() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "args.sh",
        "printf '{\"first\": \"%s\", \"count\": %s}\\n' \"$1\" \"$#\"\n",
    );

    let mut inv = invocation(&script);
    inv.args = vec!["--fast".to_string()];
    inv.params = Some(json!({}));

    let output = ProcessRunner::default().run(inv).await.unwrap();
    assert_eq!(output.value, json!({"first": "--fast", "count": 2}));
}

#[tokio::test]
async fn test_nonzero_exit_is_failure() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "fail.sh",
        "echo '{\"status\": \"success\"}'\necho 'FileNotFoundError: predictions.csv' >&2\nexit 3\n",
    );

    let err = ProcessRunner::default().run(invocation(&script)).await.unwrap_err();
    match err {
        DashboardError::ScriptFailed { script, code, stderr } => {
            assert_eq!(script, "predict");
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "FileNotFoundError: predictions.csv");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_keeps_only_stderr_tail() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "noisy.sh",
        "i=0\nwhile [ $i -lt 300 ]; do printf 'abcdefghij' >&2; i=$((i+1)); done\nprintf 'FINAL' >&2\nexit 1\n",
    );

    let err = ProcessRunner::default().run(invocation(&script)).await.unwrap_err();
    match err {
        DashboardError::ScriptFailed { stderr, .. } => {
            assert_eq!(stderr.chars().count(), 2000);
            assert!(stderr.ends_with("abcdefghijFINAL"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_reported_error_with_zero_exit() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "reported.sh",
        "echo '{\"status\": \"error\", \"message\": \"Trained model not found. Please train the model first.\"}'\n",
    );

    let err = ProcessRunner::default().run(invocation(&script)).await.unwrap_err();
    assert!(matches!(
        err,
        DashboardError::ScriptReported { ref message, .. } if message.starts_with("Trained model not found")
    ));
}

#[tokio::test]
async fn test_non_json_output_is_failure() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "plain.sh", "echo 'Saved interactive map'\n");

    let err = ProcessRunner::default().run(invocation(&script)).await.unwrap_err();
    assert!(matches!(err, DashboardError::ScriptOutputError { .. }));
}

#[tokio::test]
async fn test_runs_in_working_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("metrics.json"), "{\"rmse\": 2.1}\n").unwrap();
    write_script(&dir, "cat.sh", "cat metrics.json\n");

    let mut inv = invocation(Path::new("cat.sh"));
    inv.working_dir = Some(dir.path().to_path_buf());

    let output = ProcessRunner::default().run(inv).await.unwrap();
    assert_eq!(output.value["rmse"], 2.1);
}

#[tokio::test]
async fn test_timeout_kills_script() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "slow.sh", "sleep 10\necho '{}'\n");

    let mut inv = invocation(&script);
    inv.timeout = Some(Duration::from_millis(300));

    let err = ProcessRunner::default().run(inv).await.unwrap_err();
    assert!(matches!(err, DashboardError::ScriptTimeout { .. }));
}

#[tokio::test]
async fn test_missing_interpreter_is_failure() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "any.sh", "echo '{}'\n");

    let mut inv = invocation(&script);
    inv.interpreter = "definitely-not-an-interpreter-1234".to_string();

    let err = ProcessRunner::default().run(inv).await.unwrap_err();
    assert!(matches!(err, DashboardError::ScriptFailed { code: None, .. }));
}
