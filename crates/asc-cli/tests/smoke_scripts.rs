use std::path::PathBuf;
use std::process::{Command, Output};

fn demo_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
        .join(name)
}

fn run_cli(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_asc-cli");
    Command::new(bin)
        .args(args)
        .arg("--scripts-dir")
        .arg(demo_dir("scripts"))
        .output()
        .expect("cli should execute")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn list_prints_every_demo_script() {
    let output = run_cli(&["list"]);
    assert!(output.status.success());

    let stdout = stdout_of(&output);
    let scripts = stdout
        .lines()
        .filter(|line| line.starts_with("SCRIPT:"))
        .collect::<Vec<_>>();
    assert_eq!(scripts.len(), 5, "stdout:\n{}", stdout);
    assert!(scripts[0].contains("\"name\":\"main\""));
    assert!(stdout.contains("\"displayName\":\"movement/walk_route\""));
    assert!(stdout.ends_with("RESULT:OK\n"));
}

#[test]
fn run_main_finishes_through_nested_calls() {
    let config = demo_dir("config").join("scheduler.json");
    let output = run_cli(&[
        "run",
        "--script",
        "main",
        "--config",
        config.to_string_lossy().as_ref(),
        "--realtime",
    ]);
    let stdout = stdout_of(&output);
    assert!(
        output.status.success(),
        "stdout:\n{}\nstderr:\n{}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );

    let events = stdout
        .lines()
        .filter(|line| line.starts_with("EVENT:"))
        .collect::<Vec<_>>();
    assert_eq!(
        events
            .iter()
            .filter(|line| line.contains("\"kind\":\"started\""))
            .count(),
        1
    );
    assert!(events
        .iter()
        .any(|line| line.contains("\"kind\":\"finished\"") && line.contains("\"name\":\"main\"")));
    assert!(!stdout.contains("\"kind\":\"errored\""));
    assert!(stdout.contains("RESULT:OK"));
}

#[test]
fn run_recursive_hits_call_depth_limit_without_failing() {
    let output = run_cli(&["run", "--script", "recursive"]);
    let stdout = stdout_of(&output);
    assert!(output.status.success(), "stdout:\n{}", stdout);
    assert_eq!(stdout.matches("\"kind\":\"callRejected\"").count(), 1);
    assert!(stdout.contains("Max call depth 32 reached."));
    assert!(stdout.contains("RESULT:OK"));
}

#[test]
fn run_unknown_script_reports_error_code() {
    let output = run_cli(&["run", "--script", "does-not-exist"]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = stdout_of(&output);
    assert!(stdout.contains("RESULT:ERROR"));
    assert!(stdout.contains("ERROR_CODE:CLI_SCRIPT_NOT_FOUND"));
}
