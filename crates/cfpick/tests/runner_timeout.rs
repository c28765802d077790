#![cfg(unix)]

use std::time::{Duration, Instant};

use cfpick::runner::{CommandRunner, Invocation, ProcessRunner, RunStatus};

#[test]
fn timeout_kills_the_whole_process_group() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let marker = tmp.path().join("survived");
    // The grandchild would write the marker if it outlived the group kill.
    let script = format!("(sleep 1; touch '{}') & sleep 10", marker.display());

    let runner = ProcessRunner::with_timeout(Duration::from_millis(300));
    let started = Instant::now();
    let out = runner.run(&Invocation::new("sh").args(["-c", script.as_str()]));

    assert_eq!(out.status, RunStatus::TimedOut);
    assert!(out.stdout.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));

    std::thread::sleep(Duration::from_millis(1500));
    assert!(!marker.exists(), "background child outlived the timeout");
}

#[test]
fn output_is_sanitized_before_it_reaches_callers() {
    let runner = ProcessRunner::default();
    let out = runner.run(&Invocation::new("sh").args([
        "-c",
        r"printf '\033[32mb1\033[0m\trunning\n\n'",
    ]));

    assert!(out.success(), "{:?}", out.status);
    // Blank lines are kept; the parsers count them.
    assert_eq!(out.stdout, vec!["b1 running", ""]);
}

#[test]
fn stdin_is_not_inherited() {
    let runner = ProcessRunner::default();
    let out = runner.run(&Invocation::new("sh").args(["-c", "cat; echo done"]));
    assert!(out.success());
    assert_eq!(out.stdout, vec!["done"]);
}
