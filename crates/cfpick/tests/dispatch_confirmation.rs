use std::cell::RefCell;
use std::time::Duration;

use cfpick::actions::{Command, Host, Level, Notice, Outcome, dispatch};
use cfpick::cli::BuildCli;
use cfpick::listing::Controller;
use cfpick::model::{BuildRecord, BuildStatus, PipelineRecord};
use cfpick::runner::{CommandRunner, Invocation, RunOutput, RunStatus};

/// Records every invocation and answers with a canned output.
struct FakeRunner {
    calls: RefCell<Vec<Invocation>>,
    status: RunStatus,
    stdout: Vec<&'static str>,
    stderr: Vec<&'static str>,
}

impl FakeRunner {
    fn ok(stdout: Vec<&'static str>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            status: RunStatus::Exited(0),
            stdout,
            stderr: Vec::new(),
        }
    }

    fn failing(stderr: &'static str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            status: RunStatus::Exited(1),
            stdout: Vec::new(),
            stderr: vec![stderr],
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|i| i.args.clone()).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, inv: &Invocation) -> RunOutput {
        self.calls.borrow_mut().push(inv.clone());
        let stdout = if self.status.success() {
            self.stdout.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };
        RunOutput {
            stdout,
            stderr: self.stderr.iter().map(|s| s.to_string()).collect(),
            status: self.status.clone(),
            elapsed: Duration::from_millis(1),
        }
    }

    fn attach(&self, inv: &Invocation) -> cfpick::Result<RunStatus> {
        self.calls.borrow_mut().push(inv.clone());
        Ok(self.status.clone())
    }
}

/// Answers confirmations from a script and keeps every notice.
#[derive(Default)]
struct FakeHost {
    answers: Vec<bool>,
    prompts: Vec<String>,
    notices: Vec<Notice>,
    opened: Vec<String>,
}

impl FakeHost {
    fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().rev().copied().collect(),
            ..Default::default()
        }
    }

    fn last(&self) -> &Notice {
        self.notices.last().expect("a notice")
    }
}

impl Host for FakeHost {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answers.pop().unwrap_or(false)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn follow(&mut self, runner: &dyn CommandRunner, inv: &Invocation) -> cfpick::Result<RunStatus> {
        runner.attach(inv)
    }

    fn open_url(&mut self, url: &str) -> cfpick::Result<()> {
        self.opened.push(url.to_string());
        Ok(())
    }
}

fn controller(runner: FakeRunner) -> Controller<FakeRunner> {
    Controller::new(
        runner,
        BuildCli::new("codefresh"),
        "g.codefresh.io",
        Some("main".into()),
    )
}

fn build(id: &str, status: BuildStatus) -> BuildRecord {
    BuildRecord {
        id: id.into(),
        pipeline: "shop/deploy".into(),
        status,
        started: "2024-03-01T10:00:00Z".into(),
    }
}

#[test]
fn declined_terminate_never_invokes_the_cli() {
    let ctl = controller(FakeRunner::ok(vec![]));
    let mut host = FakeHost::answering(&[false]);

    let out = dispatch(&ctl, Command::Terminate(build("b1", BuildStatus::Running)), &mut host);

    assert_eq!(out, Outcome::Declined);
    assert!(ctl.runner().calls().is_empty());
    assert_eq!(host.prompts, vec!["Terminate build b1 (shop/deploy)?"]);
    assert_eq!(host.last().text, "terminate cancelled; nothing was changed");
}

#[test]
fn declined_restart_never_invokes_the_cli() {
    let ctl = controller(FakeRunner::ok(vec![]));
    let mut host = FakeHost::answering(&[false]);

    let out = dispatch(&ctl, Command::Restart(build("b2", BuildStatus::Error)), &mut host);

    assert_eq!(out, Outcome::Declined);
    assert!(ctl.runner().calls().is_empty());
}

#[test]
fn confirmed_terminate_runs_once() {
    let ctl = controller(FakeRunner::ok(vec![]));
    let mut host = FakeHost::answering(&[true]);

    let out = dispatch(&ctl, Command::Terminate(build("b1", BuildStatus::Running)), &mut host);

    assert_eq!(out, Outcome::Executed);
    assert_eq!(ctl.runner().calls(), vec![vec!["terminate", "b1"]]);
    assert_eq!(host.last().text, "terminate requested for build b1");
}

#[test]
fn restart_of_in_flight_build_is_refused_without_prompt() {
    for status in [
        BuildStatus::Running,
        BuildStatus::Pending,
        BuildStatus::Delayed,
        BuildStatus::Elected,
    ] {
        let ctl = controller(FakeRunner::ok(vec![]));
        let mut host = FakeHost::answering(&[true]);

        let out = dispatch(&ctl, Command::Restart(build("b3", status)), &mut host);

        assert_eq!(out, Outcome::Refused, "status {status}");
        assert!(host.prompts.is_empty(), "status {status} prompted");
        assert!(ctl.runner().calls().is_empty(), "status {status} ran the cli");
        assert_eq!(host.last().level, Level::Warn);
    }
}

#[test]
fn restart_of_finished_build_runs_after_confirmation() {
    for status in [
        BuildStatus::Terminating,
        BuildStatus::Terminated,
        BuildStatus::Error,
        BuildStatus::Success,
    ] {
        let ctl = controller(FakeRunner::ok(vec![]));
        let mut host = FakeHost::answering(&[true]);

        let out = dispatch(&ctl, Command::Restart(build("b4", status)), &mut host);

        assert_eq!(out, Outcome::Executed, "status {status}");
        assert_eq!(ctl.runner().calls(), vec![vec!["restart", "b4"]]);
    }
}

#[test]
fn failed_cli_call_surfaces_stderr() {
    let ctl = controller(FakeRunner::failing("Error: build b1 not found"));
    let mut host = FakeHost::answering(&[true]);

    let out = dispatch(&ctl, Command::Terminate(build("b1", BuildStatus::Running)), &mut host);

    let Outcome::Failed(reason) = out else {
        panic!("expected failure, got {out:?}");
    };
    assert!(reason.contains("build b1 not found"), "reason: {reason}");
    assert_eq!(host.last().level, Level::Error);
}

#[test]
fn refresh_builds_returns_fresh_scoped_listing() {
    let ctl = controller(FakeRunner::ok(vec![
        "ID   STATUS   STARTED               PIPELINE-NAME",
        "b1   running  2024-03-01T10:00:00Z  shop/deploy",
        "b2   error    2024-03-01T09:00:00Z  shop/test",
    ]));
    let mut host = FakeHost::default();

    let Outcome::Builds(listing) = dispatch(&ctl, Command::RefreshBuilds, &mut host) else {
        panic!("expected builds listing");
    };

    assert_eq!(listing.len(), 2);
    assert_eq!(listing.scope, "branch main");
    assert_eq!(listing.find("b2").map(|b| b.status), Some(BuildStatus::Error));
    let args = &ctl.runner().calls()[0];
    assert_eq!(args[..2], ["get", "builds"]);
    assert_eq!(args[args.len() - 2..], ["--branch", "main"]);
    assert_eq!(host.last().text, "loaded 2 builds (branch main)");
}

#[test]
fn refresh_failure_yields_empty_listing_and_error_notice() {
    let ctl = controller(FakeRunner::failing("not authenticated"));
    let mut host = FakeHost::default();

    let Outcome::Pipelines(listing) = dispatch(&ctl, Command::RefreshPipelines, &mut host) else {
        panic!("expected pipelines listing");
    };

    assert!(listing.is_empty());
    assert!(listing.error.as_deref().unwrap_or("").contains("not authenticated"));
    assert_eq!(host.last().level, Level::Error);
}

#[test]
fn follow_and_open_need_no_confirmation() {
    let ctl = controller(FakeRunner::ok(vec![]));
    let mut host = FakeHost::default();

    let out = dispatch(&ctl, Command::FollowLogs(build("b1", BuildStatus::Running)), &mut host);
    assert_eq!(out, Outcome::Followed(RunStatus::Exited(0)));
    assert_eq!(ctl.runner().calls(), vec![vec!["logs", "-f", "b1"]]);

    let pipeline = PipelineRecord {
        project: "shop".into(),
        name: "nightly e2e".into(),
    };
    let out = dispatch(&ctl, Command::OpenPipeline(pipeline), &mut host);
    assert_eq!(
        out,
        Outcome::Opened("https://g.codefresh.io/pipelines/all/?filter=name:nightly%20e2e".into())
    );
    assert!(host.prompts.is_empty());
    assert_eq!(host.opened.len(), 1);
}
