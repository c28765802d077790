//! Typed commands and the confirm-then-execute dispatcher.
//!
//! The UI (or the console front end) turns key presses into a [`Command`];
//! [`dispatch`] is the only place that decides whether the CLI gets invoked.
//! Terminate and restart always go through [`Host::confirm`] first, and
//! restart is refused outright for builds that are still in flight.

use std::fmt;

use crate::error::Result;
use crate::listing::{Controller, Listing};
use crate::model::{BuildRecord, PipelineRecord};
use crate::runner::{CommandRunner, Invocation, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        write!(f, "[{tag}] {}", self.text)
    }
}

/// Capabilities the dispatcher needs from whatever is driving it.
pub trait Host {
    /// Modal yes/no question. Returning `false` must leave the CLI untouched.
    fn confirm(&mut self, prompt: &str) -> bool;

    fn notify(&mut self, notice: Notice);

    /// Run `inv` with the terminal handed over to it.
    fn follow(&mut self, runner: &dyn CommandRunner, inv: &Invocation) -> Result<RunStatus>;

    fn open_url(&mut self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Terminate(BuildRecord),
    Restart(BuildRecord),
    FollowLogs(BuildRecord),
    OpenBuild(BuildRecord),
    OpenPipeline(PipelineRecord),
    RefreshBuilds,
    RefreshPipelines,
}

impl Command {
    pub fn is_destructive(&self) -> bool {
        matches!(self, Command::Terminate(_) | Command::Restart(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Terminate(_) => "terminate",
            Command::Restart(_) => "restart",
            Command::FollowLogs(_) => "logs",
            Command::OpenBuild(_) | Command::OpenPipeline(_) => "open",
            Command::RefreshBuilds => "refresh-builds",
            Command::RefreshPipelines => "refresh-pipelines",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Destructive command ran and the CLI reported success.
    Executed,
    /// User answered no.
    Declined,
    /// Gated off before asking (e.g. restart of a running build).
    Refused,
    Failed(String),
    Followed(RunStatus),
    Opened(String),
    Builds(Listing<BuildRecord>),
    Pipelines(Listing<PipelineRecord>),
}

pub fn dispatch<R: CommandRunner>(
    ctl: &Controller<R>,
    cmd: Command,
    host: &mut dyn Host,
) -> Outcome {
    tracing::debug!(command = cmd.name(), "dispatch");
    match cmd {
        Command::Terminate(build) => {
            let prompt = format!("Terminate build {} ({})?", build.id, build.pipeline);
            let inv = ctl.cli().terminate(&build.id);
            confirm_and_run(ctl, host, &prompt, &inv, "terminate", &build)
        }
        Command::Restart(build) => {
            if !build.restartable() {
                host.notify(Notice::warn(format!(
                    "Build {} is {}; only finished builds can be restarted",
                    build.id, build.status
                )));
                return Outcome::Refused;
            }
            let prompt = format!("Restart build {} ({})?", build.id, build.pipeline);
            let inv = ctl.cli().restart(&build.id);
            confirm_and_run(ctl, host, &prompt, &inv, "restart", &build)
        }
        Command::FollowLogs(build) => {
            let inv = ctl.cli().follow_logs(&build.id);
            match host.follow(ctl.runner(), &inv) {
                Ok(status) => {
                    if !status.success() {
                        host.notify(Notice::warn(format!(
                            "logs for {} ended: {status}",
                            build.id
                        )));
                    }
                    Outcome::Followed(status)
                }
                Err(e) => {
                    host.notify(Notice::error(format!("logs for {} failed: {e}", build.id)));
                    Outcome::Failed(e.to_string())
                }
            }
        }
        Command::OpenBuild(build) => open(host, build.url(ctl.host())),
        Command::OpenPipeline(pipeline) => open(host, pipeline.url(ctl.host())),
        Command::RefreshBuilds => {
            let listing = ctl.fetch_builds();
            notify_listing(host, &listing, "builds");
            Outcome::Builds(listing)
        }
        Command::RefreshPipelines => {
            let listing = ctl.fetch_pipelines();
            notify_listing(host, &listing, "pipelines");
            Outcome::Pipelines(listing)
        }
    }
}

fn confirm_and_run<R: CommandRunner>(
    ctl: &Controller<R>,
    host: &mut dyn Host,
    prompt: &str,
    inv: &Invocation,
    verb: &str,
    build: &BuildRecord,
) -> Outcome {
    if !host.confirm(prompt) {
        tracing::info!(verb, id = %build.id, "declined");
        host.notify(Notice::info(format!("{verb} cancelled; nothing was changed")));
        return Outcome::Declined;
    }
    let out = ctl.runner().run(inv);
    if out.success() {
        tracing::info!(verb, id = %build.id, pipeline = %build.pipeline, "executed");
        host.notify(Notice::info(format!("{verb} requested for build {}", build.id)));
        Outcome::Executed
    } else {
        let reason = out.failure_reason();
        host.notify(Notice::error(format!(
            "{verb} {} failed: {reason}",
            build.id
        )));
        Outcome::Failed(reason)
    }
}

fn open(host: &mut dyn Host, url: String) -> Outcome {
    match host.open_url(&url) {
        Ok(()) => {
            host.notify(Notice::info(format!("opened {url}")));
            Outcome::Opened(url)
        }
        Err(e) => {
            host.notify(Notice::error(format!("could not open {url}: {e}")));
            Outcome::Failed(e.to_string())
        }
    }
}

fn notify_listing<T>(host: &mut dyn Host, listing: &Listing<T>, what: &str) {
    if let Some(err) = &listing.error {
        host.notify(Notice::error(format!("listing {what} failed: {err}")));
        return;
    }
    host.notify(Notice::info(format!(
        "loaded {} {what} ({})",
        listing.len(),
        listing.scope
    )));
    let bad = listing.report.malformed.len();
    if bad > 0 {
        host.notify(Notice::warn(format!(
            "{bad} row(s) of {what} output could not be parsed"
        )));
    }
}
