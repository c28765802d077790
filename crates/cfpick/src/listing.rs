use chrono::{DateTime, Local};

use crate::cli::BuildCli;
use crate::config::Settings;
use crate::model::{BuildRecord, PipelineRecord};
use crate::parse::{ParseReport, parse_builds, parse_pipelines};
use crate::runner::{CommandRunner, RunOutput, RunStatus};

/// One fetch of a listing. Never mutated; a refresh produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub report: ParseReport<T>,
    pub status: RunStatus,
    /// Last stderr line of a failed fetch.
    pub error: Option<String>,
    pub scope: String,
    pub fetched_at: DateTime<Local>,
}

impl<T> Listing<T> {
    fn from_output(out: RunOutput, scope: String, parse: fn(Vec<String>) -> ParseReport<T>) -> Self {
        let error = (!out.success()).then(|| out.failure_reason());
        Self {
            report: parse(out.stdout),
            status: out.status,
            error,
            scope,
            fetched_at: Local::now(),
        }
    }

    /// Placeholder shown before the first fetch completes.
    pub fn empty(scope: impl Into<String>) -> Self {
        Self {
            report: ParseReport::default(),
            status: RunStatus::Exited(0),
            error: None,
            scope: scope.into(),
            fetched_at: Local::now(),
        }
    }

    pub fn records(&self) -> &[T] {
        &self.report.records
    }

    pub fn len(&self) -> usize {
        self.report.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.report.records.is_empty()
    }

    pub fn ok(&self) -> bool {
        self.status.success()
    }
}

impl Listing<BuildRecord> {
    pub fn find(&self, id: &str) -> Option<&BuildRecord> {
        self.records().iter().find(|b| b.id == id)
    }
}

/// Owns the runner and CLI shape; every fetch goes through here.
pub struct Controller<R> {
    runner: R,
    cli: BuildCli,
    host: String,
    branch: Option<String>,
}

impl<R: CommandRunner> Controller<R> {
    pub fn new(runner: R, cli: BuildCli, host: impl Into<String>, branch: Option<String>) -> Self {
        Self {
            runner,
            cli,
            host: host.into(),
            branch,
        }
    }

    pub fn from_settings(runner: R, settings: &Settings, branch: Option<String>) -> Self {
        Self::new(
            runner,
            BuildCli::new(settings.cli.program.clone()),
            settings.web.host.clone(),
            branch,
        )
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn cli(&self) -> &BuildCli {
        &self.cli
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn builds_scope(&self) -> String {
        match &self.branch {
            Some(b) => format!("branch {b}"),
            None => "all branches".into(),
        }
    }

    pub fn fetch_builds(&self) -> Listing<BuildRecord> {
        let out = self.runner.run(&self.cli.list_builds(self.branch()));
        let listing = Listing::from_output(out, self.builds_scope(), |lines| parse_builds(lines));
        tracing::info!(
            scope = %listing.scope,
            ok = listing.ok(),
            summary = %listing.report.summary(),
            "fetched builds"
        );
        listing
    }

    pub fn fetch_pipelines(&self) -> Listing<PipelineRecord> {
        let out = self.runner.run(&self.cli.list_pipelines());
        let listing = Listing::from_output(out, "all pipelines".into(), |lines| {
            parse_pipelines(lines)
        });
        tracing::info!(
            ok = listing.ok(),
            summary = %listing.report.summary(),
            "fetched pipelines"
        );
        listing
    }
}
