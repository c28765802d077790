//! Row parsing for the CLI's fixed-column listings.
//!
//! Each line is classified on its own into a [`RowOutcome`]; nothing here
//! fails the whole listing. Malformed rows are kept in the [`ParseReport`] so
//! they can be shown and logged instead of disappearing.

use std::sync::OnceLock;

use chrono::DateTime;
use regex::Regex;
use serde::Serialize;

use crate::model::{BuildRecord, BuildStatus, PipelineRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome<T> {
    Record(T),
    Header,
    Blank,
    Malformed { reason: String },
}

impl<T> RowOutcome<T> {
    fn malformed(reason: impl Into<String>) -> Self {
        RowOutcome::Malformed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    /// 1-based position in the CLI output.
    pub line_no: usize,
    pub line: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport<T> {
    pub records: Vec<T>,
    pub headers: usize,
    pub blank: usize,
    pub malformed: Vec<MalformedRow>,
}

impl<T> Default for ParseReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            headers: 0,
            blank: 0,
            malformed: Vec::new(),
        }
    }
}

impl<T> ParseReport<T> {
    pub fn summary(&self) -> String {
        format!(
            "{} rows, {} header, {} malformed",
            self.records.len(),
            self.headers,
            self.malformed.len()
        )
    }
}

fn build_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // id, status, then started + pipeline-name (split by `split_started`)
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<id>[A-Za-z0-9_-]+)\s+(?P<status>[A-Za-z]+)\s+(?P<rest>\S.*?)\s*$")
            .expect("build row pattern")
    })
}

/// Split the `started pipeline-name` tail of a build row.
///
/// An RFC 3339 timestamp is a single token, so everything after it is the
/// pipeline name (which may contain spaces). Any other timestamp format may
/// itself contain spaces; then the pipeline name is the last token.
fn split_started(rest: &str) -> Option<(&str, &str)> {
    if let Some((first, tail)) = rest.split_once(char::is_whitespace)
        && DateTime::parse_from_rfc3339(first).is_ok()
    {
        let tail = tail.trim();
        return (!tail.is_empty()).then_some((first, tail));
    }
    let (started, pipeline) = rest.rsplit_once(char::is_whitespace)?;
    Some((started.trim_end(), pipeline))
}

fn pipeline_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<project>[^/\s][^/]*?)\s*/\s*(?P<name>\S.*?)\s*$")
            .expect("pipeline row pattern")
    })
}

fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

pub fn parse_build_row(line: &str) -> RowOutcome<BuildRecord> {
    if line.trim().is_empty() {
        return RowOutcome::Blank;
    }
    if first_token(line).is_some_and(|t| t.eq_ignore_ascii_case("id")) {
        return RowOutcome::Header;
    }
    let Some(caps) = build_row_re().captures(line) else {
        return RowOutcome::malformed("expected: <id> <status> <started> <pipeline>");
    };
    let status = match caps["status"].parse::<BuildStatus>() {
        Ok(s) => s,
        Err(e) => return RowOutcome::malformed(e.to_string()),
    };
    let Some((started, pipeline)) = split_started(&caps["rest"]) else {
        return RowOutcome::malformed("expected: <id> <status> <started> <pipeline>");
    };
    RowOutcome::Record(BuildRecord {
        id: caps["id"].to_string(),
        pipeline: pipeline.to_string(),
        status,
        started: started.to_string(),
    })
}

pub fn parse_pipeline_row(line: &str) -> RowOutcome<PipelineRecord> {
    if line.trim().is_empty() {
        return RowOutcome::Blank;
    }
    if line.trim().eq_ignore_ascii_case("name") {
        return RowOutcome::Header;
    }
    let Some(caps) = pipeline_row_re().captures(line) else {
        return RowOutcome::malformed("expected: <project>/<name>");
    };
    RowOutcome::Record(PipelineRecord {
        project: caps["project"].to_string(),
        name: caps["name"].to_string(),
    })
}

/// Classify every line with `row` and collect the results.
pub fn parse_rows<T, I, S>(kind: &str, lines: I, row: fn(&str) -> RowOutcome<T>) -> ParseReport<T>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ParseReport::default();
    for (i, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        match row(line) {
            RowOutcome::Record(r) => report.records.push(r),
            RowOutcome::Header => report.headers += 1,
            RowOutcome::Blank => report.blank += 1,
            RowOutcome::Malformed { reason } => {
                tracing::warn!(kind, line_no = i + 1, line, %reason, "dropping malformed row");
                report.malformed.push(MalformedRow {
                    line_no: i + 1,
                    line: line.to_string(),
                    reason,
                });
            }
        }
    }
    report
}

pub fn parse_builds<I, S>(lines: I) -> ParseReport<BuildRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_rows("build", lines, parse_build_row)
}

pub fn parse_pipelines<I, S>(lines: I) -> ParseReport<PipelineRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_rows("pipeline", lines, parse_pipeline_row)
}
