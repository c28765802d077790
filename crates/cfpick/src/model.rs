use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Running,
    Success,
    Error,
    Terminated,
    Terminating,
    Delayed,
    Pending,
    Elected,
}

impl BuildStatus {
    pub const ALL: [BuildStatus; 8] = [
        BuildStatus::Running,
        BuildStatus::Success,
        BuildStatus::Error,
        BuildStatus::Terminated,
        BuildStatus::Terminating,
        BuildStatus::Delayed,
        BuildStatus::Pending,
        BuildStatus::Elected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Running => "running",
            BuildStatus::Success => "success",
            BuildStatus::Error => "error",
            BuildStatus::Terminated => "terminated",
            BuildStatus::Terminating => "terminating",
            BuildStatus::Delayed => "delayed",
            BuildStatus::Pending => "pending",
            BuildStatus::Elected => "elected",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            BuildStatus::Running => "▶",
            BuildStatus::Success => "✔",
            BuildStatus::Error => "✖",
            BuildStatus::Terminated => "■",
            BuildStatus::Terminating => "□",
            BuildStatus::Delayed => "◷",
            BuildStatus::Pending => "…",
            BuildStatus::Elected => "◆",
        }
    }

    /// Only builds that reached (or are reaching) a terminal state can be restarted.
    pub fn is_restartable(self) -> bool {
        matches!(
            self,
            BuildStatus::Terminating
                | BuildStatus::Terminated
                | BuildStatus::Error
                | BuildStatus::Success
        )
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        BuildStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::msg(format!("unknown build status '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRecord {
    pub id: String,
    pub pipeline: String,
    pub status: BuildStatus,
    /// Timestamp exactly as the CLI printed it.
    pub started: String,
}

impl BuildRecord {
    pub fn restartable(&self) -> bool {
        self.status.is_restartable()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.started.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn url(&self, host: &str) -> String {
        format!("https://{}/build/{}", host.trim_end_matches('/'), self.id)
    }

    /// Text the fuzzy filter matches against.
    pub fn haystack(&self) -> String {
        format!(
            "{} {} {} {}",
            self.id, self.pipeline, self.status, self.started
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRecord {
    pub project: String,
    pub name: String,
}

impl PipelineRecord {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.project, self.name)
    }

    pub fn url(&self, host: &str) -> String {
        format!(
            "https://{}/pipelines/all/?filter=name:{}",
            host.trim_end_matches('/'),
            percent_encode(&self.name)
        )
    }

    pub fn haystack(&self) -> String {
        self.full_name()
    }
}

/// Percent-encode everything outside RFC 3986 unreserved characters.
pub fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// "3m ago" style age, used by the preview pane.
pub fn format_age(started: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - started).num_seconds();
    if secs < 0 {
        return "in the future".into();
    }
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
