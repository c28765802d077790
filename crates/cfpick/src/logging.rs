use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::{LogFormat, LogSettings};
use crate::error::{Error, Result};

pub const FILTER_ENV: &str = "CFPICK_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    /// The TUI owns the terminal and no log file was configured.
    Discard,
}

impl LogTarget {
    pub fn for_mode(settings: &LogSettings, interactive: bool) -> Self {
        match (&settings.file, interactive) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::Discard,
            (None, false) => LogTarget::Stderr,
        }
    }
}

/// Directive string: `CFPICK_LOG`, then `[log].filter`, then `info`.
pub fn filter_directive(settings: &LogSettings, env_value: Option<String>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| settings.filter.clone())
        .unwrap_or_else(|| "info".into())
}

pub fn init(settings: &LogSettings, target: LogTarget) -> Result<()> {
    let directive = filter_directive(settings, std::env::var(FILTER_ENV).ok());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| Error::msg(format!("invalid log filter '{directive}': {e}")))?;

    let ansi = target == LogTarget::Stderr;
    let writer = match &target {
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogTarget::Discard => BoxMakeWriter::new(std::io::sink),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::msg(format!("failed to open log file {}: {e}", path.display()))
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);
    let installed = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| Error::msg(format!("failed to install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{LogTarget, filter_directive};
    use crate::config::LogSettings;

    #[test]
    fn env_filter_wins_over_config() {
        let s = LogSettings {
            filter: Some("cfpick=debug".into()),
            ..Default::default()
        };
        assert_eq!(filter_directive(&s, Some("warn".into())), "warn");
        assert_eq!(filter_directive(&s, Some(" ".into())), "cfpick=debug");
        assert_eq!(filter_directive(&LogSettings::default(), None), "info");
    }

    #[test]
    fn tui_without_file_discards() {
        let mut s = LogSettings::default();
        assert_eq!(LogTarget::for_mode(&s, true), LogTarget::Discard);
        assert_eq!(LogTarget::for_mode(&s, false), LogTarget::Stderr);
        s.file = Some(PathBuf::from("/tmp/cfpick.log"));
        assert_eq!(
            LogTarget::for_mode(&s, true),
            LogTarget::File(PathBuf::from("/tmp/cfpick.log"))
        );
    }
}
