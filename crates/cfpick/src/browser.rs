use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Opener program and leading args for the current platform.
fn opener() -> (&'static str, &'static [&'static str]) {
    const NO_ARGS: &[&str] = &[];
    const WINDOWS_START: &[&str] = &["/C", "start", ""];
    if cfg!(target_os = "macos") {
        ("open", NO_ARGS)
    } else if cfg!(target_os = "windows") {
        ("cmd", WINDOWS_START)
    } else {
        ("xdg-open", NO_ARGS)
    }
}

/// Hand `url` to the desktop's default browser without waiting for it.
pub fn open_url(url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::msg(format!("refusing to open non-http url '{url}'")));
    }
    let (program, lead) = opener();
    tracing::debug!(program, url, "opening url");
    Command::new(program)
        .args(lead)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| Error::msg(format!("failed to launch {program}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::open_url;

    #[test]
    fn non_http_urls_are_rejected() {
        let err = open_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("non-http"));
    }
}
