use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::error::{Error, Result};

pub const LOCAL_CONFIG: &str = ".cfpick.toml";

#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub path: PathBuf,
    pub value: Value,
}

fn default_program() -> String {
    "codefresh".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "g.codefresh.io".into()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CliSettings {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebSettings {
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildsSettings {
    /// Fixed branch; when unset the current git branch is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub cli: CliSettings,
    pub web: WebSettings,
    pub builds: BuildsSettings,
    pub log: LogSettings,
}

impl Settings {
    pub fn from_doc(doc: &ConfigDoc) -> Result<Self> {
        doc.value.clone().try_into().map_err(|e| {
            Error::msg(format!(
                "invalid settings in {}: {e}",
                doc.path.display()
            ))
        })
    }

    /// Overlay `CFPICK_*` variables. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CFPICK_PROGRAM") {
            self.cli.program = v;
        }
        if let Some(v) = lookup("CFPICK_HOST") {
            self.web.host = v;
        }
        if let Some(v) = lookup("CFPICK_BRANCH") {
            let v = v.trim().to_string();
            self.builds.branch = (!v.is_empty()).then_some(v);
        }
        if let Some(v) = lookup("CFPICK_TIMEOUT_SECS") {
            self.cli.timeout_secs = v.trim().parse().map_err(|_| {
                Error::msg(format!("CFPICK_TIMEOUT_SECS: expected seconds, got '{v}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cli.program.trim().is_empty() {
            return Err(Error::msg("cli.program must not be empty"));
        }
        if self.cli.timeout_secs == 0 {
            return Err(Error::msg("cli.timeout_secs must be greater than 0"));
        }
        if self.web.host.trim().is_empty() {
            return Err(Error::msg("web.host must not be empty"));
        }
        if self.web.host.contains("://") {
            return Err(Error::msg(format!(
                "web.host '{}' must be a bare host name (no scheme)",
                self.web.host
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.cli.timeout_secs)
    }
}

fn merge_values(base: &mut Value, child: Value) {
    match (base, child) {
        (Value::Table(base_tbl), Value::Table(child_tbl)) => {
            for (k, v) in child_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (base_slot, child_val) => {
            *base_slot = child_val;
        }
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn take_imports(path: &Path, value: &mut Value) -> Result<Vec<String>> {
    let Some(tbl) = value.as_table_mut() else {
        return Ok(Vec::new());
    };
    let Some(raw) = tbl.remove("imports") else {
        return Ok(Vec::new());
    };
    let Value::Array(arr) = raw else {
        return Err(Error::msg(format!(
            "imports in {} must be an array of paths",
            path.display()
        )));
    };
    let mut out = Vec::new();
    for v in arr {
        let Some(s) = v.as_str() else {
            return Err(Error::msg(format!(
                "invalid imports entry in {} (expected string)",
                path.display()
            )));
        };
        if !s.trim().is_empty() {
            out.push(s.trim().to_string());
        }
    }
    Ok(out)
}

fn load_value_inner(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::msg(format!(
            "config import cycle detected at {}",
            canonical.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

    // Precedence, lowest first: extends parent, imports in order, this file.
    let mut out = Value::Table(Default::default());
    if let Some(ext) = value.get("extends").and_then(Value::as_str) {
        out = load_value_inner(&resolve_ref_path(path, ext), stack)?;
    }
    if let Some(tbl) = value.as_table_mut() {
        tbl.remove("extends");
    }
    for imp in take_imports(path, &mut value)? {
        let loaded = load_value_inner(&resolve_ref_path(path, &imp), stack)?;
        merge_values(&mut out, loaded);
    }
    merge_values(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

pub fn load(path: &Path) -> Result<ConfigDoc> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value_inner(path, &mut stack)?;
    Ok(ConfigDoc {
        path: path.to_path_buf(),
        value,
    })
}

/// Pick the settings file: explicit path, then `./.cfpick.toml`, then the
/// user config dir. Returns `None` when nothing exists (defaults apply).
pub fn discover<F>(explicit: Option<&Path>, cwd: &Path, lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let local = cwd.join(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    let base = match lookup("XDG_CONFIG_HOME").filter(|v| !v.trim().is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => PathBuf::from(lookup("HOME")?).join(".config"),
    };
    let user = base.join("cfpick").join("config.toml");
    user.is_file().then_some(user)
}

/// Full resolution used by the binary: `.env`, file discovery, env overlay, validation.
pub fn resolve(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    let _ = dotenv::dotenv();
    let cwd = std::env::current_dir().map_err(|e| Error::msg(format!("cwd error: {e}")))?;
    let env = |k: &str| std::env::var(k).ok();

    let path = discover(explicit, &cwd, env);
    let mut settings = match path.as_deref() {
        Some(p) => Settings::from_doc(&load(p)?)?,
        None => Settings::default(),
    };
    settings.apply_env(env)?;
    settings.validate()?;
    Ok((settings, path))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use super::{LogFormat, Settings, discover};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_target_codefresh() {
        let s = Settings::default();
        assert_eq!(s.cli.program, "codefresh");
        assert_eq!(s.cli.timeout_secs, 30);
        assert_eq!(s.web.host, "g.codefresh.io");
        assert_eq!(s.builds.branch, None);
        assert_eq!(s.log.format, LogFormat::Text);
        s.validate().unwrap();
    }

    #[test]
    fn env_overrides_file_values() {
        let mut s = Settings::default();
        s.apply_env(env(&[
            ("CFPICK_PROGRAM", "/opt/cf/bin/codefresh"),
            ("CFPICK_BRANCH", "feature/x"),
            ("CFPICK_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(s.cli.program, "/opt/cf/bin/codefresh");
        assert_eq!(s.builds.branch.as_deref(), Some("feature/x"));
        assert_eq!(s.cli.timeout_secs, 5);
    }

    #[test]
    fn bad_timeout_env_is_rejected() {
        let mut s = Settings::default();
        let err = s
            .apply_env(env(&[("CFPICK_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("CFPICK_TIMEOUT_SECS"));
    }

    #[test]
    fn validate_names_offending_key() {
        let mut s = Settings::default();
        s.cli.timeout_secs = 0;
        assert!(s.validate().unwrap_err().to_string().contains("cli.timeout_secs"));

        let mut s = Settings::default();
        s.web.host = "https://g.codefresh.io".into();
        assert!(s.validate().unwrap_err().to_string().contains("web.host"));
    }

    #[test]
    fn discover_falls_back_to_xdg_dir() {
        let cwd = tempfile::tempdir().unwrap();
        let xdg = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(xdg.path().join("cfpick")).unwrap();
        std::fs::write(xdg.path().join("cfpick/config.toml"), "").unwrap();

        let lookup = env(&[("XDG_CONFIG_HOME", xdg.path().to_str().unwrap())]);
        let got = discover(None, cwd.path(), &lookup).unwrap();
        assert_eq!(got, xdg.path().join("cfpick/config.toml"));

        std::fs::write(cwd.path().join(".cfpick.toml"), "").unwrap();
        let got = discover(None, cwd.path(), &lookup).unwrap();
        assert_eq!(got, cwd.path().join(".cfpick.toml"));

        let explicit = Path::new("/etc/cfpick.toml");
        assert_eq!(discover(Some(explicit), cwd.path(), &lookup).unwrap(), explicit);
    }

    #[test]
    fn discover_none_without_any_file() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let lookup = env(&[("HOME", home.path().to_str().unwrap())]);
        assert_eq!(discover(None, cwd.path(), lookup), None);
    }
}
