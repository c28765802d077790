use crate::runner::{CommandRunner, Invocation};

/// Current branch of the repository in the working directory, if any.
///
/// Detached HEAD and non-repositories both yield `None`; the build listing
/// then runs without `--branch`.
pub fn current_branch(runner: &dyn CommandRunner) -> Option<String> {
    let inv = Invocation::new("git").args(["rev-parse", "--abbrev-ref", "HEAD"]);
    let out = runner.run(&inv);
    if !out.success() {
        tracing::debug!(status = %out.status, "no git branch detected");
        return None;
    }
    let branch = out.stdout.first()?.trim();
    if branch.is_empty() || branch == "HEAD" {
        return None;
    }
    Some(branch.to_string())
}

/// `--branch` flag, then configured branch, then git.
pub fn resolve_branch(
    flag: Option<&str>,
    configured: Option<&str>,
    runner: &dyn CommandRunner,
) -> Option<String> {
    fn given(b: Option<&str>) -> Option<&str> {
        b.map(str::trim).filter(|b| !b.is_empty())
    }
    given(flag)
        .or_else(|| given(configured))
        .map(str::to_string)
        .or_else(|| current_branch(runner))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{current_branch, resolve_branch};
    use crate::error::Result;
    use crate::runner::{CommandRunner, Invocation, RunOutput, RunStatus};

    struct Canned(RunStatus, Vec<&'static str>);

    impl CommandRunner for Canned {
        fn run(&self, inv: &Invocation) -> RunOutput {
            assert_eq!(inv.program, "git");
            RunOutput {
                stdout: self.1.iter().map(|s| s.to_string()).collect(),
                stderr: Vec::new(),
                status: self.0.clone(),
                elapsed: Duration::ZERO,
            }
        }

        fn attach(&self, _inv: &Invocation) -> Result<RunStatus> {
            unreachable!()
        }
    }

    #[test]
    fn detached_head_is_no_branch() {
        assert_eq!(current_branch(&Canned(RunStatus::Exited(0), vec!["HEAD"])), None);
        assert_eq!(
            current_branch(&Canned(RunStatus::Exited(0), vec!["feature/x"])),
            Some("feature/x".into())
        );
        assert_eq!(current_branch(&Canned(RunStatus::Exited(128), vec![])), None);
    }

    #[test]
    fn flag_beats_config_beats_git() {
        let git = Canned(RunStatus::Exited(0), vec!["from-git"]);
        assert_eq!(resolve_branch(Some("flag"), Some("cfg"), &git).as_deref(), Some("flag"));
        assert_eq!(resolve_branch(None, Some("cfg"), &git).as_deref(), Some("cfg"));
        assert_eq!(resolve_branch(None, Some("  "), &git).as_deref(), Some("from-git"));
        assert_eq!(resolve_branch(None, None, &git).as_deref(), Some("from-git"));
    }

    #[test]
    fn blank_flag_falls_back_to_configured_branch() {
        let git = Canned(RunStatus::Exited(0), vec!["from-git"]);
        assert_eq!(resolve_branch(Some("  "), Some("cfg"), &git).as_deref(), Some("cfg"));
        assert_eq!(resolve_branch(Some(""), Some(" "), &git).as_deref(), Some("from-git"));
    }
}
