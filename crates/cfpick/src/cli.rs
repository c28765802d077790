use crate::runner::Invocation;

/// Column selection for `get builds`; the row parser depends on this order.
pub const BUILD_COLUMNS: &str = "id,status,started,pipeline-name";

/// Argument lists for the build-system CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCli {
    program: String,
}

impl BuildCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn base(&self) -> Invocation {
        Invocation::new(self.program.clone())
    }

    pub fn list_builds(&self, branch: Option<&str>) -> Invocation {
        let inv = self
            .base()
            .args(["get", "builds", "--select-columns", BUILD_COLUMNS]);
        match branch {
            Some(b) => inv.args(["--branch", b]),
            None => inv,
        }
    }

    pub fn list_pipelines(&self) -> Invocation {
        self.base()
            .args(["get", "pipelines", "--all", "--select-columns", "name"])
    }

    pub fn terminate(&self, id: &str) -> Invocation {
        self.base().args(["terminate", id])
    }

    pub fn restart(&self, id: &str) -> Invocation {
        self.base().args(["restart", id])
    }

    pub fn follow_logs(&self, id: &str) -> Invocation {
        self.base().args(["logs", "-f", id])
    }
}

#[cfg(test)]
mod tests {
    use super::BuildCli;

    #[test]
    fn build_listing_arguments() {
        let cli = BuildCli::new("codefresh");
        assert_eq!(
            cli.list_builds(Some("main")).args,
            vec![
                "get",
                "builds",
                "--select-columns",
                "id,status,started,pipeline-name",
                "--branch",
                "main"
            ]
        );
        assert!(!cli.list_builds(None).args.contains(&"--branch".to_string()));
    }

    #[test]
    fn action_arguments() {
        let cli = BuildCli::new("cf");
        assert_eq!(cli.terminate("b1").args, vec!["terminate", "b1"]);
        assert_eq!(cli.restart("b1").args, vec!["restart", "b1"]);
        assert_eq!(cli.follow_logs("b1").args, vec!["logs", "-f", "b1"]);
        assert_eq!(
            cli.list_pipelines().args,
            vec!["get", "pipelines", "--all", "--select-columns", "name"]
        );
        assert_eq!(cli.terminate("b1").program, "cf");
        assert_eq!(cli.terminate("b1").cwd, None);
    }
}
