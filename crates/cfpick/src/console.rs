use std::io::{BufRead, Write};

use crate::actions::{Host, Notice};
use crate::error::Result;
use crate::runner::{CommandRunner, Invocation, RunStatus};

/// [`Host`] for the non-interactive subcommands: prompts on a line reader,
/// prints notices to a writer.
pub struct ConsoleHost<I, O> {
    input: I,
    output: O,
    assume_yes: bool,
}

impl<I: BufRead, O: Write> ConsoleHost<I, O> {
    pub fn new(input: I, output: O, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

impl<I: BufRead, O: Write> Host for ConsoleHost<I, O> {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            let _ = writeln!(self.output, "{prompt} [y/N] y (--yes)");
            return true;
        }
        let _ = write!(self.output, "{prompt} [y/N] ");
        let _ = self.output.flush();
        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn notify(&mut self, notice: Notice) {
        let _ = writeln!(self.output, "{notice}");
    }

    fn follow(&mut self, runner: &dyn CommandRunner, inv: &Invocation) -> Result<RunStatus> {
        runner.attach(inv)
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        crate::browser::open_url(url)
    }
}
