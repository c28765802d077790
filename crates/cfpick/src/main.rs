use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;

use cfpick::actions::{Command as Action, Outcome, dispatch};
use cfpick::config::{self, Settings};
use cfpick::console::ConsoleHost;
use cfpick::listing::{Controller, Listing};
use cfpick::logging::{self, LogTarget};
use cfpick::parse::ParseReport;
use cfpick::runner::ProcessRunner;
use cfpick::ui::{self, Screen};
use cfpick::{Error, Result, git};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Config file (default: ./.cfpick.toml, then ~/.config/cfpick/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fuzzy picker over recent builds (default)
    Builds {
        /// Branch to list builds for (default: current git branch)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Fuzzy picker over pipelines
    Pipelines,
    /// Print a parsed listing without the terminal UI
    List {
        kind: Kind,
        #[arg(long)]
        branch: Option<String>,
        /// Emit records as JSON
        #[arg(long)]
        json: bool,
        /// Also print rows that could not be parsed
        #[arg(long)]
        report: bool,
    },
    /// Run one build action without the terminal UI
    Act {
        action: ActKind,
        /// Build id as shown by `list builds`
        id: String,
        #[arg(long)]
        branch: Option<String>,
        /// Answer yes to the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Print the resolved settings as TOML
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Builds,
    Pipelines,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActKind {
    Terminate,
    Restart,
    Logs,
    Open,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (settings, source) =
        config::resolve(args.config.as_deref()).map_err(|e| e.context("settings"))?;

    let cmd = args.cmd.unwrap_or(Command::Builds { branch: None });
    let interactive = matches!(cmd, Command::Builds { .. } | Command::Pipelines);
    logging::init(&settings.log, LogTarget::for_mode(&settings.log, interactive))?;
    match &source {
        Some(path) => tracing::debug!(config = %path.display(), "settings loaded"),
        None => tracing::debug!("no config file; using defaults"),
    }

    match cmd {
        Command::Builds { branch } => {
            let ctl = controller(&settings, branch.as_deref());
            ui::run_tui(&ctl, Screen::Builds)
        }
        Command::Pipelines => {
            let ctl = controller(&settings, None);
            ui::run_tui(&ctl, Screen::Pipelines)
        }
        Command::List {
            kind,
            branch,
            json,
            report,
        } => cmd_list(&settings, kind, branch.as_deref(), json, report),
        Command::Act {
            action,
            id,
            branch,
            yes,
        } => cmd_act(&settings, action, &id, branch.as_deref(), yes),
        Command::Config => cmd_config(&settings),
    }
}

fn controller(settings: &Settings, branch_flag: Option<&str>) -> Controller<ProcessRunner> {
    let runner = ProcessRunner::with_timeout(settings.timeout());
    let branch = git::resolve_branch(branch_flag, settings.builds.branch.as_deref(), &runner);
    Controller::from_settings(runner, settings, branch)
}

fn cmd_list(
    settings: &Settings,
    kind: Kind,
    branch: Option<&str>,
    json: bool,
    report: bool,
) -> Result<()> {
    let ctl = controller(settings, branch);
    match kind {
        Kind::Builds => {
            let listing = ctl.fetch_builds();
            print_listing(&listing, json, report, |b| {
                format!(
                    "{} {:<24}  {:<11}  {:<25}  {}",
                    b.status.glyph(),
                    b.id,
                    b.status.as_str(),
                    b.started,
                    b.pipeline
                )
            })
        }
        Kind::Pipelines => {
            let listing = ctl.fetch_pipelines();
            print_listing(&listing, json, report, |p| p.full_name())
        }
    }
}

fn print_listing<T: serde::Serialize>(
    listing: &Listing<T>,
    json: bool,
    report: bool,
    row: impl Fn(&T) -> String,
) -> Result<()> {
    if let Some(err) = &listing.error {
        return Err(Error::msg(format!("listing failed ({}): {err}", listing.scope)));
    }
    if json {
        println!("{}", serde_json::to_string_pretty(listing.records())?);
    } else {
        for r in listing.records() {
            println!("{}", row(r));
        }
    }
    if report {
        print_report(&listing.report);
    }
    Ok(())
}

fn print_report<T>(report: &ParseReport<T>) {
    eprintln!("{}", report.summary());
    for m in &report.malformed {
        eprintln!("  line {}: {} | {}", m.line_no, m.reason, m.line);
    }
}

fn cmd_act(
    settings: &Settings,
    action: ActKind,
    id: &str,
    branch: Option<&str>,
    yes: bool,
) -> Result<()> {
    let ctl = controller(settings, branch);
    let listing = ctl.fetch_builds();
    if let Some(err) = &listing.error {
        return Err(Error::msg(format!("listing failed ({}): {err}", listing.scope)));
    }
    let build = listing
        .find(id)
        .cloned()
        .ok_or_else(|| Error::msg(format!("build {id} not found ({})", listing.scope)))?;

    let cmd = match action {
        ActKind::Terminate => Action::Terminate(build),
        ActKind::Restart => Action::Restart(build),
        ActKind::Logs => Action::FollowLogs(build),
        ActKind::Open => Action::OpenBuild(build),
    };
    let name = cmd.name();

    let stdin = io::stdin();
    let mut host = ConsoleHost::new(stdin.lock(), io::stdout(), yes);
    match dispatch(&ctl, cmd, &mut host) {
        Outcome::Executed | Outcome::Opened(_) => Ok(()),
        Outcome::Followed(status) if status.success() => Ok(()),
        Outcome::Followed(status) => Err(Error::msg(format!("{name} ended: {status}"))),
        Outcome::Declined => Err(Error::msg(format!("{name} declined"))),
        Outcome::Refused => Err(Error::msg(format!("{name} refused"))),
        Outcome::Failed(reason) => Err(Error::msg(format!("{name} failed: {reason}"))),
        Outcome::Builds(_) | Outcome::Pipelines(_) => Ok(()),
    }
}

fn cmd_config(settings: &Settings) -> Result<()> {
    print!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
