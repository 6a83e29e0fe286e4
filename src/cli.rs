use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

/// Which service holds the destination tree. The source is always Drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DestBackendKind {
    Drive,
    Box,
}

/// The one primary action selected for this run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Setup,
    Status,
    PrintSource,
    PrintDest,
    Update,
    Check,
}

#[derive(Parser, Debug)]
#[command(name = "remeta")]
#[command(about = "Repair file metadata after a bulk cloud transfer", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["setup", "status", "print_source", "print_dest", "update", "check"])
))]
#[command(after_help = "EXAMPLES:
    # One-time: connect the source and destination accounts
    remeta --setup

    # Which accounts are connected?
    remeta --status

    # Inspect the trees before touching anything
    remeta --print-source -r \"Projects/2019\" --verbose
    remeta --print-dest --xml -o dest-tree.xml

    # Preview the metadata overlay without writing
    remeta --check -r \"Projects/2019\" --report

    # Apply it, translating owners into the new organization's domain
    remeta --update -r \"Projects/2019\" --update-owner --new-domain new.example

For more information: https://github.com/remeta/remeta")]
pub struct Cli {
    /// Connect both accounts and store their sessions
    #[arg(short = 'S', long)]
    pub setup: bool,

    /// Report which accounts currently hold a stored session
    #[arg(short = 's', long)]
    pub status: bool,

    /// Print the source tree
    #[arg(short = 'p', long)]
    pub print_source: bool,

    /// Print the destination tree
    #[arg(short = 'P', long)]
    pub print_dest: bool,

    /// Write source metadata onto matched destination nodes
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Dry-run: match and report, but write nothing
    #[arg(short = 'n', long)]
    pub check: bool,

    /// Root folder on the source side (e.g. "Projects/2019"); defaults to
    /// the account root
    #[arg(short = 'r', long)]
    pub source_root: Option<String>,

    /// Root folder on the destination side; defaults to the account root
    #[arg(short = 'R', long)]
    pub dest_root: Option<String>,

    /// Destination service (drive or box); overrides the config file
    #[arg(long, value_enum)]
    pub dest_backend: Option<DestBackendKind>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only show errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Write rendered output to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Render trees and match results as XML
    #[arg(long)]
    pub xml: bool,

    /// Print the full match/duplicate/miss report after an update or check
    #[arg(short = 'a', long)]
    pub report: bool,

    /// Transfer ownership of matched nodes to the source owner
    #[arg(long)]
    pub update_owner: bool,

    /// Re-create non-owner permissions from the source set
    #[arg(long)]
    pub update_permissions: bool,

    /// Destination email domain; enables principal translation
    /// (e.g. "new.example" maps alice@old.example to alice@new.example)
    #[arg(short = 'd', long)]
    pub new_domain: Option<String>,

    /// Box OAuth access token, consumed by --setup when the destination is
    /// Box (obtaining it is up to your Box admin tooling)
    #[arg(long, env = "REMETA_BOX_TOKEN", hide_env_values = true)]
    pub box_token: Option<String>,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.setup {
            Action::Setup
        } else if self.status {
            Action::Status
        } else if self.print_source {
            Action::PrintSource
        } else if self.print_dest {
            Action::PrintDest
        } else if self.update {
            Action::Update
        } else {
            Action::Check
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let is_run = matches!(self.action(), Action::Update | Action::Check);

        if self.report && !is_run {
            anyhow::bail!("--report only applies to --update or --check runs");
        }
        if (self.update_owner || self.update_permissions) && !is_run {
            anyhow::bail!("--update-owner/--update-permissions only apply to --update or --check runs");
        }
        if self.xml && matches!(self.action(), Action::Setup | Action::Status) {
            anyhow::bail!("--xml only applies to tree printing and run reports");
        }
        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
