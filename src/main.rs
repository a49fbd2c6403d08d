use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use seclog_audit_tools::audit::normalizer::StatusStyle;
use seclog_audit_tools::audit::pipeline::{MissingStatusPolicy, OutcomeScope};
use seclog_audit_tools::audit::scheduler::SourceOrder;
use seclog_audit_tools::commands;
use seclog_audit_tools::commands::audit_run::{RunOptions, SourceSelection};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seclog-audit")]
#[command(about = "Security event log audit tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit Kerberos and NTLM authentication activity
    ///
    /// Default event IDs: 4768 (ticket granted), 4771 (pre-authentication
    /// failed), 4776 (credential validation). 4624/4625 can be added with --kinds.
    Auth {
        #[command(flatten)]
        common: CommonArgs,

        /// Also write a per-account summary CSV
        #[arg(long)]
        summary: bool,

        /// Render status codes as raw hex or with a description
        #[arg(long, value_enum, default_value = "raw")]
        status_style: StatusStyleArg,

        /// Keep only successful or only failed attempts
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,

        /// Keep or drop credential validations that carry no status
        #[arg(long, value_enum, default_value = "include")]
        missing_status: MissingStatusArg,
    },

    /// Audit account creation, enabling, disabling and deletion
    ///
    /// Default event IDs: 4720, 4722, 4725, 4726. 4740/4767 can be added with --kinds.
    Lifecycle {
        #[command(flatten)]
        common: CommonArgs,

        /// Report timestamps at this UTC offset (e.g. +02:00) instead of local time
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<String>,
    },

    /// Generate shell completion scripts
    ///
    /// Output the completion script to stdout. Redirect to a file and source it
    /// in your shell configuration.
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// First day of the range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    start: String,

    /// Last day of the range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    end: String,

    /// Accounts to audit (comma-separated); all accounts when omitted
    #[arg(long, value_delimiter = ',')]
    accounts: Vec<String>,

    /// File with one account per line ('#' starts a comment)
    #[arg(long)]
    accounts_file: Option<PathBuf>,

    /// Event IDs to collect (comma-separated)
    #[arg(long, value_delimiter = ',')]
    kinds: Vec<u32>,

    /// Directory holding Archive-Security-*.jsonl segments
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Live security log export
    #[arg(long)]
    live: Option<PathBuf>,

    /// Which sources to read
    #[arg(long, value_enum, default_value = "both")]
    sources: SourcesArg,

    /// Read archives oldest or newest first
    #[arg(long, value_enum, default_value = "oldest")]
    order: OrderArg,

    /// Directory for CSV artifacts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write one CSV with the rows of every source
    #[arg(long)]
    consolidated: bool,

    /// Do not show progress spinners
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourcesArg {
    Live,
    Archives,
    Both,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Oldest,
    Newest,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusStyleArg {
    Raw,
    Described,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    All,
    Success,
    Failure,
}

#[derive(Clone, Copy, ValueEnum)]
enum MissingStatusArg {
    Include,
    Exclude,
}

impl CommonArgs {
    fn into_options(self) -> RunOptions {
        RunOptions {
            start: self.start,
            end: self.end,
            accounts: self.accounts,
            accounts_file: self.accounts_file,
            kinds: self.kinds,
            archive_dir: self.archive_dir,
            live: self.live,
            sources: match self.sources {
                SourcesArg::Live => SourceSelection::Live,
                SourcesArg::Archives => SourceSelection::Archives,
                SourcesArg::Both => SourceSelection::Both,
            },
            order: match self.order {
                OrderArg::Oldest => SourceOrder::OldestFirst,
                OrderArg::Newest => SourceOrder::NewestFirst,
            },
            output_dir: self.output_dir,
            consolidated: self.consolidated,
            show_progress: !self.quiet,
            ..RunOptions::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Auth {
            common,
            summary,
            status_style,
            scope,
            missing_status,
        } => {
            let options = RunOptions {
                summary,
                status_style: match status_style {
                    StatusStyleArg::Raw => StatusStyle::Raw,
                    StatusStyleArg::Described => StatusStyle::Described,
                },
                scope: match scope {
                    ScopeArg::All => OutcomeScope::All,
                    ScopeArg::Success => OutcomeScope::Success,
                    ScopeArg::Failure => OutcomeScope::Failure,
                },
                missing_status: match missing_status {
                    MissingStatusArg::Include => MissingStatusPolicy::Include,
                    MissingStatusArg::Exclude => MissingStatusPolicy::Exclude,
                },
                ..common.into_options()
            };
            commands::auth_audit::run(&options)
        }
        Commands::Lifecycle { common, utc_offset } => {
            let options = RunOptions {
                utc_offset,
                ..common.into_options()
            };
            commands::lifecycle_audit::run(&options)
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "seclog-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}
