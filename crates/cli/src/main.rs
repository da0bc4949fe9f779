//! forksync command-line tool.
//!
//! Pulls commits from the upstream template a project was generated from,
//! letting the user pick which ones to replay.

mod check;
mod init;
mod prompt;
mod pull;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use forksync_core::bump::PackageManager;
use forksync_core::config::SyncConfig;
use forksync_core::errors::SyncError;
use forksync_core::{CommandRunner, GitClient, TemplateSync, Verbosity};

/// Exit status for a template remote that could not be added or fetched.
const EXIT_REMOTE_SETUP: u8 = 2;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Pull updates from the template repository this project was generated from.
#[derive(Parser, Debug)]
#[command(name = "forksync", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More output; repeat for trace logging.
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only print errors and prompts.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Choose and apply template updates.
    Pull(TemplateArgs),

    /// List pending template updates without changing anything.
    Check {
        #[command(flatten)]
        template: TemplateArgs,

        /// Print the updates as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./forksync.toml")]
        output: PathBuf,
    },
}

/// Overrides for the `[template]` and `[apply]` config sections.
#[derive(Args, Debug)]
struct TemplateArgs {
    /// Template repository URL.
    url: Option<String>,

    /// Template branch to follow.
    #[arg(short, long)]
    branch: Option<String>,

    /// Skip commits whose subject matches this regular expression.
    #[arg(short = 'x', long)]
    exclude: Option<String>,

    /// Package manager for dependency bumps: yarn, npm or pnpm.
    #[arg(long)]
    package_manager: Option<PackageManager>,
}

impl TemplateArgs {
    fn apply_to(self, config: &mut SyncConfig) {
        if let Some(url) = self.url {
            config.template.url = url;
        }
        if let Some(branch) = self.branch {
            config.template.branch = branch;
        }
        if let Some(exclude) = self.exclude {
            config.template.exclude = exclude;
        }
        if let Some(pm) = self.package_manager {
            config.apply.package_manager = pm;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::Status::Failed.line(&format!("{:#}", e)));
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Process exit status for a failed run: 2 when the template remote could
/// not be set up, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SyncError>() {
        Some(SyncError::RemoteSetup { .. }) => EXIT_REMOTE_SETUP,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { output } = &cli.command {
        init_logging(&cli, "warn");
        return init::run_init(output);
    }

    let (mut config, path) = load_config(cli.config.as_deref())?;
    init_logging(&cli, &config.output.log_level);
    if let Some(path) = &path {
        tracing::debug!(path = %path.display(), "using configuration file");
    }

    let verbosity = if cli.verbose > 0 {
        Verbosity::Debug
    } else if cli.quiet || !config.output.stream_commands {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    let git = GitClient::new(CommandRunner::new(verbosity));

    match cli.command {
        Commands::Pull(args) => {
            args.apply_to(&mut config);
            let sync = TemplateSync::new(git, sync_options(&config)?);
            pull::run_pull(sync, verbosity == Verbosity::Quiet).await
        }
        Commands::Check { template, json } => {
            template.apply_to(&mut config);
            let sync = TemplateSync::new(git, sync_options(&config)?);
            check::run_check(sync, json).await
        }
        Commands::Init { .. } => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Config & logging helpers
// ---------------------------------------------------------------------------

fn load_config(explicit: Option<&Path>) -> Result<(SyncConfig, Option<PathBuf>)> {
    SyncConfig::discover(explicit).context("failed to load configuration file")
}

fn sync_options(config: &SyncConfig) -> Result<forksync_core::SyncOptions> {
    if config.template.url.trim().is_empty() {
        anyhow::bail!(
            "no template URL: pass it as an argument or set [template] url in forksync.toml"
        );
    }
    config.sync_options().context("invalid configuration")
}

/// `RUST_LOG` wins; otherwise `-v`/`-q`, then the configured level.
fn init_logging(cli: &Cli, configured: &str) {
    let level = match (cli.verbose, cli.quiet) {
        (0, true) => "error",
        (0, false) => configured,
        (1, _) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
