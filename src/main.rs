use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use refiner::config::Config;
use refiner::ui::UiMode;

mod cmd;

#[derive(Parser)]
#[command(name = "refiner")]
#[command(
    version,
    about = "Refine a question through a panel of simulated expert personas"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Base URL of the reasoning backend. Overrides refiner.toml and REFINER_BACKEND_URL.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Timeout in seconds for each backend call. Overrides refiner.toml and REFINER_TIMEOUT_SECS.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// UI output mode: full, minimal, json
    #[arg(long, default_value = "full", global = true)]
    pub ui: String,

    /// Write JSON logs to a daily-rolling file in this directory instead of stderr
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refine a question and print the result
    Ask {
        /// The question to refine (truncated to 500 characters)
        question: String,

        /// Number of cycles to run, each feeding the last refined question back in
        #[arg(short = 'n', long, default_value = "1")]
        iterations: u32,

        /// Also show the rationale, individual answers and new dimensions
        #[arg(long)]
        details: bool,
    },
    /// Refine questions in an interactive loop
    Interactive,
    /// List the progress stages shown while a question is processed
    Stages,
    /// Check that the reasoning backend is reachable
    Ping,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default refiner.toml file
    Init,
}

impl Cli {
    fn config(&self, project_dir: PathBuf) -> Result<Config> {
        Config::new(
            project_dir,
            self.verbose,
            UiMode::parse(&self.ui),
            self.backend_url.clone(),
            self.timeout,
        )
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = refiner::logging::init(cli.verbose, cli.log_dir.as_deref())?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Ask {
            question,
            iterations,
            details,
        } => {
            let config = cli.config(project_dir)?;
            let succeeded = cmd::cmd_ask(&config, question, *iterations, *details).await?;
            if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Interactive => {
            let config = cli.config(project_dir)?;
            cmd::cmd_interactive(&config).await?;
        }
        Commands::Stages => cmd::cmd_stages(UiMode::parse(&cli.ui))?,
        Commands::Ping => {
            let config = cli.config(project_dir)?;
            if !cmd::cmd_ping(&config).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Config { command } => cmd::cmd_config(
            &project_dir,
            cli.backend_url.clone(),
            cli.timeout,
            command.clone(),
        )?,
    }

    Ok(ExitCode::SUCCESS)
}
