//! ftbot CLI - post new good first issues to Twitter
//!
//! Polls GitHub for recently opened beginner-friendly issues and posts each
//! one exactly once.

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ftbot_core::Config;

use commands::{OnceArgs, RunArgs, SecretsCommand, SeedArgs, StatusArgs};

/// ftbot: post new good first issues to Twitter
#[derive(Parser, Debug)]
#[command(name = "ftbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/ftbot/config.toml)
    #[arg(short, long, global = true, env = "FTBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Post-record database (overrides config and env)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Manage the secrets file
    #[command(subcommand)]
    Secrets(SecretsCommand),

    #[command(flatten)]
    Bot(BotCommand),
}

/// Commands that read the configuration file
#[derive(Subcommand, Debug)]
enum BotCommand {
    /// Poll and post until interrupted
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Run a single poll cycle
    Once(OnceArgs),

    /// Record current issues as posted without posting them
    Seed(SeedArgs),

    /// Show recently posted issues
    Status(StatusArgs),

    /// Show effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("ftbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Secrets(command)) => {
            let _log_guard = logging::init(cli.verbose, None);
            command.execute()?;
        }
        Some(Commands::Bot(command)) => {
            run_bot_command(command, cli.config, cli.db, cli.verbose).await?;
        }
        None => {
            println!("ftbot - post new good first issues to Twitter");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

async fn run_bot_command(
    command: BotCommand,
    config_path: Option<PathBuf>,
    db: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let config =
        Config::load_with_overrides(config_path.as_deref())?.with_cli_overrides(None, None, db);

    let _log_guard = logging::init(verbose, config.logging.file.as_deref());

    tracing::debug!(
        labels = ?config.github.labels,
        interval = %humantime::format_duration(config.poll.interval),
        "Configuration loaded"
    );

    match command {
        BotCommand::Run(args) => args.execute(config).await?,
        BotCommand::Once(args) => args.execute(config).await?,
        BotCommand::Seed(args) => args.execute(config).await?,
        BotCommand::Status(args) => args.execute(&config).await?,
        BotCommand::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            println!();
            match config_path.or_else(Config::default_config_path) {
                Some(path) if path.exists() => println!("# Config file: {}", path.display()),
                Some(path) => println!("# Config file: {} (not found - using defaults)", path.display()),
                None => println!("# No config directory available - using defaults"),
            }
        }
    }

    Ok(())
}
