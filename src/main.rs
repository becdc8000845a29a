use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

use gitsync::config::parse_interval;
use gitsync::{
    logging, AutoPushScheduler, GitHubConfig, GitHubStore, MemoryBrowser, OperationResult,
    Settings, SyncEngine,
};

#[derive(Parser)]
#[command(name = "gitsync")]
#[command(about = "Sync browser windows, tab groups and tabs through a GitHub repository", version)]
#[command(after_help = "The browser session is read from and written to a JSON file (--session).
Credentials can also come from GITSYNC_OWNER, GITSYNC_REPO and GITSYNC_TOKEN,
optionally via a .env file in the working directory.")]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = "gitsync.toml")]
    config: PathBuf,

    /// Browser session file
    #[arg(long, global = true, default_value = "session.json")]
    session: PathBuf,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the current session to the repository
    Push,

    /// Replace the current session with the repository's document
    Pull,

    /// Publish an empty document
    Clear,

    /// Check that the configured repository is reachable
    TestConnection,

    /// Push on the configured interval until interrupted
    Daemon {
        /// Minutes between pushes, overrides the settings file
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,

    /// Update and save settings
    Set {
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        repo: Option<String>,

        #[arg(long)]
        token: Option<String>,

        /// Comma-separated URL prefixes never pushed
        #[arg(long)]
        blacklist: Option<String>,

        /// Minutes between automatic pushes, 0 disables
        #[arg(long)]
        interval: Option<String>,
    },

    /// Remove the stored token
    ClearToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_dir.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Push => {
            let engine = engine(&cli.config, &cli.session)?;
            println!("{}", "Pushing...".cyan().bold());
            report("Push", "Push complete!", engine.push().await);
        }

        Commands::Pull => {
            let engine = engine(&cli.config, &cli.session)?;
            println!("{}", "Pulling...".cyan().bold());
            let result = engine.pull().await;
            // a partial restore is kept, like in a real browser
            engine.host().save(&cli.session)?;
            report("Pull", "Pull complete!", result);
        }

        Commands::Clear => {
            let engine = engine(&cli.config, &cli.session)?;
            report(
                "Clear",
                "Remote tabs file has been cleared.",
                engine.clear_remote().await,
            );
        }

        Commands::TestConnection => {
            let engine = engine(&cli.config, &cli.session)?;
            report(
                "Connection",
                "Connection successful!",
                engine.check_connection().await,
            );
        }

        Commands::Daemon { interval } => {
            let engine = Arc::new(engine(&cli.config, &cli.session)?);
            let minutes = match interval {
                Some(value) => parse_interval(&value)?,
                None => engine.settings().auto_push_interval,
            };
            if minutes == 0 {
                println!("{}", "Auto Push is disabled (interval is 0).".yellow());
                return Ok(());
            }

            let mut scheduler = AutoPushScheduler::for_engine(engine);
            scheduler.configure(minutes);
            println!(
                "{}",
                format!("Pushing every {} minute(s), Ctrl+C to stop", minutes)
                    .cyan()
                    .bold()
            );
            tokio::signal::ctrl_c().await?;
            scheduler.cancel();
            println!("{}", "Stopped".green());
        }

        Commands::Config { action } => config_command(&cli.config, action)?,
    }

    Ok(())
}

fn engine(config: &Path, session: &Path) -> Result<SyncEngine<GitHubStore, MemoryBrowser>> {
    let settings = Settings::load(config)?;
    let store = GitHubStore::new(GitHubConfig::from_settings(&settings))?;
    let browser = MemoryBrowser::load(session)?;
    Ok(SyncEngine::new(settings, store, browser))
}

fn report(operation: &str, message: &str, result: OperationResult) {
    match result.error {
        None => println!("{} {}", "✓".green(), message.green()),
        Some(error) => eprintln!(
            "{} {}",
            "✗".red(),
            format!("{} failed: {}", operation, error).red()
        ),
    }
}

fn config_command(path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load(path)?;
            println!("{}", "GitSync settings".cyan().bold());
            println!("  owner:      {}", settings.github_owner.bright_white());
            println!("  repository: {}", settings.github_repo.bright_white());
            println!("  token:      {}", settings.masked_token());
            println!("  blacklist:  {}", settings.url_blacklist);
            println!("  auto push:  {} min", settings.auto_push_interval);
            println!("  api:        {}", settings.api_url);
            println!(
                "  document:   {}@{}",
                settings.document_path, settings.branch
            );
        }

        ConfigAction::Set {
            owner,
            repo,
            token,
            blacklist,
            interval,
        } => {
            let mut settings = Settings::from_file(path)?;
            if let Some(owner) = owner {
                settings.github_owner = owner.trim().to_string();
            }
            if let Some(repo) = repo {
                settings.github_repo = repo.trim().to_string();
            }
            if let Some(token) = token {
                settings.github_token = token.trim().to_string();
            }
            if let Some(blacklist) = blacklist {
                settings.url_blacklist = blacklist;
            }
            if let Some(interval) = interval {
                settings.auto_push_interval = parse_interval(&interval)?;
            }
            settings.save(path)?;
            println!("{} {}", "✓".green(), "Settings saved!".green());
        }

        ConfigAction::ClearToken => {
            let mut settings = Settings::from_file(path)?;
            settings.clear_token();
            settings.write(path)?;
            println!("{} {}", "✓".green(), "Token cleared".green());
        }
    }
    Ok(())
}
