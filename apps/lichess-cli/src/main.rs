mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{CliConfig, Overrides};
use futures_util::StreamExt;
use lichess_sdk::{Client, ListOptions, PageCursor, PagerConfig};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Query the lichess API from the command line
#[derive(Parser)]
#[command(name = "lichess")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Personal API token (overrides config)
    #[arg(long, env = "LICHESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Public profile of a user
    User { username: String },
    /// Profile, email and preferences of the token owner
    Account,
    /// Export one game
    Game { id: String },
    /// Export games of a user, one JSON document per line
    Games {
        username: String,
        /// Only games played since this timestamp (ms)
        #[arg(long)]
        since: Option<i64>,
        /// Maximum number of games
        #[arg(long)]
        max: Option<usize>,
        /// Walk the full history page by page
        #[arg(long, conflicts_with = "max")]
        all: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_overrides(Overrides {
        base_url: cli.base_url,
        token: cli.token,
    });

    if cli.print_config {
        let mut shown = config.clone();
        if shown.token.is_some() {
            shown.token = Some("***".to_owned());
        }
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no command given, see --help");
    };

    let client = config.client()?;
    let cancel = CancellationToken::new();

    let cancel_for_signals = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
        }
        cancel_for_signals.cancel();
    });

    run(&client, &cancel, command).await
}

async fn run(client: &Client, cancel: &CancellationToken, command: Commands) -> Result<()> {
    match command {
        Commands::User { username } => print_json(&client.users().get(cancel, &username).await?),
        Commands::Account => {
            let account = client.account();
            print_json(&account.profile(cancel).await?)?;
            print_json(&serde_json::json!({ "email": account.email(cancel).await? }))?;
            print_json(&account.preferences(cancel).await?)
        }
        Commands::Game { id } => print_json(&client.games().get(cancel, &id).await?),
        Commands::Games {
            username,
            since,
            max,
            all,
        } => {
            if all {
                let config = PagerConfig::default()
                    .starting_at(PageCursor::new(since.unwrap_or_default()));
                let mut games = client.games().all_with(cancel, &username, config);
                let mut count = 0_usize;
                while let Some(game) = games.next().await {
                    print_json(&game?)?;
                    count += 1;
                }
                tracing::info!(count, "exported games");
                return Ok(());
            }

            let options = ListOptions {
                since,
                max,
                ..ListOptions::default()
            };
            for game in client.games().list(cancel, &username, &options).await? {
                print_json(&game)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_games_all_conflicts_with_max() {
        let result = Cli::try_parse_from(["lichess", "games", "thibault", "--all", "--max", "5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["lichess", "-vv", "user", "thibault"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Commands::User { username }) if username == "thibault"));
    }
}
