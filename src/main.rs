//! TubeSleep - fall asleep to your playlist
//!
//! A daemon keeps the playlist, the sleep timer and the playback state;
//! every other command is a thin client talking to it over a Unix socket.

use anyhow::Result;
use clap::{CommandFactory, Parser};

use tubesleep::cli::{Cli, Commands, Display, IpcClient};
use tubesleep::config::AppPaths;
use tubesleep::daemon::run_daemon;
use tubesleep::lookup::{suggest_and_pick, GeminiSuggestions, NoembedTitleLookup};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    let is_daemon = matches!(cli.command, Some(Commands::Daemon));
    init_tracing(cli.verbose, is_daemon);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise the daemon logs at info, the CLI at warn, and
/// `--verbose` raises either to debug.
fn init_tracing(verbose: bool, is_daemon: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match (verbose, is_daemon) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt().with_env_filter(filter).with_target(false).compact();
    if is_daemon {
        builder.init();
    } else {
        builder.without_time().init();
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        // No command provided, show help
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        generate_completions(shell);
        return Ok(());
    }

    let paths = AppPaths::from_home()?.with_overrides(cli.socket, cli.config);
    if let Commands::Daemon = command {
        return run_daemon(&paths).await;
    }

    let client = IpcClient::new(&paths.socket);
    match command {
        Commands::Add(args) => {
            let title = match args.title {
                Some(title) => title,
                None => lookup_title(&args.url).await,
            };
            let response = client.add(&args.url, Some(title)).await?;
            Display::show_added(&response);
        }
        Commands::Remove { id } => {
            let response = client.remove(&id).await?;
            Display::show_message(&response);
        }
        Commands::Clear { yes } => {
            if !yes && !Display::confirm("Remove every entry from the playlist?")? {
                println!("Nothing removed");
                return Ok(());
            }
            let response = client.clear().await?;
            Display::show_message(&response);
        }
        Commands::List => {
            let response = client.list().await?;
            Display::show_list(&response);
        }
        Commands::Play { target } => {
            let id = client.resolve_play_target(target).await?;
            let response = client.play(&id).await?;
            Display::show_message(&response);
        }
        Commands::Start(args) => {
            let response = client.start(args.minutes).await?;
            Display::show_message(&response);
            Display::show_status(&response);
        }
        Commands::Cancel => {
            let response = client.cancel().await?;
            Display::show_message(&response);
        }
        Commands::Mute => {
            let response = client.mute().await?;
            Display::show_message(&response);
        }
        Commands::Wake => {
            let response = client.wake().await?;
            Display::show_message(&response);
        }
        Commands::Status => {
            let response = client.status().await?;
            Display::show_status(&response);
        }
        Commands::Directive => {
            let response = client.directive().await?;
            Display::show_directive(&response);
        }
        Commands::Player(player) => {
            let response = client.player(player.to_event()).await?;
            Display::show_message(&response);
        }
        Commands::Suggest(args) => {
            let provider = match GeminiSuggestions::from_env() {
                Ok(provider) => provider,
                Err(e) if e.is_missing_credentials() => {
                    println!("{}", e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let (suggestions, picked) =
                suggest_and_pick(&provider, &args.query_text(), args.add).await?;
            Display::show_suggestions(&suggestions);

            if let Some(pick) = picked {
                let response = client.add(&pick.url, Some(pick.title)).await?;
                Display::show_added(&response);
            }
        }
        Commands::Daemon | Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Title for a new entry when none was given; the link itself on any failure.
async fn lookup_title(url: &str) -> String {
    match NoembedTitleLookup::new() {
        Ok(lookup) => lookup.resolve_title(url).await,
        Err(e) => {
            tracing::debug!(error = %e, "Title lookup unavailable");
            url.to_string()
        }
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["tubesleep"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["tubesleep", "status"]);
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["tubesleep", "--verbose", "status"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn test_lookup_title_non_youtube() {
        assert_eq!(
            lookup_title("https://example.com/a.mp3").await,
            "https://example.com/a.mp3"
        );
    }
}
