//! Command definitions for the TubeSleep CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::PlayerEvent;

// ============================================================================
// CLI Structure
// ============================================================================

/// TubeSleep - fall asleep to your playlist
#[derive(Parser, Debug)]
#[command(
    name = "tubesleep",
    version,
    about = "Playlist player with a sleep timer",
    long_about = "Plays a looping playlist of video/audio links and stops it when the sleep \
                  timer runs out, leaving a night clock on screen.\n\
                  Run 'tubesleep daemon' first; every other command talks to it.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.tubesleep/config.json)
    #[arg(long, global = true, env = "TUBESLEEP_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Daemon socket (default: ~/.tubesleep/tubesleep.sock)
    #[arg(long, global = true, env = "TUBESLEEP_SOCKET", value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the daemon in the foreground
    Daemon,

    /// Add a link to the end of the playlist
    Add(AddArgs),

    /// Remove an entry by id
    Remove {
        /// Entry id (see 'list')
        id: String,
    },

    /// Remove every entry
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the playlist
    List,

    /// Play an entry by id or 1-based position
    Play {
        /// Entry id or position in 'list'
        #[arg(value_parser = parse_play_target)]
        target: PlayTarget,
    },

    /// Start the sleep timer (and playback)
    Start(StartArgs),

    /// Cancel the sleep timer and stop playback
    Cancel,

    /// Toggle mute
    Mute,

    /// Leave the night clock
    Wake,

    /// Show the session status
    Status,

    /// Show what the player should be doing
    Directive,

    /// Report a player callback (used by player integrations)
    #[command(subcommand)]
    Player(PlayerCommand),

    /// Ask for music suggestions
    Suggest(SuggestArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Arguments for the add command
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Link to add
    #[arg(value_parser = validate_url)]
    pub url: String,

    /// Display title (looked up for YouTube links when omitted)
    #[arg(short, long)]
    pub title: Option<String>,
}

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Timer length in minutes (1-720, daemon default when omitted)
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=720)
    )]
    pub minutes: Option<u32>,
}

/// Arguments for the suggest command
#[derive(Args, Debug, Clone)]
pub struct SuggestArgs {
    /// What to listen to
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Add the N-th suggestion to the playlist
    #[arg(short, long, value_name = "N")]
    pub add: Option<usize>,
}

impl SuggestArgs {
    /// The query words joined with spaces.
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

/// Player callbacks
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// A clip is actually playing
    Started,
    /// The clip finished
    Ended,
    /// Paused in the player
    Paused,
    /// Resumed in the player
    Resumed,
    /// The player failed
    Error {
        /// Player error code
        #[arg(long, allow_negative_numbers = true)]
        code: i32,
    },
}

impl PlayerCommand {
    pub fn to_event(self) -> PlayerEvent {
        match self {
            PlayerCommand::Started => PlayerEvent::Started,
            PlayerCommand::Ended => PlayerEvent::Ended,
            PlayerCommand::Paused => PlayerEvent::Paused,
            PlayerCommand::Resumed => PlayerEvent::Resumed,
            PlayerCommand::Error { code } => PlayerEvent::Error { code },
        }
    }
}

/// Entry reference accepted by `play`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    /// 1-based position in the playlist
    Position(usize),
    /// Entry id
    Id(String),
}

// ============================================================================
// Validation Functions
// ============================================================================

fn validate_url(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("The link must not be empty".to_string());
    }
    Ok(s.to_string())
}

fn parse_play_target(s: &str) -> Result<PlayTarget, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Give an entry id or a position".to_string());
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(position) = s.parse::<usize>() {
            if position == 0 {
                return Err("Positions start at 1".to_string());
            }
            return Ok(PlayTarget::Position(position));
        }
    }
    Ok(PlayTarget::Id(s.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["tubesleep"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["tubesleep", "-v", "status"]);
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::Status)));
        }

        #[test]
        fn test_parse_socket_override() {
            let cli = Cli::parse_from(["tubesleep", "status", "--socket", "/tmp/x.sock"]);
            assert_eq!(cli.socket, Some(PathBuf::from("/tmp/x.sock")));
        }

        #[test]
        fn test_parse_daemon() {
            let cli = Cli::parse_from(["tubesleep", "daemon"]);
            assert!(matches!(cli.command, Some(Commands::Daemon)));
        }
    }

    // ------------------------------------------------------------------------
    // Playlist Command Tests
    // ------------------------------------------------------------------------

    mod playlist_command_tests {
        use super::*;

        #[test]
        fn test_parse_add_with_title() {
            let cli = Cli::parse_from([
                "tubesleep",
                "add",
                "https://youtu.be/abc",
                "--title",
                "Rain",
            ]);
            match cli.command {
                Some(Commands::Add(args)) => {
                    assert_eq!(args.url, "https://youtu.be/abc");
                    assert_eq!(args.title.as_deref(), Some("Rain"));
                }
                _ => panic!("Expected Add command"),
            }
        }

        #[test]
        fn test_parse_add_rejects_blank() {
            assert!(Cli::try_parse_from(["tubesleep", "add", "  "]).is_err());
        }

        #[test]
        fn test_parse_clear_yes() {
            let cli = Cli::parse_from(["tubesleep", "clear", "--yes"]);
            assert!(matches!(cli.command, Some(Commands::Clear { yes: true })));
        }

        #[test]
        fn test_parse_play_position() {
            let cli = Cli::parse_from(["tubesleep", "play", "2"]);
            match cli.command {
                Some(Commands::Play { target }) => assert_eq!(target, PlayTarget::Position(2)),
                _ => panic!("Expected Play command"),
            }
        }

        #[test]
        fn test_parse_play_id() {
            let cli = Cli::parse_from(["tubesleep", "play", "3f2a9c"]);
            match cli.command {
                Some(Commands::Play { target }) => {
                    assert_eq!(target, PlayTarget::Id("3f2a9c".to_string()))
                }
                _ => panic!("Expected Play command"),
            }
        }

        #[test]
        fn test_parse_play_zero_rejected() {
            assert!(Cli::try_parse_from(["tubesleep", "play", "0"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Timer Command Tests
    // ------------------------------------------------------------------------

    mod timer_command_tests {
        use super::*;

        #[test]
        fn test_parse_start_default() {
            let cli = Cli::parse_from(["tubesleep", "start"]);
            match cli.command {
                Some(Commands::Start(args)) => assert_eq!(args.minutes, None),
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_parse_start_minutes() {
            let cli = Cli::parse_from(["tubesleep", "start", "-m", "45"]);
            match cli.command {
                Some(Commands::Start(args)) => assert_eq!(args.minutes, Some(45)),
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_parse_start_out_of_range() {
            assert!(Cli::try_parse_from(["tubesleep", "start", "--minutes", "0"]).is_err());
            assert!(Cli::try_parse_from(["tubesleep", "start", "--minutes", "721"]).is_err());
        }

        #[test]
        fn test_parse_simple_commands() {
            let parse = |arg: &str| Cli::parse_from(["tubesleep", arg]).command;
            assert!(matches!(parse("cancel"), Some(Commands::Cancel)));
            assert!(matches!(parse("mute"), Some(Commands::Mute)));
            assert!(matches!(parse("wake"), Some(Commands::Wake)));
            assert!(matches!(parse("directive"), Some(Commands::Directive)));
            assert!(matches!(parse("list"), Some(Commands::List)));
        }
    }

    // ------------------------------------------------------------------------
    // Player and Suggest Command Tests
    // ------------------------------------------------------------------------

    mod other_command_tests {
        use super::*;

        #[test]
        fn test_parse_player_error() {
            let cli = Cli::parse_from(["tubesleep", "player", "error", "--code", "150"]);
            match cli.command {
                Some(Commands::Player(command)) => {
                    assert_eq!(command.to_event(), PlayerEvent::Error { code: 150 });
                }
                _ => panic!("Expected Player command"),
            }
        }

        #[test]
        fn test_parse_player_ended() {
            let cli = Cli::parse_from(["tubesleep", "player", "ended"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Player(PlayerCommand::Ended))
            ));
        }

        #[test]
        fn test_parse_suggest() {
            let cli = Cli::parse_from(["tubesleep", "suggest", "rain", "sounds", "--add", "2"]);
            match cli.command {
                Some(Commands::Suggest(args)) => {
                    assert_eq!(args.query_text(), "rain sounds");
                    assert_eq!(args.add, Some(2));
                }
                _ => panic!("Expected Suggest command"),
            }
        }

        #[test]
        fn test_parse_suggest_requires_query() {
            assert!(Cli::try_parse_from(["tubesleep", "suggest"]).is_err());
        }

        #[test]
        fn test_parse_completions() {
            let cli = Cli::parse_from(["tubesleep", "completions", "bash"]);
            assert!(matches!(cli.command, Some(Commands::Completions { .. })));
        }
    }
}
