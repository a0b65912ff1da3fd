//! CLI module for chapsplit.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_size, format_timestamp, Output};

use clap::{Parser, Subcommand};

/// chapsplit - split chaptered videos into per-chapter audio clips
///
/// Downloads a video, extracts its audio track and cuts one clip per chapter
/// marker. Work is kept on disk, so repeated runs only do what is missing.
#[derive(Parser, Debug)]
#[command(name = "chapsplit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CHAPSPLIT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Process a video and wait for its clips
    Process {
        /// YouTube URL/ID or other video page URL
        url: String,
    },

    /// Show the job for a URL
    Status {
        /// Video URL
        url: String,

        /// Print the job as JSON
        #[arg(long)]
        json: bool,
    },

    /// List ready clips for a URL, or all jobs if no URL is given
    List {
        /// Video URL
        url: Option<String>,
    },

    /// Write a zip of a job's ready clips
    Archive {
        /// Video URL
        url: String,

        /// Output file (defaults to <identity>.zip)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start the HTTP server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let cli = Cli::try_parse_from(["chapsplit", "-vv", "process", "https://youtu.be/xETEYG-az9E"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Process { ref url } if url.ends_with("xETEYG-az9E")));
    }

    #[test]
    fn test_parse_archive_output() {
        let cli = Cli::try_parse_from(["chapsplit", "archive", "xETEYG-az9E", "-o", "talk.zip"]).unwrap();
        match cli.command {
            Commands::Archive { url, output } => {
                assert_eq!(url, "xETEYG-az9E");
                assert_eq!(output.as_deref(), Some("talk.zip"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_serve_defaults_come_from_settings() {
        let cli = Cli::try_parse_from(["chapsplit", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { host: None, port: None }));
    }
}
