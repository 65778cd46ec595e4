//! Command-line interface for crosstalk
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Dual-source speech arbitration for meeting transcription
#[derive(Parser, Debug)]
#[command(
    name = "crosstalk",
    version,
    about = "Dual-source speech arbitration for meeting transcription"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: source switches, -vv: energy levels)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Microphone device (e.g., hw:0 or pipewire)
    #[arg(long, value_name = "DEVICE")]
    pub local_device: Option<String>,

    /// System-audio device (default: auto-detect a monitor source)
    #[arg(long, value_name = "DEVICE")]
    pub ambient_device: Option<String>,

    /// RMS threshold above which a source counts as speaking
    #[arg(long, value_name = "LEVEL")]
    pub threshold: Option<f32>,

    /// Minimum interval between source switches. Examples: 750ms, 1s
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_ms)]
    pub hold: Option<u64>,

    /// Silence duration before an utterance commits. Examples: 1200ms, 2s
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_ms)]
    pub silence_timeout: Option<u64>,

    /// Hard cap on utterance duration. Examples: 15s, 30s
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_ms)]
    pub max_utterance: Option<u64>,

    /// Emit committed chunks as JSON lines instead of plain text
    #[arg(long)]
    pub json: bool,
}

/// Parse a duration string into milliseconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (milliseconds), single-unit (`750ms`, `2s`), and compound (`1m30s`).
fn parse_duration_ms(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → milliseconds
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(ms);
    }
    humantime::parse_duration(s)
        .map(|d: Duration| d.as_millis() as u64)
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio devices (monitor sources annotated)
    Devices,

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the active configuration file path
    Path,
    /// Print an annotated default configuration template
    Dump,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_no_args() {
        let cli = Cli::parse_from(["crosstalk"]);
        assert!(cli.command.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_parses_devices_subcommand() {
        let cli = Cli::parse_from(["crosstalk", "devices"]);
        assert!(matches!(cli.command, Some(Commands::Devices)));
    }

    #[test]
    fn test_cli_parses_config_dump() {
        let cli = Cli::parse_from(["crosstalk", "config", "dump"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Dump
            })
        ));
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from([
            "crosstalk",
            "--local-device",
            "pipewire",
            "--threshold",
            "0.05",
            "--hold",
            "750ms",
            "--json",
        ]);
        assert_eq!(cli.local_device.as_deref(), Some("pipewire"));
        assert_eq!(cli.threshold, Some(0.05));
        assert_eq!(cli.hold, Some(750));
        assert!(cli.json);
    }

    #[test]
    fn test_parse_duration_ms_formats() {
        assert_eq!(parse_duration_ms("750"), Ok(750));
        assert_eq!(parse_duration_ms("750ms"), Ok(750));
        assert_eq!(parse_duration_ms("2s"), Ok(2000));
        assert_eq!(parse_duration_ms("1m30s"), Ok(90_000));
        assert!(parse_duration_ms("not a duration").is_err());
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::parse_from(["crosstalk", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
