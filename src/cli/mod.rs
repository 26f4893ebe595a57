//! CLI interface for Tides

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tides::synth::RunMode;

/// Asymmetric slope generator: LFO, envelope and oscillator
#[derive(Parser)]
#[command(name = "tides")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play through the audio device, reading controls from stdin
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "tides.yaml")]
        config: PathBuf,
    },

    /// Render to a WAV file
    Render {
        /// Configuration file path
        #[arg(short, long, default_value = "tides.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: f64,
    },

    /// Print rendered frames
    Dump {
        /// Configuration file path
        #[arg(short, long, default_value = "tides.yaml")]
        config: PathBuf,

        /// Number of frames
        #[arg(short = 'n', long, default_value = "64")]
        frames: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = DumpFormat::Json)]
        format: DumpFormat,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "tides.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpFormat {
    Json,
    Csv,
}

/// One line of stdin input during playback
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Set(String, f64),
    Mode(RunMode),
    Trigger,
    Gate(bool),
    Reset,
    /// Restart the cycle phase only
    Sync,
    Quit,
}

/// Parse a control line such as `slope 0.2` or `gate on`
pub fn parse_control_line(line: &str) -> Result<ControlCommand, String> {
    let mut words = line.split_whitespace();
    let command = words.next().ok_or_else(|| "empty command".to_string())?;
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments: {}", line.trim()));
    }

    match (command, arg) {
        ("trigger", None) => Ok(ControlCommand::Trigger),
        ("reset", None) => Ok(ControlCommand::Reset),
        ("sync", None) => Ok(ControlCommand::Sync),
        ("quit" | "exit", None) => Ok(ControlCommand::Quit),
        ("gate", Some("on")) => Ok(ControlCommand::Gate(true)),
        ("gate", Some("off")) => Ok(ControlCommand::Gate(false)),
        ("mode", Some(mode)) => match mode {
            "loop" => Ok(ControlCommand::Mode(RunMode::Loop)),
            "ad" | "attack_decay" => Ok(ControlCommand::Mode(RunMode::AttackDecay)),
            "ar" | "attack_release" => Ok(ControlCommand::Mode(RunMode::AttackRelease)),
            other => Err(format!("unknown mode: {}", other)),
        },
        (name, Some(value)) => value
            .parse::<f64>()
            .map(|v| ControlCommand::Set(name.to_string(), v))
            .map_err(|_| format!("invalid value for {}: {}", name, value)),
        (name, None) => Err(format!("unknown command: {}", name)),
    }
}
