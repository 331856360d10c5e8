use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;

use crate::config::{Config, DEFAULT_CONFIG_PATH};

/// App Audio Switcher - route a focused application's audio to another device
#[derive(Parser, Debug)]
#[command(name = "aas")]
#[command(version)]
#[command(about = "Control-surface plugin that moves app audio between output devices")]
#[command(long_about = "App Audio Switcher (aas) runs as a control-surface plugin.

It reads host events as JSON lines on stdin and writes host commands to stdout.
A helper worker process does the actual audio routing; aas launches it on demand
and talks to it over a local TCP socket.

Quick start:
  1. Run 'aas init' to generate a config file
  2. Point worker_path at the helper executable
  3. Register 'aas run' with the control-surface host")]
pub struct Cli {
    /// Path to config file (defaults to .appaudioswitcher.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve host events from stdin (default)
    Run,
    /// Write a config file with default settings
    Init,
    /// Move one process's audio to a device and exit
    Switch {
        /// Target process id
        #[arg(long)]
        process: u32,
        /// Target device id
        #[arg(long)]
        device: String,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

/// Write a default config file unless one already exists
pub fn init_config(config_path: &str) -> anyhow::Result<()> {
    if Path::new(config_path).exists() {
        println!("Config file '{}' already exists.", config_path);
        return Ok(());
    }

    let config = Config::default();
    config
        .save(config_path)
        .with_context(|| format!("Failed to write config to '{}'", config_path))?;

    println!("Created {}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit worker_path in {} to point at the helper", config_path);
    println!("  2. Run 'aas run' from the control-surface host");

    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
