//! # move-drag
//!
//! Command line front end for the drag engine:
//! - `replay`: run a JSON drag script against a headless compositor
//! - `check-config`: validate a configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use std::path::{Path, PathBuf};

use move_drag::script::ReplayScript;
use move_drag::MoveDragConfig;

#[derive(Parser)]
#[command(name = "move-drag")]
#[command(about = "Cross-output interactive window-drag engine")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a drag script and print the final placement as JSON
    Replay {
        /// Path to the JSON script
        script: PathBuf,

        /// Configuration file merged over the script's own config
        #[arg(short, long)]
        config: Option<String>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a configuration file
    CheckConfig {
        #[arg(default_value = "~/.config/move-drag/move-drag.toml")]
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if wants_debug(&cli) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    debug!(
        "move-drag {} ({}, built {})",
        move_drag::VERSION,
        env!("MOVE_DRAG_GIT_COMMIT"),
        env!("MOVE_DRAG_BUILD_DATE")
    );

    match cli.command {
        Command::Replay {
            script,
            config,
            pretty,
        } => replay(&script, config.as_deref(), pretty),
        Command::CheckConfig { path } => check_config(&path),
    }
}

/// `--debug`, or `general.debug` in the configuration passed to `replay`
fn wants_debug(cli: &Cli) -> bool {
    if cli.debug {
        return true;
    }

    match &cli.command {
        Command::Replay {
            config: Some(path), ..
        } => MoveDragConfig::load(path)
            .map(|config| config.general.debug)
            .unwrap_or(false),
        _ => false,
    }
}

fn replay(path: &Path, config: Option<&str>, pretty: bool) -> Result<()> {
    let mut script = ReplayScript::load(path)?;

    if let Some(config_path) = config {
        let overrides = MoveDragConfig::load(config_path)?;
        script.config = script.config.merge_partial(overrides);
        script.config.validate()?;
        info!("Configuration loaded from: {}", config_path);
    }

    info!(
        "Replaying {} step(s) from {}",
        script.steps.len(),
        path.display()
    );
    let report = script.run()?;
    info!(
        "{} event(s), {} drop(s)",
        report.events.len(),
        report.drops.len()
    );

    let output = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize replay report")?;
    println!("{}", output);

    Ok(())
}

fn check_config(path: &str) -> Result<()> {
    match MoveDragConfig::load(path) {
        Ok(config) => {
            info!("Configuration at {} is valid", path);
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            Err(e)
        }
    }
}
