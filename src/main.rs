//! mediasplit - split compiled stylesheets by max-width breakpoint.

mod asset;
mod cli;
mod config;
mod html;
mod logger;
mod split;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = ProjectConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build_project(&config),
        Commands::Check => cli::check::check_project(&config).map(|_| ()),
    }
}
