//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Split compiled stylesheets by max-width breakpoint
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Compiled asset directory (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: mediasplit.toml)
    #[arg(short = 'C', long, global = true, default_value = "mediasplit.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Split stylesheets and inject link tags into HTML documents
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Validate the configuration and list the stylesheets that would be split
    #[command(visible_alias = "c")]
    Check,
}

/// Build command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Minify emitted stylesheets
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Prefix for generated link hrefs (e.g. "/static/")
    #[arg(short = 'p', long = "public-path")]
    pub public_path: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::parse_from([
            "mediasplit",
            "-C",
            "site/mediasplit.toml",
            "build",
            "--minify",
            "--public-path",
            "/static/",
            "-V",
        ]);
        assert!(cli.is_build());
        assert_eq!(cli.config, PathBuf::from("site/mediasplit.toml"));
        let Commands::Build { build_args } = cli.command else {
            unreachable!()
        };
        assert_eq!(build_args.minify, Some(true));
        assert_eq!(build_args.public_path.as_deref(), Some("/static/"));
        assert!(build_args.verbose);
    }

    #[test]
    fn test_parse_minify_false() {
        let cli = Cli::parse_from(["mediasplit", "build", "--minify", "false"]);
        let Commands::Build { build_args } = cli.command else {
            unreachable!()
        };
        assert_eq!(build_args.minify, Some(false));
    }

    #[test]
    fn test_parse_check_with_output() {
        let cli = Cli::parse_from(["mediasplit", "check", "-o", "public"]);
        assert!(cli.is_check());
        assert_eq!(cli.output, Some(PathBuf::from("public")));
        assert_eq!(cli.config, PathBuf::from("mediasplit.toml"));
    }
}
