//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Env file loaded when `--env-file` is not given.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Appfile - Declarative deployment of App Platform specs.
#[derive(Parser, Debug)]
#[command(name = "appfile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the appfile or to a single app spec.
    #[arg(short, long, global = true, env = "APPFILE_FILE", default_value = "appfile.yaml")]
    pub file: PathBuf,

    /// Environment to resolve values from.
    #[arg(short, long, global = true, env = "APPFILE_ENVIRONMENT", default_value = "default")]
    pub environment: String,

    /// DigitalOcean access token.
    #[arg(short = 't', long, global = true, env = "DIGITALOCEAN_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// File to load environment variables from.
    #[arg(long, global = true, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update every app defined in the appfile.
    Sync,

    /// Show the differences between local and remote apps.
    Diff,

    /// Destroy every app defined in the appfile.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Also delete CNAME records of the apps' custom domains.
        #[arg(long)]
        cleanup_dns: bool,
    },

    /// Show status for apps defined in the appfile.
    Status,

    /// List all apps defined in the appfile.
    List {
        /// List the components of this app instead.
        #[arg(long)]
        app: Option<String>,
    },

    /// Lint the app specs locally and against App Platform.
    Lint,

    /// Print the resolved app specs without contacting App Platform.
    Render,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Finds the `--env-file` value ahead of the full parse, so variables
    /// from that file are visible to the `env` bindings of the other flags.
    #[must_use]
    pub fn env_file_hint<I, T>(args: I) -> PathBuf
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            if arg == "--" {
                break;
            }
            if arg == "--env-file" {
                if let Some(value) = args.next() {
                    return PathBuf::from(value);
                }
            } else if let Some(value) = arg.to_str().and_then(|a| a.strip_prefix("--env-file=")) {
                return PathBuf::from(value);
            }
        }
        PathBuf::from(DEFAULT_ENV_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["appfile", "sync"]).unwrap();

        assert_eq!(cli.file, PathBuf::from("appfile.yaml"));
        assert_eq!(cli.environment, "default");
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(matches!(cli.command, Commands::Sync));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "appfile", "destroy", "--yes", "--cleanup-dns", "-e", "review", "-f", "apps/appfile.yaml",
            "-t", "token",
        ])
        .unwrap();

        assert_eq!(cli.environment, "review");
        assert_eq!(cli.access_token.as_deref(), Some("token"));
        assert!(matches!(
            cli.command,
            Commands::Destroy {
                yes: true,
                cleanup_dns: true
            }
        ));
    }

    #[test]
    fn test_list_options() {
        let components = Cli::try_parse_from(["appfile", "list", "--app", "web"]).unwrap();
        assert!(matches!(components.command, Commands::List { app: Some(ref name) } if name == "web"));

        let list = Cli::try_parse_from(["appfile", "list", "--output", "json"]).unwrap();
        assert!(matches!(list.command, Commands::List { app: None }));
        assert_eq!(list.output, OutputFormat::Json);
    }

    #[test]
    fn test_env_file_hint() {
        assert_eq!(Cli::env_file_hint(["sync"]), PathBuf::from(".env"));
        assert_eq!(
            Cli::env_file_hint(["status", "--env-file", "ci.env"]),
            PathBuf::from("ci.env")
        );
        assert_eq!(
            Cli::env_file_hint(["--env-file=deploy/.env", "sync"]),
            PathBuf::from("deploy/.env")
        );
        assert_eq!(Cli::env_file_hint(["sync", "--", "--env-file", "x"]), PathBuf::from(".env"));
    }
}

