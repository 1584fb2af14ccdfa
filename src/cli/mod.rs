//! CLI module for the Appfile deployment tool.
//!
//! This module provides the command-line interface for managing
//! App Platform apps from an appfile.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
