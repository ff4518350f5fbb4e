//! CLI argument parsing for keyconf.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Keyconf: build typed configuration trees from flat key/value sources.
///
/// Sources are `.properties` or YAML files. Later sources override earlier
/// ones. Schemas are YAML files describing fields, defaults, dependencies
/// and nested groups.
#[derive(Parser, Debug)]
#[command(name = "keyconf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter (e.g. "debug", "keyconf=trace"). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for keyconf.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a configuration tree and print it.
    ///
    /// Resolves every field of the schema against the merged sources,
    /// converts and validates it, then prints the result.
    Build(BuildArgs),

    /// Print the merged flat source.
    ///
    /// Useful for checking which value wins when several sources define
    /// the same key.
    Keys(KeysArgs),
}

/// Output formats for printed values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Schema file (YAML).
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Source files, lowest precedence first.
    #[arg(long = "source", required = true)]
    pub sources: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Engine options file (YAML).
    #[arg(long)]
    pub options: Option<PathBuf>,
}

/// Arguments for the `keys` command.
#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Source files, lowest precedence first.
    #[arg(long = "source", required = true)]
    pub sources: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
