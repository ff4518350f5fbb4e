//! Command implementations for keyconf.
//!
//! Each command renders its output to a string; [`dispatch`] prints it.

use crate::cli::{BuildArgs, Command, KeysArgs, OutputFormat};
use indexmap::IndexMap;
use keyconf::error::KeyconfError;
use keyconf::factory::{ConfigFactory, FactoryOptions};
use keyconf::schema_file::SchemaFile;
use keyconf::source::PropertiesSource;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, KeyconfError>;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    let output = match command {
        Command::Build(args) => cmd_build(args)?,
        Command::Keys(args) => cmd_keys(args)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

fn cmd_build(args: BuildArgs) -> Result<String> {
    let options = match &args.options {
        Some(path) => FactoryOptions::load(path)?,
        None => FactoryOptions {
            standard_operators: true,
            ..FactoryOptions::default()
        },
    };
    debug!(?options, "factory options");

    let schema = SchemaFile::load(&args.schema)?.to_schema()?;
    let source = load_sources(&args.sources)?;
    info!(schema = %args.schema.display(), keys = source.len(), "building");

    let value = ConfigFactory::with_options(options).build(&schema, &source)?;
    render(&value, args.format)
}

fn cmd_keys(args: KeysArgs) -> Result<String> {
    let source = load_sources(&args.sources)?;
    let keys: IndexMap<&str, &str> = source.iter().collect();
    render(&keys, args.format)
}

/// Load and layer source files, later files overriding earlier ones.
fn load_sources(paths: &[PathBuf]) -> Result<PropertiesSource> {
    let mut layers = Vec::with_capacity(paths.len());
    for path in paths {
        let layer = PropertiesSource::load(path)?;
        debug!(path = %path.display(), keys = layer.len(), "loaded source");
        layers.push(layer);
    }
    Ok(PropertiesSource::layered(layers))
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| KeyconfError::UserError(format!("failed to render JSON: {}", e))),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| KeyconfError::UserError(format!("failed to render YAML: {}", e))),
    }
}
