use crate::schema::{Arguments, ConfigSchema, Configuration, FieldDescriptor, GroupDescriptor, Transform};
use crate::source::PropertiesSource;
use crate::types::{PrimitiveKind, TypeDescriptor};
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DatabaseConfig {
    pub url: String,
    pub pool_size: i32,
}

impl Configuration for DatabaseConfig {
    fn schema() -> ConfigSchema {
        ConfigSchema::for_type::<Self>("DatabaseConfig")
            .field(FieldDescriptor::new("url", "Url", TypeDescriptor::string()))
            .field(
                FieldDescriptor::new("pool_size", "PoolSize", TypeDescriptor::primitive(PrimitiveKind::I32))
                    .default_value("4"),
            )
    }

    fn construct(args: &mut Arguments) -> anyhow::Result<Self> {
        Ok(Self {
            url: args.take()?,
            pool_size: args.take()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerConfig {
    pub name: String,
    pub port: i32,
    pub tags: Vec<String>,
    pub database: DatabaseConfig,
}

impl Configuration for ServerConfig {
    fn schema() -> ConfigSchema {
        ConfigSchema::for_type::<Self>("ServerConfig")
            .field(FieldDescriptor::new("name", "Name", TypeDescriptor::string()).transform::<Trim>())
            .field(
                FieldDescriptor::new("port", "Port", TypeDescriptor::primitive(PrimitiveKind::I32))
                    .default_value("8080"),
            )
            .field(
                FieldDescriptor::new("tags", "Tags", TypeDescriptor::list(TypeDescriptor::string()))
                    .default_value(""),
            )
            .group(GroupDescriptor::of::<DatabaseConfig>("database").namespace("db"))
    }

    fn construct(args: &mut Arguments) -> anyhow::Result<Self> {
        let name = args.take()?;
        let port = args.take()?;
        let tags = args.take()?;
        let database: Arc<DatabaseConfig> = args.take()?;
        Ok(Self {
            name,
            port,
            tags,
            database: DatabaseConfig::clone(&database),
        })
    }
}

pub(crate) fn server_source() -> PropertiesSource {
    PropertiesSource::from_pairs([
        ("Name", "  edge-01 "),
        ("Port", "9090"),
        ("Tags", "eu, primary"),
        ("db.Url", "postgres://db"),
        ("db.PoolSize", "16"),
    ])
}

/// Trims surrounding whitespace from string values.
#[derive(Default)]
pub(crate) struct Trim;

impl Transform for Trim {
    fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        }
    }
}

/// Uppercases string values.
#[derive(Default)]
pub(crate) struct Upper;

impl Transform for Upper {
    fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        }
    }
}
