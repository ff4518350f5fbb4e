//! Keyconf builds typed, nested configuration objects from flat key/value
//! sources.
//!
//! A [`ConfigSchema`](schema::ConfigSchema) declares fields (source key,
//! default, conditional dependency, target type) and nested groups. The
//! [`ConfigFactory`](factory::ConfigFactory) resolves each field against a
//! [`RawSource`](source::RawSource), converts the winning string to its
//! declared type, applies transforms and constraints, and constructs the
//! object tree.

pub mod builder;
pub mod convert;
pub mod error;
pub mod exit_codes;
pub mod factory;
pub mod resolve;
pub mod schema;
pub mod schema_file;
pub mod source;
pub mod types;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{BuildError, ConfigError};
pub use factory::{ConfigFactory, FactoryOptions};
pub use schema::{ConfigSchema, Configuration};
pub use value::{FromValue, Value};
