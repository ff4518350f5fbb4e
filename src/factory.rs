//! Configuration factory.
//!
//! [`ConfigFactory`] is the long-lived entry point. It owns the converter
//! registry, the optional dependency checker and the caches that outlive a
//! single build (transform instances, per-type schemas). Registration takes
//! `&mut self`; once set up the factory can be shared across threads and
//! used for any number of concurrent builds.

use crate::builder::TreeBuilder;
use crate::convert::Converter;
use crate::error::{BuildError, ConfigError, KeyconfError};
use crate::resolve::{DependencyChecker, StandardChecker};
use crate::schema::{ConfigSchema, Configuration, Transform, TransformSpec};
use crate::source::RawSource;
use crate::types::TypeDescriptor;
use crate::value::Value;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::path::Path;
use std::sync::Arc;

/// Engine options.
///
/// Loaded from YAML; unknown fields are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryOptions {
    /// Run field constraints after conversion and transforms.
    pub validate_constraints: bool,

    /// Install [`StandardChecker`] for named dependency operators.
    pub standard_operators: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            validate_constraints: true,
            standard_operators: false,
        }
    }
}

impl FactoryOptions {
    /// Load options from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeyconfError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeyconfError::UserError(format!(
                "failed to read options file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string. An empty document yields defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, KeyconfError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| KeyconfError::UserError(format!("failed to parse options YAML: {}", e)))
    }
}

/// Builds configuration objects from raw sources.
pub struct ConfigFactory {
    converter: Converter,
    checker: Option<Arc<dyn DependencyChecker>>,
    transforms: DashMap<TypeId, Arc<dyn Transform>>,
    schemas: DashMap<TypeId, Arc<ConfigSchema>>,
    options: FactoryOptions,
}

impl Default for ConfigFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFactory {
    pub fn new() -> Self {
        Self::with_options(FactoryOptions::default())
    }

    pub fn with_options(options: FactoryOptions) -> Self {
        let mut factory = Self {
            converter: Converter::new(),
            checker: None,
            transforms: DashMap::new(),
            schemas: DashMap::new(),
            options,
        };
        if factory.options.standard_operators {
            factory.set_dependency_checker(StandardChecker);
        }
        factory
    }

    pub fn options(&self) -> &FactoryOptions {
        &self.options
    }

    /// Register a custom converter for the raw type name `target`.
    pub fn register_converter<F>(&mut self, target: impl Into<String>, converter: F) -> &mut Self
    where
        F: Fn(&TypeDescriptor, &str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.converter.register(target, converter);
        self
    }

    /// Install the dependency checker, replacing any previous one.
    pub fn set_dependency_checker<C: DependencyChecker + 'static>(&mut self, checker: C) -> &mut Self {
        self.checker = Some(Arc::new(checker));
        self
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn checker(&self) -> Option<&dyn DependencyChecker> {
        self.checker.as_deref()
    }

    /// Build the object described by `schema`.
    pub fn build(&self, schema: &ConfigSchema, source: &dyn RawSource) -> Result<Value, BuildError> {
        TreeBuilder::new(self, source).build(schema)
    }

    /// Build a typed configuration object.
    pub fn create_config<T: Configuration>(&self, source: &dyn RawSource) -> Result<T, BuildError> {
        let schema = self.schema_of::<T>();
        let value = self.build(&schema, source)?;

        let mismatch = || {
            BuildError::new(
                schema.type_name(),
                "",
                ConfigError::Construction(anyhow::anyhow!(
                    "constructor did not produce a {}",
                    std::any::type_name::<T>()
                )),
            )
        };
        let Value::Object { inner, .. } = value else {
            return Err(mismatch());
        };
        let shared = inner.downcast::<T>().map_err(|_| mismatch())?;
        Arc::try_unwrap(shared).map_err(|_| mismatch())
    }

    /// The schema of `T`, built on first use and shared afterwards.
    pub fn schema_of<T: Configuration>(&self) -> Arc<ConfigSchema> {
        self.schemas
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(T::schema()))
            .clone()
    }

    /// The shared instance of a transform type, created on first use.
    pub(crate) fn transform(&self, spec: &TransformSpec) -> Arc<dyn Transform> {
        self.transforms
            .entry(spec.type_id())
            .or_insert_with(|| spec.instantiate())
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn cached_transforms(&self) -> usize {
        self.transforms.len()
    }
}
