//! Value resolution engine.
//!
//! Computes the winning raw string for a field, honoring conditional
//! dependency chains:
//!
//! - no dependency, or a satisfied one: the source value at the field's
//!   qualified key, else the field's default
//! - unsatisfied dependency: the default, without looking at the key
//!
//! Satisfaction is evaluated recursively (the dependency target's own
//! dependency first). Each chain tracks the fields it has visited so that a
//! cycle is reported with its full path, while two fields sharing a common
//! upstream dependency are not mistaken for one. Every qualified key is
//! resolved once per build and memoized in a [`ResolvedCache`].

mod checker;


pub use checker::{DependencyChecker, StandardChecker};

use crate::error::{CircularDependency, ConfigError, Result};
use crate::schema::{ConfigSchema, Dependency, DependencyTarget, FieldDescriptor, GroupDescriptor};
use crate::source::RawSource;
use std::collections::HashMap;
use tracing::debug;

/// A namespace prefix plus the inherited satisfaction of all enclosing
/// group dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    prefix: String,
    dependencies_satisfied: bool,
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    pub fn root() -> Self {
        Self {
            prefix: String::new(),
            dependencies_satisfied: true,
        }
    }

    /// Derive a nested scope. `satisfied` is AND-ed with this scope's own
    /// state; a missing namespace keeps the current prefix.
    pub fn child(&self, namespace: Option<&str>, satisfied: bool) -> Self {
        let prefix = match namespace {
            Some(segment) if !segment.is_empty() => self.qualify(segment),
            _ => self.prefix.clone(),
        };
        Self {
            prefix,
            dependencies_satisfied: self.dependencies_satisfied && satisfied,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn dependencies_satisfied(&self) -> bool {
        self.dependencies_satisfied
    }

    /// Fully qualified form of `key` in this scope.
    pub fn qualify(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }
}

/// Resolved raw values of one build, keyed by qualified source key.
#[derive(Debug, Default)]
pub struct ResolvedCache {
    values: HashMap<String, String>,
}

impl ResolvedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }
}

/// Resolves the fields of one schema level within one scope.
pub struct Resolver<'a> {
    schema: &'a ConfigSchema,
    source: &'a dyn RawSource,
    scope: &'a Scope,
    checker: Option<&'a dyn DependencyChecker>,
    cache: &'a mut ResolvedCache,
}

impl<'a> Resolver<'a> {
    pub fn new(
        schema: &'a ConfigSchema,
        source: &'a dyn RawSource,
        scope: &'a Scope,
        checker: Option<&'a dyn DependencyChecker>,
        cache: &'a mut ResolvedCache,
    ) -> Self {
        Self {
            schema,
            source,
            scope,
            checker,
            cache,
        }
    }

    /// The winning raw string for `field`.
    pub fn resolve(&mut self, field: &FieldDescriptor) -> Result<String> {
        let mut chain = Vec::new();
        self.resolve_in_chain(field, &mut chain)
    }

    /// Whether a group's own dependency holds. Groups without one are
    /// always satisfied.
    pub fn is_group_dependency_satisfied(&mut self, group: &GroupDescriptor) -> Result<bool> {
        let Some(dependency) = group.dependency() else {
            return Ok(true);
        };
        let mut chain = vec![group.name().to_string()];
        let satisfied = self.dependency_satisfied(dependency, &mut chain)?;
        debug!(
            group = group.name(),
            dependency = %dependency,
            satisfied,
            "evaluated group dependency"
        );
        Ok(satisfied)
    }

    /// The field's fallback value: its literal default, or the source value
    /// at its default key.
    pub fn default_for(&self, field: &FieldDescriptor) -> Result<String> {
        self.default_value(field)
            .ok_or_else(|| self.missing(field, &self.scope.qualify(field.source_key())))
    }

    fn default_value(&self, field: &FieldDescriptor) -> Option<String> {
        match (field.literal_default(), field.default_source_key()) {
            (Some(value), _) => Some(value.to_string()),
            (None, Some(key)) => self.source.get(&self.scope.qualify(key)),
            (None, None) => None,
        }
    }

    fn missing(&self, field: &FieldDescriptor, key: &str) -> ConfigError {
        if field.ty().is_primitive() {
            ConfigError::declaration(format!(
                "primitive field '{}' ({}) has no value for key '{}' and declares no default",
                field.name(),
                field.ty(),
                key
            ))
        } else {
            ConfigError::MissingValue {
                key: key.to_string(),
            }
        }
    }

    fn resolve_in_chain(
        &mut self,
        field: &FieldDescriptor,
        chain: &mut Vec<String>,
    ) -> Result<String> {
        let key = self.scope.qualify(field.source_key());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.to_string());
        }

        if chain.iter().any(|visited| visited == field.name()) {
            return Err(ConfigError::CircularDependency(CircularDependency {
                chain: chain.clone(),
                reentered: field.name().to_string(),
            }));
        }

        chain.push(field.name().to_string());
        let satisfied = match field.dependency() {
            Some(dependency) => self.dependency_satisfied(dependency, chain)?,
            None => true,
        };
        chain.pop();

        let value = if satisfied {
            match self.source.get(&key) {
                Some(value) => {
                    debug!(field = field.name(), key = %key, "resolved from source");
                    value
                }
                None => {
                    debug!(field = field.name(), key = %key, "key absent, using default");
                    self.default_value(field)
                        .ok_or_else(|| self.missing(field, &key))?
                }
            }
        } else {
            debug!(field = field.name(), key = %key, "dependency unsatisfied, using default");
            self.default_value(field)
                .ok_or_else(|| self.missing(field, &key))?
        };

        self.cache.insert(key, value.clone());
        Ok(value)
    }

    fn dependency_satisfied(
        &mut self,
        dependency: &Dependency,
        chain: &mut Vec<String>,
    ) -> Result<bool> {
        let actual = match dependency.target() {
            DependencyTarget::Field(name) => {
                let schema = self.schema;
                let target = schema.field_named(name).ok_or_else(|| {
                    ConfigError::declaration(format!(
                        "dependency on unknown field '{}' of {}",
                        name,
                        schema.type_name()
                    ))
                })?;
                Some(self.resolve_in_chain(target, chain)?)
            }
            DependencyTarget::Key(key) => self.source.get(&self.scope.qualify(key)),
        };

        let Some(actual) = actual else {
            return Ok(false);
        };
        self.compare(&actual, dependency)
    }

    fn compare(&self, actual: &str, dependency: &Dependency) -> Result<bool> {
        let operator = dependency.operator();
        if operator.is_empty() {
            return Ok(actual == dependency.required_value());
        }
        match self.checker {
            Some(checker) if checker.supports(operator) => {
                Ok(checker.check(actual, operator, dependency.required_value()))
            }
            Some(_) => Err(ConfigError::declaration(format!(
                "dependency checker does not support operator '{}'",
                operator
            ))),
            None => Err(ConfigError::declaration(format!(
                "operator '{}' requires a registered dependency checker",
                operator
            ))),
        }
    }
}
