//! Config tree builder.
//!
//! Walks a schema depth-first. Scalar fields go through resolution, then
//! conversion, then the field's transforms and constraints. Groups derive a
//! child scope (namespace prefix plus inherited dependency satisfaction) and
//! recurse. Once an ancestor group is unsatisfied, every field beneath it
//! takes its default regardless of its own dependency.
//!
//! The first failure aborts the whole build; no partial object is produced.


use crate::error::{BuildError, ConfigError};
use crate::factory::ConfigFactory;
use crate::resolve::{ResolvedCache, Resolver, Scope};
use crate::schema::{Arguments, ConfigSchema, FieldDescriptor, SchemaEntry};
use crate::source::RawSource;
use crate::value::Value;
use tracing::{debug, info};

/// Builds one configuration object. Owns the per-build resolved value cache.
pub struct TreeBuilder<'f> {
    factory: &'f ConfigFactory,
    source: &'f dyn RawSource,
    cache: ResolvedCache,
}

impl<'f> TreeBuilder<'f> {
    pub fn new(factory: &'f ConfigFactory, source: &'f dyn RawSource) -> Self {
        Self {
            factory,
            source,
            cache: ResolvedCache::new(),
        }
    }

    /// Build the object described by `schema` from the root scope.
    pub fn build(mut self, schema: &ConfigSchema) -> Result<Value, BuildError> {
        info!(config_type = schema.type_name(), "building configuration");
        let value = self.build_level(schema, &Scope::root(), schema.type_name(), "")?;
        info!(
            config_type = schema.type_name(),
            resolved_keys = self.cache.len(),
            "configuration built"
        );
        Ok(value)
    }

    fn build_level(
        &mut self,
        schema: &ConfigSchema,
        scope: &Scope,
        root_type: &str,
        path: &str,
    ) -> Result<Value, BuildError> {
        schema
            .check_declarations()
            .map_err(|e| BuildError::new(root_type, path, e))?;

        let mut args = Vec::with_capacity(schema.entries().len());
        for entry in schema.entries() {
            let entry_path = join_path(path, entry.name());
            let value = match entry {
                SchemaEntry::Group(group) => {
                    let satisfied = scope.dependencies_satisfied()
                        && self
                            .resolver(schema, scope)
                            .is_group_dependency_satisfied(group)
                            .map_err(|e| BuildError::new(root_type, &entry_path, e))?;
                    let child = scope.child(group.namespace_segment(), satisfied);
                    debug!(
                        group = %entry_path,
                        prefix = child.prefix(),
                        satisfied = child.dependencies_satisfied(),
                        "entering group"
                    );
                    self.build_level(group.schema(), &child, root_type, &entry_path)?
                }
                SchemaEntry::Field(field) => self
                    .build_field(schema, scope, field)
                    .map_err(|e| BuildError::new(root_type, &entry_path, e))?,
            };
            args.push((entry.name().to_string(), value));
        }

        schema
            .construct(Arguments::new(args))
            .map_err(|e| BuildError::new(root_type, path, ConfigError::Construction(e)))
    }

    fn build_field(
        &mut self,
        schema: &ConfigSchema,
        scope: &Scope,
        field: &FieldDescriptor,
    ) -> Result<Value, ConfigError> {
        let raw = {
            let mut resolver = self.resolver(schema, scope);
            if scope.dependencies_satisfied() {
                resolver.resolve(field)?
            } else {
                debug!(field = field.name(), "enclosing group unsatisfied, using default");
                resolver.default_for(field)?
            }
        };

        let mut value = self.factory.converter().convert(&raw, field.ty())?;
        for spec in field.transforms() {
            value = self.factory.transform(spec).apply(value);
        }

        if self.factory.options().validate_constraints {
            for constraint in field.constraints() {
                constraint
                    .validate(&value)
                    .map_err(|detail| ConfigError::ConstraintViolation {
                        field: field.name().to_string(),
                        detail,
                    })?;
            }
        }

        Ok(value)
    }

    fn resolver<'a>(&'a mut self, schema: &'a ConfigSchema, scope: &'a Scope) -> Resolver<'a> {
        Resolver::new(
            schema,
            self.source,
            scope,
            self.factory.checker(),
            &mut self.cache,
        )
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
