//! Schema descriptors for configuration types.
//!
//! A [`ConfigSchema`] is the explicit, statically-built description of one
//! configuration type: its fields and nested groups in declaration order,
//! plus the function that constructs the configured object from the
//! converted arguments.
//!
//! # Example
//!
//! ```
//! use keyconf::schema::{ConfigSchema, Dependency, FieldDescriptor};
//! use keyconf::types::{PrimitiveKind, TypeDescriptor};
//!
//! let schema = ConfigSchema::new("Server")
//!     .field(
//!         FieldDescriptor::new("enabled", "Enabled", TypeDescriptor::primitive(PrimitiveKind::Bool))
//!             .default_value("false"),
//!     )
//!     .field(
//!         FieldDescriptor::new("port", "Port", TypeDescriptor::primitive(PrimitiveKind::I32))
//!             .default_value("0")
//!             .depends_on(Dependency::on("enabled")),
//!     );
//! assert!(schema.check_declarations().is_ok());
//! ```

use crate::error::{ConfigError, Result, ViolationDetail};
use crate::types::TypeDescriptor;
use crate::value::{FromValue, Value};
use anyhow::Context;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Required value used when a dependency does not name one.
pub const DEFAULT_REQUIRED_VALUE: &str = "true";

/// What a dependency reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    /// Another declared field at the same schema level, by logical name.
    Field(String),
    /// A raw source key that is not a declared field.
    Key(String),
}

/// Makes a field (or group) conditional on another value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    target: DependencyTarget,
    operator: String,
    required_value: String,
}

impl Dependency {
    /// Depend on a declared field's resolved value.
    pub fn on(field: impl Into<String>) -> Self {
        Self::with_target(DependencyTarget::Field(field.into()))
    }

    /// Depend on a raw source key (a "virtual" dependency).
    pub fn on_key(key: impl Into<String>) -> Self {
        Self::with_target(DependencyTarget::Key(key.into()))
    }

    fn with_target(target: DependencyTarget) -> Self {
        Self {
            target,
            operator: String::new(),
            required_value: DEFAULT_REQUIRED_VALUE.to_string(),
        }
    }

    pub fn equal_to(mut self, value: impl Into<String>) -> Self {
        self.required_value = value.into();
        self
    }

    /// Compare with a named operator handled by the factory's dependency
    /// checker instead of exact equality.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn target(&self) -> &DependencyTarget {
        &self.target
    }

    /// Empty means exact, case-sensitive equality.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn required_value(&self) -> &str {
        &self.required_value
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            DependencyTarget::Field(name) => name.as_str(),
            DependencyTarget::Key(key) => key.as_str(),
        };
        let operator = if self.operator.is_empty() {
            "=="
        } else {
            &self.operator
        };
        write!(f, "{} {} '{}'", target, operator, self.required_value)
    }
}

/// A stateless post-conversion transform.
///
/// Instances are created at most once per factory and type, then shared.
pub trait Transform: Send + Sync + 'static {
    fn apply(&self, value: Value) -> Value;
}

fn make_transform<T: Transform + Default>() -> Arc<dyn Transform> {
    Arc::new(T::default())
}

/// Reference to a transform type attached to a field.
#[derive(Clone)]
pub struct TransformSpec {
    type_id: TypeId,
    name: &'static str,
    make: fn() -> Arc<dyn Transform>,
}

impl TransformSpec {
    pub fn of<T: Transform + Default>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            make: make_transform::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn instantiate(&self) -> Arc<dyn Transform> {
        (self.make)()
    }
}

impl fmt::Debug for TransformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransformSpec").field(&self.name).finish()
    }
}

/// A check run against a field's final typed value.
pub trait Constraint: Send + Sync {
    fn validate(&self, value: &Value) -> std::result::Result<(), ViolationDetail>;
}

impl<F> Constraint for F
where
    F: Fn(&Value) -> std::result::Result<(), ViolationDetail> + Send + Sync,
{
    fn validate(&self, value: &Value) -> std::result::Result<(), ViolationDetail> {
        self(value)
    }
}

/// A single scalar field.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    source_key: String,
    default_value: Option<String>,
    default_key: Option<String>,
    ty: TypeDescriptor,
    dependency: Option<Dependency>,
    transforms: Vec<TransformSpec>,
    constraints: Vec<Arc<dyn Constraint>>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, source_key: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            source_key: source_key.into(),
            default_value: None,
            default_key: None,
            ty,
            dependency: None,
            transforms: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Literal fallback. Mutually exclusive with [`default_key`](Self::default_key).
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Use another raw key's value as the fallback.
    pub fn default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = Some(key.into());
        self
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn transform<T: Transform + Default>(mut self) -> Self {
        self.transforms.push(TransformSpec::of::<T>());
        self
    }

    pub fn constraint<C: Constraint + 'static>(mut self, constraint: C) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn literal_default(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn default_source_key(&self) -> Option<&str> {
        self.default_key.as_deref()
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    pub fn transforms(&self) -> &[TransformSpec] {
        &self.transforms
    }

    pub fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("source_key", &self.source_key)
            .field("default_value", &self.default_value)
            .field("default_key", &self.default_key)
            .field("ty", &self.ty)
            .field("dependency", &self.dependency)
            .field("transforms", &self.transforms)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

/// A nested configuration type, optionally namespaced and gated.
#[derive(Clone)]
pub struct GroupDescriptor {
    name: String,
    namespace: Option<String>,
    dependency: Option<Dependency>,
    schema: Arc<ConfigSchema>,
}

impl GroupDescriptor {
    pub fn new(name: impl Into<String>, schema: ConfigSchema) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            dependency: None,
            schema: Arc::new(schema),
        }
    }

    /// A group whose schema comes from a typed configuration.
    pub fn of<T: Configuration>(name: impl Into<String>) -> Self {
        Self::new(name, T::schema())
    }

    /// Prefix segment added to every key beneath this group. Without one the
    /// group only organizes fields and keeps its parent's prefix.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_segment(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }
}

/// One declared member of a schema.
#[derive(Clone)]
pub enum SchemaEntry {
    Field(FieldDescriptor),
    Group(GroupDescriptor),
}

impl SchemaEntry {
    pub fn name(&self) -> &str {
        match self {
            SchemaEntry::Field(field) => field.name(),
            SchemaEntry::Group(group) => group.name(),
        }
    }
}

/// Ordered converted arguments handed to a constructor.
#[derive(Debug, Default)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
    cursor: usize,
}

impl Arguments {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes the next argument in declaration order.
    pub fn take<T: FromValue>(&mut self) -> anyhow::Result<T> {
        let (name, value) = self
            .entries
            .get(self.cursor)
            .cloned()
            .with_context(|| format!("missing argument at position {}", self.cursor))?;
        self.cursor += 1;
        T::from_value(value).with_context(|| format!("argument '{}'", name))
    }

    /// Looks up an argument by logical name.
    pub fn get<T: FromValue>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .with_context(|| format!("no argument named '{}'", name))?;
        T::from_value(value).with_context(|| format!("argument '{}'", name))
    }

    pub fn into_record(self) -> Value {
        Value::Record(self.entries)
    }
}

/// Builds the configured object from its ordered arguments.
pub type Constructor = Arc<dyn Fn(&mut Arguments) -> anyhow::Result<Value> + Send + Sync>;

/// A configuration type implemented as a Rust struct.
pub trait Configuration: Sized + Send + Sync + 'static {
    fn schema() -> ConfigSchema;

    fn construct(args: &mut Arguments) -> anyhow::Result<Self>;
}

/// Description of one configuration type.
#[derive(Clone)]
pub struct ConfigSchema {
    type_name: String,
    entries: Vec<SchemaEntry>,
    constructor: Constructor,
}

impl ConfigSchema {
    /// An untyped schema whose objects are [`Value::Record`]s.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: Vec::new(),
            constructor: Arc::new(|args: &mut Arguments| Ok(std::mem::take(args).into_record())),
        }
    }

    /// A schema whose objects are built by `T::construct`.
    pub fn for_type<T: Configuration>(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let object_name = type_name.clone();
        let mut schema = Self::new(type_name);
        schema.constructor = Arc::new(move |args: &mut Arguments| {
            Ok(Value::object(object_name.clone(), T::construct(args)?))
        });
        schema
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.entries.push(SchemaEntry::Field(field));
        self
    }

    pub fn group(mut self, group: GroupDescriptor) -> Self {
        self.entries.push(SchemaEntry::Group(group));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            SchemaEntry::Field(field) => Some(field),
            SchemaEntry::Group(_) => None,
        })
    }

    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|field| field.name() == name)
    }

    pub fn construct(&self, mut args: Arguments) -> anyhow::Result<Value> {
        (self.constructor)(&mut args)
    }

    /// Check this schema level for declaration errors:
    /// - duplicate logical names or source keys
    /// - a default value and a default key declared together
    /// - a field dependency on an undeclared field
    /// - a group dependency on an undeclared field
    pub fn check_declarations(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut keys = HashSet::new();

        for entry in &self.entries {
            if !names.insert(entry.name()) {
                return Err(ConfigError::declaration(format!(
                    "{} declares '{}' more than once",
                    self.type_name,
                    entry.name()
                )));
            }

            let dependency = match entry {
                SchemaEntry::Field(field) => {
                    if !keys.insert(field.source_key()) {
                        return Err(ConfigError::declaration(format!(
                            "{} declares source key '{}' more than once",
                            self.type_name,
                            field.source_key()
                        )));
                    }
                    if field.default_value.is_some() && field.default_key.is_some() {
                        return Err(ConfigError::declaration(format!(
                            "field '{}' declares both a default value and a default key",
                            field.name()
                        )));
                    }
                    field.dependency()
                }
                SchemaEntry::Group(group) => group.dependency(),
            };

            if let Some(DependencyTarget::Field(target)) = dependency.map(Dependency::target)
                && self.field_named(target).is_none()
            {
                return Err(ConfigError::declaration(format!(
                    "'{}' depends on unknown field '{}' of {}",
                    entry.name(),
                    target,
                    self.type_name
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ConfigSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSchema")
            .field("type_name", &self.type_name)
            .field(
                "entries",
                &self.entries.iter().map(SchemaEntry::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
