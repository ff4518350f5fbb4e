//! Declarative YAML schema files.
//!
//! The CLI cannot compile Rust configuration types, so it reads schemas from
//! YAML instead:
//!
//! ```yaml
//! name: ServerConfig
//! fields:
//!   - name: enabled
//!     key: Enabled
//!     type: bool
//!     default: false
//!   - name: port
//!     key: Port
//!     type: i32
//!     default: 8080
//!     depends_on: { field: enabled }
//! groups:
//!   - name: database
//!     namespace: db
//!     depends_on: { key: Profile, value: prod }
//!     fields:
//!       - { name: url, key: Url, type: string }
//! ```
//!
//! Fields are declared before groups at every level. Built objects are
//! untyped records.

use crate::error::KeyconfError;
use crate::schema::{ConfigSchema, Dependency, FieldDescriptor, GroupDescriptor};
use crate::types::{EnumType, NamedType, PrimitiveKind, StringFactory, TypeDescriptor};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Root of a schema file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Type name used in error messages.
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,

    /// Source key; defaults to the field name.
    #[serde(default)]
    pub key: Option<String>,

    #[serde(rename = "type")]
    pub ty: String,

    /// Literal default. Any YAML scalar; it is read back as its string form.
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,

    #[serde(default)]
    pub default_key: Option<String>,

    #[serde(default)]
    pub depends_on: Option<DependencySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,

    /// Type name of the nested object; defaults to the group name.
    #[serde(default)]
    pub type_name: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub depends_on: Option<DependencySpec>,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// Exactly one of `field` and `key` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    #[serde(default)]
    pub field: Option<String>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub operator: Option<String>,

    #[serde(default)]
    pub value: Option<serde_yaml::Value>,
}

impl SchemaFile {
    /// Load a schema file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeyconfError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeyconfError::UserError(format!(
                "failed to read schema file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, KeyconfError> {
        let file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| KeyconfError::SchemaError(format!("failed to parse schema YAML: {}", e)))?;
        if file.name.trim().is_empty() {
            return Err(KeyconfError::SchemaError("schema name must not be empty".to_string()));
        }
        Ok(file)
    }

    /// Convert into an engine schema. Declaration rules (duplicate keys,
    /// unknown dependency targets) are checked later, by the builder.
    pub fn to_schema(&self) -> Result<ConfigSchema, KeyconfError> {
        level_schema(&self.name, &self.fields, &self.groups)
    }
}

fn level_schema(
    type_name: &str,
    fields: &[FieldSpec],
    groups: &[GroupSpec],
) -> Result<ConfigSchema, KeyconfError> {
    let mut schema = ConfigSchema::new(type_name);
    for field in fields {
        schema = schema.field(field.to_descriptor()?);
    }
    for group in groups {
        schema = schema.group(group.to_descriptor()?);
    }
    Ok(schema)
}

impl FieldSpec {
    fn to_descriptor(&self) -> Result<FieldDescriptor, KeyconfError> {
        let ty = parse_type(&self.ty).map_err(|e| {
            KeyconfError::SchemaError(format!("field '{}': {}", self.name, e))
        })?;
        let key = self.key.as_deref().unwrap_or(&self.name);

        let mut field = FieldDescriptor::new(&self.name, key, ty);
        if let Some(default) = &self.default {
            field = field.default_value(scalar_text(default).ok_or_else(|| {
                KeyconfError::SchemaError(format!("field '{}': default must be a scalar", self.name))
            })?);
        }
        if let Some(default_key) = &self.default_key {
            field = field.default_key(default_key);
        }
        if let Some(dependency) = &self.depends_on {
            field = field.depends_on(dependency.to_dependency(&self.name)?);
        }
        Ok(field)
    }
}

impl GroupSpec {
    fn to_descriptor(&self) -> Result<GroupDescriptor, KeyconfError> {
        let type_name = self.type_name.as_deref().unwrap_or(&self.name);
        let mut group = GroupDescriptor::new(&self.name, level_schema(type_name, &self.fields, &self.groups)?);
        if let Some(namespace) = &self.namespace {
            group = group.namespace(namespace);
        }
        if let Some(dependency) = &self.depends_on {
            group = group.depends_on(dependency.to_dependency(&self.name)?);
        }
        Ok(group)
    }
}

impl DependencySpec {
    fn to_dependency(&self, owner: &str) -> Result<Dependency, KeyconfError> {
        let mut dependency = match (&self.field, &self.key) {
            (Some(field), None) => Dependency::on(field),
            (None, Some(key)) => Dependency::on_key(key),
            _ => {
                return Err(KeyconfError::SchemaError(format!(
                    "'{}': depends_on needs exactly one of 'field' or 'key'",
                    owner
                )));
            }
        };
        if let Some(operator) = &self.operator {
            dependency = dependency.with_operator(operator);
        }
        if let Some(value) = &self.value {
            let required = scalar_text(value).ok_or_else(|| {
                KeyconfError::SchemaError(format!("'{}': dependency value must be a scalar", owner))
            })?;
            dependency = dependency.equal_to(required);
        }
        Ok(dependency)
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parse a type expression.
///
/// Grammar: a primitive name (`bool`, `char`, `i8` ... `f64`), `string`,
/// `optional<P>`, `array<P>`, `list<T>`, `set<T>`, `map<K,V>`,
/// `enum(A|B|...)`, or one of the named types `ip` and `socket_addr`.
pub fn parse_type(text: &str) -> Result<TypeDescriptor, String> {
    let text = text.trim();

    if let Ok(kind) = text.parse::<PrimitiveKind>() {
        return Ok(TypeDescriptor::primitive(kind));
    }
    if text == "string" {
        return Ok(TypeDescriptor::string());
    }
    if let Some(named) = named_type(text) {
        return Ok(TypeDescriptor::named(named));
    }
    if let Some(body) = text.strip_prefix("enum(").and_then(|rest| rest.strip_suffix(')')) {
        let variants: Vec<&str> = body.split('|').map(str::trim).collect();
        if variants.iter().any(|v| v.is_empty()) {
            return Err(format!("empty variant in '{}'", text));
        }
        return Ok(TypeDescriptor::enumeration(EnumType::new("enum", variants)));
    }

    let Some((head, args)) = generic(text) else {
        return Err(format!("unknown type '{}'", text));
    };
    match (head, args.as_slice()) {
        ("optional", [inner]) => Ok(TypeDescriptor::boxed(primitive(inner)?)),
        ("array", [inner]) => Ok(TypeDescriptor::array(primitive(inner)?)),
        ("list", [inner]) => Ok(TypeDescriptor::list(parse_type(inner)?)),
        ("set", [inner]) => Ok(TypeDescriptor::set(parse_type(inner)?)),
        ("map", [key, value]) => Ok(TypeDescriptor::map(parse_type(key)?, parse_type(value)?)),
        _ => Err(format!(
            "'{}' takes a different number of type arguments than {}",
            head,
            args.len()
        )),
    }
}

fn primitive(text: &str) -> Result<PrimitiveKind, String> {
    text.trim().parse()
}

/// Split `head<a, b<c, d>>` into its head and top-level arguments.
fn generic(text: &str) -> Option<(&str, Vec<&str>)> {
    let open = text.find('<')?;
    let body = text.strip_suffix('>')?.get(open + 1..)?;
    let head = text[..open].trim();

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    args.push(body[start..].trim());
    Some((head, args))
}

/// Named types with a string factory. Parsed values are normalized back to
/// their canonical text so they serialize as plain strings.
fn named_type(name: &str) -> Option<NamedType> {
    let factory = match name {
        "ip" => StringFactory::new("parse", "ip", |raw| {
            let addr: IpAddr = raw.trim().parse()?;
            Ok(Value::String(addr.to_string()))
        }),
        "socket_addr" => StringFactory::new("parse", "socket_addr", |raw| {
            let addr: SocketAddr = raw.trim().parse()?;
            Ok(Value::String(addr.to_string()))
        }),
        _ => return None,
    };
    Some(NamedType::new(name).with_factory(factory))
}
