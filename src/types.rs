//! Type descriptors for conversion targets.
//!
//! A [`TypeDescriptor`] describes the shape a raw string must be converted
//! into: a scalar, a primitive array, a collection, a map, or an opaque type
//! with generic arguments. Descriptors are plain data built once per schema.

use crate::value::Value;
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// The type name used for registry lookups and messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

}

impl FromStr for PrimitiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "char" => Ok(Self::Char),
            "i8" => Ok(Self::I8),
            "i16" => Ok(Self::I16),
            "i32" => Ok(Self::I32),
            "i64" => Ok(Self::I64),
            "f32" => Ok(Self::F32),
            "f64" => Ok(Self::F64),
            _ => Err(format!("'{}' is not a primitive type", s)),
        }
    }
}

/// Collection flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Insertion-ordered, duplicates preserved.
    List,
    /// Insertion-ordered, duplicates removed.
    Set,
}

/// An enumeration matched by exact, case-sensitive variant name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    variants: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

pub type FactoryFn = Arc<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

/// A static "from string" factory exposed by a named type.
///
/// The converter only invokes factories whose method name it recognizes and
/// whose declared return type is assignable to the target type: the target
/// itself, or a type listed through [`assignable_to`](Self::assignable_to).
#[derive(Clone)]
pub struct StringFactory {
    method: String,
    returns: String,
    returns_supertypes: Vec<String>,
    call: FactoryFn,
}

impl StringFactory {
    pub fn new<F>(method: impl Into<String>, returns: impl Into<String>, call: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            method: method.into(),
            returns: returns.into(),
            returns_supertypes: Vec::new(),
            call: Arc::new(call),
        }
    }

    /// A `from_str` factory backed by the type's [`FromStr`] implementation.
    /// The parsed value is carried as a [`Value::Object`] that compares by
    /// value, so sets and map keys of this type deduplicate.
    pub fn from_str<T>(type_name: impl Into<String>) -> Self
    where
        T: FromStr + PartialEq + Any + Send + Sync,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let returns = type_name.clone();
        Self::new("from_str", returns, move |raw| {
            let parsed = raw.parse::<T>()?;
            Ok(Value::comparable_object(type_name.clone(), parsed))
        })
    }

    /// Declare that the returned type is also assignable to `supertype`.
    pub fn assignable_to(mut self, supertype: impl Into<String>) -> Self {
        self.returns_supertypes.push(supertype.into());
        self
    }

    /// Whether the returned type can be used where `target` is expected.
    pub fn returns_assignable_to(&self, target: &str) -> bool {
        self.returns == target || self.returns_supertypes.iter().any(|s| s == target)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn returns(&self) -> &str {
        &self.returns
    }

    pub fn invoke(&self, raw: &str) -> anyhow::Result<Value> {
        (self.call)(raw)
    }
}

impl fmt::Debug for StringFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringFactory")
            .field("method", &self.method)
            .field("returns", &self.returns)
            .field("returns_supertypes", &self.returns_supertypes)
            .finish_non_exhaustive()
    }
}

/// A user-defined type, identified by name.
///
/// `supertypes` lists the names this type is assignable to; the converter
/// uses them for the best-effort custom converter scan.
#[derive(Debug, Clone)]
pub struct NamedType {
    name: String,
    supertypes: Vec<String>,
    factories: Vec<StringFactory>,
}

impl NamedType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            factories: Vec::new(),
        }
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn with_factory(mut self, factory: StringFactory) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    pub fn factories(&self) -> &[StringFactory] {
        &self.factories
    }

    /// Whether a value of this type can be used where `other` is expected.
    pub fn is_assignable_to(&self, other: &str) -> bool {
        self.name == other || self.supertypes.iter().any(|s| s == other)
    }
}

impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Single-valued targets.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    Primitive(PrimitiveKind),
    /// Nullable wrapper around a primitive (`Option<i64>`). Converts exactly
    /// like the primitive but is a distinct registry key.
    Boxed(PrimitiveKind),
    String,
    Enum(EnumType),
    /// A type converted through a string factory or a custom converter.
    Named(NamedType),
}

/// Conversion target description.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    PrimitiveArray(PrimitiveKind),
    Collection {
        kind: CollectionKind,
        element: Box<TypeDescriptor>,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Opaque {
        raw: NamedType,
        arguments: Vec<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Scalar(ScalarType::Primitive(kind))
    }

    pub fn boxed(kind: PrimitiveKind) -> Self {
        Self::Scalar(ScalarType::Boxed(kind))
    }

    pub fn string() -> Self {
        Self::Scalar(ScalarType::String)
    }

    pub fn enumeration(ty: EnumType) -> Self {
        Self::Scalar(ScalarType::Enum(ty))
    }

    pub fn named(ty: NamedType) -> Self {
        Self::Scalar(ScalarType::Named(ty))
    }

    pub fn array(kind: PrimitiveKind) -> Self {
        Self::PrimitiveArray(kind)
    }

    pub fn list(element: TypeDescriptor) -> Self {
        Self::Collection {
            kind: CollectionKind::List,
            element: Box::new(element),
        }
    }

    pub fn set(element: TypeDescriptor) -> Self {
        Self::Collection {
            kind: CollectionKind::Set,
            element: Box::new(element),
        }
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn opaque(raw: NamedType, arguments: Vec<TypeDescriptor>) -> Self {
        Self::Opaque { raw, arguments }
    }

    /// The raw (argument-free) type name. Custom converters are keyed by it.
    pub fn raw_name(&self) -> String {
        match self {
            Self::Scalar(ScalarType::Primitive(kind)) => kind.name().to_string(),
            Self::Scalar(ScalarType::Boxed(kind)) => format!("Option<{}>", kind.name()),
            Self::Scalar(ScalarType::String) => "String".to_string(),
            Self::Scalar(ScalarType::Enum(ty)) => ty.name().to_string(),
            Self::Scalar(ScalarType::Named(ty)) => ty.name().to_string(),
            Self::PrimitiveArray(kind) => format!("[{}]", kind.name()),
            Self::Collection {
                kind: CollectionKind::List,
                ..
            } => "List".to_string(),
            Self::Collection {
                kind: CollectionKind::Set,
                ..
            } => "Set".to_string(),
            Self::Map { .. } => "Map".to_string(),
            Self::Opaque { raw, .. } => raw.name().to_string(),
        }
    }

    /// Generic arguments, in declaration order.
    pub fn arguments(&self) -> Vec<&TypeDescriptor> {
        match self {
            Self::Collection { element, .. } => vec![element.as_ref()],
            Self::Map { key, value } => vec![key.as_ref(), value.as_ref()],
            Self::Opaque { arguments, .. } => arguments.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Primitive fields cannot fall back to an empty value and must declare a default.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Scalar(ScalarType::Primitive(_)))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection { element, .. } => write!(f, "{}<{}>", self.raw_name(), element),
            Self::Map { key, value } => write!(f, "Map<{}, {}>", key, value),
            Self::Opaque { raw, arguments } if !arguments.is_empty() => {
                write!(f, "{}<", raw.name())?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            _ => write!(f, "{}", self.raw_name()),
        }
    }
}
