//! Typed values produced by conversion.
//!
//! [`Value`] is the dynamically-typed result of converting a raw string
//! against a [`TypeDescriptor`](crate::types::TypeDescriptor). Typed
//! configuration objects pull concrete Rust types back out through
//! [`FromValue`].

use anyhow::{Context, bail};
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A converted configuration value.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Enum {
        type_name: String,
        variant: String,
    },
    /// Primitive array.
    Array(Vec<Value>),
    List(Vec<Value>),
    /// Insertion-ordered, without duplicates.
    Set(Vec<Value>),
    /// Insertion-ordered entries with unique keys.
    Map(Vec<(Value, Value)>),
    /// An untyped configuration object: logical field name to value.
    Record(Vec<(String, Value)>),
    /// Any other Rust value, produced by factories, custom converters or
    /// typed configuration constructors.
    ///
    /// Objects with `eq` compare by value; the rest compare by identity.
    Object {
        type_name: String,
        inner: Arc<dyn Any + Send + Sync>,
        eq: Option<ObjectEq>,
    },
}

/// Value equality between two objects of the same Rust type.
pub type ObjectEq = fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool;

fn eq_as<T: Any + PartialEq>(a: &(dyn Any + Send + Sync), b: &(dyn Any + Send + Sync)) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl Value {
    /// An object compared by identity.
    pub fn object<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Value::Object {
            type_name: type_name.into(),
            inner: Arc::new(value),
            eq: None,
        }
    }

    /// An object compared through `T`'s [`PartialEq`], so equal values
    /// deduplicate in sets and map keys.
    pub fn comparable_object<T: Any + Send + Sync + PartialEq>(
        type_name: impl Into<String>,
        value: T,
    ) -> Self {
        Value::Object {
            type_name: type_name.into(),
            inner: Arc::new(value),
            eq: Some(eq_as::<T>),
        }
    }

    /// Short name of the variant, used in mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Enum { .. } => "enum",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Object { .. } => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Variant name of an enum value.
    pub fn variant(&self) -> Option<&str> {
        match self {
            Value::Enum { variant, .. } => Some(variant),
            _ => None,
        }
    }

    /// Items of an array, list or set.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a map entry by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up a record field by logical name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Object { inner, .. } => inner.clone().downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Enum {
                    type_name: ta,
                    variant: va,
                },
                Value::Enum {
                    type_name: tb,
                    variant: vb,
                },
            ) => ta == tb && va == vb,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (
                Value::Object {
                    type_name: ta,
                    inner: ia,
                    eq,
                },
                Value::Object {
                    type_name: tb,
                    inner: ib,
                    ..
                },
            ) => {
                ta == tb
                    && (Arc::ptr_eq(ia, ib) || eq.is_some_and(|eq| eq(ia.as_ref(), ib.as_ref())))
            }
            _ => false,
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Enum { variant, .. } => write!(f, "{}", variant),
            Value::Array(items) | Value::List(items) | Value::Set(items) => write_seq(f, items),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, "}}")
            }
            Value::Object { type_name, .. } => write!(f, "<{}>", type_name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => write!(f, "String({:?})", v),
            Value::Enum { type_name, variant } => write!(f, "{}::{}", type_name, variant),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Set(items) => f.debug_tuple("Set").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Record(fields) => f.debug_tuple("Record").field(fields).finish(),
            Value::Object { type_name, .. } => write!(f, "Object(<{}>)", type_name),
            scalar => write!(f, "{}({})", scalar.kind(), scalar),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Char(v) => serializer.serialize_char(*v),
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Enum { variant, .. } => serializer.serialize_str(variant),
            Value::Array(items) | Value::List(items) | Value::Set(items) => {
                serializer.collect_seq(items)
            }
            // Keys are rendered as strings so that every map is representable in JSON.
            Value::Map(entries) => {
                serializer.collect_map(entries.iter().map(|(k, v)| (k.to_string(), v)))
            }
            Value::Record(fields) => serializer.collect_map(fields.iter().map(|(k, v)| (k, v))),
            Value::Object { type_name, .. } => serializer.serialize_str(&format!("<{}>", type_name)),
        }
    }
}

/// Extraction of a concrete Rust type from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> anyhow::Result<Self>;
}

macro_rules! scalar_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> anyhow::Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => bail!("expected {}, found {}", stringify!($ty), other.kind()),
                    }
                }
            }
        )*
    };
}

scalar_from_value!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

impl FromValue for Value {
    fn from_value(value: Value) -> anyhow::Result<Self> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::String(v) => Ok(v),
            Value::Enum { variant, .. } => Ok(variant),
            other => bail!("expected string, found {}", other.kind()),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Array(items) | Value::List(items) | Value::Set(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).with_context(|| format!("element {}", i)))
                .collect(),
            other => bail!("expected a sequence, found {}", other.kind()),
        }
    }
}

impl<T: FromValue + Hash + Eq> FromValue for IndexSet<T> {
    fn from_value(value: Value) -> anyhow::Result<Self> {
        Ok(Vec::<T>::from_value(value)?.into_iter().collect())
    }
}

impl<K, V> FromValue for IndexMap<K, V>
where
    K: FromValue + Hash + Eq,
    V: FromValue,
{
    fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| {
                    let key = K::from_value(k).context("map key")?;
                    let value = V::from_value(v).context("map value")?;
                    Ok((key, value))
                })
                .collect(),
            other => bail!("expected a map, found {}", other.kind()),
        }
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Object {
                type_name, inner, ..
            } => inner
                .downcast::<T>()
                .map_err(|_| anyhow::anyhow!("object <{}> has an unexpected Rust type", type_name)),
            other => bail!("expected an object, found {}", other.kind()),
        }
    }
}
