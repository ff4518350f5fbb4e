//! Value conversion engine.
//!
//! Turns a raw string into a [`Value`] of the shape described by a
//! [`TypeDescriptor`]. Dispatch order, first match wins:
//!
//! 1. custom converter registered for the exact raw type name
//! 2. string passthrough
//! 3. enum, by exact case-sensitive variant name
//! 4. list / set, comma separated, elements converted recursively
//! 5. map, comma separated `key:value` entries, converted recursively
//! 6. primitive array
//! 7. primitive / boxed primitive
//! 8. recognized string factory on a named type
//! 9. first registered converter whose type is a supertype of the target
//! 10. unsupported type error
//!
//! Custom converters registered for an exact type pre-empt every built-in
//! rule for that type.

mod primitive;

#[cfg(test)]
mod tests;

use crate::error::ConversionError;
use crate::types::{CollectionKind, NamedType, ScalarType, StringFactory, TypeDescriptor};
use crate::value::Value;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::trace;

/// Separates list elements and map entries.
pub const LIST_SEPARATOR: char = ',';

/// Separates a map entry's key from its value.
pub const MAP_ENTRY_DELIMITER: char = ':';

/// Factory method names the converter recognizes, in priority order.
pub const RECOGNIZED_FACTORY_METHODS: [&str; 4] = ["from_str", "parse", "of", "value_of"];

/// A user conversion function: receives the full target descriptor (raw type
/// plus type arguments) and the raw string.
pub type ConverterFn =
    Arc<dyn Fn(&TypeDescriptor, &str) -> anyhow::Result<Value> + Send + Sync>;

/// String to [`Value`] converter with a custom converter registry.
///
/// Registration happens through `&mut self` before the converter is shared;
/// the factory lookup cache is filled lazily from any thread.
#[derive(Default)]
pub struct Converter {
    custom: IndexMap<String, ConverterFn>,
    factories: DashMap<String, Option<StringFactory>>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter for the raw type name `target`.
    ///
    /// Re-registering a type replaces its converter but keeps its original
    /// position in the supertype scan order.
    pub fn register<F>(&mut self, target: impl Into<String>, converter: F)
    where
        F: Fn(&TypeDescriptor, &str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.custom.insert(target.into(), Arc::new(converter));
    }

    pub fn has_converter(&self, target: &str) -> bool {
        self.custom.contains_key(target)
    }

    /// Convert `raw` into a value of type `ty`.
    pub fn convert(&self, raw: &str, ty: &TypeDescriptor) -> Result<Value, ConversionError> {
        let raw_name = ty.raw_name();
        trace!(value = raw, target = %ty, "converting");

        if let Some(converter) = self.custom.get(&raw_name) {
            return converter(ty, raw).map_err(|e| ConversionError::caused_by(raw, ty.to_string(), e));
        }

        match ty {
            TypeDescriptor::Scalar(ScalarType::String) => Ok(Value::String(raw.to_string())),
            TypeDescriptor::Scalar(ScalarType::Enum(enum_type)) => {
                if enum_type.contains(raw) {
                    Ok(Value::Enum {
                        type_name: enum_type.name().to_string(),
                        variant: raw.to_string(),
                    })
                } else {
                    Err(ConversionError::new(
                        raw,
                        enum_type.name(),
                        format!("no variant named '{}'", raw),
                    ))
                }
            }
            TypeDescriptor::Collection { kind, element } => {
                let mut items = Vec::new();
                for token in split_list(raw) {
                    let item = self.convert(token, element)?;
                    if *kind == CollectionKind::Set && items.contains(&item) {
                        continue;
                    }
                    items.push(item);
                }
                Ok(match kind {
                    CollectionKind::List => Value::List(items),
                    CollectionKind::Set => Value::Set(items),
                })
            }
            TypeDescriptor::Map { key, value } => self.convert_map(raw, ty, key, value),
            TypeDescriptor::PrimitiveArray(kind) => {
                let items = split_list(raw)
                    .map(|token| primitive::decode(*kind, token, kind.name()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            }
            TypeDescriptor::Scalar(ScalarType::Primitive(kind))
            | TypeDescriptor::Scalar(ScalarType::Boxed(kind)) => {
                primitive::decode(*kind, raw, &raw_name)
            }
            TypeDescriptor::Scalar(ScalarType::Named(named))
            | TypeDescriptor::Opaque { raw: named, .. } => self.convert_named(raw, ty, named),
        }
    }

    fn convert_map(
        &self,
        raw: &str,
        ty: &TypeDescriptor,
        key_type: &TypeDescriptor,
        value_type: &TypeDescriptor,
    ) -> Result<Value, ConversionError> {
        let mut entries: Vec<(Value, Value)> = Vec::new();
        for entry in split_list(raw).filter(|entry| !entry.is_empty()) {
            let parts: Vec<&str> = entry.split(MAP_ENTRY_DELIMITER).collect();
            let [key, value] = parts.as_slice() else {
                return Err(ConversionError::new(
                    raw,
                    ty.to_string(),
                    format!(
                        "malformed map entry '{}', expected key{}value",
                        entry, MAP_ENTRY_DELIMITER
                    ),
                ));
            };
            let key = self.convert(key.trim(), key_type)?;
            let value = self.convert(value.trim(), value_type)?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(Value::Map(entries))
    }

    fn convert_named(
        &self,
        raw: &str,
        ty: &TypeDescriptor,
        named: &NamedType,
    ) -> Result<Value, ConversionError> {
        if let Some(factory) = self.factory_for(named) {
            return factory
                .invoke(raw)
                .map_err(|e| ConversionError::caused_by(raw, ty.to_string(), e));
        }

        let fallback = self
            .custom
            .iter()
            .find(|(target, _)| named.is_assignable_to(target));
        if let Some((target, converter)) = fallback {
            trace!(target = %ty, via = %target, "using supertype converter");
            return converter(ty, raw).map_err(|e| ConversionError::caused_by(raw, ty.to_string(), e));
        }

        Err(ConversionError::unsupported(raw, &ty.to_string()))
    }

    /// Looks up the recognized factory for `named`, caching the answer
    /// (including "none") per type name. A factory only qualifies when its
    /// return type is assignable to the target type.
    fn factory_for(&self, named: &NamedType) -> Option<StringFactory> {
        if let Some(cached) = self.factories.get(named.name()) {
            return cached.clone();
        }
        let found = RECOGNIZED_FACTORY_METHODS.iter().find_map(|method| {
            named
                .factories()
                .iter()
                .find(|f| f.method() == *method && f.returns_assignable_to(named.name()))
                .cloned()
        });
        self.factories
            .entry(named.name().to_string())
            .or_insert(found)
            .clone()
    }
}

/// Split a list literal on commas, trimming each token. Blank input has no
/// tokens at all.
fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    let blank = raw.trim().is_empty();
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(move |_| !blank)
}
