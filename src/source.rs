//! Raw key/value sources.
//!
//! The engines only need [`RawSource::get`]. [`PropertiesSource`] is the
//! stock implementation: an insertion-ordered string map that can be parsed
//! from `.properties` text or flattened from YAML, and layered so that later
//! sources override earlier ones.
//!
//! # Properties format
//!
//! ```text
//! # comment
//! ! also a comment
//! Server.Port = 8080
//! Server.Name: primary
//! Greeting hello \
//!     world
//! ```

use crate::error::SourceError;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;

/// A flat, immutable string-keyed source.
pub trait RawSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// All keys, in source order where the source has one.
    fn keys(&self) -> Vec<String>;
}

impl RawSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = HashMap::keys(self).cloned().collect();
        keys.sort();
        keys
    }
}

/// Insertion-ordered in-memory source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesSource {
    values: IndexMap<String, String>,
}

impl PropertiesSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of this source; its keys win.
    pub fn merge(&mut self, other: PropertiesSource) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    /// Merge sources in order, later layers overriding earlier ones.
    pub fn layered<I: IntoIterator<Item = PropertiesSource>>(layers: I) -> Self {
        let mut merged = Self::new();
        for layer in layers {
            merged.merge(layer);
        }
        merged
    }

    /// Load a source file, choosing the format by extension: `.yaml` and
    /// `.yml` are flattened YAML, anything else is properties text.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Ok(Self::parse_properties(&content))
        }
    }

    /// Parse `.properties` text. Malformed lines cannot occur: every
    /// non-comment logical line yields a key, possibly with an empty value.
    pub fn parse_properties(text: &str) -> Self {
        let mut source = Self::new();
        for line in logical_lines(text) {
            let (key, value) = split_property(&line);
            source.insert(unescape(key), unescape(value));
        }
        source
    }

    /// Flatten a YAML document: nested mappings become dot-joined keys and
    /// scalar sequences become comma-joined values.
    pub fn from_yaml(text: &str) -> Result<Self, SourceError> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| SourceError::Yaml(e.to_string()))?;
        let mut source = Self::new();
        if !document.is_null() {
            flatten_yaml("", &document, &mut source)?;
        }
        Ok(source)
    }
}

impl RawSource for PropertiesSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Join continuation lines and drop comments and blank lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim_start();
        let continuing = current.is_some();
        if !continuing && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        let trailing_backslashes = line.chars().rev().take_while(|c| *c == '\\').count();
        let continues = trailing_backslashes % 2 == 1;
        let content = if continues {
            &line[..line.len() - 1]
        } else {
            line
        };

        let buffer = current.get_or_insert_with(String::new);
        buffer.push_str(content);
        if !continues {
            lines.extend(current.take());
        }
    }
    lines.extend(current);
    lines
}

/// Split a logical line at the first unescaped `=`, `:` or whitespace.
fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }
    (key, rest)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Tagged(tagged) => yaml_scalar(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
    }
}

fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut PropertiesSource,
) -> Result<(), SourceError> {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let segment = yaml_scalar(key).ok_or_else(|| {
                    SourceError::Yaml(format!("non-scalar mapping key under '{}'", prefix))
                })?;
                flatten_yaml(&join_key(prefix, &segment), child, out)?;
            }
        }
        serde_yaml::Value::Sequence(items) => {
            let scalars: Option<Vec<String>> = items.iter().map(yaml_scalar).collect();
            match scalars {
                Some(scalars) => out.insert(prefix, scalars.join(",")),
                None => {
                    for (i, item) in items.iter().enumerate() {
                        flatten_yaml(&join_key(prefix, &i.to_string()), item, out)?;
                    }
                }
            }
        }
        serde_yaml::Value::Tagged(tagged) => flatten_yaml(prefix, &tagged.value, out)?,
        scalar => {
            if prefix.is_empty() {
                return Err(SourceError::Yaml(
                    "top-level document must be a mapping".to_string(),
                ));
            }
            out.insert(prefix, yaml_scalar(scalar).unwrap_or_default());
        }
    }
    Ok(())
}
