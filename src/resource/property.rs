//! Property values and property maps.
//!
//! Property values are dynamically typed and arbitrarily nested. Besides the
//! JSON-like scalars, lists and maps, a value may be `Computed` (unknown until
//! the resource is actually created, only seen during preview) or wrapped as
//! `Secret`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialized form of a computed (unknown) value.
pub const UNKNOWN_SENTINEL: &str = "<unknown>";

/// Key of the single-entry object a secret value serializes to.
pub const SECRET_KEY: &str = "__secret";

/// Name of a property.
pub type PropertyKey = String;

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum PropertyValue {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// String.
    String(String),
    /// Ordered list.
    Array(Vec<PropertyValue>),
    /// Nested property map.
    Object(PropertyMap),
    /// A value that is not known yet.
    Computed,
    /// A value that must not be displayed.
    Secret(Box<PropertyValue>),
}

/// Ordered mapping from property key to value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<PropertyKey, PropertyValue>);

impl PropertyValue {
    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for `Computed`.
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }

    /// Returns true for `Secret`.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Returns the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested map, if this is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns true if this value or anything nested in it is computed.
    #[must_use]
    pub fn contains_unknowns(&self) -> bool {
        match self {
            Self::Computed => true,
            Self::Array(items) => items.iter().any(Self::contains_unknowns),
            Self::Object(map) => map.contains_unknowns(),
            Self::Secret(inner) => inner.contains_unknowns(),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => false,
        }
    }

    /// Wraps this value as a secret. Already-secret values are left alone.
    #[must_use]
    pub fn into_secret(self) -> Self {
        match self {
            Self::Secret(_) => self,
            other => Self::Secret(Box::new(other)),
        }
    }
}

impl PropertyMap {
    /// Creates an empty property map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<PropertyKey>, value: impl Into<PropertyValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a property, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<PropertyKey>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Gets a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    /// Returns true if the property is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.0.iter()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.0.keys()
    }

    /// Returns true if any property value is or contains a computed value.
    #[must_use]
    pub fn contains_unknowns(&self) -> bool {
        self.0.values().any(PropertyValue::contains_unknowns)
    }

    /// Gets the value at a property path such as `tags.env` or `rules[0].port`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&PropertyValue> {
        let segments = path_segments(path)?;
        let (PathSegment::Key(key), rest) = segments.split_first()? else {
            return None;
        };

        let mut value = self.get(key)?;
        for segment in rest {
            value = match (segment, value) {
                (PathSegment::Key(k), PropertyValue::Object(map)) => map.get(k)?,
                (PathSegment::Index(i), PropertyValue::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(value)
    }

    /// Sets (or with `None`, removes) the value at a property path.
    ///
    /// Only the last segment is created or removed; every container above it
    /// must already exist. Returns false when the path could not be reached.
    pub fn set_path(&mut self, path: &str, value: Option<PropertyValue>) -> bool {
        let Some(segments) = path_segments(path) else {
            return false;
        };
        let Some((PathSegment::Key(key), rest)) = segments.split_first() else {
            return false;
        };

        let Some((last, parents)) = rest.split_last() else {
            match value {
                Some(v) => {
                    self.0.insert((*key).to_string(), v);
                }
                None => {
                    self.0.remove(*key);
                }
            }
            return true;
        };

        let Some(mut current) = self.0.get_mut(*key) else {
            return false;
        };
        for segment in parents {
            let next = match (segment, current) {
                (PathSegment::Key(k), PropertyValue::Object(map)) => map.0.get_mut(*k),
                (PathSegment::Index(i), PropertyValue::Array(items)) => items.get_mut(*i),
                _ => None,
            };
            let Some(next) = next else {
                return false;
            };
            current = next;
        }

        match (last, current, value) {
            (PathSegment::Key(k), PropertyValue::Object(map), Some(v)) => {
                map.0.insert((*k).to_string(), v);
            }
            (PathSegment::Key(k), PropertyValue::Object(map), None) => {
                map.0.remove(*k);
            }
            (PathSegment::Index(i), PropertyValue::Array(items), Some(v)) => {
                let Some(slot) = items.get_mut(*i) else {
                    return false;
                };
                *slot = v;
            }
            (PathSegment::Index(i), PropertyValue::Array(items), None) if *i < items.len() => {
                items.remove(*i);
            }
            _ => return false,
        }
        true
    }

    /// Returns a copy with every property from `other` laid over this map.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }
}

/// One step of a property path.
enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Splits `a.b[2].c` into segments. Returns `None` for malformed indexes.
fn path_segments(path: &str) -> Option<Vec<PathSegment<'_>>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let key_end = part.find('[').unwrap_or(part.len());
        if key_end > 0 {
            segments.push(PathSegment::Key(&part[..key_end]));
        }
        for index in part[key_end..].split('[').filter(|s| !s.is_empty()) {
            let index = index.strip_suffix(']')?.parse().ok()?;
            segments.push(PathSegment::Index(index));
        }
    }
    Some(segments)
}

impl FromIterator<(PropertyKey, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (PropertyKey, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a PropertyKey, &'a PropertyValue);
    type IntoIter = std::collections::btree_map::Iter<'a, PropertyKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeMap<PropertyKey, PropertyValue>> for PropertyMap {
    fn from(map: BTreeMap<PropertyKey, PropertyValue>) -> Self {
        Self(map)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Self>> for PropertyValue {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(v)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(v: PropertyMap) -> Self {
        Self::Object(v)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) if s == UNKNOWN_SENTINEL => Self::Computed,
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(mut map) => {
                if map.len() == 1
                    && let Some(inner) = map.remove(SECRET_KEY)
                {
                    return Self::Secret(Box::new(Self::from(inner)));
                }
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Self::Null,
            PropertyValue::Bool(b) => Self::Bool(b),
            PropertyValue::Number(n) => number_to_json(n),
            PropertyValue::String(s) => Self::String(s),
            PropertyValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            PropertyValue::Object(map) => Self::Object(
                map.0
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
            PropertyValue::Computed => Self::String(UNKNOWN_SENTINEL.to_string()),
            PropertyValue::Secret(inner) => {
                let mut map = serde_json::Map::new();
                map.insert(SECRET_KEY.to_string(), Self::from(*inner));
                Self::Object(map)
            }
        }
    }
}

/// Integral numbers serialize without a fractional part.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secret(_) => write!(f, "[secret]"),
            Self::Computed => write!(f, "[unknown]"),
            Self::String(s) => write!(f, "{s:?}"),
            other => {
                let json = serde_json::Value::from(other.clone());
                write!(f, "{json}")
            }
        }
    }
}
