//! Typed document objects and the indirect references that link them.
//!
//! Containers own their nested values directly. Links between top-level
//! objects are always `Object::Reference` values resolved through an
//! [`ObjectStore`](crate::store::ObjectStore), so the graph may contain cycles
//! while every individual `Object` stays a finite tree.

use crate::compression::{self, StreamFilter};
use crate::error::DedupError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Indirect reference: an (object number, generation number) pair.
///
/// Ordering is by object number, then generation, which is also the stable
/// enumeration order of [`ObjectTable`](crate::store::ObjectTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    /// Object number
    pub object: u32,
    /// Generation number
    pub generation: u16,
}

impl Reference {
    /// Create a reference from its object and generation numbers
    pub const fn new(object: u32, generation: u16) -> Self {
        Self { object, generation }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.object, self.generation)
    }
}

/// A name token, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl Name {
    /// Raw bytes of the name
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Name {
    fn from(b: &[u8]) -> Self {
        Name(b.to_vec())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.0))
    }
}

/// Key/value mapping that preserves insertion order.
///
/// Keys are unique. Re-inserting an existing key replaces its value without
/// moving it, so iteration order is the order keys were first added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(Name, Object)>", into = "Vec<(Name, Object)>")]
pub struct Dictionary {
    entries: Vec<(Name, Object)>,
}

impl Dictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Returns the previous value for the key.
    pub fn insert(&mut self, key: impl Into<Name>, value: impl Into<Object>) -> Option<Object> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_bytes() == key.as_bytes())
            .map(|(_, v)| v)
    }

    /// Look up a value by key for mutation
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.as_bytes() == key.as_bytes())
            .map(|(_, v)| v)
    }

    /// Remove a key, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.as_bytes() == key.as_bytes())?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate entries with mutable values. Keys are never handed out mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Name, &mut Object)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<(Name, Object)>> for Dictionary {
    fn from(entries: Vec<(Name, Object)>) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in entries {
            dict.insert(k, v);
        }
        dict
    }
}

impl From<Dictionary> for Vec<(Name, Object)> {
    fn from(dict: Dictionary) -> Self {
        dict.entries
    }
}

impl<K: Into<Name>, V: Into<Object>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// A dictionary with an attached byte payload.
///
/// `data` holds the payload as stored, encoded with `filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Stream dictionary
    pub dict: Dictionary,
    /// Encoding applied to `data`
    #[serde(default)]
    pub filter: StreamFilter,
    /// Encoded payload
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Stream {
    /// Build a stream from plain bytes, encoding them with `filter`.
    pub fn with_data(dict: Dictionary, filter: StreamFilter, plain: &[u8]) -> Result<Self, DedupError> {
        let data = compression::encode(plain, filter)?;
        Ok(Self { dict, filter, data })
    }

    /// Decoded payload, independent of how it is stored.
    pub fn materialize(&self) -> Result<Vec<u8>, DedupError> {
        compression::decode(&self.data, self.filter)
    }
}

/// A typed value in the document graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    /// The null object
    Null,
    /// Boolean
    Bool(bool),
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// String, raw bytes
    String(#[serde(with = "serde_bytes")] Vec<u8>),
    /// Name
    Name(Name),
    /// Ordered sequence of objects
    Array(Vec<Object>),
    /// Keyed container
    Dictionary(Dictionary),
    /// Link to a top-level object
    Reference(Reference),
    /// Dictionary with an attached payload
    Stream(Stream),
    /// Content that could not be classified when it was read
    Opaque(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl Object {
    /// Build a string object from text
    pub fn string(s: &str) -> Self {
        Object::String(s.as_bytes().to_vec())
    }

    /// Build a name object from text
    pub fn name(s: &str) -> Self {
        Object::Name(Name::from(s))
    }

    /// Short label for the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Bool(_) => "bool",
            Object::Integer(_) => "int",
            Object::Real(_) => "real",
            Object::String(_) => "str",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dict",
            Object::Reference(_) => "ref",
            Object::Stream(_) => "stream",
            Object::Opaque(_) => "unknown",
        }
    }

    /// Integer value, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Referenced object, if this is a reference
    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Array elements, if this is an array
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or stream object
    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// True if this is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Object::Array(_))
    }

    /// True if this is a plain dictionary (not a stream)
    pub fn is_dictionary(&self) -> bool {
        matches!(self, Object::Dictionary(_))
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Bool(v)
    }
}

impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}

impl From<i32> for Object {
    fn from(v: i32) -> Self {
        Object::Integer(v as i64)
    }
}

impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v)
    }
}

impl From<Name> for Object {
    fn from(v: Name) -> Self {
        Object::Name(v)
    }
}

impl From<Reference> for Object {
    fn from(v: Reference) -> Self {
        Object::Reference(v)
    }
}

impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}

impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}

impl From<Stream> for Object {
    fn from(v: Stream) -> Self {
        Object::Stream(v)
    }
}
