//! Content fingerprinting: canonical rendering of an object subtree and its BLAKE3 digest
//!
//! Each variant is written with its kind tag so different types never collide:
//!
//! ```text
//! null | bool:true | int:42 | real:1.5 | str:<bytes> | name:<bytes>
//! array:[<fp>,<fp>] | dict:{<key>:<fp>,...}[stream:<bytes>] | ref:<obj>:<gen> | unknown
//! ```
//!
//! Recursion descends only into owned container contents. A reference is
//! rendered from its own object and generation numbers and is never followed,
//! so rendering terminates on cyclic graphs.

use crate::error::DedupError;
use crate::object::{Dictionary, Object};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// A 32-byte BLAKE3 hash of a fingerprint. Short, loggable identity for a
/// duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Return the digest as a lowercase hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
    /// Return the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Canonical rendering of an object. Two objects merge iff their
/// fingerprints are byte-for-byte equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// The canonical rendering
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// BLAKE3 digest of the rendering
    pub fn digest(&self) -> ContentDigest {
        ContentDigest(*blake3::hash(&self.0).as_bytes())
    }

    /// Length of the rendering in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty rendering (never produced by [`fingerprint`])
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Fingerprint an object. In aggressive mode a stream's decoded payload is
/// appended after its dictionary; the only error is a failure to decode it.
pub fn fingerprint(object: &Object, aggressive: bool) -> Result<Fingerprint, DedupError> {
    let mut out = Vec::new();
    render(&mut out, object, aggressive)?;
    Ok(Fingerprint(out))
}

fn render(out: &mut Vec<u8>, object: &Object, aggressive: bool) -> Result<(), DedupError> {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Bool(v) => out.extend_from_slice(if *v { &b"bool:true"[..] } else { b"bool:false" }),
        Object::Integer(v) => write!(out, "int:{}", v)?,
        Object::Real(v) => write!(out, "real:{}", v)?,
        Object::String(bytes) => {
            out.extend_from_slice(b"str:");
            out.extend_from_slice(bytes);
        }
        Object::Name(name) => {
            out.extend_from_slice(b"name:");
            out.extend_from_slice(name.as_bytes());
        }
        Object::Array(items) => {
            out.extend_from_slice(b"array:[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                render(out, item, aggressive)?;
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => render_dict(out, dict, aggressive)?,
        Object::Stream(stream) => {
            render_dict(out, &stream.dict, aggressive)?;
            if aggressive {
                out.extend_from_slice(b"stream:");
                out.extend_from_slice(&stream.materialize()?);
            }
        }
        Object::Reference(r) => write!(out, "ref:{}:{}", r.object, r.generation)?,
        Object::Opaque(_) => out.extend_from_slice(b"unknown"),
    }
    Ok(())
}

// Entries are rendered in insertion order, not sorted: reordered dictionaries
// keep distinct fingerprints.
fn render_dict(out: &mut Vec<u8>, dict: &Dictionary, aggressive: bool) -> Result<(), DedupError> {
    out.extend_from_slice(b"dict:{");
    for (i, (key, value)) in dict.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(key.as_bytes());
        out.push(b':');
        render(out, value, aggressive)?;
    }
    out.push(b'}');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::StreamFilter;
    use crate::object::{Name, Reference, Stream};

    fn fp(object: &Object) -> String {
        fingerprint(object, false).unwrap().to_string()
    }

    #[test]
    fn test_scalar_encodings() {
        assert_eq!(fp(&Object::Null), "null");
        assert_eq!(fp(&Object::Bool(true)), "bool:true");
        assert_eq!(fp(&Object::Bool(false)), "bool:false");
        assert_eq!(fp(&Object::Integer(-42)), "int:-42");
        assert_eq!(fp(&Object::Real(1.5)), "real:1.5");
        assert_eq!(fp(&Object::string("Hello")), "str:Hello");
        assert_eq!(fp(&Object::name("Type")), "name:Type");
        assert_eq!(fp(&Object::Opaque(vec![1, 2, 3])), "unknown");
    }

    #[test]
    fn test_type_tag_separates_equal_text() {
        assert_ne!(fp(&Object::string("Page")), fp(&Object::name("Page")));
        assert_ne!(fp(&Object::Integer(1)), fp(&Object::Real(1.0)));
    }

    #[test]
    fn test_array_renders_elements_in_order() {
        let arr = Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)]);
        assert_eq!(fp(&arr), "array:[int:1,int:2,int:3]");
        let rev = Object::Array(vec![Object::Integer(3), Object::Integer(2), Object::Integer(1)]);
        assert_ne!(fp(&arr), fp(&rev));
    }

    #[test]
    fn test_reference_is_not_followed() {
        let arr = Object::Array(vec![Reference::new(12, 3).into()]);
        assert_eq!(fp(&arr), "array:[ref:12:3]");
    }

    #[test]
    fn test_dictionary_uses_insertion_order() {
        let ab: Dictionary = [("A", 1), ("B", 2)].into_iter().collect();
        let ba: Dictionary = [("B", 2), ("A", 1)].into_iter().collect();
        assert_eq!(fp(&Object::Dictionary(ab.clone())), "dict:{A:int:1,B:int:2}");
        assert_ne!(fp(&Object::Dictionary(ab)), fp(&Object::Dictionary(ba)));
    }

    #[test]
    fn test_nested_containers() {
        let mut inner = Dictionary::new();
        inner.insert("inner", 123);
        let outer = Object::Array(vec![Object::Dictionary(inner), Object::Integer(456)]);
        assert_eq!(fp(&outer), "array:[dict:{inner:int:123},int:456]");
    }

    #[test]
    fn test_stream_bytes_only_in_aggressive_mode() {
        let mut dict = Dictionary::new();
        dict.insert("Length", 3);
        let stream = Object::Stream(Stream::with_data(dict, StreamFilter::Lz4, b"abc").unwrap());
        assert_eq!(fingerprint(&stream, false).unwrap().to_string(), "dict:{Length:int:3}");
        assert_eq!(
            fingerprint(&stream, true).unwrap().to_string(),
            "dict:{Length:int:3}stream:abc"
        );
    }

    #[test]
    fn test_aggressive_mode_decodes_before_rendering() {
        let plain = Stream::with_data(Dictionary::new(), StreamFilter::None, b"xyz").unwrap();
        let packed = Stream::with_data(Dictionary::new(), StreamFilter::Zstd { level: 3 }, b"xyz").unwrap();
        assert_eq!(
            fingerprint(&Object::Stream(plain), true).unwrap(),
            fingerprint(&Object::Stream(packed), true).unwrap()
        );
    }

    #[test]
    fn test_undecodable_stream_fails_only_when_aggressive() {
        let broken = Object::Stream(Stream {
            dict: Dictionary::new(),
            filter: StreamFilter::Lz4,
            data: vec![10, 0, 0, 0, 0xff],
        });
        assert!(fingerprint(&broken, false).is_ok());
        assert!(matches!(
            fingerprint(&broken, true),
            Err(DedupError::StreamDecodeFailed(_))
        ));
    }

    #[test]
    fn test_digest_tracks_rendering() {
        let a = fingerprint(&Object::Integer(42), false).unwrap();
        let b = fingerprint(&Object::Integer(42), false).unwrap();
        let c = fingerprint(&Object::Integer(43), false).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().to_hex().len(), 64);
    }

    #[test]
    fn test_raw_name_bytes_are_kept() {
        let name = Object::Name(Name(vec![0xfe, b'x']));
        assert_eq!(fingerprint(&name, false).unwrap().as_bytes(), b"name:\xfex");
    }
}
