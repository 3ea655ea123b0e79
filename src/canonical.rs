//! The single canonical encoder used for every hash and signature input.
//!
//! spec.md §4.C and §9 are explicit that canonicalization is load-bearing:
//! any mismatch between writer and reader breaks both the epoch chain and
//! the document signature. Every hash in this crate goes through
//! [`CanonicalValue::encode`] — never through `serde_json`'s own
//! serializer, which is reserved for cosmetic on-disk I/O.

use serde_json::Value as Json;
use sha2::{Digest, Sha256};

/// A value ready for canonical encoding. Object keys are kept in
/// insertion order (spec.md §4.C: "keys in insertion order ... not
/// alphabetized").
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<CanonicalValue>),
    Object(Vec<(String, CanonicalValue)>),
}

impl CanonicalValue {
    pub fn object(fields: Vec<(&str, CanonicalValue)>) -> Self {
        CanonicalValue::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Convert an opaque `serde_json::Value` (e.g. editor-supplied delta
    /// ops) into a `CanonicalValue`, preserving whatever key order the
    /// `Value` carries. Requires `serde_json`'s `preserve_order` feature
    /// so `Value::Object` iterates in insertion order rather than
    /// alphabetically.
    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => CanonicalValue::Null,
            Json::Bool(b) => CanonicalValue::Bool(*b),
            Json::Number(n) => {
                if let Some(u) = n.as_u64() {
                    CanonicalValue::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    CanonicalValue::Int(i)
                } else {
                    CanonicalValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => CanonicalValue::Str(s.clone()),
            Json::Array(items) => {
                CanonicalValue::Array(items.iter().map(CanonicalValue::from_json).collect())
            }
            Json::Object(map) => CanonicalValue::Object(
                map.iter().map(|(k, v)| (k.clone(), CanonicalValue::from_json(v))).collect(),
            ),
        }
    }

    /// Render to the canonical string: no whitespace, standard JSON
    /// string escaping, shortest decimal form for numbers, integers
    /// never in exponent form.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    /// SHA-256 over the UTF-8 bytes of the canonical encoding.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.encode().as_bytes());
        hasher.finalize().into()
    }

    fn write(&self, out: &mut String) {
        match self {
            CanonicalValue::Null => out.push_str("null"),
            CanonicalValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            CanonicalValue::UInt(u) => out.push_str(&u.to_string()),
            CanonicalValue::Int(i) => out.push_str(&i.to_string()),
            CanonicalValue::Float(f) => out.push_str(&format_float(*f)),
            CanonicalValue::Str(s) => write_json_string(s, out),
            CanonicalValue::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write(out);
                }
                out.push(']');
            }
            CanonicalValue::Object(fields) => {
                out.push('{');
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_json_string(k, out);
                    out.push(':');
                    v.write(out);
                }
                out.push('}');
            }
        }
    }
}

/// Shortest decimal form, no trailing zeros after the decimal point, no
/// exponent notation. Rust's `f64` `Display` already produces the
/// shortest round-trippable decimal and never emits scientific notation,
/// so whole values (`10.0`) print as `10` and fractional values
/// (`9.875`) keep only their significant digits.
fn format_float(f: f64) -> String {
    if f.is_nan() || f.is_infinite() {
        return "0".to_string();
    }
    format!("{f}")
}

fn write_json_string(s: &str, out: &mut String) {
    // serde_json's string serializer implements exactly the "standard
    // JSON escaping" the spec calls for; reuse it for this one piece.
    out.push_str(&serde_json::to_string(s).expect("string serialization cannot fail"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_without_whitespace_in_insertion_order() {
        let v = CanonicalValue::object(vec![
            ("b", CanonicalValue::UInt(1)),
            ("a", CanonicalValue::UInt(2)),
        ]);
        assert_eq!(v.encode(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn floats_drop_trailing_zero() {
        assert_eq!(format_float(10.0), "10");
        assert_eq!(format_float(9.875), "9.875");
    }

    #[test]
    fn strings_are_escaped() {
        let v = CanonicalValue::Str("a\"b\nc".to_string());
        assert_eq!(v.encode(), r#""a\"b\nc""#);
    }

    #[test]
    fn json_object_order_is_preserved() {
        let json: Json = serde_json::from_str(r#"{"z":1,"a":2}"#).unwrap();
        let canon = CanonicalValue::from_json(&json);
        assert_eq!(canon.encode(), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn hash_is_deterministic() {
        let v = CanonicalValue::object(vec![("x", CanonicalValue::UInt(1))]);
        assert_eq!(v.hash(), v.clone().hash());
    }
}
