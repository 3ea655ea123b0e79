//! The editor collaborator's delta shape (spec.md §3 `EditDelta`, §6
//! editor collaborator contract, §9 "Delta representation").
//!
//! The core treats `ops` as an opaque JSON value for hashing and chain
//! sealing — it is carried verbatim through [`crate::canonical`]. Only
//! the authorship analyzer (§4.H) needs to look inside it, and it does
//! so through the narrow [`Op`] inspector below rather than by
//! interpreting the stored JSON directly everywhere.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One operation-group the editor emitted, stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditDeltaGroup {
    pub ops: Json,
}

impl EditDeltaGroup {
    pub fn new(ops: Json) -> Self {
        Self { ops }
    }

    /// Parse this group's `ops` array into the analyzer's narrow `Op`
    /// shape, tolerating unknown keys and non-array/non-object ops by
    /// skipping them rather than failing the whole epoch.
    pub fn parse_ops(&self) -> Vec<Op> {
        self.ops
            .as_array()
            .map(|arr| arr.iter().filter_map(Op::from_json).collect())
            .unwrap_or_default()
    }
}

/// The analyzer's view of one operation: `{insert(text)} | {delete(len)}
/// | {retain(len)}` (spec.md §3, §6, §9).
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Insert { text: String },
    Delete { len: u64 },
    Retain { len: u64 },
}

impl Op {
    fn from_json(value: &Json) -> Option<Op> {
        let obj = value.as_object()?;
        if let Some(Json::String(text)) = obj.get("insert") {
            return Some(Op::Insert { text: text.clone() });
        }
        if let Some(n) = obj.get("delete").and_then(Json::as_u64) {
            return Some(Op::Delete { len: n });
        }
        if let Some(n) = obj.get("retain").and_then(Json::as_u64) {
            return Some(Op::Retain { len: n });
        }
        None
    }

    pub fn insert_len(&self) -> Option<usize> {
        match self {
            Op::Insert { text } => Some(text.chars().count()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_shapes_and_skips_unknown() {
        let group = EditDeltaGroup::new(json!([
            {"insert": "hi"},
            {"delete": 3},
            {"retain": 5, "attributes": {"bold": true}},
            {"unknown": "whatever"},
        ]));
        let ops = group.parse_ops();
        assert_eq!(
            ops,
            vec![
                Op::Insert { text: "hi".to_string() },
                Op::Delete { len: 3 },
                Op::Retain { len: 5 },
            ]
        );
    }

    #[test]
    fn ops_are_carried_verbatim_in_the_struct() {
        let group = EditDeltaGroup::new(json!([{"insert": "x"}]));
        let serialized = serde_json::to_value(&group).unwrap();
        assert_eq!(serialized["ops"][0]["insert"], "x");
    }
}
