//! Message identity and merge helpers
//!
//! Information Hiding:
//! - Message payloads are opaque JSON; only the `id` is ever inspected
//! - Cursor encoding is owned by adapters, never interpreted here

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// A single chat turn as seen by the conversation engine.
///
/// `id` is the only field the engine understands. Everything else (role,
/// content, timestamps, tool calls...) rides along in `payload` and is
/// flattened back into the same JSON object on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMessage {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl UnifiedMessage {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: Map::new(),
        }
    }

    /// Builder-style helper to attach a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn role(&self) -> Option<&str> {
        self.field("role").and_then(Value::as_str)
    }

    pub fn content(&self) -> Option<&str> {
        self.field("content").and_then(Value::as_str)
    }

    /// Messages without an id cannot be tracked and are dropped by [`dedupe`].
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Shallow-merge `patch` into the payload. The id is not patchable.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) {
        for (name, value) in patch {
            if name == "id" {
                continue;
            }
            self.payload.insert(name.clone(), value.clone());
        }
    }
}

/// Opaque pagination token handed out by an adapter.
///
/// The engine stores and echoes cursors but never looks inside them, so
/// adapters are free to use strings, numbers or structured JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub Value);

impl Cursor {
    pub fn new(raw: impl Into<Value>) -> Self {
        Self(raw.into())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.0.as_u64()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(raw) => formatter.write_str(raw),
            other => write!(formatter, "{}", other),
        }
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<u64> for Cursor {
    fn from(value: u64) -> Self {
        Self(Value::from(value))
    }
}

/// Keep the first occurrence of every id, in input order.
///
/// Items with an empty id are skipped.
pub fn dedupe(messages: &[UnifiedMessage]) -> Vec<UnifiedMessage> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(messages.len());
    let mut kept = Vec::with_capacity(messages.len());

    for message in messages {
        if !message.has_id() {
            continue;
        }
        if seen.insert(message.id.as_str()) {
            kept.push(message.clone());
        }
    }

    kept
}

/// Owned variant of [`dedupe`] used on freshly merged lists.
pub fn dedupe_owned(messages: Vec<UnifiedMessage>) -> Vec<UnifiedMessage> {
    let mut seen: HashSet<String> = HashSet::with_capacity(messages.len());
    messages
        .into_iter()
        .filter(|message| message.has_id() && seen.insert(message.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ids(messages: &[UnifiedMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let input = vec![
            UnifiedMessage::new("a").with_field("content", "first"),
            UnifiedMessage::new("b"),
            UnifiedMessage::new("a").with_field("content", "second"),
        ];

        let output = dedupe(&input);
        assert_eq!(ids(&output), vec!["a", "b"]);
        assert_eq!(output[0].content(), Some("first"));
    }

    #[test]
    fn test_dedupe_skips_missing_ids() {
        let input = vec![
            UnifiedMessage::new(""),
            UnifiedMessage::new("x"),
            UnifiedMessage::new(""),
        ];
        assert_eq!(ids(&dedupe(&input)), vec!["x"]);
    }

    #[test]
    fn test_dedupe_edge_cases() {
        assert!(dedupe(&[]).is_empty());

        let all_same = vec![
            UnifiedMessage::new("m").with_field("n", 1),
            UnifiedMessage::new("m").with_field("n", 2),
            UnifiedMessage::new("m").with_field("n", 3),
        ];
        let output = dedupe(&all_same);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].field("n"), Some(&json!(1)));
    }

    #[test]
    fn test_message_json_shape() {
        let raw = json!({"id": "m1", "role": "user", "content": "hi"});
        let message: UnifiedMessage = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(message.id, "m1");
        assert_eq!(message.role(), Some("user"));
        assert_eq!(serde_json::to_value(&message).unwrap(), raw);

        let anonymous: UnifiedMessage = serde_json::from_value(json!({"content": "?"})).unwrap();
        assert!(!anonymous.has_id());
    }

    #[test]
    fn test_apply_patch_ignores_id() {
        let mut message = UnifiedMessage::new("m1").with_field("content", "Hel");
        let mut patch = Map::new();
        patch.insert("content".to_string(), json!("Hello"));
        patch.insert("id".to_string(), json!("other"));

        message.apply_patch(&patch);
        assert_eq!(message.id, "m1");
        assert_eq!(message.content(), Some("Hello"));
    }

    #[test]
    fn test_cursor_is_opaque() {
        assert_eq!(Cursor::from("c1").to_string(), "c1");
        assert_eq!(Cursor::from(42u64).as_u64(), Some(42));
        let structured = Cursor::new(json!({"before": 7}));
        assert_eq!(structured.to_string(), r#"{"before":7}"#);
    }

    fn arb_messages() -> impl Strategy<Value = Vec<UnifiedMessage>> {
        prop::collection::vec("[a-e]{0,1}", 0..40)
            .prop_map(|raw| raw.into_iter().map(UnifiedMessage::new).collect())
    }

    proptest! {
        #[test]
        fn prop_dedupe_is_idempotent(input in arb_messages()) {
            let once = dedupe(&input);
            prop_assert_eq!(dedupe(&once), once.clone());
            prop_assert_eq!(dedupe_owned(input), once);
        }

        #[test]
        fn prop_dedupe_preserves_first_seen_order(input in arb_messages()) {
            let mut expected: Vec<String> = Vec::new();
            for message in &input {
                if !message.id.is_empty() && !expected.contains(&message.id) {
                    expected.push(message.id.clone());
                }
            }
            let actual: Vec<String> = dedupe(&input).into_iter().map(|m| m.id).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
