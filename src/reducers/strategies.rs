//! The two built-in reducer strategies.

use serde_json::Value;

use super::ReducerError;
use crate::message::Message;

/// Overwrite outright. Used for any field not explicitly bound to
/// `add_messages` in a state contract.
pub fn replace(_field: &str, current: Value, incoming: Value) -> Result<Value, ReducerError> {
    let _ = current;
    Ok(incoming)
}

/// Append `incoming` onto `current`, both interpreted as JSON arrays of
/// message-shaped objects, deduplicating by a stable `id` when present.
///
/// Resolution of the open question on exact semantics: a message carrying
/// an `id` that already exists in `current` is dropped (first write wins);
/// a message without an `id`, or with an `id` not yet seen, is always
/// appended. Order is preserved: `current` messages first, then surviving
/// `incoming` messages in their original order.
pub fn add_messages(field: &str, current: Value, incoming: Value) -> Result<Value, ReducerError> {
    let current_list = as_message_array(field, current)?;
    let incoming_list = as_message_array(field, incoming)?;

    let mut seen_ids: std::collections::HashSet<String> = current_list
        .iter()
        .filter_map(|m| m.id.clone())
        .collect();

    let mut merged = current_list;
    for msg in incoming_list {
        if let Some(id) = &msg.id {
            if seen_ids.contains(id) {
                continue;
            }
            seen_ids.insert(id.clone());
        }
        merged.push(msg);
    }

    Ok(serde_json::to_value(merged).expect("Message serializes infallibly"))
}

fn as_message_array(field: &str, value: Value) -> Result<Vec<Message>, ReducerError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(value).map_err(|_| ReducerError::ShapeMismatch {
            field: field.to_string(),
            expected: "array of messages",
            found: "array with non-message elements",
        }),
        other => Err(ReducerError::ShapeMismatch {
            field: field.to_string(),
            expected: "array of messages",
            found: type_name(&other),
        }),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_messages_drops_duplicate_ids() {
        let current = json!([{"role": "user", "content": "hi", "id": "m1"}]);
        let incoming = json!([
            {"role": "user", "content": "hi again", "id": "m1"},
            {"role": "assistant", "content": "hello", "id": "m2"},
        ]);
        let merged = add_messages("messages", current, incoming).unwrap();
        let merged: Vec<Message> = serde_json::from_value(merged).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content, "hi");
        assert_eq!(merged[1].id.as_deref(), Some("m2"));
    }

    #[test]
    fn add_messages_always_appends_when_no_id() {
        let current = json!([]);
        let incoming = json!([
            {"role": "user", "content": "a"},
            {"role": "user", "content": "a"},
        ]);
        let merged = add_messages("messages", current, incoming).unwrap();
        let merged: Vec<Message> = serde_json::from_value(merged).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn replace_ignores_current_value() {
        let got = replace("count", json!(1), json!(2)).unwrap();
        assert_eq!(got, json!(2));
    }
}
