//! JSON manipulation utilities for the flowforge engine.
//!
//! Provides dot-path lookup into `serde_json::Value` trees, used by the
//! runtime to resolve edge predicates against node output state.

use serde_json::Value;

/// Get a value using a JSON pointer-like path.
///
/// # Parameters
/// * `value` - JSON value to search in
/// * `path` - Dot-separated path (e.g., "user.profile.name")
///
/// # Returns
/// Reference to the value if found, None otherwise
///
/// # Examples
///
/// ```rust
/// use flowforge::utils::json_ext::get_by_path;
/// use serde_json::json;
///
/// let data = json!({"user": {"profile": {"name": "Alice"}}});
/// let name = get_by_path(&data, "user.profile.name");
/// assert_eq!(name, Some(&json!("Alice")));
/// ```
#[must_use]
pub fn get_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let parts: Vec<&str> = path.split('.').collect();
    let mut current = value;

    for part in parts {
        match current {
            Value::Object(obj) => {
                current = obj.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_path_returns_the_whole_value() {
        let data = json!({"a": 1});
        assert_eq!(get_by_path(&data, ""), Some(&data));
    }

    #[test]
    fn nested_object_path_resolves() {
        let data = json!({"user": {"profile": {"name": "Alice"}}});
        assert_eq!(
            get_by_path(&data, "user.profile.name"),
            Some(&json!("Alice"))
        );
    }

    #[test]
    fn array_index_segment_resolves() {
        let data = json!({"items": [10, 20, 30]});
        assert_eq!(get_by_path(&data, "items.1"), Some(&json!(20)));
    }

    #[test]
    fn missing_key_returns_none() {
        let data = json!({"a": 1});
        assert_eq!(get_by_path(&data, "b"), None);
    }

    #[test]
    fn non_numeric_array_segment_returns_none() {
        let data = json!({"items": [1, 2, 3]});
        assert_eq!(get_by_path(&data, "items.first"), None);
    }

    #[test]
    fn path_through_a_scalar_returns_none() {
        let data = json!({"a": 1});
        assert_eq!(get_by_path(&data, "a.b"), None);
    }
}
