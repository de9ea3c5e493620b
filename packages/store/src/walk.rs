//! Path descent through a value tree.
//!
//! Views are keyed by `(collection, path)` where the path is a sequence of
//! object keys and numeric array indexes; this module is the single place
//! that walks such a path over raw data.

use serde_json::Value;

/// Descend into `value` along `path`.
///
/// Object components index maps; numeric components index arrays. Returns
/// `None` when a component is missing or the walk hits a non-container.
///
/// # Example
///
/// ```rust
/// use facet_store::walk::descend;
/// use serde_json::json;
///
/// let data = json!({"rows": [{"name": "Alice"}]});
/// let path = ["rows".to_string(), "0".to_string(), "name".to_string()];
/// assert_eq!(descend(&data, &path), Some(&json!("Alice")));
/// ```
pub fn descend<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for component in path {
        current = match current {
            Value::Object(map) => map.get(component)?,
            Value::Array(items) => {
                let index: usize = component.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Join a parent path and one more component.
pub fn child_path(path: &[String], component: &str) -> Vec<String> {
    let mut extended = Vec::with_capacity(path.len() + 1);
    extended.extend_from_slice(path);
    extended.push(component.to_string());
    extended
}
