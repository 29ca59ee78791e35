use serde_json::Value;

/// Recursively merges `patch` into `target`. Objects merge per field, arrays
/// merge per position, anything else is overwritten.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (name, value) in patch {
                match target.get_mut(name) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(name.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(patch)) => {
            for (position, value) in patch.iter().enumerate() {
                match target.get_mut(position) {
                    Some(existing) => deep_merge(existing, value),
                    None => target.push(value.clone()),
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

/// Partial deep comparison: every field of `pattern` must match in `target`,
/// every element of a pattern array must match some element of the target array.
pub fn is_match(target: &Value, pattern: &Value) -> bool {
    match (target, pattern) {
        (Value::Object(target), Value::Object(pattern)) => pattern
            .iter()
            .all(|(name, expected)| target.get(name).is_some_and(|actual| is_match(actual, expected))),
        (Value::Array(target), Value::Array(pattern)) => pattern
            .iter()
            .all(|expected| target.iter().any(|actual| is_match(actual, expected))),
        _ => target == pattern,
    }
}
