//! Deep merge and dotted-key assignment on JSON configuration trees.

use serde_json::{Map, Value};

/// Merge `source` into `target`.
///
/// Objects are merged key by key, recursively; anything else in `source`
/// (scalars, arrays, `null`) replaces the value in `target`. A non-object
/// `target` receiving an object is replaced by an empty object first.
pub fn merge_deep(target: &mut Value, source: Value) {
    let Value::Object(source) = source else {
        *target = source;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target) = target else {
        return;
    };

    for (key, value) in source {
        match value {
            Value::Object(_) => {
                let slot = target.entry(key).or_insert_with(|| Value::Object(Map::new()));
                merge_deep(slot, value);
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Assign `value` at a dotted path such as `cors.allowedOrigins`, creating
/// intermediate objects as needed.
pub fn set_dotted(target: &mut Value, key: &str, value: Value) {
    let mut current = target;

    for part in key.split('.') {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map.entry(part).or_insert(Value::Null);
    }

    *current = value;
}

/// Look up a dotted path.
pub fn get_dotted<'a>(target: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(target, |current, part| current.as_object()?.get(part))
}
