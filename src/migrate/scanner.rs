use serde_json::Value;

use crate::model::ResourceRef;

/// Walk `tree` and, in every array holding `old`, append `new` unless that
/// same array already holds it. Returns whether any array changed.
///
/// Arrays without `old` are left alone; a match does not stop the walk, so
/// independent arrays each get their own copy of `new`.
pub fn scan_and_augment(tree: &mut Value, old: &ResourceRef, new: &ResourceRef) -> bool {
    match tree {
        Value::Array(items) => {
            let mut modified = false;
            for item in items.iter_mut() {
                if scan_and_augment(item, old, new) {
                    modified = true;
                }
            }
            if items.iter().any(|i| old.matches(i)) && !items.iter().any(|i| new.matches(i)) {
                items.push(new.to_value());
                modified = true;
            }
            modified
        }
        Value::Object(map) => {
            let mut modified = false;
            for value in map.values_mut() {
                if scan_and_augment(value, old, new) {
                    modified = true;
                }
            }
            modified
        }
        _ => false,
    }
}

/// Whether `r` appears anywhere in `tree` as a `{rid, rtype}` object.
pub fn references(tree: &Value, r: &ResourceRef) -> bool {
    if r.matches(tree) {
        return true;
    }
    match tree {
        Value::Array(items) => items.iter().any(|item| references(item, r)),
        Value::Object(map) => map.values().any(|value| references(value, r)),
        _ => false,
    }
}
