use serde_json::Value;

/// Recursively merge `patch` into `target`.
///
/// Objects merge key by key; any other value in `patch` replaces what was
/// there. A `null` in the patch overwrites rather than deletes.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, patch_value),
                    None => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_nested_objects() {
        let mut target = json!({"vitals": {"hp": 10, "mp": 4}, "gold": 3});
        deep_merge(&mut target, &json!({"vitals": {"hp": 7}, "torch": true}));
        assert_eq!(
            target,
            json!({"vitals": {"hp": 7, "mp": 4}, "gold": 3, "torch": true})
        );
    }

    #[test]
    fn scalars_replace_objects() {
        let mut target = json!({"equipment": {"hand": "sword"}});
        deep_merge(&mut target, &json!({"equipment": "none"}));
        assert_eq!(target, json!({"equipment": "none"}));
    }
}
