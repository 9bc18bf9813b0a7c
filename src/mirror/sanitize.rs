use serde_json::Value;

/// Strip NUL characters from every string leaf, recursing through arrays and objects
///
/// SQLite text columns truncate at NUL in some drivers, so content is
/// cleaned before it is stored.
pub fn strip_nul(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains('\0') {
                s.retain(|c| c != '\0');
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nul),
        Value::Object(map) => map.values_mut().for_each(strip_nul),
        _ => {}
    }
}

/// Owned variant of [`strip_nul`]
pub fn sanitized(mut value: Value) -> Value {
    strip_nul(&mut value);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_nested_nul() {
        let value = sanitized(json!({
            "title": "Wait\u{0000}ing",
            "themes": [{"name": "Tr\u{0000}ust", "weight": 3}, "plain"],
            "nested": {"deeper": ["a\u{0000}b\u{0000}c"]},
            "empty": null
        }));

        assert_eq!(
            value,
            json!({
                "title": "Waiting",
                "themes": [{"name": "Trust", "weight": 3}, "plain"],
                "nested": {"deeper": ["abc"]},
                "empty": null
            })
        );
    }

    #[test]
    fn test_other_characters_untouched() {
        let original = json!({"text": "Psalm 46:10 \u{2014} \"Be still\"\n\tand know"});
        assert_eq!(sanitized(original.clone()), original);
    }
}
