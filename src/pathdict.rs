//! Dot-notation access into JSON documents, as used by the sample filters:
//! `"val.NO2.cnc"` names a leaf three objects deep.

use serde_json::{Map, Value};

/// Resolve a dot-separated path to a node, or `None` where the path breaks.
pub fn node<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;

    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }

    Some(current)
}

/// Resolve a path to a float. Accepts JSON numbers and numeric strings, the
/// two shapes sensor payloads carry values in.
pub fn leaf_f64(root: &Value, path: &str) -> Option<f64> {
    match node(root, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Every leaf path of a document, in document order. Arrays and empty
/// objects count as leaves.
pub fn paths(root: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_paths(root, String::new(), &mut found);
    found
}

fn collect_paths(node: &Value, prefix: String, found: &mut Vec<String>) {
    match node.as_object() {
        Some(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_paths(child, path, found);
            }
        }
        _ => {
            if !prefix.is_empty() {
                found.push(prefix);
            }
        }
    }
}

/// Whether a sub-path covers a full path: its keys are a leading run of the
/// path's keys. `"val"` covers `"val.NO2.cnc"`; `"va"` does not.
pub fn sub_path_includes(sub_path: &str, path: &str) -> bool {
    let mut full = path.split('.');

    for key in sub_path.split('.') {
        if full.next() != Some(key) {
            return false;
        }
    }

    true
}

/// Insert a value at a dot-separated path, creating intermediate objects.
/// An intermediate non-object node is replaced.
pub fn insert(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut keys = path.split('.').peekable();
    let mut current = root;

    while let Some(key) = keys.next() {
        if keys.peek().is_none() {
            current.insert(key.to_string(), value);
            return;
        }

        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        let Value::Object(map) = entry else { return };
        current = map;
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn datum() -> Value {
        json!({"rec": "2021-01-01T00:00:00Z", "val": {"NO2": {"cnc": 12.3}, "tmp": "21.5"}})
    }

    #[test]
    fn resolves_nested_paths() {
        let datum = datum();

        assert_eq!(node(&datum, "rec"), Some(&json!("2021-01-01T00:00:00Z")));
        assert_eq!(node(&datum, "val.NO2.cnc"), Some(&json!(12.3)));
        assert_eq!(node(&datum, "val.SO2.cnc"), None);
        assert_eq!(node(&datum, "rec.deeper"), None);
    }

    #[test]
    fn leaf_accepts_numbers_and_numeric_strings() {
        let datum = datum();

        assert_eq!(leaf_f64(&datum, "val.NO2.cnc"), Some(12.3));
        assert_eq!(leaf_f64(&datum, "val.tmp"), Some(21.5));
        assert_eq!(leaf_f64(&datum, "rec"), None);
    }

    #[test]
    fn paths_walks_the_leaves_in_document_order() {
        let datum = datum();

        assert_eq!(
            paths(&datum),
            ["rec", "val.NO2.cnc", "val.tmp"]
        );
    }

    #[test]
    fn sub_path_coverage_is_by_whole_keys() {
        assert!(sub_path_includes("val", "val.NO2.cnc"));
        assert!(sub_path_includes("val.NO2", "val.NO2.cnc"));
        assert!(sub_path_includes("val.NO2.cnc", "val.NO2.cnc"));

        assert!(!sub_path_includes("va", "val.NO2.cnc"));
        assert!(!sub_path_includes("val.SO2", "val.NO2.cnc"));
        assert!(!sub_path_includes("val.NO2.cnc.deeper", "val.NO2.cnc"));
    }

    #[test]
    fn insert_builds_intermediate_objects_in_order() {
        let mut target = Map::new();

        insert(&mut target, "val.NO2.src", json!(12.3));
        insert(&mut target, "val.NO2.lpf", json!(11.9));

        assert_eq!(
            Value::Object(target).to_string(),
            r#"{"val":{"NO2":{"src":12.3,"lpf":11.9}}}"#
        );
    }
}
