//! Configuration tree access. Paths are dot-separated object keys (`inputs.datasources`).

use serde_json::{Map, Value};

use crate::errors::TreeError;

pub fn find<'a>(node: &'a Value, field: &str) -> Option<&'a Value> {
    node.as_object()?.get(field)
}

pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, key| find(node, key))
}

pub fn as_list(node: &Value) -> Option<&[Value]> {
    node.as_array().map(Vec::as_slice)
}

/// String form of a scalar leaf; `None` for null, lists and objects.
pub fn as_scalar_string(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Sets the list at `path` in one step, creating missing parent objects.
/// The tree is untouched when an error is returned.
pub fn replace_list(root: &mut Value, path: &str, items: Vec<Value>) -> Result<(), TreeError> {
    if path.split('.').any(str::is_empty) {
        return Err(TreeError::InvalidPath(path.to_string()));
    }
    let (parents, last) = path.rsplit_once('.').unwrap_or(("", path));

    // Validate before creating anything so a failure leaves no partial parents behind.
    let mut walked = String::new();
    let mut existing = Some(&*root);
    for key in parents.split('.').filter(|k| !k.is_empty()) {
        let Some(current) = existing else { break };
        let Some(obj) = current.as_object() else {
            return Err(not_an_object(&walked));
        };
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(key);
        existing = obj.get(key);
    }
    if existing.is_some_and(|node| !node.is_object()) {
        return Err(not_an_object(&walked));
    }

    let mut node = root;
    for key in parents.split('.').filter(|k| !k.is_empty()) {
        let obj = node.as_object_mut().ok_or_else(|| not_an_object(key))?;
        node = obj
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let obj = node.as_object_mut().ok_or_else(|| not_an_object(parents))?;
    obj.insert(last.to_string(), Value::Array(items));
    Ok(())
}

fn not_an_object(path: &str) -> TreeError {
    TreeError::NotAnObject {
        path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lookup_nested() {
        let v = json!({"a": {"b": [1, 2]}, "c": "x"});
        assert_eq!(lookup(&v, "a.b"), Some(&json!([1, 2])));
        assert_eq!(lookup(&v, "a.missing"), None);
        assert_eq!(lookup(&v, "c.d"), None);
        assert_eq!(as_list(lookup(&v, "a.b").unwrap()).map(<[Value]>::len), Some(2));
        assert_eq!(as_list(&v["c"]), None);
    }

    #[test]
    fn scalar_strings() {
        assert_eq!(as_scalar_string(&json!("ns")), Some("ns".to_string()));
        assert_eq!(as_scalar_string(&json!(42)), Some("42".to_string()));
        assert_eq!(as_scalar_string(&json!(true)), Some("true".to_string()));
        assert_eq!(as_scalar_string(&json!(null)), None);
        assert_eq!(as_scalar_string(&json!([1])), None);
    }

    #[test]
    fn replace_top_level_list() {
        let mut v = json!({"datasources": [1, 2, 3], "outputs": {}});
        replace_list(&mut v, "datasources", vec![json!(1), json!(3)]).unwrap();
        assert_eq!(v, json!({"datasources": [1, 3], "outputs": {}}));
    }

    #[test]
    fn replace_creates_parents() {
        let mut v = json!({});
        replace_list(&mut v, "a.b", vec![]).unwrap();
        assert_eq!(v, json!({"a": {"b": []}}));
    }

    #[test]
    fn replace_rejects_non_objects_without_mutating() {
        let mut v = json!({"a": "scalar"});
        let err = replace_list(&mut v, "a.b", vec![]).unwrap_err();
        assert!(matches!(err, TreeError::NotAnObject { ref path } if path == "a"));
        assert_eq!(v, json!({"a": "scalar"}));

        let mut v = json!({"a": {"b": 1}});
        let err = replace_list(&mut v, "a.b.c.d", vec![]).unwrap_err();
        assert!(matches!(err, TreeError::NotAnObject { .. }));
        assert_eq!(v, json!({"a": {"b": 1}}));

        let mut list = json!([1]);
        assert!(replace_list(&mut list, "x", vec![]).is_err());
        assert!(matches!(
            replace_list(&mut v, "a..b", vec![]),
            Err(TreeError::InvalidPath(_))
        ));
    }
}
