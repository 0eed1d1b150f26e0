use serde_json::{Map, Value};

/// Deep merge `overlay` into `base`.
///
/// - Objects are merged recursively.
/// - Arrays and scalars overwrite.
/// - A `null` overlay leaves `base` untouched; `null` means "not specified".
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => {
            *slot = v;
        }
    }
}

/// Merge documents in order, later ones taking precedence. Starts from an
/// empty object.
pub fn merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), |mut acc, next| {
            merge(&mut acc, next);
            acc
        })
}

/// Insert a nested value into a JSON object given a dotted path.
///
/// Example:
/// ```rust
/// use serde_json::json;
/// use appconfigr::merge::insert_path;
///
/// let mut obj = json!({});
/// insert_path(&mut obj, &["database", "url"], json!("postgres://..."));
/// assert_eq!(obj["database"]["url"], "postgres://...");
/// ```
pub fn insert_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((last_key, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for part in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert((*last_key).to_string(), value);
    }
}

/// Mutable variant of [`lookup`].
pub fn lookup_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        _ => None,
    })
}

/// Walk a dotted path through nested objects.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}
