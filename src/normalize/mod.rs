// src/normalize/mod.rs
//! Property normalization: nested upstream payloads become flat property bags.
//!
//! Nested objects flatten into dot-joined keys, wrapped scalars
//! (`{"value": x}`) are hoisted into their parent's key, absent values and
//! empty arrays disappear, and optional coercions turn timestamp strings into
//! epoch milliseconds and primitive-looking strings into booleans and numbers.
//!
//! Normalization is pure and infallible: nothing here logs, performs I/O or
//! returns an error. Strings that fail a coercion are kept as they were.

mod coerce;
mod payload;

pub use coerce::{is_time_key, parse_primitive, parse_timestamp_millis};
pub use payload::Payload;

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Key of the wrapper object that upstream APIs use around single scalars.
const WRAPPED_SCALAR_KEY: &str = "value";

/// Coercions applied while normalizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Convert timestamp strings under time-like keys to epoch milliseconds.
    pub parse_time: bool,
    /// Convert `"true"`/`"false"` and numeric strings to primitives.
    pub parse_string: bool,
    /// Store nested objects as JSON text instead of flattening them.
    pub stringify_object: bool,
    /// Store arrays as JSON text instead of normalizing their elements.
    pub stringify_array: bool,
}

impl NormalizeOptions {
    /// Options with every coercion disabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse_time(self) -> Self {
        Self {
            parse_time: true,
            ..self
        }
    }

    pub fn with_parse_string(self) -> Self {
        Self {
            parse_string: true,
            ..self
        }
    }

    pub fn with_stringify_object(self) -> Self {
        Self {
            stringify_object: true,
            ..self
        }
    }

    pub fn with_stringify_array(self) -> Self {
        Self {
            stringify_array: true,
            ..self
        }
    }
}

/// Normalizes an upstream payload.
///
/// Objects flatten into a single-level object; arrays normalize element-wise;
/// scalars, `null` and absent values are returned unchanged.
pub fn normalize(value: Payload, options: &NormalizeOptions) -> Payload {
    match value {
        Payload::Object(fields) => {
            let mut flat = IndexMap::with_capacity(fields.len());
            flatten_into(&mut flat, "", fields, options);
            Payload::Object(flat)
        }
        Payload::Array(items) => Payload::Array(normalize_elements(items, options)),
        scalar => scalar,
    }
}

/// Normalizes a JSON value; the JSON-in, JSON-out form of [`normalize`].
pub fn normalize_json(value: Value, options: &NormalizeOptions) -> Value {
    normalize(Payload::from(value), options).into_json_or_null()
}

/// Normalizes a JSON value into a flat property map.
///
/// Non-object inputs produce an empty map.
pub fn normalize_to_map(value: Value, options: &NormalizeOptions) -> Map<String, Value> {
    match normalize_json(value, options) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Writes every field of `fields` into `flat` under `prefix`.
fn flatten_into(
    flat: &mut IndexMap<String, Payload>,
    prefix: &str,
    fields: IndexMap<String, Payload>,
    options: &NormalizeOptions,
) {
    for (key, value) in fields {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        insert_normalized(flat, path, &key, value, options);
    }
}

/// Places one value at `path`, flattening or coercing it as the options say.
///
/// `key` is the innermost key that led here; time detection looks at it, not
/// at the full dotted path.
fn insert_normalized(
    flat: &mut IndexMap<String, Payload>,
    path: String,
    key: &str,
    value: Payload,
    options: &NormalizeOptions,
) {
    match value {
        Payload::Absent => {}
        Payload::Null | Payload::Bool(_) | Payload::Number(_) => {
            flat.insert(path, value);
        }
        Payload::String(s) => {
            flat.insert(path, coerce_string(key, s, options));
        }
        Payload::Array(items) => {
            if items.iter().all(Payload::is_absent) {
                return;
            }
            if options.stringify_array {
                flat.insert(path, stringify(Payload::Array(items)));
                return;
            }
            let normalized = normalize_elements(items, options);
            if !normalized.is_empty() {
                flat.insert(path, Payload::Array(normalized));
            }
        }
        Payload::Object(fields) => {
            if options.stringify_object {
                flat.insert(path, stringify(Payload::Object(fields)));
                return;
            }
            match unwrap_scalar_wrapper(fields) {
                Ok(inner) => insert_normalized(flat, path, key, inner, options),
                Err(fields) => flatten_into(flat, &path, fields, options),
            }
        }
    }
}

/// Normalizes array elements independently, dropping absent ones and any
/// element that normalizes to an empty array or object.
fn normalize_elements(items: Vec<Payload>, options: &NormalizeOptions) -> Vec<Payload> {
    items
        .into_iter()
        .filter(|item| !item.is_absent())
        .map(|item| match item {
            Payload::Object(fields) => match unwrap_scalar_wrapper(fields) {
                Ok(inner) => normalize(inner, options),
                Err(fields) => normalize(Payload::Object(fields), options),
            },
            other => normalize(other, options),
        })
        .filter(|item| !item.is_absent() && !is_empty_container(item))
        .collect()
}

fn is_empty_container(value: &Payload) -> bool {
    match value {
        Payload::Array(items) => items.is_empty(),
        Payload::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Returns the inner value when `value` is the only present key of the object.
fn unwrap_scalar_wrapper(
    mut fields: IndexMap<String, Payload>,
) -> Result<Payload, IndexMap<String, Payload>> {
    let mut present = fields.iter().filter(|(_, v)| !v.is_absent());
    let is_wrapper = matches!(
        (present.next(), present.next()),
        (Some((only_key, _)), None) if only_key == WRAPPED_SCALAR_KEY
    );

    if is_wrapper {
        Ok(fields
            .swap_remove(WRAPPED_SCALAR_KEY)
            .unwrap_or(Payload::Absent))
    } else {
        Err(fields)
    }
}

fn coerce_string(key: &str, raw: String, options: &NormalizeOptions) -> Payload {
    if options.parse_time && is_time_key(key) {
        if let Some(millis) = parse_timestamp_millis(&raw) {
            return Payload::from(millis);
        }
    }
    if options.parse_string {
        return Payload::from(parse_primitive(&raw));
    }
    Payload::String(raw)
}

/// Canonical JSON text of a payload, absent parts omitted.
fn stringify(value: Payload) -> Payload {
    Payload::String(value.into_json_or_null().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn defaults() -> NormalizeOptions {
        NormalizeOptions::default()
    }

    #[test]
    fn flattens_nested_objects_with_dotted_keys() {
        let input = json!({"a": {"b": {"c": 1}, "d": "x"}, "e": true});
        assert_eq!(
            normalize_json(input, &defaults()),
            json!({"a.b.c": 1, "a.d": "x", "e": true})
        );
    }

    #[test]
    fn empty_containers_inside_arrays_are_dropped() {
        let input = json!({
            "a": [[]],
            "b": [{}],
            "c": [[], {"x": 1}, {"y": []}],
            "d": [[[]], 2]
        });
        assert_eq!(
            normalize_json(input, &defaults()),
            json!({"c": [{"x": 1}], "d": [2]})
        );
    }

    #[test]
    fn collapses_wrapped_scalars() {
        let input = json!({"a": {"b": {"value": "x"}}});
        assert_eq!(normalize_json(input, &defaults()), json!({"a.b": "x"}));
    }

    #[test]
    fn wrapper_with_siblings_is_flattened_normally() {
        let input = json!({"a": {"value": "x", "unit": "GB"}});
        assert_eq!(
            normalize_json(input, &defaults()),
            json!({"a.value": "x", "a.unit": "GB"})
        );
    }

    #[test]
    fn wrapper_with_absent_sibling_still_collapses() {
        let input = Payload::object([(
            "size",
            Payload::object([("value", Payload::from(3)), ("unit", Payload::Absent)]),
        )]);
        assert_eq!(
            normalize(input, &defaults()).into_json(),
            Some(json!({"size": 3}))
        );
    }

    #[test]
    fn drops_absent_values() {
        let input = Payload::object([("a", Payload::Absent), ("b", Payload::from(1))]);
        assert_eq!(normalize(input, &defaults()).into_json(), Some(json!({"b": 1})));
    }

    #[test]
    fn drops_empty_arrays_but_keeps_null() {
        assert_eq!(normalize_json(json!({"a": []}), &defaults()), json!({}));
        assert_eq!(
            normalize_json(json!({"a": null, "b": [null]}), &defaults()),
            json!({"a": null, "b": [null]})
        );
    }

    #[test]
    fn arrays_normalize_element_wise() {
        let input = json!({"tags": ["a", {"k": {"v": 1}}, [{"x": {"value": 2}}]]});
        assert_eq!(
            normalize_json(input, &defaults()),
            json!({"tags": ["a", {"k.v": 1}, [{"x": 2}]]})
        );
    }

    #[test]
    fn stringify_options_serialize_nested_values() {
        let options = defaults().with_stringify_object().with_stringify_array();
        let input = json!({"o": {"b": 2, "a": 1}, "l": [1, "two"], "s": "keep"});
        assert_eq!(
            normalize_json(input, &options),
            json!({"o": "{\"a\":1,\"b\":2}", "l": "[1,\"two\"]", "s": "keep"})
        );
    }

    #[test]
    fn parse_time_converts_timestamps_and_falls_back() {
        let options = defaults().with_parse_time();
        assert_eq!(
            normalize_json(json!({"created_at": "not-a-date"}), &options),
            json!({"created_at": "not-a-date"})
        );
        assert_eq!(
            normalize_json(json!({"created_at": "2021-03-04T05:06:07Z"}), &options),
            json!({"created_at": 1_614_834_367_000_i64})
        );
    }

    #[test]
    fn parse_time_uses_innermost_key() {
        let options = defaults().with_parse_time();
        let input = json!({"signIn": {"lastSignInDateTime": "1970-01-01T00:00:01Z"}});
        assert_eq!(
            normalize_json(input, &options),
            json!({"signIn.lastSignInDateTime": 1000})
        );
    }

    #[test]
    fn parse_time_applies_to_hoisted_wrappers() {
        let options = defaults().with_parse_time();
        let input = json!({"createdOn": {"value": "1970-01-02"}});
        assert_eq!(normalize_json(input, &options), json!({"createdOn": 86_400_000}));
    }

    #[test]
    fn parse_string_coerces_primitives() {
        let options = defaults().with_parse_string();
        let input = json!({"enabled": "true", "count": "12", "name": "web-01", "zip": "02134"});
        assert_eq!(
            normalize_json(input, &options),
            json!({"enabled": true, "count": 12, "name": "web-01", "zip": "02134"})
        );
    }

    #[test]
    fn booleans_and_numbers_ignore_options() {
        let options = defaults()
            .with_parse_time()
            .with_parse_string()
            .with_stringify_object()
            .with_stringify_array();
        let input = json!({"updatedAt": 5, "flag": false});
        assert_eq!(normalize_json(input.clone(), &options), input);
    }

    #[test]
    fn scalars_are_returned_unchanged() {
        assert_eq!(normalize_json(json!("2021-03-04"), &defaults().with_parse_time()), json!("2021-03-04"));
        assert_eq!(normalize_json(json!(null), &defaults()), json!(null));
        assert_eq!(normalize(Payload::Absent, &defaults()), Payload::Absent);
    }

    #[test]
    fn idempotent_on_flat_input() {
        let options = defaults().with_parse_time().with_parse_string();
        let flat = json!({"a.b": "x", "n": 3, "createdAt": "2021-03-04", "list": ["1", "2"]});
        let once = normalize_json(flat, &options);
        let twice = normalize_json(once.clone(), &options);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_to_map_ignores_non_objects() {
        assert!(normalize_to_map(json!([1, 2]), &defaults()).is_empty());
        assert_eq!(
            normalize_to_map(json!({"a": {"b": 1}}), &defaults()).get("a.b"),
            Some(&json!(1))
        );
    }
}
