//! Loosely-typed access to environment documents.
//!
//! Documents are plain `serde_json` values because their shape depends on the
//! release that saved them. Steps borrow only the slice they work on through
//! the helpers here, which turn shape problems into [`StepError`]s.

use serde_json::{Map, Number, Value};

use crate::error::{MigrationError, StepError, StepResult};

/// Name of the field recording the highest migration applied to a document.
pub const LAST_MIGRATION_KEY: &str = "lastMigration";

/// Read the document's `lastMigration` marker.
///
/// An absent or `null` marker means the document predates versioning and
/// yields `None`. Integral floats such as `5.0` are read as integers.
pub fn read_marker(doc: &Map<String, Value>) -> Result<Option<u32>, MigrationError> {
    match doc.get(LAST_MIGRATION_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .or_else(|| {
                // Hand-edited files sometimes carry `5.0`.
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| MigrationError::InvalidMarker {
                found: value.to_string(),
            }),
    }
}

/// Stamp the document with a marker.
pub fn write_marker(doc: &mut Map<String, Value>, id: u32) {
    doc.insert(LAST_MIGRATION_KEY.to_string(), Value::from(id));
}

/// Truthiness as the desktop app's persisted-data checks saw it.
///
/// Absent keys, `null`, `false`, `0` and `""` are falsy. Arrays and objects
/// are truthy even when empty.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Presence check: only a missing key is undefined, `null` counts as set.
pub fn is_undefined(value: Option<&Value>) -> bool {
    value.is_none()
}

/// Set `key` to `value`, or remove it when there is no value.
pub fn assign(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            map.insert(key.to_string(), value);
        }
        None => {
            map.remove(key);
        }
    }
}

/// Insert `default` under `key` when the current value is falsy.
pub fn fill_if_falsy(map: &mut Map<String, Value>, key: &str, default: Value) {
    if !is_truthy(map.get(key)) {
        map.insert(key.to_string(), default);
    }
}

/// Insert `default` under `key` when the key is absent.
pub fn fill_if_undefined(map: &mut Map<String, Value>, key: &str, default: Value) {
    if is_undefined(map.get(key)) {
        map.insert(key.to_string(), default);
    }
}

/// Run `f` on every route of the environment.
///
/// The `routes` array must exist and every entry must be an object.
pub fn for_each_route<F>(env: &mut Map<String, Value>, mut f: F) -> StepResult
where
    F: FnMut(&mut Map<String, Value>, usize) -> StepResult,
{
    let routes = match env.get_mut("routes") {
        Some(Value::Array(routes)) => routes,
        Some(_) => return Err(StepError::unexpected("routes", "an array")),
        None => return Err(StepError::missing("routes")),
    };

    for (i, route) in routes.iter_mut().enumerate() {
        let route = route
            .as_object_mut()
            .ok_or_else(|| StepError::unexpected(format!("routes[{i}]"), "an object"))?;
        f(route, i)?;
    }
    Ok(())
}

/// Run `f` on every response of every route.
///
/// Each route must carry a `responses` array of objects.
pub fn for_each_response<F>(env: &mut Map<String, Value>, mut f: F) -> StepResult
where
    F: FnMut(&mut Map<String, Value>) -> StepResult,
{
    for_each_route(env, |route, i| {
        let responses = match route.get_mut("responses") {
            Some(Value::Array(responses)) => responses,
            Some(_) => {
                return Err(StepError::unexpected(
                    format!("routes[{i}].responses"),
                    "an array",
                ))
            }
            None => return Err(StepError::missing(format!("routes[{i}].responses"))),
        };

        for (j, response) in responses.iter_mut().enumerate() {
            let response = response.as_object_mut().ok_or_else(|| {
                StepError::unexpected(format!("routes[{i}].responses[{j}]"), "an object")
            })?;
            f(response)?;
        }
        Ok(())
    })
}

/// Base-10 integer parse of a value's text form.
///
/// Skips leading whitespace, accepts one sign and reads digits up to the first
/// non-digit. Strings are read as-is and numbers through their JSON rendering,
/// so `"404"`, `" 404ms"` and `404.7` all give `404`. Anything without leading
/// digits, and every non-scalar value, yields `null`.
pub fn parse_int(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Value::Null,
    };

    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return Value::Null;
    }

    match digits.parse::<i64>() {
        Ok(n) => Value::from(if negative { -n } else { n }),
        // Beyond i64 the value degrades to a float, like any JSON number would.
        Err(_) => digits
            .parse::<f64>()
            .ok()
            .and_then(|f| Number::from_f64(if negative { -f } else { f }))
            .map_or(Value::Null, Value::Number),
    }
}
