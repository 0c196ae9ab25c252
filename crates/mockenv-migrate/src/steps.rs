//! Transform bodies for every released migration.
//!
//! Each function upgrades an environment by exactly one schema revision and
//! is safe to run against a document that already has the target shape.
//! Several checks test truthiness rather than presence: documents written by
//! those releases depend on it, so a stored `""`, `0` or `false` in those
//! fields is replaced on upgrade.

use serde_json::{json, Map, Value};

use crate::document::{
    assign, fill_if_falsy, fill_if_undefined, for_each_response, for_each_route, is_truthy,
    parse_int,
};
use crate::error::{StepError, StepResult};
use crate::ident::fresh_uuid;

type Env = Map<String, Value>;

const CONTENT_TYPE: &str = "Content-Type";

/// 0.4.0: proxy and TLS settings.
pub fn add_proxy_settings(env: &mut Env) -> StepResult {
    fill_if_falsy(env, "proxyMode", json!(false));
    fill_if_falsy(env, "proxyHost", json!(""));
    fill_if_falsy(env, "https", json!(false));
    Ok(())
}

/// 1.0.0: CORS flag, route identifiers, and the content type folded into the
/// route's custom headers.
pub fn add_cors_and_route_uuids(env: &mut Env) -> StepResult {
    fill_if_falsy(env, "cors", json!(true));

    for_each_route(env, |route, i| {
        fill_if_falsy(route, "uuid", Value::String(fresh_uuid()));

        if !is_truthy(route.get("customHeaders")) {
            return Ok(());
        }

        if !route.get("customHeaders").map_or(false, Value::is_array) {
            return Err(StepError::unexpected(
                format!("routes[{i}].customHeaders"),
                "an array",
            ));
        }
        let content_type = route
            .remove("contentType")
            .filter(|value| is_truthy(Some(value)));
        let Some(Value::Array(headers)) = route.get_mut("customHeaders") else {
            return Ok(());
        };

        let has_content_type = headers
            .iter()
            .any(|header| header.get("key").and_then(Value::as_str) == Some(CONTENT_TYPE));

        if let (false, Some(value)) = (has_content_type, content_type) {
            headers.insert(
                0,
                json!({ "uuid": fresh_uuid(), "key": CONTENT_TYPE, "value": value }),
            );
        }
        Ok(())
    })
}

/// 1.2.0: identifiers for routes created without one.
pub fn fill_route_uuids(env: &mut Env) -> StepResult {
    for_each_route(env, |route, _| {
        fill_if_falsy(route, "uuid", Value::String(fresh_uuid()));
        Ok(())
    })
}

/// 1.3.0: environment headers, route documentation, and `customHeaders`
/// renamed to `headers`.
pub fn add_environment_headers(env: &mut Env) -> StepResult {
    fill_if_falsy(
        env,
        "headers",
        json!([{ "uuid": fresh_uuid(), "key": "", "value": "" }]),
    );

    for_each_route(env, |route, _| {
        if let Some(Value::Object(file)) = route.get_mut("file") {
            fill_if_undefined(file, "sendAsBody", json!(false));
        }

        fill_if_undefined(route, "documentation", json!(""));

        if is_truthy(route.get("customHeaders")) {
            if let Some(headers) = route.remove("customHeaders") {
                route.insert("headers".to_string(), headers);
            }
        }
        Ok(())
    })
}

/// 1.4.0: the route `file` object flattened to `filePath` and
/// `sendFileAsBody`; duplication bookkeeping dropped.
pub fn flatten_route_file(env: &mut Env) -> StepResult {
    env.remove("duplicates");

    for_each_route(env, |route, _| {
        match route.remove("file") {
            Some(file) if is_truthy(Some(&file)) => {
                let path = file.get("path").cloned().unwrap_or_else(|| json!(""));
                let send_as_body = file.get("sendAsBody").cloned().unwrap_or(json!(false));
                route.insert("filePath".to_string(), path);
                route.insert("sendFileAsBody".to_string(), send_as_body);
            }
            Some(_) => {
                route.insert("filePath".to_string(), json!(""));
                route.insert("sendFileAsBody".to_string(), json!(false));
            }
            None => {
                fill_if_undefined(route, "filePath", json!(""));
                fill_if_undefined(route, "sendFileAsBody", json!(false));
            }
        }

        route.remove("duplicates");
        Ok(())
    })
}

/// Multiple responses per route: the route's response fields move into a
/// single first entry of a new `responses` array.
pub fn move_route_fields_to_responses(env: &mut Env) -> StepResult {
    for_each_route(env, |route, i| {
        match route.get("responses") {
            Some(Value::Array(_)) => return Ok(()),
            Some(_) => {
                return Err(StepError::unexpected(
                    format!("routes[{i}].responses"),
                    "an array",
                ))
            }
            None => {}
        }

        let mut response = Map::new();
        response.insert("uuid".to_string(), Value::String(fresh_uuid()));
        assign(&mut response, "statusCode", route.remove("statusCode"));
        response.insert("label".to_string(), json!(""));
        assign(&mut response, "latency", route.remove("latency"));
        assign(&mut response, "filePath", route.remove("filePath"));
        assign(&mut response, "sendFileAsBody", route.remove("sendFileAsBody"));
        assign(&mut response, "headers", route.remove("headers"));
        assign(&mut response, "body", route.remove("body"));
        response.insert("rules".to_string(), json!([]));

        route.insert(
            "responses".to_string(),
            Value::Array(vec![Value::Object(response)]),
        );
        Ok(())
    })
}

/// Every route response gets a new identifier, undoing identifiers that were
/// duplicated when routes were copied.
pub fn renew_response_uuids(env: &mut Env) -> StepResult {
    for_each_response(env, |response| {
        response.insert("uuid".to_string(), Value::String(fresh_uuid()));
        Ok(())
    })
}

/// Routes can be disabled.
pub fn add_route_enabled(env: &mut Env) -> StepResult {
    for_each_route(env, |route, _| {
        fill_if_undefined(route, "enabled", json!(true));
        Ok(())
    })
}

/// Route responses carry a label.
pub fn add_response_label(env: &mut Env) -> StepResult {
    for_each_response(env, |response| {
        fill_if_falsy(response, "label", json!(""));
        Ok(())
    })
}

/// Headers added to proxied requests and responses.
pub fn add_proxy_headers(env: &mut Env) -> StepResult {
    fill_if_falsy(env, "proxyReqHeaders", json!([{ "key": "", "value": "" }]));
    fill_if_falsy(env, "proxyResHeaders", json!([{ "key": "", "value": "" }]));
    Ok(())
}

/// Per-response templating switch; status codes stored as numbers.
pub fn add_disable_templating(env: &mut Env) -> StepResult {
    for_each_response(env, |response| {
        fill_if_undefined(response, "disableTemplating", json!(false));

        let status = parse_int(response.get("statusCode").unwrap_or(&Value::Null));
        response.insert("statusCode".to_string(), status);
        Ok(())
    })
}

/// How a response's rules combine.
pub fn add_rules_operator(env: &mut Env) -> StepResult {
    for_each_response(env, |response| {
        fill_if_undefined(response, "rulesOperator", json!("OR"));
        Ok(())
    })
}
