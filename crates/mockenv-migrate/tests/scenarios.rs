//! End-to-end upgrades of environments saved by older releases.

use std::collections::HashSet;

use mockenv_migrate::{
    migrate, run, MigrationEngine, MigrationError, MigrationOutcome, StepError,
    HIGHEST_MIGRATION_ID,
};
use serde_json::{json, Value};

/// An environment as the first public release saved it.
fn legacy_environment() -> Value {
    json!({
        "uuid": "env-1",
        "name": "Legacy API",
        "endpointPrefix": "api",
        "latency": 0,
        "port": 3000,
        "routes": [
            {
                "method": "get",
                "endpoint": "users",
                "body": "[]",
                "latency": 0,
                "statusCode": "200",
                "contentType": "application/json",
                "customHeaders": [ { "key": "X-Powered-By", "value": "legacy" } ],
                "file": null,
                "duplicates": []
            },
            {
                "method": "get",
                "endpoint": "report",
                "body": "",
                "latency": 250,
                "statusCode": "201",
                "contentType": "text/plain",
                "customHeaders": [ { "key": "Content-Type", "value": "application/pdf" } ],
                "file": { "path": "/tmp/report.pdf" }
            }
        ],
        "duplicates": []
    })
}

fn route_ids(env: &Value) -> Vec<&str> {
    env["routes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uuid"].as_str().unwrap())
        .collect()
}

fn response_ids(env: &Value) -> Vec<&str> {
    env["routes"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|r| r["responses"].as_array().unwrap())
        .map(|r| r["uuid"].as_str().unwrap())
        .collect()
}

fn assert_unique_non_empty(ids: &[&str]) {
    assert!(ids.iter().all(|id| !id.is_empty()));
    let distinct: HashSet<&&str> = ids.iter().collect();
    assert_eq!(distinct.len(), ids.len(), "duplicate ids in {ids:?}");
}

#[test]
fn legacy_environment_reaches_current_schema() {
    let mut env = legacy_environment();
    let report = migrate(&mut env).unwrap();

    assert_eq!(report.from, 0);
    assert_eq!(report.to, HIGHEST_MIGRATION_ID);
    assert_eq!(report.applied, (1..=HIGHEST_MIGRATION_ID).collect::<Vec<_>>());
    assert_eq!(env["lastMigration"], json!(HIGHEST_MIGRATION_ID));

    assert_eq!(env["proxyMode"], json!(false));
    assert_eq!(env["proxyHost"], json!(""));
    assert_eq!(env["https"], json!(false));
    assert_eq!(env["cors"], json!(true));
    assert_eq!(env["proxyReqHeaders"], json!([ { "key": "", "value": "" } ]));
    assert_eq!(env["proxyResHeaders"], json!([ { "key": "", "value": "" } ]));
    assert!(env.get("duplicates").is_none());
    assert_eq!(env["headers"].as_array().unwrap().len(), 1);

    let users = &env["routes"][0];
    assert_eq!(users["enabled"], json!(true));
    assert_eq!(users["documentation"], json!(""));
    for gone in [
        "contentType",
        "customHeaders",
        "file",
        "duplicates",
        "statusCode",
        "body",
        "latency",
        "headers",
        "filePath",
        "sendFileAsBody",
    ] {
        assert!(users.get(gone).is_none(), "{gone} left on route");
    }

    let response = &users["responses"][0];
    assert_eq!(response["statusCode"], json!(200));
    assert_eq!(response["body"], json!("[]"));
    assert_eq!(response["label"], json!(""));
    assert_eq!(response["filePath"], json!(""));
    assert_eq!(response["sendFileAsBody"], json!(false));
    assert_eq!(response["disableTemplating"], json!(false));
    assert_eq!(response["rulesOperator"], json!("OR"));
    assert_eq!(response["rules"], json!([]));
    let headers = response["headers"].as_array().unwrap();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0]["key"], json!("Content-Type"));
    assert_eq!(headers[0]["value"], json!("application/json"));
    assert_eq!(headers[1]["key"], json!("X-Powered-By"));

    let report = &env["routes"][1]["responses"][0];
    assert_eq!(report["statusCode"], json!(201));
    assert_eq!(report["latency"], json!(250));
    assert_eq!(report["filePath"], json!("/tmp/report.pdf"));
    assert_eq!(report["sendFileAsBody"], json!(false));
    assert_eq!(
        report["headers"],
        json!([ { "key": "Content-Type", "value": "application/pdf" } ])
    );
}

#[test]
fn file_object_ends_up_in_first_response() {
    let mut env = json!({
        "lastMigration": 4,
        "routes": [ {
            "uuid": "r1",
            "documentation": "",
            "headers": [],
            "file": { "path": "/a", "sendAsBody": true }
        } ]
    });

    run(&mut env, Some(4)).unwrap();

    let route = &env["routes"][0];
    for gone in ["file", "filePath", "sendFileAsBody"] {
        assert!(route.get(gone).is_none(), "{gone} left on route");
    }
    let responses = route["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["filePath"], json!("/a"));
    assert_eq!(responses[0]["sendFileAsBody"], json!(true));
    assert_eq!(responses[0]["label"], json!(""));
    assert_eq!(responses[0]["rules"], json!([]));
    assert!(!responses[0]["uuid"].as_str().unwrap().is_empty());
}

#[test]
fn content_type_is_folded_into_headers() {
    let mut env = json!({
        "lastMigration": 1,
        "routes": [ { "customHeaders": [], "contentType": "text/plain" } ]
    });

    MigrationEngine::default().migrate_to(&mut env, 4).unwrap();
    assert_eq!(env["lastMigration"], json!(4));

    let route = &env["routes"][0];
    assert!(route.get("customHeaders").is_none());
    assert!(route.get("contentType").is_none());
    let headers = route["headers"].as_array().unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0]["key"], json!("Content-Type"));
    assert_eq!(headers[0]["value"], json!("text/plain"));

    migrate(&mut env).unwrap();
    let headers = env["routes"][0]["responses"][0]["headers"].as_array().unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0]["value"], json!("text/plain"));
}

#[test]
fn text_status_codes_become_numbers() {
    let mut env = json!({
        "lastMigration": 10,
        "routes": [ { "responses": [ { "uuid": "a", "statusCode": "404" } ] } ]
    });

    migrate(&mut env).unwrap();
    assert_eq!(env["routes"][0]["responses"][0]["statusCode"], json!(404));
    assert_eq!(env["lastMigration"], json!(HIGHEST_MIGRATION_ID));
}

#[test]
fn identifiers_are_unique_after_migration() {
    let mut env = legacy_environment();
    env["routes"]
        .as_array_mut()
        .unwrap()
        .extend((0..20).map(|i| json!({ "endpoint": format!("r{i}"), "customHeaders": [] })));

    migrate(&mut env).unwrap();
    assert_unique_non_empty(&route_ids(&env));
    assert_unique_non_empty(&response_ids(&env));
}

#[test]
fn duplicated_response_ids_are_repaired() {
    let mut env = json!({
        "lastMigration": 6,
        "routes": [
            { "uuid": "a", "responses": [ { "uuid": "same" } ] },
            { "uuid": "b", "responses": [ { "uuid": "same" }, { "uuid": "same" } ] }
        ]
    });

    migrate(&mut env).unwrap();
    let ids = response_ids(&env);
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains(&"same"));
    assert_unique_non_empty(&ids);
}

#[test]
fn every_marker_reaches_the_highest_id() {
    let engine = MigrationEngine::default();
    for marker in 0..=HIGHEST_MIGRATION_ID {
        let mut env = legacy_environment();
        engine.migrate_to(&mut env, marker).unwrap();

        let report = engine.migrate(&mut env).unwrap();
        assert_eq!(report.from, marker);
        assert_eq!(env["lastMigration"], json!(HIGHEST_MIGRATION_ID));
    }
}

#[test]
fn running_at_the_ceiling_is_a_no_op() {
    let mut env = legacy_environment();
    migrate(&mut env).unwrap();
    let before = env.clone();

    let report = run(&mut env, Some(HIGHEST_MIGRATION_ID)).unwrap();
    assert_eq!(report.outcome, MigrationOutcome::UpToDate);
    assert_eq!(env, before);

    let report = migrate(&mut env).unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(env, before);
}

#[test]
fn newer_documents_are_not_touched() {
    let mut env = json!({ "lastMigration": HIGHEST_MIGRATION_ID + 5, "routes": "unknown" });
    let before = env.clone();

    let report = migrate(&mut env).unwrap();
    assert_eq!(
        report.outcome,
        MigrationOutcome::AheadOfRegistry {
            found: HIGHEST_MIGRATION_ID + 5,
            highest: HIGHEST_MIGRATION_ID
        }
    );
    assert_eq!(env, before);
}

#[test]
fn missing_routes_stops_at_first_step_needing_them() {
    let mut env = json!({ "name": "broken" });

    let err = migrate(&mut env).unwrap_err();
    assert_eq!(
        err,
        MigrationError::StepFailed {
            id: 2,
            last_applied: 1,
            source: StepError::MissingField {
                path: "routes".to_string()
            },
        }
    );
    assert_eq!(env["lastMigration"], json!(1));
    assert_eq!(env["proxyMode"], json!(false));

    env["routes"] = json!([]);
    let report = migrate(&mut env).unwrap();
    assert_eq!(report.from, 1);
    assert_eq!(report.to, HIGHEST_MIGRATION_ID);
}
