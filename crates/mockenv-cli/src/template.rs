use mockenv_migrate::{fresh_uuid, HIGHEST_MIGRATION_ID};
use serde_json::{json, Value};

/// A new environment in the current schema with one example route.
///
/// It is stamped with the highest migration id so loading it never runs a
/// migration.
pub fn new_environment(name: &str, port: u16) -> Value {
    json!({
        "uuid": fresh_uuid(),
        "lastMigration": HIGHEST_MIGRATION_ID,
        "name": name,
        "endpointPrefix": "",
        "latency": 0,
        "port": port,
        "routes": [ new_route() ],
        "proxyMode": false,
        "proxyHost": "",
        "https": false,
        "cors": true,
        "headers": [ { "uuid": fresh_uuid(), "key": "Content-Type", "value": "application/json" } ],
        "proxyReqHeaders": [ { "key": "", "value": "" } ],
        "proxyResHeaders": [ { "key": "", "value": "" } ]
    })
}

fn new_route() -> Value {
    json!({
        "uuid": fresh_uuid(),
        "documentation": "",
        "method": "get",
        "endpoint": "",
        "enabled": true,
        "responses": [ {
            "uuid": fresh_uuid(),
            "statusCode": 200,
            "label": "",
            "latency": 0,
            "filePath": "",
            "sendFileAsBody": false,
            "headers": [],
            "body": "",
            "rules": [],
            "disableTemplating": false,
            "rulesOperator": "OR"
        } ]
    })
}
