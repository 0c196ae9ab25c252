use uuid::Uuid;

/// A fresh identifier for a route, route response or header.
///
/// Random v4 UUIDs, so repeated calls within one run never collide and no
/// run-scoped state is needed.
pub fn fresh_uuid() -> String {
    Uuid::new_v4().to_string()
}
