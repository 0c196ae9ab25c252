use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::document::{read_marker, write_marker};
use crate::error::MigrationError;
use crate::registry::{MigrationRegistry, MigrationStep};

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Log a warning when a document was written by a newer release.
    pub warn_on_future_marker: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            warn_on_future_marker: true,
        }
    }
}

/// What a run did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Nothing was pending.
    UpToDate,
    /// At least one step was applied.
    Migrated,
    /// The document's marker is beyond every registered step. It was left
    /// untouched since the engine never downgrades.
    AheadOfRegistry { found: u32, highest: u32 },
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Marker before the run (0 for unversioned documents).
    pub from: u32,
    /// Marker after the run.
    pub to: u32,
    /// Ids of the steps applied, in order.
    pub applied: Vec<u32>,
    pub outcome: MigrationOutcome,
}

/// Applies pending migrations to environment documents.
///
/// A document records the highest migration it has seen in `lastMigration`.
/// The engine applies every registered step above that marker in ascending
/// order and rewrites the marker after each step, so a failing step leaves
/// the document at the last step that succeeded.
///
/// # Example
///
/// ```
/// use mockenv_migrate::{MigrationEngine, HIGHEST_MIGRATION_ID};
/// use serde_json::json;
///
/// let mut env = json!({ "name": "legacy", "routes": [] });
/// let report = MigrationEngine::default().migrate(&mut env).unwrap();
///
/// assert_eq!(report.to, HIGHEST_MIGRATION_ID);
/// assert_eq!(env["lastMigration"], json!(HIGHEST_MIGRATION_ID));
/// assert_eq!(env["cors"], json!(true));
/// ```
#[derive(Debug, Clone)]
pub struct MigrationEngine<'r> {
    registry: &'r MigrationRegistry,
    config: MigrationConfig,
}

impl Default for MigrationEngine<'static> {
    fn default() -> Self {
        Self::new(MigrationRegistry::global(), MigrationConfig::default())
    }
}

impl<'r> MigrationEngine<'r> {
    pub fn new(registry: &'r MigrationRegistry, config: MigrationConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'r MigrationRegistry {
        self.registry
    }

    /// Marker a fully migrated document carries.
    pub fn highest_id(&self) -> u32 {
        self.registry.highest_id()
    }

    /// Whether a document at `marker` has pending steps.
    pub fn needs_migration(&self, marker: Option<u32>) -> bool {
        marker.unwrap_or(0) < self.registry.highest_id()
    }

    /// Steps a document at `marker` still needs, ascending.
    pub fn pending_steps(&self, marker: Option<u32>) -> &'r [MigrationStep] {
        self.registry.pending(marker.unwrap_or(0))
    }

    /// Migrate a document using the marker it carries.
    pub fn migrate(&self, doc: &mut Value) -> Result<MigrationReport, MigrationError> {
        self.migrate_to(doc, u32::MAX)
    }

    /// Migrate a document, stopping after the last step whose id is at most
    /// `target`.
    pub fn migrate_to(&self, doc: &mut Value, target: u32) -> Result<MigrationReport, MigrationError> {
        let env = as_environment(doc)?;
        let marker = read_marker(env)?;
        self.apply(env, marker, target)
    }

    /// Migrate a document from an explicitly supplied marker.
    ///
    /// `None` means the document predates versioning and every step runs.
    pub fn run(
        &self,
        doc: &mut Value,
        marker: Option<u32>,
    ) -> Result<MigrationReport, MigrationError> {
        let env = as_environment(doc)?;
        self.apply(env, marker, u32::MAX)
    }

    fn apply(
        &self,
        env: &mut Map<String, Value>,
        marker: Option<u32>,
        target: u32,
    ) -> Result<MigrationReport, MigrationError> {
        let from = marker.unwrap_or(0);
        let highest = self.registry.highest_id();

        if from > highest {
            if self.config.warn_on_future_marker {
                warn!(
                    found = from,
                    highest, "document was written by a newer release, leaving it unchanged"
                );
            }
            return Ok(MigrationReport {
                from,
                to: from,
                applied: Vec::new(),
                outcome: MigrationOutcome::AheadOfRegistry {
                    found: from,
                    highest,
                },
            });
        }

        let mut last_applied = from;
        let mut applied = Vec::new();

        for step in self
            .registry
            .pending(from)
            .iter()
            .take_while(|s| s.id <= target)
        {
            step.apply(env).map_err(|source| MigrationError::StepFailed {
                id: step.id,
                last_applied,
                source,
            })?;
            write_marker(env, step.id);
            debug!(id = step.id, name = step.name, "applied migration");

            last_applied = step.id;
            applied.push(step.id);
        }

        if applied.is_empty() {
            return Ok(MigrationReport {
                from,
                to: from,
                applied,
                outcome: MigrationOutcome::UpToDate,
            });
        }

        info!(
            from,
            to = last_applied,
            steps = applied.len(),
            "migrated environment"
        );
        Ok(MigrationReport {
            from,
            to: last_applied,
            applied,
            outcome: MigrationOutcome::Migrated,
        })
    }
}

fn as_environment(doc: &mut Value) -> Result<&mut Map<String, Value>, MigrationError> {
    let kind = json_kind(doc);
    doc.as_object_mut()
        .ok_or_else(|| MigrationError::MalformedDocument {
            reason: format!("expected an environment object, found {kind}"),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Migrate a document with the released migrations.
pub fn migrate(doc: &mut Value) -> Result<MigrationReport, MigrationError> {
    MigrationEngine::default().migrate(doc)
}

/// Migrate a document from an explicit marker with the released migrations.
pub fn run(doc: &mut Value, marker: Option<u32>) -> Result<MigrationReport, MigrationError> {
    MigrationEngine::default().run(doc, marker)
}
