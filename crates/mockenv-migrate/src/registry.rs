use std::fmt;

use lazy_static::lazy_static;
use serde_json::{Map, Value};

use crate::error::{MigrationError, StepResult};
use crate::steps;

/// Signature of a step transform. Steps mutate the environment in place.
pub type TransformFn = fn(&mut Map<String, Value>) -> StepResult;

/// A single released migration.
///
/// Steps are values, not branches: the registry is an ordered list of them
/// and new releases only ever append.
#[derive(Clone, Copy)]
pub struct MigrationStep {
    /// Position in the history; documents record the highest id applied.
    pub id: u32,
    /// Short identifier used in logs and listings.
    pub name: &'static str,
    /// One-line summary of the schema change.
    pub description: &'static str,
    transform: TransformFn,
}

impl MigrationStep {
    pub const fn new(
        id: u32,
        name: &'static str,
        description: &'static str,
        transform: TransformFn,
    ) -> Self {
        Self {
            id,
            name,
            description,
            transform,
        }
    }

    /// Apply this step to an environment.
    pub fn apply(&self, env: &mut Map<String, Value>) -> StepResult {
        (self.transform)(env)
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Every migration released so far, in ascending id order.
pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep::new(
        1,
        "proxy-settings",
        "add proxyMode, proxyHost and https settings",
        steps::add_proxy_settings,
    ),
    MigrationStep::new(
        2,
        "cors-and-route-uuids",
        "add cors, route uuids, fold contentType into custom headers",
        steps::add_cors_and_route_uuids,
    ),
    MigrationStep::new(
        3,
        "fill-route-uuids",
        "add missing route uuids",
        steps::fill_route_uuids,
    ),
    MigrationStep::new(
        4,
        "environment-headers",
        "add environment headers and route documentation, rename customHeaders to headers",
        steps::add_environment_headers,
    ),
    MigrationStep::new(
        5,
        "flatten-route-file",
        "replace route file object with filePath and sendFileAsBody",
        steps::flatten_route_file,
    ),
    MigrationStep::new(
        6,
        "route-responses",
        "move route response fields into a responses array",
        steps::move_route_fields_to_responses,
    ),
    MigrationStep::new(
        7,
        "renew-response-uuids",
        "regenerate every route response uuid",
        steps::renew_response_uuids,
    ),
    MigrationStep::new(
        8,
        "route-enabled",
        "add route enabled flag",
        steps::add_route_enabled,
    ),
    MigrationStep::new(
        9,
        "response-label",
        "add route response label",
        steps::add_response_label,
    ),
    MigrationStep::new(
        10,
        "proxy-headers",
        "add proxy request and response headers",
        steps::add_proxy_headers,
    ),
    MigrationStep::new(
        11,
        "disable-templating",
        "add disableTemplating, store statusCode as a number",
        steps::add_disable_templating,
    ),
    MigrationStep::new(
        12,
        "rules-operator",
        "add route response rulesOperator",
        steps::add_rules_operator,
    ),
];

/// Id of the newest migration. New documents are stamped with it.
pub const HIGHEST_MIGRATION_ID: u32 = MIGRATIONS[MIGRATIONS.len() - 1].id;

lazy_static! {
    static ref GLOBAL: MigrationRegistry = MigrationRegistry::from_sorted(MIGRATIONS.to_vec());
}

/// Ordered set of migration steps.
///
/// Steps are kept sorted by id whatever order they are registered in, so the
/// runner always applies them ascending.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    steps: Vec<MigrationStep>,
}

impl MigrationRegistry {
    /// Build a registry, rejecting id 0 and duplicate ids.
    pub fn new(steps: impl IntoIterator<Item = MigrationStep>) -> Result<Self, MigrationError> {
        let mut registry = Self::default();
        for step in steps {
            registry.register(step)?;
        }
        Ok(registry)
    }

    /// The registry of released migrations, built on first use.
    pub fn global() -> &'static MigrationRegistry {
        &GLOBAL
    }

    fn from_sorted(steps: Vec<MigrationStep>) -> Self {
        debug_assert!(steps.windows(2).all(|w| w[0].id < w[1].id));
        Self { steps }
    }

    /// Register a step.
    pub fn register(&mut self, step: MigrationStep) -> Result<(), MigrationError> {
        if step.id == 0 {
            return Err(MigrationError::InvalidRegistry {
                reason: format!("step `{}` uses reserved id 0", step.name),
            });
        }
        if let Some(existing) = self.get(step.id) {
            return Err(MigrationError::InvalidRegistry {
                reason: format!(
                    "steps `{}` and `{}` share id {}",
                    existing.name, step.name, step.id
                ),
            });
        }

        self.steps.push(step);
        self.steps.sort_by_key(|s| s.id);
        Ok(())
    }

    /// All steps, ascending by id.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Id of the last step, or 0 for an empty registry.
    pub fn highest_id(&self) -> u32 {
        self.steps.last().map_or(0, |s| s.id)
    }

    pub fn get(&self, id: u32) -> Option<&MigrationStep> {
        self.steps
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.steps[i])
    }

    /// Steps a document at `marker` still needs, ascending.
    pub fn pending(&self, marker: u32) -> &[MigrationStep] {
        let start = self.steps.partition_point(|s| s.id <= marker);
        &self.steps[start..]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
