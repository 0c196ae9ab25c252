//! # mockenv-migrate
//!
//! Forward-only schema migrations for mock API environment documents.
//!
//! Environments saved by older releases are upgraded in place, one released
//! schema change at a time, before the rest of the application touches them.
//!
//! ## How It Works
//!
//! 1. Every released schema change is a [`MigrationStep`] with an increasing id.
//! 2. A document records the highest id applied in its `lastMigration` field.
//! 3. The [`MigrationEngine`] applies every step above that marker, ascending,
//!    stamping the marker after each step.
//! 4. Documents without a marker get every step; documents from a newer
//!    release are left alone.
//!
//! ## Key Concepts
//!
//! - **Schema-less documents**: steps work on `serde_json` values and touch
//!   only the fields they own.
//! - **Idempotent steps**: a step finding its target shape already in place
//!   leaves it as is.
//! - **Resumable**: a failing step leaves the marker at the last step that
//!   succeeded; nothing is rolled back.
//! - **Append-only history**: [`MIGRATIONS`] only grows, and new documents are
//!   stamped with [`HIGHEST_MIGRATION_ID`].

pub mod document;
mod engine;
mod error;
mod ident;
mod registry;
pub mod steps;

pub use engine::{
    migrate, run, MigrationConfig, MigrationEngine, MigrationOutcome, MigrationReport,
};
pub use error::{MigrationError, StepError, StepResult};
pub use ident::fresh_uuid;
pub use registry::{
    MigrationRegistry, MigrationStep, TransformFn, HIGHEST_MIGRATION_ID, MIGRATIONS,
};
