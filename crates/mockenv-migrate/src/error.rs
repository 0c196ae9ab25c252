use thiserror::Error;

/// Failure raised by a single step's transform.
///
/// Steps only ever report shape problems: a structure the step needs is
/// missing or holds the wrong kind of JSON value. Paths are dotted and use
/// `[i]` for array positions, e.g. `routes[2].responses`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// A required field is absent.
    #[error("missing field `{path}`")]
    MissingField { path: String },
    /// A field exists but is not the JSON type the step works on.
    #[error("field `{path}` is not {expected}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
    },
}

impl StepError {
    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    pub(crate) fn unexpected(path: impl Into<String>, expected: &'static str) -> Self {
        Self::UnexpectedType {
            path: path.into(),
            expected,
        }
    }
}

/// Error returned by the registry or the runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A step failed. Steps before it stay applied and the document's
    /// marker equals `last_applied`.
    #[error("migration {id} failed (document left at migration {last_applied}): {source}")]
    StepFailed {
        id: u32,
        last_applied: u32,
        #[source]
        source: StepError,
    },
    /// The document is not something the runner can work on at all.
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },
    /// `lastMigration` holds something other than a non-negative integer.
    #[error("invalid lastMigration marker: {found}")]
    InvalidMarker { found: String },
    /// The step list violates the registry's ordering rules.
    #[error("invalid migration registry: {reason}")]
    InvalidRegistry { reason: String },
}

/// Result type for step transforms.
pub type StepResult = Result<(), StepError>;
