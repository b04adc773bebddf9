//! Error types for msgflow.
//!
//! A rule that simply does not match is never an error — the matcher
//! returns that as a value (`rules::MatchOutcome::NoMatch`). Everything
//! here is either a configuration defect (bad pattern, unknown template
//! field, unregistered executor variant) or a runtime failure that aborts
//! a plan execution.

use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Confirmation error: {0}")]
    Confirm(#[from] ConfirmError),

    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Pattern compilation errors.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("invalid pattern `{pattern}`: {reason}")]
    Invalid { pattern: String, reason: String },
}

/// Template rendering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown context field `{name}`")]
    UnknownField { name: String },
}

/// Rule store backend errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rule store backend error: {0}")]
    Backend(String),
}

/// Plan execution errors.
///
/// `MissingExecutor` and `Condition` are configuration defects; `Action`
/// wraps whatever an executor reported, tagged with the failing action's
/// name and variant for diagnostics. All of them abort the execution and
/// discard the accumulated context.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("no executor registered for action variant `{tag}`")]
    MissingExecutor { tag: String },

    #[error("action `{name}` ({tag}) failed: {reason}")]
    Action {
        name: String,
        tag: String,
        reason: String,
    },

    #[error("condition on step {step} could not be evaluated: {source}")]
    Condition {
        step: usize,
        #[source]
        source: TemplateError,
    },
}

/// Confirmation-flow errors.
///
/// An expired token is a distinct signal, not a generic failure: the
/// caller may want to re-issue rather than reject outright.
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("confirmation token `{token}` has expired")]
    Expired { token: String },

    #[error("unknown or already used confirmation token `{token}`")]
    Unknown { token: String },

    #[error("resumed plan failed: {0}")]
    Plan(#[from] PlanError),
}

/// Trigger entrypoint errors.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("no rule persisted under id `{id}`")]
    UnknownRule { id: String },

    #[error("rule store error: {0}")]
    Store(#[from] StoreError),

    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
