//! Executor seam for action dispatch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TemplateError;
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::Action;

/// How an executor reports the fate of a dispatched action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// Work finished inline; the interpreter continues with this value,
    /// storing it under the action's name when present.
    Completed(Option<String>),
    /// The executor took ownership of resumption and will call
    /// `PlanInterpreter::advance` exactly once, possibly from another
    /// thread.
    Pending,
    /// The execution is finished; remaining steps and the final action
    /// are skipped and the terminal callback fires.
    Finalized,
}

/// Errors an executor can report. The interpreter wraps these with the
/// failing action's name and variant tag before aborting the plan.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("template rendering failed: {0}")]
    Template(#[from] TemplateError),

    #[error("outbound call failed: {0}")]
    Call(String),

    #[error("alert delivery failed: {0}")]
    Delivery(String),

    #[error("no executor registered for nested action variant `{0}`")]
    MissingNestedExecutor(String),

    #[error("action payload does not match variant `{expected}`")]
    WrongVariant { expected: &'static str },

    #[error("{0}")]
    Failed(String),
}

/// Performs the work for one action variant.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute one action.
    ///
    /// Exactly one resume per dispatch: either return
    /// `Completed`/`Finalized`, or return `Pending` and later call
    /// `advance` once. The interpreter never assumes synchronous
    /// completion.
    async fn execute(
        &self,
        interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError>;
}
