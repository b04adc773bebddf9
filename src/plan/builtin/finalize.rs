//! Finalize-execution executor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::plan::executor::{ActionError, ActionExecutor, ActionOutcome};
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::{tags, Action, ActionKind};

/// Ends the execution where it stands: remaining steps and the plan's
/// final action are skipped and the terminal callback fires with the
/// context accumulated so far.
pub struct FinalizeExecutor;

#[async_trait]
impl ActionExecutor for FinalizeExecutor {
    async fn execute(
        &self,
        _interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        if !matches!(action.kind, ActionKind::FinalizeExecution) {
            return Err(ActionError::WrongVariant {
                expected: tags::FINALIZE_EXECUTION,
            });
        }
        debug!(action = %action.name, "finalizing execution");
        Ok(ActionOutcome::Finalized)
    }
}
