//! View-and-confirm executor.
//!
//! Not registered by default: the embedding application wires it up
//! together with its form/UI handling, sharing one `ConfirmationService`
//! with whatever surface receives the confirmations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::confirm::ConfirmationService;
use crate::plan::builtin::alert::{Alert, AlertSink};
use crate::plan::executor::{ActionError, ActionExecutor, ActionOutcome};
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::{tags, Action, ActionKind};
use crate::template::TemplateProcessor;

/// Pauses the plan behind a confirmation token and announces the token
/// through the alert sink. The plan resumes when
/// `ConfirmationService::confirm` is called with a live token.
pub struct ViewAndConfirmExecutor {
    confirmations: Arc<ConfirmationService>,
    sink: Arc<dyn AlertSink>,
    templates: Arc<dyn TemplateProcessor>,
}

impl ViewAndConfirmExecutor {
    pub fn new(
        confirmations: Arc<ConfirmationService>,
        sink: Arc<dyn AlertSink>,
        templates: Arc<dyn TemplateProcessor>,
    ) -> Self {
        Self {
            confirmations,
            sink,
            templates,
        }
    }
}

#[async_trait]
impl ActionExecutor for ViewAndConfirmExecutor {
    async fn execute(
        &self,
        interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        let ActionKind::ViewAndConfirm { view } = &action.kind else {
            return Err(ActionError::WrongVariant {
                expected: tags::VIEW_AND_CONFIRM,
            });
        };

        let snapshot = interpreter.context_snapshot().await;
        let view = self.templates.render(view, &snapshot)?;
        let token = self
            .confirmations
            .issue(Arc::clone(&interpreter), &action.name)
            .await;
        self.sink
            .deliver(Alert {
                recipient: None,
                subject: format!("Confirmation required: {view}"),
                body: format!("Execution paused at `{}`; confirm with token {token}", action.name),
            })
            .await?;
        Ok(ActionOutcome::Pending)
    }
}
