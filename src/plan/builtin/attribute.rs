//! Set-attribute executor.

use std::sync::Arc;

use async_trait::async_trait;

use crate::plan::executor::{ActionError, ActionExecutor, ActionOutcome};
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::{tags, Action, ActionKind};
use crate::template::TemplateProcessor;

/// Renders a value template and completes with the result, which the
/// interpreter stores under the action's name.
pub struct SetAttributeExecutor {
    templates: Arc<dyn TemplateProcessor>,
}

impl SetAttributeExecutor {
    pub fn new(templates: Arc<dyn TemplateProcessor>) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl ActionExecutor for SetAttributeExecutor {
    async fn execute(
        &self,
        interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        let ActionKind::SetAttribute { value } = &action.kind else {
            return Err(ActionError::WrongVariant {
                expected: tags::SET_ATTRIBUTE,
            });
        };
        let snapshot = interpreter.context_snapshot().await;
        let rendered = self.templates.render(value, &snapshot)?;
        Ok(ActionOutcome::Completed(Some(rendered)))
    }
}
