//! Send-alert executor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::plan::executor::{ActionError, ActionExecutor, ActionOutcome};
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::{tags, Action, ActionKind};
use crate::template::TemplateProcessor;

/// A rendered alert ready for delivery.
#[derive(Debug, Clone)]
pub struct Alert {
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Delivery seam for alerts — pure I/O, no business logic. Mail and
/// messenger transports are external collaborators behind this trait.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: Alert) -> Result<(), ActionError>;
}

/// Sink that writes alerts to the log. The default when no transport is
/// wired up.
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn deliver(&self, alert: Alert) -> Result<(), ActionError> {
        info!(
            recipient = alert.recipient.as_deref().unwrap_or("-"),
            subject = %alert.subject,
            body = %alert.body,
            "alert emitted"
        );
        Ok(())
    }
}

/// Renders subject/body templates and hands the alert to the sink.
/// Contributes nothing to the context.
pub struct SendAlertExecutor {
    sink: Arc<dyn AlertSink>,
    templates: Arc<dyn TemplateProcessor>,
}

impl SendAlertExecutor {
    pub fn new(sink: Arc<dyn AlertSink>, templates: Arc<dyn TemplateProcessor>) -> Self {
        Self { sink, templates }
    }
}

#[async_trait]
impl ActionExecutor for SendAlertExecutor {
    async fn execute(
        &self,
        interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        let ActionKind::SendAlert {
            recipient,
            subject,
            body,
        } = &action.kind
        else {
            return Err(ActionError::WrongVariant {
                expected: tags::SEND_ALERT,
            });
        };

        let snapshot = interpreter.context_snapshot().await;
        let alert = Alert {
            recipient: recipient
                .as_ref()
                .map(|r| self.templates.render(r, &snapshot))
                .transpose()?,
            subject: self.templates.render(subject, &snapshot)?,
            body: self.templates.render(body, &snapshot)?,
        };
        self.sink.deliver(alert).await?;
        Ok(ActionOutcome::Completed(None))
    }
}
