//! Trigger entrypoint: from a matched rule to a running plan.

use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{PlanError, TriggerError};
use crate::message::InboundMessage;
use crate::patterns::PatternCache;
use crate::plan::condition::ConditionEvaluator;
use crate::plan::interpreter::{CompletionCallback, PlanInterpreter};
use crate::plan::registry::ExecutorRegistry;
use crate::rules::matcher::{MatchOutcome, RuleMatcher};
use crate::rules::model::Rule;
use crate::rules::store::{RoleMatcher, RuleStore};
use crate::template::{ContextMap, TemplateProcessor};

/// Reserved context keys carrying the original message. Extraction groups
/// shadowing them is intentional — reserved means the collision is known.
pub const KEY_SOURCE_TYPE: &str = "source_type";
pub const KEY_FROM: &str = "from";
pub const KEY_MESSAGE: &str = "message";
pub const KEY_TITLE: &str = "title";

/// What the trigger did with a reported match.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The rule re-matched and its plan was started.
    Started { execution_id: Uuid },
    /// The rule exists but rejected the message on re-validation.
    Rejected { reason: String },
    /// The rule matched but carries no plan to run.
    NoPlan,
}

/// Observes plan completions. Plan execution is fire-and-forget relative
/// to the trigger call; this is where results surface.
pub trait ExecutionObserver: Send + Sync {
    fn plan_completed(&self, execution_id: Uuid, result: &Result<ContextMap, PlanError>);
}

/// Observer that only logs.
pub struct LoggingObserver;

impl ExecutionObserver for LoggingObserver {
    fn plan_completed(&self, execution_id: Uuid, result: &Result<ContextMap, PlanError>) {
        match result {
            Ok(values) => info!(execution = %execution_id, keys = values.len(), "plan finished"),
            Err(err) => error!(execution = %execution_id, error = %err, "plan failed"),
        }
    }
}

/// Entry point wiring rules, matching and plan execution together.
pub struct TriggerService {
    store: Arc<dyn RuleStore>,
    roles: Arc<dyn RoleMatcher>,
    matcher: RuleMatcher,
    registry: Arc<ExecutorRegistry>,
    templates: Arc<dyn TemplateProcessor>,
    observer: Arc<dyn ExecutionObserver>,
}

impl TriggerService {
    pub fn new(
        store: Arc<dyn RuleStore>,
        roles: Arc<dyn RoleMatcher>,
        patterns: Arc<PatternCache>,
        registry: Arc<ExecutorRegistry>,
        templates: Arc<dyn TemplateProcessor>,
        observer: Arc<dyn ExecutionObserver>,
    ) -> Self {
        Self {
            store,
            roles,
            matcher: RuleMatcher::new(patterns),
            registry,
            templates,
            observer,
        }
    }

    /// Handle a reported match for `rule_id`.
    ///
    /// The persisted rule is re-validated against the message — the
    /// caller's word is not taken for it — then the rule's defaults and
    /// extraction captures are merged into a fresh context, the original
    /// message is placed under the reserved keys, and the plan is started.
    /// Configuration and execution errors propagate; the plan's result
    /// itself goes to the observer, not to the caller.
    pub async fn match_found(
        &self,
        rule_id: &str,
        message: &InboundMessage,
    ) -> Result<TriggerOutcome, TriggerError> {
        let rule = self
            .store
            .rule_by_id(rule_id)
            .await?
            .ok_or_else(|| TriggerError::UnknownRule {
                id: rule_id.to_string(),
            })?;

        match self.matcher.matches(&rule, message)? {
            MatchOutcome::NoMatch { reason } => {
                debug!(rule = %rule.id, %reason, "re-validation rejected the message");
                return Ok(TriggerOutcome::Rejected { reason });
            }
            MatchOutcome::Match => {}
        }

        let Some(plan) = rule.plan.clone() else {
            debug!(rule = %rule.id, "rule has no action plan; nothing to execute");
            return Ok(TriggerOutcome::NoPlan);
        };

        let mut context = plan.initial_context.clone();
        context.extend(rule.default_attributes.clone());
        context.extend(self.matcher.extract(&rule, message)?);
        context.insert(KEY_SOURCE_TYPE.into(), message.source_type.clone());
        context.insert(KEY_FROM.into(), message.from.clone());
        context.insert(KEY_MESSAGE.into(), message.message.clone());
        context.insert(KEY_TITLE.into(), message.title.clone().unwrap_or_default());

        let execution_id = Uuid::new_v4();
        let observer = Arc::clone(&self.observer);
        let callback: CompletionCallback = Box::new(move |result| {
            observer.plan_completed(execution_id, &result);
        });

        info!(
            rule = %rule.id,
            execution = %execution_id,
            plan = %plan.name,
            "starting action plan"
        );
        let interpreter = PlanInterpreter::with_id(
            execution_id,
            plan,
            context,
            Arc::clone(&self.registry),
            ConditionEvaluator::new(Arc::clone(&self.templates)),
            Some(callback),
        );
        interpreter.advance(None).await?;

        Ok(TriggerOutcome::Started { execution_id })
    }

    /// Rules visible to a caller holding `roles`.
    pub async fn rules_for_roles(&self, roles: &[String]) -> Result<Vec<Rule>, TriggerError> {
        Ok(self
            .store
            .all_rules()
            .await?
            .into_iter()
            .filter(|rule| self.roles.allows(rule.required_role.as_deref(), roles))
            .collect())
    }
}
