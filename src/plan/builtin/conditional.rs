//! Conditional-group executor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::plan::condition::ConditionEvaluator;
use crate::plan::executor::{ActionError, ActionExecutor, ActionOutcome};
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::{tags, Action, ActionKind};

/// Gates a nested group of actions on a condition.
///
/// The nested actions run inline, to completion, in order; each result is
/// stored under the nested action's name. Nesting is unrestricted — a
/// conditional inside a conditional dispatches through the same registry —
/// but a nested action that detaches (`Pending`) is an execution error:
/// a deferred resume inside an inline group would corrupt the plan's
/// single-cursor progression.
pub struct ConditionalExecutor {
    conditions: ConditionEvaluator,
}

impl ConditionalExecutor {
    pub fn new(conditions: ConditionEvaluator) -> Self {
        Self { conditions }
    }
}

#[async_trait]
impl ActionExecutor for ConditionalExecutor {
    async fn execute(
        &self,
        interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        let ActionKind::Conditional { condition, actions } = &action.kind else {
            return Err(ActionError::WrongVariant {
                expected: tags::CONDITIONAL,
            });
        };

        let snapshot = interpreter.context_snapshot().await;
        let admitted = self.conditions.evaluate(Some(condition), &snapshot)?;
        if !admitted {
            debug!(action = %action.name, "conditional group rejected");
            return Ok(ActionOutcome::Completed(None));
        }

        for nested in actions {
            let tag = nested.kind.tag();
            let executor = interpreter
                .registry()
                .get(tag)
                .await
                .ok_or_else(|| ActionError::MissingNestedExecutor(tag.to_string()))?;
            match executor.execute(Arc::clone(&interpreter), nested).await? {
                ActionOutcome::Completed(Some(value)) => {
                    interpreter.set_value(nested.name.clone(), value).await;
                }
                ActionOutcome::Completed(None) => {}
                ActionOutcome::Pending => {
                    return Err(ActionError::Failed(format!(
                        "nested action `{}` detached; asynchronous actions may not nest inside a conditional group",
                        nested.name
                    )));
                }
                ActionOutcome::Finalized => return Ok(ActionOutcome::Finalized),
            }
        }
        Ok(ActionOutcome::Completed(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::builtin::SetAttributeExecutor;
    use crate::plan::interpreter::PlanInterpreter;
    use crate::plan::model::{ActionPlan, Condition};
    use crate::plan::registry::ExecutorRegistry;
    use crate::template::{ContextMap, SimpleTemplateProcessor, TemplateProcessor};

    fn set_attribute(name: &str, value: &str) -> Action {
        Action {
            name: name.into(),
            label: None,
            kind: ActionKind::SetAttribute { value: value.into() },
        }
    }

    async fn harness(initial: ContextMap) -> (Arc<PlanInterpreter>, ConditionalExecutor) {
        let templates: Arc<dyn TemplateProcessor> = Arc::new(SimpleTemplateProcessor::new());
        let registry = ExecutorRegistry::new();
        registry
            .register(
                tags::SET_ATTRIBUTE,
                Arc::new(SetAttributeExecutor::new(Arc::clone(&templates))),
            )
            .await;
        let evaluator = ConditionEvaluator::new(Arc::clone(&templates));
        let interpreter = PlanInterpreter::new(
            ActionPlan {
                name: "harness".into(),
                steps: vec![],
                final_action: None,
                initial_context: ContextMap::new(),
            },
            initial,
            Arc::new(registry),
            evaluator.clone(),
            None,
        );
        (interpreter, ConditionalExecutor::new(evaluator))
    }

    #[tokio::test]
    async fn admitted_group_runs_nested_actions() {
        let mut initial = ContextMap::new();
        initial.insert("state".into(), "open".into());
        let (interpreter, executor) = harness(initial).await;

        let action = Action {
            name: "escalate".into(),
            label: None,
            kind: ActionKind::Conditional {
                condition: Condition::equals("state", "open"),
                actions: vec![set_attribute("urgency", "high")],
            },
        };
        let outcome = executor
            .execute(Arc::clone(&interpreter), &action)
            .await
            .unwrap();
        assert!(matches!(outcome, ActionOutcome::Completed(None)));
        let snapshot = interpreter.context_snapshot().await;
        assert_eq!(snapshot.get("urgency").unwrap(), "high");
    }

    #[tokio::test]
    async fn rejected_group_contributes_nothing() {
        let mut initial = ContextMap::new();
        initial.insert("state".into(), "closed".into());
        let (interpreter, executor) = harness(initial).await;

        let action = Action {
            name: "escalate".into(),
            label: None,
            kind: ActionKind::Conditional {
                condition: Condition::equals("state", "open"),
                actions: vec![set_attribute("urgency", "high")],
            },
        };
        executor
            .execute(Arc::clone(&interpreter), &action)
            .await
            .unwrap();
        assert!(!interpreter.context_snapshot().await.contains_key("urgency"));
    }

    #[tokio::test]
    async fn conditionals_nest() {
        let mut initial = ContextMap::new();
        initial.insert("state".into(), "open".into());
        initial.insert("severity".into(), "1".into());
        let (interpreter, executor) = harness(initial).await;

        // Outer gate on state, inner gate on severity.
        let inner = Action {
            name: "page".into(),
            label: None,
            kind: ActionKind::Conditional {
                condition: Condition::equals("severity", "1"),
                actions: vec![set_attribute("paged", "yes")],
            },
        };
        let outer = Action {
            name: "escalate".into(),
            label: None,
            kind: ActionKind::Conditional {
                condition: Condition::equals("state", "open"),
                actions: vec![inner],
            },
        };
        // The nested conditional dispatches through the registry, so it
        // must be registered there too.
        interpreter
            .registry()
            .register(
                tags::CONDITIONAL,
                Arc::new(ConditionalExecutor::new(
                    ConditionEvaluator::new(Arc::new(SimpleTemplateProcessor::new())),
                )),
            )
            .await;

        executor
            .execute(Arc::clone(&interpreter), &outer)
            .await
            .unwrap();
        assert_eq!(
            interpreter.context_snapshot().await.get("paged").unwrap(),
            "yes"
        );
    }

    #[tokio::test]
    async fn missing_nested_executor_is_an_error() {
        let mut initial = ContextMap::new();
        initial.insert("state".into(), "open".into());
        let (interpreter, executor) = harness(initial).await;

        let action = Action {
            name: "escalate".into(),
            label: None,
            kind: ActionKind::Conditional {
                condition: Condition::equals("state", "open"),
                actions: vec![Action {
                    name: "call".into(),
                    label: None,
                    kind: ActionKind::ApiCall {
                        endpoint: "https://api.example".into(),
                        payload: None,
                    },
                }],
            },
        };
        let err = executor.execute(interpreter, &action).await.unwrap_err();
        assert!(matches!(err, ActionError::MissingNestedExecutor(tag) if tag == "api_call"));
    }

    #[tokio::test]
    async fn nested_finalize_propagates() {
        let mut initial = ContextMap::new();
        initial.insert("state".into(), "open".into());
        let (interpreter, executor) = harness(initial).await;
        interpreter
            .registry()
            .register(
                tags::FINALIZE_EXECUTION,
                Arc::new(crate::plan::builtin::FinalizeExecutor),
            )
            .await;

        let action = Action {
            name: "short_circuit".into(),
            label: None,
            kind: ActionKind::Conditional {
                condition: Condition::equals("state", "open"),
                actions: vec![Action {
                    name: "done".into(),
                    label: None,
                    kind: ActionKind::FinalizeExecution,
                }],
            },
        };
        let outcome = executor.execute(interpreter, &action).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Finalized));
    }
}
