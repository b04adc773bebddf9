//! The action-plan interpreter — a single re-entrant continuation.
//!
//! One operation, `advance(previous_result)`, is called once to start an
//! execution and again by each executor when its work completes. The
//! interpreter walks the plan's steps and actions behind a short-lived
//! lock, so a resume may arrive from any thread; progression through one
//! context is strictly sequential and both cursors only ever move forward.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::PlanError;
use crate::plan::condition::ConditionEvaluator;
use crate::plan::executor::ActionOutcome;
use crate::plan::model::{Action, ActionPlan};
use crate::plan::registry::ExecutorRegistry;
use crate::template::ContextMap;

/// Invoked exactly once when the execution completes or aborts. On
/// success it receives the accumulated context; on failure the context is
/// discarded and only the error travels.
pub type CompletionCallback = Box<dyn FnOnce(Result<ContextMap, PlanError>) + Send + 'static>;

/// Interpreter state machine.
///
/// The "step evaluated" flag of the execution model is represented
/// explicitly: `StepEntry` means the current step's condition has not been
/// consulted, `ActionDispatch` means the step was admitted and its actions
/// are being walked, `Running` means an executor is in flight and the
/// context is waiting for a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    StepEntry,
    ActionDispatch,
    Running,
    Completed,
}

/// Mutable state of one in-flight execution. Owned by the interpreter,
/// mutated only behind its lock.
struct ExecutionContext {
    values: ContextMap,
    step_cursor: usize,
    action_cursor: usize,
    state: PlanState,
    current_action: Option<Action>,
    final_dispatched: bool,
    on_complete: Option<CompletionCallback>,
}

/// What the locked transition decided the interpreter should do next.
enum Transition {
    Dispatch(Action),
    Complete {
        values: ContextMap,
        on_complete: Option<CompletionCallback>,
    },
    AlreadyDone,
}

/// Walks an action plan to completion.
pub struct PlanInterpreter {
    plan: Arc<ActionPlan>,
    registry: Arc<ExecutorRegistry>,
    conditions: ConditionEvaluator,
    execution_id: Uuid,
    ctx: Mutex<ExecutionContext>,
}

impl PlanInterpreter {
    /// Create an interpreter for one execution of `plan`.
    pub fn new(
        plan: ActionPlan,
        initial_context: ContextMap,
        registry: Arc<ExecutorRegistry>,
        conditions: ConditionEvaluator,
        on_complete: Option<CompletionCallback>,
    ) -> Arc<Self> {
        Self::with_id(Uuid::new_v4(), plan, initial_context, registry, conditions, on_complete)
    }

    /// Create an interpreter with a caller-assigned execution id.
    pub fn with_id(
        execution_id: Uuid,
        plan: ActionPlan,
        initial_context: ContextMap,
        registry: Arc<ExecutorRegistry>,
        conditions: ConditionEvaluator,
        on_complete: Option<CompletionCallback>,
    ) -> Arc<Self> {
        Arc::new(Self {
            plan: Arc::new(plan),
            registry,
            conditions,
            execution_id,
            ctx: Mutex::new(ExecutionContext {
                values: initial_context,
                step_cursor: 0,
                action_cursor: 0,
                state: PlanState::StepEntry,
                current_action: None,
                final_dispatched: false,
                on_complete,
            }),
        })
    }

    /// Id of this execution, for log correlation.
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// The plan being executed.
    pub fn plan(&self) -> &ActionPlan {
        &self.plan
    }

    /// The registry actions are dispatched through.
    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// The condition evaluator for this execution.
    pub fn conditions(&self) -> &ConditionEvaluator {
        &self.conditions
    }

    /// Current interpreter state.
    pub async fn state(&self) -> PlanState {
        self.ctx.lock().await.state
    }

    /// A copy of the context values as accumulated so far.
    pub async fn context_snapshot(&self) -> ContextMap {
        self.ctx.lock().await.values.clone()
    }

    /// Store a value directly, outside the current-action bookkeeping.
    /// Used by executors that run nested actions inline.
    pub async fn set_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.ctx.lock().await.values.insert(key.into(), value.into());
    }

    /// Drive the execution forward.
    ///
    /// Called with `None` to start, and with the previous action's result
    /// to resume. Any thread may call this, but never concurrently for
    /// the same execution. On error the plan is aborted: the terminal
    /// callback observes the error, the context is discarded, and the
    /// error is also returned to the caller.
    pub async fn advance(self: Arc<Self>, previous: Option<String>) -> Result<(), PlanError> {
        let mut carry = previous;
        loop {
            let transition = match self.transition(carry.take()).await {
                Ok(t) => t,
                Err(err) => {
                    self.abort(err.clone()).await;
                    return Err(err);
                }
            };

            match transition {
                Transition::AlreadyDone => return Ok(()),
                Transition::Complete { values, on_complete } => {
                    info!(
                        execution = %self.execution_id,
                        plan = %self.plan.name,
                        keys = values.len(),
                        "action plan completed"
                    );
                    if let Some(callback) = on_complete {
                        callback(Ok(values));
                    }
                    return Ok(());
                }
                Transition::Dispatch(action) => {
                    let tag = action.kind.tag();
                    let Some(executor) = self.registry.get(tag).await else {
                        let err = PlanError::MissingExecutor {
                            tag: tag.to_string(),
                        };
                        self.abort(err.clone()).await;
                        return Err(err);
                    };
                    debug!(
                        execution = %self.execution_id,
                        action = %action.name,
                        tag,
                        "dispatching action"
                    );
                    match executor.execute(Arc::clone(&self), &action).await {
                        Ok(ActionOutcome::Completed(value)) => carry = value,
                        Ok(ActionOutcome::Pending) => return Ok(()),
                        Ok(ActionOutcome::Finalized) => {
                            debug!(
                                execution = %self.execution_id,
                                action = %action.name,
                                "execution finalized; skipping remaining steps"
                            );
                            self.finalize_cursor().await;
                            carry = None;
                        }
                        Err(err) => {
                            let err = PlanError::Action {
                                name: action.name.clone(),
                                tag: tag.to_string(),
                                reason: err.to_string(),
                            };
                            self.abort(err.clone()).await;
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    /// Abort the execution from outside the `advance` loop. Executors
    /// that detached (returned `Pending`) use this when their deferred
    /// work fails.
    pub async fn fail(self: Arc<Self>, error: PlanError) {
        self.abort(error).await;
    }

    /// One locked state transition: record the previous result, skip
    /// rejected steps, and either pick the next action or finish.
    async fn transition(&self, previous: Option<String>) -> Result<Transition, PlanError> {
        let mut ctx = self.ctx.lock().await;

        if ctx.state == PlanState::Completed {
            warn!(execution = %self.execution_id, "advance called after completion; ignoring");
            return Ok(Transition::AlreadyDone);
        }

        if let Some(action) = ctx.current_action.take() {
            if let Some(result) = previous {
                debug!(
                    execution = %self.execution_id,
                    action = %action.name,
                    "recording action result"
                );
                ctx.values.insert(action.name.clone(), result);
            }
            if ctx.state == PlanState::Running {
                ctx.state = PlanState::ActionDispatch;
            }
        }

        loop {
            if ctx.step_cursor >= self.plan.steps.len() {
                if let Some(final_action) = &self.plan.final_action {
                    if !ctx.final_dispatched {
                        ctx.final_dispatched = true;
                        ctx.current_action = Some(final_action.clone());
                        ctx.state = PlanState::Running;
                        return Ok(Transition::Dispatch(final_action.clone()));
                    }
                }
                ctx.state = PlanState::Completed;
                let values = std::mem::take(&mut ctx.values);
                return Ok(Transition::Complete {
                    values,
                    on_complete: ctx.on_complete.take(),
                });
            }

            let step = &self.plan.steps[ctx.step_cursor];

            if ctx.state == PlanState::StepEntry {
                let admitted = self
                    .conditions
                    .evaluate(step.condition.as_ref(), &ctx.values)
                    .map_err(|source| PlanError::Condition {
                        step: ctx.step_cursor,
                        source,
                    })?;
                if !admitted {
                    debug!(
                        execution = %self.execution_id,
                        step = ctx.step_cursor,
                        "step condition rejected; skipping step"
                    );
                    ctx.step_cursor += 1;
                    ctx.action_cursor = 0;
                    continue;
                }
                ctx.state = PlanState::ActionDispatch;
            }

            if ctx.action_cursor >= step.actions.len() {
                ctx.step_cursor += 1;
                ctx.action_cursor = 0;
                ctx.state = PlanState::StepEntry;
                continue;
            }

            let action = step.actions[ctx.action_cursor].clone();
            ctx.action_cursor += 1;
            ctx.current_action = Some(action.clone());
            ctx.state = PlanState::Running;
            return Ok(Transition::Dispatch(action));
        }
    }

    /// Jump the cursor past every remaining step and the final action.
    async fn finalize_cursor(&self) {
        let mut ctx = self.ctx.lock().await;
        ctx.step_cursor = self.plan.steps.len();
        ctx.action_cursor = 0;
        ctx.final_dispatched = true;
    }

    async fn abort(&self, err: PlanError) {
        let callback = {
            let mut ctx = self.ctx.lock().await;
            if ctx.state == PlanState::Completed {
                return;
            }
            ctx.state = PlanState::Completed;
            ctx.values.clear();
            ctx.on_complete.take()
        };
        error!(
            execution = %self.execution_id,
            plan = %self.plan.name,
            error = %err,
            "action plan aborted"
        );
        if let Some(callback) = callback {
            callback(Err(err));
        }
    }
}
