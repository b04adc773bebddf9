//! Plan, step, action and condition models.
//!
//! Plans are persisted as structured markup and deserialized into this
//! graph before interpretation. The serde tag on `ActionKind` is the same
//! string the executor registry dispatches on, so the markup↔variant
//! mapping and the dispatch table cannot drift apart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Variant tags, shared between serde and the executor registry.
pub mod tags {
    pub const API_CALL: &str = "api_call";
    pub const SEND_ALERT: &str = "send_alert";
    pub const SET_ATTRIBUTE: &str = "set_attribute";
    pub const CONDITIONAL: &str = "conditional";
    pub const FILL_FORM: &str = "fill_form";
    pub const CALL_AND_FILL_FORM: &str = "call_and_fill_form";
    pub const VIEW_AND_CONFIRM: &str = "view_and_confirm";
    pub const FINALIZE_EXECUTION: &str = "finalize_execution";
}

/// An ordered, condition-gated sequence of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Plan name, for logging and listings.
    pub name: String,
    /// Steps executed in order.
    pub steps: Vec<Step>,
    /// Action dispatched once after the last step completes.
    #[serde(default)]
    pub final_action: Option<Action>,
    /// Values seeded into the context before execution starts.
    #[serde(default)]
    pub initial_context: HashMap<String, String>,
}

/// A gated group of actions. The condition is consulted exactly once per
/// entry; a step whose condition rejects is skipped entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub condition: Option<Condition>,
    pub actions: Vec<Action>,
}

/// One unit of work in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Context key the action's result is stored under.
    pub name: String,
    /// Display label for UI surfaces.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// The closed set of action variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Invoke an external endpoint; the response becomes the result.
    ApiCall {
        endpoint: String,
        #[serde(default)]
        payload: Option<String>,
    },
    /// Emit an alert through the configured sink.
    SendAlert {
        #[serde(default)]
        recipient: Option<String>,
        subject: String,
        body: String,
    },
    /// Render a template and store it under the action name.
    SetAttribute { value: String },
    /// Gate a nested group of actions on a condition.
    Conditional {
        condition: Condition,
        actions: Vec<Action>,
    },
    /// Present a form to fill; handled by the embedding UI layer.
    FillForm {
        form: String,
        #[serde(default)]
        fields: HashMap<String, String>,
    },
    /// Invoke an endpoint and present its result as a pre-filled form.
    CallAndFillForm {
        endpoint: String,
        form: String,
        #[serde(default)]
        fields: HashMap<String, String>,
    },
    /// Pause until a human confirms the named view.
    ViewAndConfirm { view: String },
    /// End the execution, skipping whatever remains.
    FinalizeExecution,
}

impl ActionKind {
    /// The variant tag used for registry dispatch; identical to the serde
    /// `type` tag.
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::ApiCall { .. } => tags::API_CALL,
            ActionKind::SendAlert { .. } => tags::SEND_ALERT,
            ActionKind::SetAttribute { .. } => tags::SET_ATTRIBUTE,
            ActionKind::Conditional { .. } => tags::CONDITIONAL,
            ActionKind::FillForm { .. } => tags::FILL_FORM,
            ActionKind::CallAndFillForm { .. } => tags::CALL_AND_FILL_FORM,
            ActionKind::ViewAndConfirm { .. } => tags::VIEW_AND_CONFIRM,
            ActionKind::FinalizeExecution => tags::FINALIZE_EXECUTION,
        }
    }
}

/// A recursive AND/OR predicate over the execution context.
///
/// The expression is rendered through the template processor; the primary
/// test compares the rendered value against `value` (equality) or, when
/// `value` is blank, against `not_value` (inequality). The `and` child
/// narrows a passing primary test; the `or` child widens a failing one.
/// The opposite child is never consulted — both children on one condition
/// are legal but asymmetric, and that asymmetry is kept as observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub expression: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub not_value: Option<String>,
    #[serde(default)]
    pub and: Option<Box<Condition>>,
    #[serde(default)]
    pub or: Option<Box<Condition>>,
}

impl Condition {
    /// An equality condition with no children.
    pub fn equals(expression: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            value: Some(value.into()),
            not_value: None,
            and: None,
            or: None,
        }
    }

    /// An inequality condition with no children.
    pub fn differs(expression: impl Into<String>, not_value: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            value: None,
            not_value: Some(not_value.into()),
            and: None,
            or: None,
        }
    }

    /// Attach an `and` child.
    pub fn with_and(mut self, child: Condition) -> Self {
        self.and = Some(Box::new(child));
        self
    }

    /// Attach an `or` child.
    pub fn with_or(mut self, child: Condition) -> Self {
        self.or = Some(Box::new(child));
        self
    }
}
