//! Recursive AND/OR condition evaluation.

use std::sync::Arc;

use regex::Regex;

use crate::error::TemplateError;
use crate::plan::model::Condition;
use crate::template::{ContextMap, TemplateProcessor};

/// Evaluates condition trees against an execution context.
///
/// A bare-identifier expression (`state`) is shorthand for `${state}`;
/// anything else is rendered verbatim through the template processor, so
/// composite expressions like `${a}-${b}` work too.
#[derive(Clone)]
pub struct ConditionEvaluator {
    templates: Arc<dyn TemplateProcessor>,
    identifier: Regex,
}

impl ConditionEvaluator {
    /// Create an evaluator over the given template processor.
    pub fn new(templates: Arc<dyn TemplateProcessor>) -> Self {
        Self {
            templates,
            identifier: Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap(),
        }
    }

    /// Evaluate a condition tree. An absent condition never blocks.
    ///
    /// Precedence, kept exactly as observed: when the primary test passes,
    /// an `and` child decides the final result (pass is necessary but not
    /// sufficient) and the `or` child is never consulted; when the primary
    /// test fails, an `or` child decides the final result and the `and`
    /// child is never consulted.
    pub fn evaluate(
        &self,
        condition: Option<&Condition>,
        context: &ContextMap,
    ) -> Result<bool, TemplateError> {
        let Some(condition) = condition else {
            return Ok(true);
        };

        let rendered = self.render_expression(&condition.expression, context)?;
        let primary = if let Some(expected) = nonblank(&condition.value) {
            rendered == expected
        } else if let Some(rejected) = nonblank(&condition.not_value) {
            rendered != rejected
        } else {
            false
        };

        if primary {
            match &condition.and {
                Some(child) => self.evaluate(Some(child), context),
                None => Ok(true),
            }
        } else {
            match &condition.or {
                Some(child) => self.evaluate(Some(child), context),
                None => Ok(false),
            }
        }
    }

    fn render_expression(
        &self,
        expression: &str,
        context: &ContextMap,
    ) -> Result<String, TemplateError> {
        if self.identifier.is_match(expression) {
            return self.templates.render(&format!("${{{expression}}}"), context);
        }
        self.templates.render(expression, context)
    }
}

fn nonblank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
