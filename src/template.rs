//! Template evaluation against an execution context.
//!
//! Condition expressions and action payloads are small template strings
//! rendered against the context map. The processor is pluggable so an
//! embedding application can swap in a full templating engine; the shipped
//! implementation does plain substitution.

use std::collections::HashMap;

use regex::Regex;

use crate::error::TemplateError;

/// The mutable key→value state of one plan execution.
pub type ContextMap = HashMap<String, String>;

/// Renders a template string against a context map.
pub trait TemplateProcessor: Send + Sync {
    /// Render `input` against `context`, yielding a plain string.
    fn render(&self, input: &str, context: &ContextMap) -> Result<String, TemplateError>;
}

/// Plain-substitution template processor.
///
/// Every `${name}` placeholder is replaced with the context value under
/// `name`. A referenced field absent from the context is a configuration
/// defect and renders as `TemplateError::UnknownField`; text without
/// placeholders renders as itself.
pub struct SimpleTemplateProcessor {
    placeholder: Regex,
}

impl SimpleTemplateProcessor {
    /// Create a processor.
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}").unwrap(),
        }
    }
}

impl Default for SimpleTemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateProcessor for SimpleTemplateProcessor {
    fn render(&self, input: &str, context: &ContextMap) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        for caps in self.placeholder.captures_iter(input) {
            let whole = caps.get(0).unwrap();
            let name = &caps[1];
            let value = context.get(name).ok_or_else(|| TemplateError::UnknownField {
                name: name.to_string(),
            })?;
            out.push_str(&input[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&input[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> ContextMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn placeholders_are_substituted() {
        let templates = SimpleTemplateProcessor::new();
        let ctx = context(&[("ticketId", "4521"), ("reporter", "alice")]);
        assert_eq!(
            templates
                .render("ticket ${ticketId} reported by ${reporter}", &ctx)
                .unwrap(),
            "ticket 4521 reported by alice"
        );
    }

    #[test]
    fn missing_placeholder_field_is_unknown_field() {
        let templates = SimpleTemplateProcessor::new();
        let ctx = context(&[("ticketId", "4521")]);
        let err = templates.render("assignee: ${assignee}", &ctx).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownField { name } if name == "assignee"));
    }

    #[test]
    fn placeholder_free_text_renders_as_itself() {
        let templates = SimpleTemplateProcessor::new();
        assert_eq!(
            templates.render("no fields here!", &ContextMap::new()).unwrap(),
            "no fields here!"
        );
    }

    #[test]
    fn adjacent_placeholders_keep_their_order() {
        let templates = SimpleTemplateProcessor::new();
        let ctx = context(&[("a", "1"), ("b", "2")]);
        assert_eq!(templates.render("${a}${b}", &ctx).unwrap(), "12");
    }

    #[test]
    fn dotted_names_resolve() {
        let templates = SimpleTemplateProcessor::new();
        let ctx = context(&[("order.state", "open")]);
        assert_eq!(
            templates.render("state=${order.state}", &ctx).unwrap(),
            "state=open"
        );
    }

    #[test]
    fn empty_context_value_substitutes_as_empty() {
        let templates = SimpleTemplateProcessor::new();
        let ctx = context(&[("title", "")]);
        assert_eq!(templates.render("[${title}]", &ctx).unwrap(), "[]");
    }
}
