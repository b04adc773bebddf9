//! Rule model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::plan::model::ActionPlan;

/// A configured rule over inbound messages.
///
/// All predicate fields are optional; an empty rule matches everything.
/// Filter patterns are conjunctive — every one of them must find a match
/// in the message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Identifier assigned by the persistence layer.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Required source transport ("mail", "sms"); exact equality.
    #[serde(default)]
    pub source_type: Option<String>,
    /// Pattern the sender address must contain a match for.
    #[serde(default)]
    pub source_address_pattern: Option<String>,
    /// Patterns the message body must contain a match for (all of them).
    #[serde(default)]
    pub message_filter_patterns: Vec<String>,
    /// Patterns whose named groups are merged into the execution context.
    #[serde(default)]
    pub extraction_patterns: Vec<String>,
    /// Attributes seeded into every execution context for this rule.
    #[serde(default)]
    pub default_attributes: HashMap<String, String>,
    /// Action plan started when the rule fires.
    #[serde(default)]
    pub plan: Option<ActionPlan>,
    /// Identifier of a single action dispatched directly by the UI layer
    /// instead of a plan.
    #[serde(default)]
    pub direct_action: Option<String>,
    /// Role a caller must hold to see this rule in listings.
    #[serde(default)]
    pub required_role: Option<String>,
}

impl Rule {
    /// Create a rule with the given id and name and no predicates.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type: None,
            source_address_pattern: None,
            message_filter_patterns: Vec::new(),
            extraction_patterns: Vec::new(),
            default_attributes: HashMap::new(),
            plan: None,
            direct_action: None,
            required_role: None,
        }
    }
}
