//! Rule persistence and authorization seams.
//!
//! Real persistence and the authorization service are external
//! collaborators; these traits are the boundary. The in-memory
//! implementations back the binary harness and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::rules::model::Rule;

/// Read access to persisted rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Fetch a rule by id; `None` when no such rule is persisted.
    async fn rule_by_id(&self, id: &str) -> Result<Option<Rule>, StoreError>;

    /// Fetch every persisted rule.
    async fn all_rules(&self) -> Result<Vec<Rule>, StoreError>;
}

/// Decides whether a caller's role set satisfies a rule's restriction.
pub trait RoleMatcher: Send + Sync {
    /// `required` is the rule's role restriction, if any.
    fn allows(&self, required: Option<&str>, roles: &[String]) -> bool;
}

/// Membership-based role matching: unrestricted rules are visible to
/// everyone, restricted rules require the exact role.
pub struct ExactRoleMatcher;

impl RoleMatcher for ExactRoleMatcher {
    fn allows(&self, required: Option<&str>, roles: &[String]) -> bool {
        match required {
            None => true,
            Some(required) => roles.iter().any(|held| held == required),
        }
    }
}

/// In-memory rule store.
pub struct InMemoryRuleStore {
    rules: RwLock<HashMap<String, Rule>>,
}

impl InMemoryRuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store preloaded with rules.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let map = rules.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            rules: RwLock::new(map),
        }
    }

    /// Insert or replace a rule.
    pub async fn insert(&self, rule: Rule) {
        self.rules.write().await.insert(rule.id.clone(), rule);
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn rule_by_id(&self, id: &str) -> Result<Option<Rule>, StoreError> {
        Ok(self.rules.read().await.get(id).cloned())
    }

    async fn all_rules(&self) -> Result<Vec<Rule>, StoreError> {
        Ok(self.rules.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_fetch() {
        let store = InMemoryRuleStore::new();
        store.insert(Rule::new("r1", "first")).await;

        let rule = store.rule_by_id("r1").await.unwrap();
        assert_eq!(rule.unwrap().name, "first");
        assert!(store.rule_by_id("missing").await.unwrap().is_none());
    }

    #[test]
    fn unrestricted_rules_are_visible_to_all() {
        let roles: Vec<String> = vec![];
        assert!(ExactRoleMatcher.allows(None, &roles));
    }

    #[test]
    fn restricted_rules_require_membership() {
        let roles = vec!["dispatcher".to_string()];
        assert!(ExactRoleMatcher.allows(Some("dispatcher"), &roles));
        assert!(!ExactRoleMatcher.allows(Some("admin"), &roles));
    }
}
