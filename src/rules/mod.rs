//! Rule configuration and matching.
//!
//! A rule is a configured predicate over an inbound message plus optional
//! extraction patterns and an associated action plan. Rules are created
//! and updated by external configuration management; during matching and
//! execution they are read-only.

pub mod matcher;
pub mod model;
pub mod store;

pub use matcher::{MatchOutcome, RuleMatcher};
pub use model::Rule;
pub use store::{ExactRoleMatcher, InMemoryRuleStore, RoleMatcher, RuleStore};
