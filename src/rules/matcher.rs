//! Rule matching over inbound messages.

use std::sync::Arc;

use tracing::debug;

use crate::error::PatternError;
use crate::message::InboundMessage;
use crate::patterns::PatternCache;
use crate::rules::model::Rule;
use crate::template::ContextMap;

/// Outcome of matching one rule against one message.
///
/// "No match" is an expected result, not an error, so the diagnostic
/// travels as a value the caller can log or ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Match,
    NoMatch { reason: String },
}

impl MatchOutcome {
    /// Whether the rule accepted the message.
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match)
    }
}

/// Evaluates rule predicates against inbound messages.
///
/// Checks run in a strict order and short-circuit on the first failure:
/// source type, then sender address, then every message filter pattern.
pub struct RuleMatcher {
    patterns: Arc<PatternCache>,
}

impl RuleMatcher {
    /// Create a matcher backed by the shared pattern cache.
    pub fn new(patterns: Arc<PatternCache>) -> Self {
        Self { patterns }
    }

    /// Match a rule against a message.
    ///
    /// Errors only on unresolvable configuration (an invalid pattern);
    /// every predicate failure is reported as `NoMatch` with a reason.
    pub fn matches(
        &self,
        rule: &Rule,
        message: &InboundMessage,
    ) -> Result<MatchOutcome, PatternError> {
        if let Some(wanted) = nonblank(&rule.source_type) {
            if message.source_type != wanted {
                return Ok(MatchOutcome::NoMatch {
                    reason: format!(
                        "source type mismatch: rule `{}` requires `{}`, message carries `{}`",
                        rule.id, wanted, message.source_type
                    ),
                });
            }
        }

        if let Some(pattern) = nonblank(&rule.source_address_pattern) {
            if message.from.trim().is_empty() {
                return Ok(MatchOutcome::NoMatch {
                    reason: format!(
                        "rule `{}` requires sender address pattern `{}` but the message has a blank sender",
                        rule.id, pattern
                    ),
                });
            }
            let compiled = self.patterns.resolve(pattern)?;
            if !compiled.regex.is_match(&message.from) {
                return Ok(MatchOutcome::NoMatch {
                    reason: format!(
                        "sender `{}` contains no match for address pattern `{}`",
                        message.from, pattern
                    ),
                });
            }
        }

        for pattern in &rule.message_filter_patterns {
            let compiled = self.patterns.resolve(pattern)?;
            if !compiled.regex.is_match(&message.message) {
                return Ok(MatchOutcome::NoMatch {
                    reason: format!(
                        "message body contains no match for filter pattern `{pattern}`"
                    ),
                });
            }
        }

        debug!(rule = %rule.id, from = %message.from, "rule matched message");
        Ok(MatchOutcome::Match)
    }

    /// Run the rule's extraction patterns over the message body and
    /// collect every named group that matched.
    ///
    /// A pattern that finds nothing contributes nothing — rules may carry
    /// extractions for several message shapes at once.
    pub fn extract(
        &self,
        rule: &Rule,
        message: &InboundMessage,
    ) -> Result<ContextMap, PatternError> {
        let mut extracted = ContextMap::new();
        for pattern in &rule.extraction_patterns {
            let compiled = self.patterns.resolve(pattern)?;
            let Some(caps) = compiled.regex.captures(&message.message) else {
                debug!(rule = %rule.id, pattern, "extraction pattern found no match");
                continue;
            };
            for name in &compiled.group_names {
                if let Some(found) = caps.name(name) {
                    extracted.insert(name.clone(), found.as_str().to_string());
                }
            }
        }
        Ok(extracted)
    }
}

fn nonblank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> RuleMatcher {
        RuleMatcher::new(Arc::new(PatternCache::new()))
    }

    fn make_message(from: &str, body: &str) -> InboundMessage {
        InboundMessage::new("mail", from, body)
    }

    #[test]
    fn empty_rule_matches_anything() {
        let rule = Rule::new("r1", "catch-all");
        let outcome = matcher()
            .matches(&rule, &make_message("anyone@x.com", "hi"))
            .unwrap();
        assert!(outcome.is_match());
    }

    #[test]
    fn source_type_checked_before_address_pattern() {
        let mut rule = Rule::new("r1", "mail-only");
        rule.source_type = Some("mail".into());
        // Deliberately invalid pattern: it must never be compiled because
        // the source type check fails first.
        rule.source_address_pattern = Some("(?<broken".into());

        let mut msg = make_message("ops@x.com", "hi");
        msg.source_type = "sms".into();

        let outcome = matcher().matches(&rule, &msg).unwrap();
        match outcome {
            MatchOutcome::NoMatch { reason } => {
                assert!(reason.contains("source type"), "reason was: {reason}");
            }
            MatchOutcome::Match => panic!("expected NoMatch"),
        }
    }

    #[test]
    fn address_pattern_is_a_find_not_a_full_match() {
        let mut rule = Rule::new("r1", "ops");
        rule.source_address_pattern = Some("ops@".into());
        let outcome = matcher()
            .matches(&rule, &make_message("ops@x.com", "hi"))
            .unwrap();
        assert!(outcome.is_match());
    }

    #[test]
    fn blank_sender_fails_address_pattern() {
        let mut rule = Rule::new("r1", "ops");
        rule.source_address_pattern = Some("ops@".into());
        let outcome = matcher().matches(&rule, &make_message("   ", "hi")).unwrap();
        match outcome {
            MatchOutcome::NoMatch { reason } => assert!(reason.contains("blank sender")),
            MatchOutcome::Match => panic!("expected NoMatch"),
        }
    }

    #[test]
    fn every_filter_pattern_must_match() {
        let mut rule = Rule::new("r1", "ticket-opened");
        rule.message_filter_patterns = vec![r"ticket".into(), r"opened".into()];

        let ok = matcher()
            .matches(&rule, &make_message("a@x.com", "ticket #1 opened"))
            .unwrap();
        assert!(ok.is_match());

        let rejected = matcher()
            .matches(&rule, &make_message("a@x.com", "ticket #1 closed"))
            .unwrap();
        match rejected {
            MatchOutcome::NoMatch { reason } => assert!(reason.contains("opened")),
            MatchOutcome::Match => panic!("expected NoMatch"),
        }
    }

    #[test]
    fn blank_predicates_are_ignored() {
        let mut rule = Rule::new("r1", "blankish");
        rule.source_type = Some("  ".into());
        rule.source_address_pattern = Some(String::new());
        let outcome = matcher()
            .matches(&rule, &make_message("a@x.com", "hi"))
            .unwrap();
        assert!(outcome.is_match());
    }

    #[test]
    fn extraction_populates_named_groups() {
        let mut rule = Rule::new("r1", "tickets");
        rule.extraction_patterns = vec![r"ticket #(?<ticketId>\d+) opened by (?<reporter>\w+)".into()];

        let extracted = matcher()
            .extract(&rule, &make_message("ops@x.com", "ticket #4521 opened by alice"))
            .unwrap();
        assert_eq!(extracted.get("ticketId").unwrap(), "4521");
        assert_eq!(extracted.get("reporter").unwrap(), "alice");
    }

    #[test]
    fn non_matching_extraction_contributes_nothing() {
        let mut rule = Rule::new("r1", "tickets");
        rule.extraction_patterns = vec![
            r"ticket #(?<ticketId>\d+)".into(),
            r"order (?<orderId>\d+)".into(),
        ];
        let extracted = matcher()
            .extract(&rule, &make_message("ops@x.com", "ticket #7 opened"))
            .unwrap();
        assert_eq!(extracted.get("ticketId").unwrap(), "7");
        assert!(!extracted.contains_key("orderId"));
    }

    #[test]
    fn invalid_filter_pattern_is_an_error() {
        let mut rule = Rule::new("r1", "broken");
        rule.message_filter_patterns = vec!["(?<oops".into()];
        let err = matcher()
            .matches(&rule, &make_message("a@x.com", "hi"))
            .unwrap_err();
        assert!(matches!(err, PatternError::Invalid { .. }));
    }
}
