//! Shared cache of compiled patterns and their named capture groups.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use tracing::debug;

use crate::error::PatternError;

/// A compiled pattern plus the named groups it can produce.
#[derive(Debug)]
pub struct CompiledPattern {
    /// Compiled regex for matching.
    pub regex: Regex,
    /// Named capture groups declared in the pattern source, in order of
    /// appearance.
    pub group_names: Vec<String>,
}

/// Compile-once, cache-forever pattern store.
///
/// Keyed by the raw pattern string and populated lazily; bounded by the
/// number of distinct configured patterns, so nothing is ever evicted.
/// Group names are recovered by scanning the pattern source itself with a
/// fixed meta-pattern, which avoids carrying separate metadata per pattern.
pub struct PatternCache {
    /// Meta-pattern matching `(?<name>` and `(?P<name>` tokens.
    group_token: Regex,
    entries: RwLock<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            group_token: Regex::new(r"\(\?P?<([A-Za-z][A-Za-z0-9_]*)>").unwrap(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a raw pattern to its compiled form, compiling on first use.
    ///
    /// Concurrent rule evaluations may race to compile the same pattern;
    /// whichever insert lands first wins and every caller gets that entry.
    pub fn resolve(&self, raw: &str) -> Result<Arc<CompiledPattern>, PatternError> {
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(raw)
        {
            return Ok(Arc::clone(hit));
        }

        let regex = Regex::new(raw).map_err(|e| PatternError::Invalid {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;
        let group_names: Vec<String> = self
            .group_token
            .captures_iter(raw)
            .map(|caps| caps[1].to_string())
            .collect();
        debug!(pattern = raw, groups = ?group_names, "compiled pattern");

        let compiled = Arc::new(CompiledPattern { regex, group_names });
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            entries.entry(raw.to_string()).or_insert(compiled),
        ))
    }

    /// Number of distinct patterns compiled so far.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_named_groups_from_source() {
        let cache = PatternCache::new();
        let compiled = cache
            .resolve(r"ticket #(?<ticketId>\d+) opened by (?<reporter>\w+)")
            .unwrap();
        assert_eq!(compiled.group_names, vec!["ticketId", "reporter"]);
    }

    #[test]
    fn accepts_p_spelling() {
        let cache = PatternCache::new();
        let compiled = cache.resolve(r"(?P<code>[A-Z]{3})-\d+").unwrap();
        assert_eq!(compiled.group_names, vec!["code"]);
    }

    #[test]
    fn second_resolve_returns_cached_entry() {
        let cache = PatternCache::new();
        let first = cache.resolve(r"(?<id>\d+)").unwrap();
        let second = cache.resolve(r"(?<id>\d+)").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.group_names, second.group_names);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let cache = PatternCache::new();
        let err = cache.resolve(r"(?<broken").unwrap_err();
        assert!(matches!(err, PatternError::Invalid { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_resolve_converges_on_one_entry() {
        let cache = Arc::new(PatternCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.resolve(r"(?<word>\w+)").unwrap())
            })
            .collect();
        let compiled: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 1);
        for c in &compiled {
            assert_eq!(c.group_names, vec!["word"]);
        }
    }

    #[test]
    fn pattern_without_groups_has_empty_name_set() {
        let cache = PatternCache::new();
        let compiled = cache.resolve(r"urgent|asap").unwrap();
        assert!(compiled.group_names.is_empty());
        assert!(compiled.regex.is_match("this is urgent"));
    }
}
