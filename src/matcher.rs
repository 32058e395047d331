use crate::tokenizer::tokenize_with_min;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tuning constants for fuzzy name matching
///
/// The defaults are the values the portal has always used. They were picked by
/// hand against real roster data, so overriding them changes which historical
/// log rows land on which person.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Tokens shorter than this are ignored
    pub min_token_chars: usize,

    /// Token count (of the longer name) from which the ratio rule applies
    pub long_name_tokens: usize,

    /// Share of the longer name's tokens that must match, strictly exceeded
    pub long_name_ratio: f64,

    /// Shared tokens needed when both names are short
    pub short_name_min_matches: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        MatchThresholds {
            min_token_chars: 2,
            long_name_tokens: 3,
            long_name_ratio: 0.7,
            short_name_min_matches: 2,
        }
    }
}

/// Decides whether two free-text names belong to the same person.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMatcher {
    thresholds: MatchThresholds,
}

impl IdentityMatcher {
    pub fn new(thresholds: MatchThresholds) -> Self {
        IdentityMatcher { thresholds }
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Compare two names
    ///
    /// Rules are applied in order and the first one that decides wins:
    /// 1. trimmed, case-folded equality
    /// 2. either name without usable tokens never matches
    /// 3. every token of the shorter name appears in the longer one
    /// 4. names with many tokens need a high share of shared tokens
    /// 5. short names need at least two shared tokens
    ///
    /// Tokens are compared whole, "kanishk" and "kanishka" share nothing.
    pub fn are_equivalent(&self, name_a: &str, name_b: &str) -> bool {
        let a = name_a.trim().to_lowercase();
        let b = name_b.trim().to_lowercase();

        if a.is_empty() || b.is_empty() {
            return false;
        }

        if a == b {
            return true;
        }

        let tokens_a = tokenize_with_min(&a, self.thresholds.min_token_chars);
        let tokens_b = tokenize_with_min(&b, self.thresholds.min_token_chars);

        if tokens_a.is_empty() || tokens_b.is_empty() {
            return false;
        }

        let set_b: HashSet<&str> = tokens_b.iter().map(String::as_str).collect();
        let match_count = tokens_a
            .iter()
            .filter(|t| set_b.contains(t.as_str()))
            .count();

        let min_len = tokens_a.len().min(tokens_b.len());
        let max_len = tokens_a.len().max(tokens_b.len());

        // shorter name fully contained in the longer one
        if match_count == min_len {
            return true;
        }

        if max_len >= self.thresholds.long_name_tokens {
            return (match_count as f64 / max_len as f64) > self.thresholds.long_name_ratio;
        }

        match_count >= self.thresholds.short_name_min_matches
    }
}

/// Compare two names with the default thresholds
///
/// # Examples
/// ```
/// use tracker::matcher::are_equivalent;
///
/// assert!(are_equivalent("Shivam Kumar", "Shivam Kumar Jha"));
/// assert!(!are_equivalent("Kanishk", "Kanishka"));
/// ```
pub fn are_equivalent(name_a: &str, name_b: &str) -> bool {
    IdentityMatcher::default().are_equivalent(name_a, name_b)
}
