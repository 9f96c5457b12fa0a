//! Context budget manager (§4.6): priority-ordered context assembly under a
//! token cap, with a stable-prefix fingerprint for upstream prompt caching.
//!
//! Grounded on two teacher files: `memory::working`'s `chars/4`
//! token-estimation heuristic (reused verbatim as the estimator) and
//! sliding-window eviction-with-preservation idiom (generalized from
//! "preserve the system message" to "always include required sources"), and
//! `agent::context_manager`'s `CHARS_PER_TOKEN` constant and prune/compact
//! design. The stable-prefix hash is a non-cryptographic FNV-1a over UTF-8
//! bytes (`std::hash::Hasher`-based), avoiding a new crypto dependency for a
//! cache-keying fingerprint that has no security requirement.

use serde::{Deserialize, Serialize};

const CHARS_PER_TOKEN: usize = 4;

/// A single content source competing for a place in the assembled context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSource {
    pub id: String,
    pub source_type: String,
    pub content: String,
    pub priority: i32,
    pub required: bool,
}

impl ContentSource {
    pub fn new(id: impl Into<String>, source_type: impl Into<String>, content: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            source_type: source_type.into(),
            content: content.into(),
            priority,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// `chars/4`, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// The result of an `optimize()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedContext {
    pub included_ids: Vec<String>,
    pub content: String,
    pub total_tokens: usize,
    pub stable_prefix_len: usize,
    pub stable_prefix_hash: u64,
}

/// Priority-ordered, token-capped context assembler.
#[derive(Debug, Default)]
pub struct ContextBudgetManager {
    sources: Vec<ContentSource>,
}

impl ContextBudgetManager {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn add(&mut self, source: ContentSource) {
        self.sources.push(source);
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    /// Sort by priority descending, always include required sources,
    /// greedily append lower-priority sources while they fit under
    /// `token_cap`.
    pub fn optimize(&self, token_cap: usize) -> OptimizedContext {
        let mut ordered: Vec<&ContentSource> = self.sources.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut included: Vec<&ContentSource> = Vec::new();
        let mut used_tokens = 0usize;

        for source in &ordered {
            let tokens = estimate_tokens(&source.content);
            if source.required {
                included.push(source);
                used_tokens += tokens;
                continue;
            }
            if used_tokens + tokens <= token_cap {
                included.push(source);
                used_tokens += tokens;
            }
        }

        // Required sources may push usage over the cap; that's intentional
        // (required always wins), but we re-sort the final included set by
        // priority so concatenation order matches intent regardless of the
        // two passes above.
        included.sort_by(|a, b| b.priority.cmp(&a.priority));

        let content = included
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let (stable_prefix_len, stable_prefix_hash) = self.stable_prefix(&included);

        OptimizedContext {
            included_ids: included.iter().map(|s| s.id.clone()).collect(),
            total_tokens: used_tokens,
            content,
            stable_prefix_len,
            stable_prefix_hash,
        }
    }

    /// The longest leading subsequence of `included` (by priority order)
    /// consisting only of `required` or otherwise invariant high-priority
    /// sources, i.e. the prefix whose concatenation is byte-identical across
    /// invocations given the same required+high-priority sources. We treat
    /// every required source, plus any source whose priority is >= 90 (the
    /// system-prompt/goal band per the runner's default priorities), as
    /// part of the stable candidate set; the prefix stops at the first
    /// source outside that set.
    fn stable_prefix(&self, included: &[&ContentSource]) -> (usize, u64) {
        const STABLE_PRIORITY_FLOOR: i32 = 90;
        let mut prefix = String::new();
        let mut len = 0usize;
        for source in included {
            if source.required || source.priority >= STABLE_PRIORITY_FLOOR {
                if !prefix.is_empty() {
                    prefix.push_str("\n\n");
                }
                prefix.push_str(&source.content);
                len += 1;
            } else {
                break;
            }
        }
        (len, fnv1a(prefix.as_bytes()))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_sources_are_always_included() {
        let mut mgr = ContextBudgetManager::new();
        mgr.add(ContentSource::new("system", "system", "x".repeat(1000), 100).required());
        mgr.add(ContentSource::new("low", "history", "y".repeat(40), 10));
        let optimized = mgr.optimize(10);
        assert!(optimized.included_ids.contains(&"system".to_string()));
    }

    #[test]
    fn greedy_append_stops_at_cap() {
        let mut mgr = ContextBudgetManager::new();
        mgr.add(ContentSource::new("a", "t", "a".repeat(40), 90)); // 10 tokens
        mgr.add(ContentSource::new("b", "t", "b".repeat(40), 50)); // 10 tokens
        mgr.add(ContentSource::new("c", "t", "c".repeat(40), 10)); // 10 tokens
        let optimized = mgr.optimize(20);
        assert_eq!(optimized.included_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn stable_prefix_is_byte_identical_across_invocations() {
        let mut mgr = ContextBudgetManager::new();
        mgr.add(ContentSource::new("system", "system", "SYSTEM PROMPT", 100).required());
        mgr.add(ContentSource::new("goal", "goal", "GOAL TEXT", 90));
        mgr.add(ContentSource::new("history", "history", "recent chat...", 50));

        let first = mgr.optimize(1000);
        let second = mgr.optimize(1000);
        assert_eq!(first.stable_prefix_hash, second.stable_prefix_hash);
        assert_eq!(first.stable_prefix_len, 2);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abcde"), 2); // 5 chars / 4 = 1.25 -> 2
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(""), 0);
    }
}
