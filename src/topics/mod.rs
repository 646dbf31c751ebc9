//! Lexical topic extraction and aspect splitting.
//!
//! Both functions are deterministic and side-effect-free: the traversal
//! engine and the automation loop rely on repeatable topic sets for their
//! de-duplication and coverage decisions.

use std::collections::BTreeSet;

/// Fixed topic vocabulary: label plus the keywords that signal it.
const VOCABULARY: &[(&str, &[&str])] = &[
    ("audience", &["audience", "user", "visitor", "customer", "demographic"]),
    ("purpose", &["purpose", "goal", "objective", "mission", "why"]),
    ("features", &["feature", "function", "capability", "support", "tool"]),
    ("content", &["content", "information", "text", "media", "article"]),
    ("style", &["style", "design", "look", "feel", "brand", "theme", "color"]),
    ("navigation", &["navigation", "menu", "link", "page", "flow"]),
    ("payments", &["payment", "price", "pricing", "pay", "checkout", "billing"]),
    ("platform", &["platform", "device", "mobile", "desktop", "web", "app"]),
    ("data", &["data", "storage", "database", "record", "report"]),
    ("security", &["security", "login", "account", "privacy", "permission"]),
    ("performance", &["performance", "speed", "load", "scale", "traffic"]),
    ("integration", &["integration", "api", "third-party", "external", "import"]),
];

/// Maximum number of children a node deserves, however many aspects its
/// answer mentions.
pub const MAX_ASPECTS_PER_NODE: usize = 3;

/// Conjunctions that separate distinct aspects within one clause.
const CONJUNCTIONS: &[&str] = &[" and ", " as well as ", " along with ", " plus ", " but also "];

/// Map a question or answer to its coarse topic labels.
///
/// Lexical keyword matching against the fixed vocabulary; a `BTreeSet` keeps
/// the result ordered so downstream comparisons are repeatable.
pub fn extract_topics(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let mut topics = BTreeSet::new();

    for (label, keywords) in VOCABULARY {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            topics.insert((*label).to_string());
        }
    }

    topics
}

/// Split an answer into clause-level aspects, in mention order.
///
/// Splits on sentence boundaries, then on conjunctions and comma-separated
/// list items. The count of distinct aspects sizes how many follow-up
/// children a node deserves (capped by [`MAX_ASPECTS_PER_NODE`]).
pub fn extract_aspects(answer: &str) -> Vec<String> {
    let mut aspects: Vec<String> = Vec::new();

    for sentence in answer.split(['.', '!', '?', ';']) {
        for clause in split_conjunctions(sentence) {
            for part in clause.split(", ") {
                let trimmed = part
                    .trim()
                    .trim_start_matches("and ")
                    .trim_start_matches("also ")
                    .trim();
                // Single-word fragments ("yes", "no") are not aspects.
                if trimmed.split_whitespace().count() < 2 {
                    continue;
                }
                let normalized = trimmed.to_lowercase();
                if !aspects.iter().any(|a: &String| a.to_lowercase() == normalized) {
                    aspects.push(trimmed.to_string());
                }
            }
        }
    }

    aspects
}

/// How many children a node with this answer deserves.
pub fn desired_child_count(answer: &str) -> usize {
    extract_aspects(answer).len().min(MAX_ASPECTS_PER_NODE)
}

fn split_conjunctions(sentence: &str) -> Vec<&str> {
    let mut parts = vec![sentence];
    for conj in CONJUNCTIONS {
        parts = parts
            .into_iter()
            .flat_map(|p| p.split(conj).collect::<Vec<_>>())
            .collect();
    }
    parts
}
