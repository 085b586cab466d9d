//! Personal dictionary for custom terminology.
//!
//! Entries map a spoken form to a written form (`"api" → "API"`). Matching
//! is longest-spoken-wins: when several entries could match at one position
//! the longest `spoken` applies, with insertion order breaking ties.
//! Membership is unique by case-insensitive `spoken`. The dictionary is
//! process-local and mutated through the admin endpoints.

use parking_lot::RwLock;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One replacement rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// What the user says.
    pub spoken: String,
    /// What should be written.
    pub written: String,
    /// Grouping label for the admin surface.
    #[serde(default = "default_category")]
    pub category: String,
    /// Match case exactly.
    #[serde(default)]
    pub case_sensitive: bool,
    /// Match on Unicode word boundaries only.
    #[serde(default)]
    pub whole_word: bool,
}

fn default_category() -> String {
    "general".to_owned()
}

/// Built-in entries every process starts with. The admin endpoints extend
/// or override them; overrides win by spoken-form uniqueness.
fn default_entries() -> Vec<DictionaryEntry> {
    let tech = |spoken: &str, written: &str| DictionaryEntry {
        spoken: spoken.to_owned(),
        written: written.to_owned(),
        category: "tech".to_owned(),
        case_sensitive: false,
        whole_word: true,
    };
    vec![
        tech("api", "API"),
        tech("json", "JSON"),
        tech("github", "GitHub"),
        tech("docker", "Docker"),
        tech("kubernetes", "Kubernetes"),
        tech("javascript", "JavaScript"),
        tech("typescript", "TypeScript"),
        tech("python", "Python"),
        tech("rust", "Rust"),
        tech("ai", "AI"),
        tech("ml", "ML"),
        tech("llm", "LLM"),
        tech("gpt", "GPT"),
    ]
}

/// The process-wide dictionary. Reads dominate; writes only come from the
/// admin endpoints.
pub struct PersonalDictionary {
    entries: RwLock<Vec<DictionaryEntry>>,
}

impl Default for PersonalDictionary {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PersonalDictionary {
    /// Dictionary preloaded with the built-in entries.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            entries: RwLock::new(default_entries()),
        }
    }

    /// Empty dictionary.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace an entry. Membership is unique by case-insensitive
    /// spoken form; a replaced entry keeps the new insertion position.
    pub fn upsert(&self, entry: DictionaryEntry) {
        let mut entries = self.entries.write();
        entries.retain(|e| !e.spoken.eq_ignore_ascii_case(&entry.spoken));
        entries.push(entry);
    }

    /// Remove an entry by spoken form. Returns whether anything was removed.
    pub fn remove(&self, spoken: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !e.spoken.eq_ignore_ascii_case(spoken));
        entries.len() != before
    }

    /// Snapshot of all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<DictionaryEntry> {
        self.entries.read().clone()
    }

    /// Look up one entry by spoken form.
    #[must_use]
    pub fn get(&self, spoken: &str) -> Option<DictionaryEntry> {
        self.entries
            .read()
            .iter()
            .find(|e| e.spoken.eq_ignore_ascii_case(spoken))
            .cloned()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Apply all entries to `text`, returning the rewritten text and the
    /// number of replacements.
    ///
    /// Longest spoken form wins at each position; earlier insertion wins
    /// ties. A position claimed by one entry is invisible to shorter ones,
    /// so `"api key" → "API Key"` suppresses `"api" → "API"` inside it.
    #[must_use]
    pub fn apply(&self, text: &str) -> (String, usize) {
        let entries = self.entries.read();
        if entries.is_empty() || text.is_empty() {
            return (text.to_owned(), 0);
        }

        // Longest spoken first; insertion order breaks ties (sort is stable).
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| {
            entries[b]
                .spoken
                .chars()
                .count()
                .cmp(&entries[a].spoken.chars().count())
        });

        // Claim non-overlapping match ranges against the original text.
        let mut claims: Vec<(usize, usize, &str)> = Vec::new();
        for idx in order {
            let entry = &entries[idx];
            let pattern = if entry.whole_word {
                format!(r"\b{}\b", regex::escape(&entry.spoken))
            } else {
                regex::escape(&entry.spoken)
            };
            let regex = match RegexBuilder::new(&pattern)
                .case_insensitive(!entry.case_sensitive)
                .build()
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(spoken = %entry.spoken, error = %e, "skipping unbuildable dictionary pattern");
                    continue;
                }
            };
            for m in regex.find_iter(text) {
                let overlaps = claims
                    .iter()
                    .any(|&(start, end, _)| m.start() < end && start < m.end());
                if !overlaps {
                    claims.push((m.start(), m.end(), entry.written.as_str()));
                }
            }
        }

        if claims.is_empty() {
            return (text.to_owned(), 0);
        }

        claims.sort_by_key(|&(start, _, _)| start);
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for &(start, end, written) in &claims {
            out.push_str(&text[cursor..start]);
            out.push_str(written);
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        (out, claims.len())
    }
}
