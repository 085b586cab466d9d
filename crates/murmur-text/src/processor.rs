//! The mode pipeline that turns raw transcripts into user-facing text.

use std::str::FromStr;
use std::sync::Arc;

use murmur_core::ServiceError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dictionary::PersonalDictionary;
use crate::enhance::Enhancer;
use crate::profiles::ProfileSettings;
use crate::punctuation;

/// Minimum text length (chars) worth sending to the enhancer.
const MIN_ENHANCE_CHARS: usize = 16;

/// Default filler words removed in `standard` mode.
const DEFAULT_FILLERS: &[&str] = &["um", "uh", "er", "ah", "like", "you know", "嗯", "啊", "那个"];

/// Default self-correction cues. The phrase before a cue, back to the
/// previous clause boundary, is dropped in favor of what follows it.
const DEFAULT_CORRECTIONS: &[&str] = &[
    "no wait",
    "actually no",
    "wait actually",
    "sorry i meant",
    "i mean",
    "不对",
];

/// Post-processing mode requested by the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostProcessMode {
    /// Identity.
    None,
    /// Duplicate collapse, whitespace, punctuation spacing.
    Basic,
    /// `basic` + fillers, self-corrections, paragraphs, dictionary.
    #[default]
    Standard,
    /// `standard` + LLM enhancement (best-effort).
    Advanced,
}

impl PostProcessMode {
    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for PostProcessMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "standard" | "" => Ok(Self::Standard),
            "advanced" => Ok(Self::Advanced),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown postprocess_mode: {other:?}"
            ))),
        }
    }
}

/// Counters emitted with every processed transcript.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PostProcessStats {
    /// Filler occurrences removed.
    pub fillers_removed: usize,
    /// Immediate word duplicates collapsed.
    pub duplicates_removed: usize,
    /// Self-correction substitutions applied.
    pub corrections_applied: usize,
    /// Dictionary replacements applied.
    pub dict_replacements: usize,
    /// Sum of the above.
    pub total_changes: usize,
    /// Mode that produced this result.
    pub mode: String,
    /// Whether the enhancer rewrote the text.
    pub ai_enhanced: bool,
    /// Provider tag when `ai_enhanced`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<String>,
}

/// Processed text plus its statistics.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessOutcome {
    /// User-facing text.
    pub text: String,
    /// What changed.
    pub stats: PostProcessStats,
}

/// One processing request.
pub struct ProcessRequest<'a> {
    /// Raw transcript.
    pub text: &'a str,
    /// Requested mode.
    pub mode: PostProcessMode,
    /// Profile switches from the app hint.
    pub profile: ProfileSettings,
    /// Byte offsets into `text` where the pipeline observed silences long
    /// enough to warrant a paragraph break.
    pub paragraph_hints: &'a [usize],
}

impl<'a> ProcessRequest<'a> {
    /// Request with the default profile and no paragraph hints.
    #[must_use]
    pub fn new(text: &'a str, mode: PostProcessMode) -> Self {
        Self {
            text,
            mode,
            profile: ProfileSettings::default(),
            paragraph_hints: &[],
        }
    }
}

struct CorrectionRule {
    regex: Regex,
}

/// Rule-based transcript cleaner.
pub struct TextProcessor {
    filler_regexes: Vec<Regex>,
    fillers: Vec<String>,
    corrections: Vec<CorrectionRule>,
    correction_cues: Vec<String>,
    dictionary: Arc<PersonalDictionary>,
}

impl TextProcessor {
    /// Processor with the default rule sets and the given dictionary.
    #[must_use]
    pub fn new(dictionary: Arc<PersonalDictionary>) -> Self {
        Self::with_rules(
            dictionary,
            DEFAULT_FILLERS.iter().map(|s| (*s).to_owned()).collect(),
            DEFAULT_CORRECTIONS.iter().map(|s| (*s).to_owned()).collect(),
        )
    }

    /// Processor with custom filler and correction sets.
    #[must_use]
    pub fn with_rules(
        dictionary: Arc<PersonalDictionary>,
        mut fillers: Vec<String>,
        correction_cues: Vec<String>,
    ) -> Self {
        // Longest first so phrases win over their component words.
        fillers.sort_by_key(|f| std::cmp::Reverse(f.chars().count()));

        let filler_regexes = fillers
            .iter()
            .filter_map(|filler| {
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(filler)))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();

        let corrections = correction_cues
            .iter()
            .filter_map(|cue| {
                let pattern = format!(
                    r"([^.,!?。！？]*?)\s+{}\s+([^.,!?。！？]*?)([.,!?。！？]|$)",
                    regex::escape(cue)
                );
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|regex| CorrectionRule { regex })
            })
            .collect();

        Self {
            filler_regexes,
            fillers,
            corrections,
            correction_cues,
            dictionary,
        }
    }

    /// Current filler set.
    #[must_use]
    pub fn fillers(&self) -> &[String] {
        &self.fillers
    }

    /// Current correction cues.
    #[must_use]
    pub fn correction_cues(&self) -> &[String] {
        &self.correction_cues
    }

    /// The dictionary this processor applies.
    #[must_use]
    pub fn dictionary(&self) -> &Arc<PersonalDictionary> {
        &self.dictionary
    }

    /// Apply the requested mode.
    #[must_use]
    pub fn process(&self, req: &ProcessRequest<'_>) -> ProcessOutcome {
        let mut stats = PostProcessStats {
            mode: req.mode.as_str().to_owned(),
            ..PostProcessStats::default()
        };

        let text = match req.mode {
            // Byte-for-byte identity.
            PostProcessMode::None => req.text.to_owned(),
            PostProcessMode::Basic => self.run_chunks(req, false, &mut stats),
            PostProcessMode::Standard | PostProcessMode::Advanced => {
                self.run_chunks(req, true, &mut stats)
            }
        };

        stats.total_changes = stats.fillers_removed
            + stats.duplicates_removed
            + stats.corrections_applied
            + stats.dict_replacements;

        ProcessOutcome { text, stats }
    }

    /// Apply the requested mode, then the enhancer for `advanced`.
    ///
    /// Enhancement is best-effort: failures are logged and the rule-based
    /// output is returned unchanged. Texts under 16 chars skip the enhancer.
    pub async fn process_with_enhancer(
        &self,
        req: &ProcessRequest<'_>,
        enhancer: Option<&dyn Enhancer>,
        profile_hint: &str,
    ) -> ProcessOutcome {
        let mut outcome = self.process(req);

        if req.mode != PostProcessMode::Advanced {
            return outcome;
        }
        let Some(enhancer) = enhancer else {
            return outcome;
        };
        if outcome.text.chars().count() < MIN_ENHANCE_CHARS {
            debug!("transcript too short for enhancement, keeping rule-based output");
            return outcome;
        }

        match enhancer.enhance(&outcome.text, profile_hint).await {
            Ok(enhanced) if !enhanced.trim().is_empty() => {
                outcome.text = enhanced;
                outcome.stats.ai_enhanced = true;
                outcome.stats.ai_provider = Some(enhancer.provider().to_owned());
            }
            Ok(_) => {
                warn!(provider = enhancer.provider(), "enhancer returned empty text, ignoring");
            }
            Err(e) => {
                warn!(provider = enhancer.provider(), error = %e, "enhancement failed, returning rule-based output");
            }
        }
        outcome
    }

    /// Split at paragraph hints, clean each chunk, and rejoin.
    ///
    /// Working per chunk keeps hint offsets valid: they index the raw text,
    /// and every length-changing transform happens after the split.
    fn run_chunks(
        &self,
        req: &ProcessRequest<'_>,
        standard: bool,
        stats: &mut PostProcessStats,
    ) -> String {
        let chunks = if standard && req.profile.paragraph_breaks && !req.paragraph_hints.is_empty()
        {
            split_at_hints(req.text, req.paragraph_hints)
        } else {
            vec![req.text.to_owned()]
        };

        let cleaned: Vec<String> = chunks
            .iter()
            .map(|chunk| self.clean_chunk(chunk, req, standard, stats))
            .filter(|c| !c.is_empty())
            .collect();

        cleaned.join("\n\n")
    }

    fn clean_chunk(
        &self,
        chunk: &str,
        req: &ProcessRequest<'_>,
        standard: bool,
        stats: &mut PostProcessStats,
    ) -> String {
        let mut text = chunk.to_owned();

        if standard && req.profile.drop_fillers {
            text = self.remove_fillers(&text, stats);
        }
        if standard {
            text = self.apply_corrections(&text, stats);
        }

        text = collapse_duplicates(&text, stats);

        if req.profile.punctuation {
            text = punctuation::fix_ascii_spacing(&text);
            if standard {
                text = punctuation::cjk_pause_commas(&text);
            }
        }
        if req.profile.casing {
            text = capitalize_sentences(&text);
        }
        if standard {
            let (replaced, n) = self.dictionary.apply(&text);
            stats.dict_replacements += n;
            text = replaced;
        }
        text
    }

    fn remove_fillers(&self, text: &str, stats: &mut PostProcessStats) -> String {
        let mut result = text.to_owned();
        for regex in &self.filler_regexes {
            let count = regex.find_iter(&result).count();
            if count > 0 {
                stats.fillers_removed += count;
                result = regex.replace_all(&result, "").into_owned();
            }
        }
        result
    }

    fn apply_corrections(&self, text: &str, stats: &mut PostProcessStats) -> String {
        let mut result = text.to_owned();
        for rule in &self.corrections {
            let mut applied = 0usize;
            let replaced = rule
                .regex
                .replace_all(&result, |caps: &regex::Captures<'_>| {
                    applied += 1;
                    // Keep a separator when the dropped phrase was mid-text.
                    let lead = if caps.get(0).is_some_and(|m| m.start() > 0) {
                        " "
                    } else {
                        ""
                    };
                    format!("{lead}{}{}", &caps[2], &caps[3])
                })
                .into_owned();
            if applied > 0 {
                stats.corrections_applied += applied;
                result = replaced;
            }
        }
        result
    }
}

/// Collapse immediate word-level duplicates and normalize whitespace.
fn collapse_duplicates(text: &str, stats: &mut PostProcessStats) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev_lower = String::new();
    for word in text.split_whitespace() {
        let lower = word.to_lowercase();
        if !out.is_empty() && lower == prev_lower {
            stats.duplicates_removed += 1;
            continue;
        }
        out.push(word);
        prev_lower = lower;
    }
    out.join(" ")
}

/// Capitalize the first letter of the text and of each sentence.
fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_sentence_start = true;
    for c in text.chars() {
        if at_sentence_start && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
            at_sentence_start = false;
        } else {
            if ".!?".contains(c) {
                at_sentence_start = true;
            } else if !c.is_whitespace() {
                at_sentence_start = false;
            }
            out.push(c);
        }
    }
    out
}

/// Split text at the whitespace nearest after each hint offset.
fn split_at_hints(text: &str, hints: &[usize]) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut cuts = Vec::new();
    for &hint in hints {
        let mut i = hint.min(bytes.len());
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i > 0 && i < bytes.len() && cuts.last().is_none_or(|&c| c < i) {
            cuts.push(i);
        }
    }

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        chunks.push(text[start..cut].trim().to_owned());
        start = cut + 1;
    }
    chunks.push(text[start.min(text.len())..].trim().to_owned());
    chunks
}
