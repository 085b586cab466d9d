//! Punctuation assistance: ASCII spacing fixes and rule-based help for
//! unpunctuated CJK transcripts.

use std::sync::OnceLock;

use regex::Regex;

/// Pause words that usually open a new clause in Mandarin speech. A comma
/// lands after each when the transcript carries no punctuation of its own.
const CJK_PAUSE_WORDS: &[&str] = &[
    "然后", "接着", "之后", "所以", "但是", "不过", "而且", "另外", "还有", "最后", "首先",
    "其次", "总之", "因此",
];

fn space_before_punct() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([,.!?;:])").expect("static regex"))
}

fn missing_space_after_punct() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Letters only: "3.5" and "v1.2" must survive.
    RE.get_or_init(|| Regex::new(r"([,!?;:])([A-Za-z])").expect("static regex"))
}

/// Remove space before ASCII punctuation and ensure one after it.
#[must_use]
pub fn fix_ascii_spacing(text: &str) -> String {
    let out = space_before_punct().replace_all(text, "$1");
    missing_space_after_punct()
        .replace_all(&out, "$1 $2")
        .into_owned()
}

/// Whether the text contains CJK ideographs.
#[must_use]
pub fn has_cjk(text: &str) -> bool {
    text.chars()
        .any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c))
}

/// Whether the text already carries CJK punctuation.
#[must_use]
pub fn has_cjk_punct(text: &str) -> bool {
    text.chars().any(|c| "，。！？、；：".contains(c))
}

/// Insert commas after pause words and a sentence-final 。 into an
/// unpunctuated CJK transcript. Text that already has CJK punctuation is
/// returned untouched.
#[must_use]
pub fn cjk_pause_commas(text: &str) -> String {
    if !has_cjk(text) || has_cjk_punct(text) || text.trim().is_empty() {
        return text.to_owned();
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len() + 8);
    for (i, token) in tokens.iter().enumerate() {
        out.push_str(token);
        let last = i == tokens.len() - 1;
        if CJK_PAUSE_WORDS.contains(token) && !last {
            out.push('，');
        } else if !last {
            out.push(' ');
        }
    }
    out.push('。');
    out
}

/// Close a sentence: append `.` (or `。` for CJK text) when the text ends
/// without terminal punctuation. Used at paragraph boundaries.
#[must_use]
pub fn terminate_sentence(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return text.to_owned();
    }
    let last = trimmed.chars().last().unwrap_or(' ');
    if ".!?。！？…".contains(last) {
        return trimmed.to_owned();
    }
    if has_cjk(trimmed) {
        format!("{trimmed}。")
    } else {
        format!("{trimmed}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_space_before_punctuation() {
        assert_eq!(fix_ascii_spacing("hello , world ."), "hello, world.");
    }

    #[test]
    fn adds_space_after_comma() {
        assert_eq!(fix_ascii_spacing("hello,world"), "hello, world");
    }

    #[test]
    fn decimals_survive() {
        assert_eq!(fix_ascii_spacing("pi is 3.14, roughly"), "pi is 3.14, roughly");
        assert_eq!(fix_ascii_spacing("version 1.2.3 shipped"), "version 1.2.3 shipped");
    }

    #[test]
    fn cjk_detection() {
        assert!(has_cjk("你好 world"));
        assert!(!has_cjk("hello world"));
    }

    #[test]
    fn pause_words_get_commas() {
        let out = cjk_pause_commas("我们先开会 然后 吃饭");
        assert_eq!(out, "我们先开会 然后，吃饭。");
    }

    #[test]
    fn already_punctuated_cjk_untouched() {
        let text = "我们先开会，然后吃饭。";
        assert_eq!(cjk_pause_commas(text), text);
    }

    #[test]
    fn ascii_text_untouched_by_cjk_rule() {
        let text = "hello then lunch";
        assert_eq!(cjk_pause_commas(text), text);
    }

    #[test]
    fn terminate_ascii_sentence() {
        assert_eq!(terminate_sentence("see you tomorrow"), "see you tomorrow.");
        assert_eq!(terminate_sentence("done already."), "done already.");
        assert_eq!(terminate_sentence("really?"), "really?");
    }

    #[test]
    fn terminate_cjk_sentence() {
        assert_eq!(terminate_sentence("明天见"), "明天见。");
        assert_eq!(terminate_sentence("明天见。"), "明天见。");
    }

    #[test]
    fn terminate_empty_is_identity() {
        assert_eq!(terminate_sentence(""), "");
        assert_eq!(terminate_sentence("   "), "   ");
    }
}
