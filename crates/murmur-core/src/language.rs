//! Language hints accepted on the request surface.

use std::fmt;
use std::str::FromStr;

use crate::error::ServiceError;

/// Language hint passed through to the recognizer.
///
/// The named variants mirror the request enumeration (`auto, zh, en, ja,
/// ko, yue, ...`); other ISO-ish codes are carried opaquely in `Other` so
/// new model languages need no server change. Values are only ever built
/// through [`FromStr`], the single validation point for the code shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Language {
    /// Let the model detect the language.
    #[default]
    Auto,
    /// Mandarin Chinese.
    Zh,
    /// English.
    En,
    /// Japanese.
    Ja,
    /// Korean.
    Ko,
    /// Cantonese.
    Yue,
    /// Any other language code (lowercase ASCII, 2–8 chars, enforced by
    /// [`FromStr`]).
    Other(String),
}

impl Language {
    /// Code string as sent to the recognizer.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::Zh => "zh",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Yue => "yue",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" | "" => Ok(Self::Auto),
            "zh" => Ok(Self::Zh),
            "en" => Ok(Self::En),
            "ja" => Ok(Self::Ja),
            "ko" => Ok(Self::Ko),
            "yue" => Ok(Self::Yue),
            other => {
                let valid = (2..=8).contains(&other.len())
                    && other.chars().all(|c| c.is_ascii_lowercase());
                if valid {
                    Ok(Self::Other(other.to_owned()))
                } else {
                    Err(ServiceError::InvalidInput(format!(
                        "unknown language code: {other:?}"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_parse() {
        assert_eq!("auto".parse::<Language>().unwrap(), Language::Auto);
        assert_eq!("zh".parse::<Language>().unwrap(), Language::Zh);
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!("yue".parse::<Language>().unwrap(), Language::Yue);
    }

    #[test]
    fn empty_is_auto() {
        assert_eq!("".parse::<Language>().unwrap(), Language::Auto);
    }

    #[test]
    fn unknown_but_plausible_code_is_carried() {
        let lang = "de".parse::<Language>().unwrap();
        assert_eq!(lang, Language::Other("de".into()));
        assert_eq!(lang.code(), "de");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("ZH".parse::<Language>().is_err());
        assert!("x".parse::<Language>().is_err());
        assert!("not a language".parse::<Language>().is_err());
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(Language::Auto.to_string(), "auto");
        assert_eq!(Language::Other("de".into()).to_string(), "de");
    }

    #[test]
    fn default_is_auto() {
        assert_eq!(Language::default(), Language::Auto);
    }
}
