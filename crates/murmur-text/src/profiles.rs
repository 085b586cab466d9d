//! App-hint → post-process profile mapping.
//!
//! The desktop client sends `app_hint` as `"AppName|bundle.id"`. A fixed
//! substring table on the bundle id picks the category; the category picks
//! which cleanup switches apply.

use serde::{Deserialize, Serialize};

/// Category of the frontmost application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppCategory {
    /// IDEs and editors.
    Coding,
    /// Long-form writing apps.
    Writing,
    /// Messengers.
    Chat,
    /// Web browsers.
    Browser,
    /// Terminal emulators.
    Terminal,
    /// Everything else.
    #[default]
    General,
}

/// Bundle-id substring table. First match wins.
const CATEGORY_TABLE: &[(&str, AppCategory)] = &[
    ("xcode", AppCategory::Coding),
    ("vscode", AppCategory::Coding),
    ("jetbrains", AppCategory::Coding),
    ("sublime", AppCategory::Coding),
    ("notion", AppCategory::Writing),
    ("word", AppCategory::Writing),
    ("pages", AppCategory::Writing),
    ("wechat", AppCategory::Chat),
    ("discord", AppCategory::Chat),
    ("slack", AppCategory::Chat),
    ("chrome", AppCategory::Browser),
    ("safari", AppCategory::Browser),
    ("firefox", AppCategory::Browser),
    ("terminal", AppCategory::Terminal),
    ("iterm", AppCategory::Terminal),
];

impl AppCategory {
    /// Resolve a category from an `"AppName|bundle.id"` hint.
    #[must_use]
    pub fn from_app_hint(hint: &str) -> Self {
        let bundle_id = hint.rsplit('|').next().unwrap_or(hint).to_ascii_lowercase();
        CATEGORY_TABLE
            .iter()
            .find(|(needle, _)| bundle_id.contains(needle))
            .map_or(Self::General, |(_, category)| *category)
    }

    /// The cleanup switches for this category.
    ///
    /// `coding` and `terminal` preserve punctuation and casing verbatim and
    /// keep filler words; dictated identifiers must survive untouched.
    #[must_use]
    pub fn profile(self) -> ProfileSettings {
        match self {
            Self::Coding | Self::Terminal => ProfileSettings {
                punctuation: false,
                casing: false,
                drop_fillers: false,
                paragraph_breaks: false,
            },
            Self::Writing => ProfileSettings {
                punctuation: true,
                casing: true,
                drop_fillers: true,
                paragraph_breaks: true,
            },
            Self::Chat | Self::Browser => ProfileSettings {
                punctuation: true,
                casing: false,
                drop_fillers: true,
                paragraph_breaks: false,
            },
            Self::General => ProfileSettings {
                punctuation: true,
                casing: false,
                drop_fillers: true,
                paragraph_breaks: true,
            },
        }
    }

    /// Wire name of the category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Writing => "writing",
            Self::Chat => "chat",
            Self::Browser => "browser",
            Self::Terminal => "terminal",
            Self::General => "general",
        }
    }
}

/// Cleanup switches applied on top of the selected mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// Apply punctuation assistance (spacing fixes, CJK pause commas).
    pub punctuation: bool,
    /// Capitalize sentence starts.
    pub casing: bool,
    /// Remove filler words in `standard`/`advanced` modes.
    pub drop_fillers: bool,
    /// Insert paragraph breaks at silence hints.
    pub paragraph_breaks: bool,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        AppCategory::General.profile()
    }
}
