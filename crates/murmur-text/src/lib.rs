//! # murmur-text
//!
//! Turns raw recognizer output into user-facing text.
//!
//! - [`processor`]: the mode pipeline (`none`, `basic`, `standard`,
//!   `advanced`) with per-step statistics
//! - [`dictionary`]: personal dictionary with longest-spoken-wins matching
//! - [`profiles`]: app-hint → post-process profile mapping
//! - [`punctuation`]: spacing fixes and CJK pause-word assistance
//! - [`enhance`]: the best-effort LLM enhancer capability and providers

#![deny(unsafe_code)]

pub mod dictionary;
pub mod enhance;
pub mod processor;
pub mod profiles;
pub mod punctuation;

pub use dictionary::{DictionaryEntry, PersonalDictionary};
pub use enhance::{Enhancer, EnhancerConfig, EnhancerError};
pub use processor::{PostProcessMode, PostProcessStats, ProcessOutcome, TextProcessor};
pub use profiles::{AppCategory, ProfileSettings};
