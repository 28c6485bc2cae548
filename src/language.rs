//! Supported output languages
//!
//! Every site record carries one description and one detail slot per
//! [`Language`]. The set is closed: records are always fully populated by
//! iterating [`Language::ALL`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A language the record is translated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Jp,
    De,
    Es,
    Fr,
    Pt,
    Ru,
    Cn,
    Tw,
}

impl Language {
    /// All supported languages in record order
    pub const ALL: [Language; 9] = [
        Language::En,
        Language::Jp,
        Language::De,
        Language::Es,
        Language::Fr,
        Language::Pt,
        Language::Ru,
        Language::Cn,
        Language::Tw,
    ];

    /// Short code used in record field names
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Jp => "jp",
            Language::De => "de",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::Pt => "pt",
            Language::Ru => "ru",
            Language::Cn => "cn",
            Language::Tw => "tw",
        }
    }

    /// Human-readable name substituted into translation prompts
    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Jp => "Japanese",
            Language::De => "German",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::Pt => "Portuguese",
            Language::Ru => "Russian",
            Language::Cn => "Simplified Chinese",
            Language::Tw => "Traditional Chinese",
        }
    }

    /// Whether this is the source language (no translation needed)
    pub fn is_source(self) -> bool {
        self == Language::En
    }

    /// Field name for this language in the given namespace.
    ///
    /// English maps to the bare namespace (`content`, `detail`); every other
    /// language is suffixed (`content_de`, `detail_de`).
    pub fn field_name(self, namespace: &str) -> String {
        if self.is_source() {
            namespace.to_string()
        } else {
            format!("{}_{}", namespace, self.code())
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unsupported language code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language code: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

/// One value per supported language.
///
/// Fixed-shape storage for translation results: there is always exactly one
/// slot per language, so a record can never be missing a language key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerLanguage<T> {
    slots: [T; 9],
}

impl<T> PerLanguage<T> {
    /// Build a table by evaluating `f` for every language
    pub fn from_fn(mut f: impl FnMut(Language) -> T) -> Self {
        Self {
            slots: Language::ALL.map(&mut f),
        }
    }

    pub fn get(&self, lang: Language) -> &T {
        &self.slots[lang.index()]
    }

    pub fn set(&mut self, lang: Language, value: T) {
        self.slots[lang.index()] = value;
    }

    /// Iterate in record order
    pub fn iter(&self) -> impl Iterator<Item = (Language, &T)> {
        Language::ALL.into_iter().zip(self.slots.iter())
    }
}

/// Parse requested language codes, dropping anything unsupported.
///
/// Order is preserved and duplicates are removed.
pub fn parse_requested(codes: &[String]) -> Vec<Language> {
    let mut languages = Vec::new();
    for code in codes {
        match code.parse::<Language>() {
            Ok(lang) if !languages.contains(&lang) => languages.push(lang),
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring requested language: {}", e),
        }
    }
    languages
}
