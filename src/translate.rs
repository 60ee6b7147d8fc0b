//! Offline glossary translation.
//!
//! Translations come from a bundled JSON glossary rather than a network
//! service. The [`Translator`] trait is the seam a remote backend would
//! plug into; the poem layer already treats every call as fallible and
//! substitutes `?` on failure, so swapping backends changes nothing above.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Target languages offered in the editor, code and native name.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("de", "Deutsch"),
    ("fr", "Français"),
    ("es", "Español"),
    ("it", "Italiano"),
];

pub trait Translator {
    fn translate(&self, text: &str, lang: &str) -> Result<String>;
}

/// Per-language word maps backed by a JSON file of shape
/// `{"en": {"春": "spring", ...}, "de": {...}}`.
pub struct Glossary {
    languages: BTreeMap<String, BTreeMap<String, String>>,
}

impl Glossary {
    pub fn builtin() -> Self {
        match Self::from_json_str(include_str!("../data/glossary.json")) {
            Ok(g) => g,
            Err(_) => Self { languages: BTreeMap::new() },
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let languages = serde_json::from_str(text).context("bad glossary JSON")?;
        Ok(Self { languages })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read glossary `{}`", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("bad glossary `{}`", path.display()))
    }
}

impl Translator for Glossary {
    fn translate(&self, text: &str, lang: &str) -> Result<String> {
        self.languages
            .get(lang)
            .ok_or_else(|| anyhow!("no glossary for language `{lang}`"))?
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("no {lang} entry for `{text}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_english() {
        let g = Glossary::builtin();
        assert_eq!(g.translate("春", "en").unwrap(), "spring");
        assert_eq!(g.translate("雨", "en").unwrap(), "rain");
    }

    #[test]
    fn misses_are_errors_not_panics() {
        let g = Glossary::from_json_str(r#"{"en": {"春": "spring"}}"#).unwrap();
        assert!(g.translate("罕", "en").is_err());
        assert!(g.translate("春", "xx").is_err());
    }

    #[test]
    fn known_language_codes_have_builtin_maps() {
        let g = Glossary::builtin();
        for (code, _) in LANGUAGES {
            assert!(g.languages.contains_key(*code), "missing {code}");
        }
    }
}
