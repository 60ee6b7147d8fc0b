//! Hanzi to pinyin lookup.
//!
//! The lookup contract follows a quirk worth knowing: an unknown character
//! is answered with the character itself, not an error. Callers that care
//! check with [`is_missing`] and skip or substitute.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Tone-numeral syllables for the characters the bundled demo poem uses,
/// plus common everyday hanzi.
const DEFAULT_TABLE: &str = include_str!("../data/pinyin.tsv");

pub trait PinyinLookup {
    /// Returns the tone-numeral syllable for `ch`, or `ch` itself as a
    /// string when the character is unknown.
    fn lookup(&self, ch: char) -> String;
}

/// True when `pinyin` is the echo-back sentinel for `ch`.
pub fn is_missing(ch: char, pinyin: &str) -> bool {
    let mut chars = pinyin.chars();
    chars.next() == Some(ch) && chars.next().is_none()
}

/// In-memory hanzi → syllable table loaded from tab-separated text.
pub struct Lexicon {
    entries: HashMap<char, String>,
}

impl Lexicon {
    /// The compiled-in table.
    pub fn builtin() -> Self {
        // The bundled table is checked at compile time via include_str!,
        // a parse failure here is a packaging bug.
        match Self::from_tsv(DEFAULT_TABLE) {
            Ok(lex) => lex,
            Err(_) => Self { entries: HashMap::new() },
        }
    }

    /// Parses `hanzi<TAB>syllable` lines. Blank lines and `#` comments are
    /// skipped; anything else malformed is an error.
    pub fn from_tsv(text: &str) -> Result<Self> {
        let mut entries = HashMap::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (hanzi, syllable) = line
                .split_once('\t')
                .ok_or_else(|| anyhow!("line {}: missing tab separator", n + 1))?;
            let mut chars = hanzi.chars();
            let ch = match (chars.next(), chars.next()) {
                (Some(ch), None) => ch,
                _ => return Err(anyhow!("line {}: key must be a single character", n + 1)),
            };
            entries.insert(ch, syllable.trim().to_string());
        }
        Ok(Self { entries })
    }

    /// Builtin table with overrides layered from a user file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read lexicon `{}`", path.display()))?;
        let overrides = Self::from_tsv(&text)
            .with_context(|| format!("bad lexicon `{}`", path.display()))?;
        let mut base = Self::builtin();
        base.entries.extend(overrides.entries);
        Ok(base)
    }

    pub fn insert(&mut self, ch: char, syllable: String) {
        self.entries.insert(ch, syllable);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PinyinLookup for Lexicon {
    fn lookup(&self, ch: char) -> String {
        match self.entries.get(&ch) {
            Some(syllable) => syllable.clone(),
            None => ch.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_knows_the_demo_poem() {
        let lex = Lexicon::builtin();
        assert_eq!(lex.lookup('好'), "hao3");
        assert_eq!(lex.lookup('雨'), "yu3");
        assert!(lex.len() > 50);
    }

    #[test]
    fn unknown_character_echoes_back() {
        let lex = Lexicon::from_tsv("").unwrap();
        assert_eq!(lex.lookup('罕'), "罕");
        assert!(is_missing('罕', &lex.lookup('罕')));
        assert!(!is_missing('好', "hao3"));
    }

    #[test]
    fn tsv_parsing_skips_comments_and_blanks() {
        let lex = Lexicon::from_tsv("# comment\n\n春\tchun1\n夜\tye4\n").unwrap();
        assert_eq!(lex.len(), 2);
        assert_eq!(lex.lookup('春'), "chun1");
    }

    #[test]
    fn insert_overrides_the_table() {
        let mut lex = Lexicon::from_tsv("好\thao3").unwrap();
        lex.insert('好', "hao4".to_string());
        lex.insert('罕', "han3".to_string());
        assert_eq!(lex.lookup('好'), "hao4");
        assert_eq!(lex.lookup('罕'), "han3");
    }

    #[test]
    fn tsv_rejects_multi_char_keys() {
        assert!(Lexicon::from_tsv("春夜\tchun1").is_err());
        assert!(Lexicon::from_tsv("春 chun1").is_err());
    }
}
