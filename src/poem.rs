//! Poem document model: lines, the unique characters they contain, and
//! the pinyin/translation data attached to both.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compositor::is_cjk;
use crate::pinyin::{self, PinyinLookup};
use crate::translate::Translator;

/// 春夜喜雨 (Du Fu), the document every fresh editor session starts from.
pub const DEMO_POEM: &str = "好雨知时节，当春乃发生。\n随风潜入夜，润物细无声。\n野径云俱黑，江船火独明。\n晓看红湿处，花重锦官城。";

/// Substituted wherever a lookup or translation comes back empty-handed.
pub const UNKNOWN_MARK: &str = "?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharEntry {
    pub hanzi: char,
    pub pinyin: String,
    pub translations: BTreeMap<String, String>,
}

impl CharEntry {
    fn new(hanzi: char) -> Self {
        Self {
            hanzi,
            pinyin: String::new(),
            translations: BTreeMap::new(),
        }
    }
}

/// Interchange schema. Keys stay camelCase so exports from earlier versions
/// of the editor remain loadable.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemExport {
    pub poem_text: String,
    pub pinyin_data: BTreeMap<String, String>,
    pub translations: BTreeMap<String, BTreeMap<String, String>>,
    pub line_translations: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct PoemDocument {
    pub lines: Vec<String>,
    pub chars: Vec<CharEntry>,
    /// lang → (line text → translation)
    pub line_translations: BTreeMap<String, BTreeMap<String, String>>,
}

impl PoemDocument {
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self {
            lines: text
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            chars: Vec::new(),
            line_translations: BTreeMap::new(),
        };
        doc.reparse_characters();
        doc
    }

    pub fn demo() -> Self {
        Self::from_text(DEMO_POEM)
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Rebuilds the character list from the current lines: unique CJK
    /// characters in first-appearance order. Pinyin and translations
    /// already gathered for surviving characters are kept.
    pub fn reparse_characters(&mut self) {
        let mut kept: BTreeMap<char, CharEntry> =
            self.chars.drain(..).map(|e| (e.hanzi, e)).collect();
        let mut seen = std::collections::HashSet::new();
        for line in &self.lines {
            for ch in line.chars().filter(|c| is_cjk(*c)) {
                if seen.insert(ch) {
                    self.chars
                        .push(kept.remove(&ch).unwrap_or_else(|| CharEntry::new(ch)));
                }
            }
        }
    }

    pub fn entry(&self, ch: char) -> Option<&CharEntry> {
        self.chars.iter().find(|e| e.hanzi == ch)
    }

    pub fn entry_mut(&mut self, ch: char) -> Option<&mut CharEntry> {
        self.chars.iter_mut().find(|e| e.hanzi == ch)
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        self.reparse_characters();
    }

    pub fn add_line(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.lines.push(line.to_string());
            self.reparse_characters();
        }
    }

    /// Fills pinyin for every character from `lookup`. The lookup echoes
    /// unknown characters back; those become [`UNKNOWN_MARK`]. Returns how
    /// many characters resolved.
    pub fn apply_pinyin(&mut self, lookup: &dyn PinyinLookup) -> usize {
        let mut resolved = 0;
        for entry in &mut self.chars {
            let syllable = lookup.lookup(entry.hanzi);
            if pinyin::is_missing(entry.hanzi, &syllable) {
                entry.pinyin = UNKNOWN_MARK.to_string();
            } else {
                entry.pinyin = syllable;
                resolved += 1;
            }
        }
        resolved
    }

    /// Translates every character into `lang`. One failed item never aborts
    /// the rest; failures get [`UNKNOWN_MARK`]. Returns (ok, failed).
    pub fn apply_char_translations(
        &mut self,
        translator: &dyn Translator,
        lang: &str,
    ) -> (usize, usize) {
        let (mut ok, mut failed) = (0, 0);
        for entry in &mut self.chars {
            let word = match translator.translate(&entry.hanzi.to_string(), lang) {
                Ok(word) => {
                    ok += 1;
                    word
                }
                Err(_) => {
                    failed += 1;
                    UNKNOWN_MARK.to_string()
                }
            };
            entry.translations.insert(lang.to_string(), word);
        }
        (ok, failed)
    }

    /// Translates every line into `lang`, same isolation rules as
    /// [`apply_char_translations`].
    pub fn apply_line_translations(
        &mut self,
        translator: &dyn Translator,
        lang: &str,
    ) -> (usize, usize) {
        let (mut ok, mut failed) = (0, 0);
        let map = self.line_translations.entry(lang.to_string()).or_default();
        for line in &self.lines {
            let trans = match translator.translate(line, lang) {
                Ok(trans) => {
                    ok += 1;
                    trans
                }
                Err(_) => {
                    failed += 1;
                    UNKNOWN_MARK.to_string()
                }
            };
            map.insert(line.clone(), trans);
        }
        (ok, failed)
    }

    pub fn to_export(&self) -> PoemExport {
        let mut pinyin_data = BTreeMap::new();
        let mut translations: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for entry in &self.chars {
            if !entry.pinyin.is_empty() {
                pinyin_data.insert(entry.hanzi.to_string(), entry.pinyin.clone());
            }
            for (lang, word) in &entry.translations {
                translations
                    .entry(lang.clone())
                    .or_default()
                    .insert(entry.hanzi.to_string(), word.clone());
            }
        }
        PoemExport {
            poem_text: self.text(),
            pinyin_data,
            translations,
            line_translations: self.line_translations.clone(),
        }
    }

    pub fn from_export(export: PoemExport) -> Self {
        let mut doc = Self::from_text(&export.poem_text);
        for entry in &mut doc.chars {
            let key = entry.hanzi.to_string();
            if let Some(p) = export.pinyin_data.get(&key) {
                entry.pinyin = p.clone();
            }
            for (lang, map) in &export.translations {
                if let Some(word) = map.get(&key) {
                    entry.translations.insert(lang.clone(), word.clone());
                }
            }
        }
        doc.line_translations = export.line_translations;
        doc
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_export()).context("poem serialization failed")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let export: PoemExport = serde_json::from_str(text).context("bad poem JSON")?;
        Ok(Self::from_export(export))
    }
}

/// How to break a flat run of text into poem lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Break after every 、 or ，.
    Comma,
    /// Break after every 。.
    FullStop,
    /// Break after any of ，。；！？.
    Punctuation,
    /// Exact chunks of n characters, punctuation stripped first.
    Fixed(usize),
}

impl SplitStrategy {
    pub fn label(&self) -> String {
        match self {
            Self::Comma => "After commas (，、)".to_string(),
            Self::FullStop => "After full stops (。)".to_string(),
            Self::Punctuation => "After any punctuation (，。；！？)".to_string(),
            Self::Fixed(n) => format!("Fixed width ({n} characters)"),
        }
    }
}

/// Splits `text` into lines per `strategy`. Lines are trimmed and empties
/// dropped, so runs of punctuation never produce blank lines.
pub fn split_lines(text: &str, strategy: SplitStrategy) -> Vec<String> {
    let flat: String = text.split_whitespace().collect();
    match strategy {
        SplitStrategy::Comma => split_after(&flat, &['，', '、']),
        SplitStrategy::FullStop => split_after(&flat, &['。']),
        SplitStrategy::Punctuation => split_after(&flat, &['，', '。', '；', '！', '？']),
        SplitStrategy::Fixed(n) => {
            if n == 0 {
                return Vec::new();
            }
            let chars: Vec<char> = flat
                .chars()
                .filter(|c| !['，', '。', '；', '！', '？', '、'].contains(c))
                .collect();
            chars.chunks(n).map(|c| c.iter().collect()).collect()
        }
    }
}

fn split_after(text: &str, breaks: &[char]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if breaks.contains(&ch) {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinyin::Lexicon;
    use crate::translate::Glossary;

    #[test]
    fn demo_poem_parses_to_four_lines() {
        let doc = PoemDocument::demo();
        assert_eq!(doc.lines.len(), 4);
        assert!(doc.chars.len() >= 35);
        assert_eq!(doc.chars[0].hanzi, '好');
    }

    #[test]
    fn reparse_keeps_existing_data() {
        let mut doc = PoemDocument::from_text("春眠不觉晓");
        if let Some(e) = doc.entry_mut('春') {
            e.pinyin = "chun1".to_string();
        }
        doc.add_line("处处闻啼鸟");
        assert_eq!(doc.entry('春').map(|e| e.pinyin.as_str()), Some("chun1"));
        assert!(doc.entry('鸟').is_some());
    }

    #[test]
    fn reparse_drops_removed_characters() {
        let mut doc = PoemDocument::from_text("春眠\n处处");
        doc.set_lines(vec!["春眠".to_string()]);
        assert!(doc.entry('处').is_none());
        assert!(doc.entry('春').is_some());
    }

    #[test]
    fn non_cjk_never_enters_the_character_list() {
        let doc = PoemDocument::from_text("春 abc，。123");
        assert_eq!(doc.chars.len(), 1);
    }

    #[test]
    fn pinyin_fill_marks_unknowns() {
        let mut doc = PoemDocument::from_text("好罕");
        let lex = Lexicon::from_tsv("好\thao3").unwrap();
        let resolved = doc.apply_pinyin(&lex);
        assert_eq!(resolved, 1);
        assert_eq!(doc.entry('好').unwrap().pinyin, "hao3");
        assert_eq!(doc.entry('罕').unwrap().pinyin, UNKNOWN_MARK);
    }

    #[test]
    fn translation_failures_are_isolated() {
        let mut doc = PoemDocument::from_text("春罕");
        let g = Glossary::from_json_str(r#"{"en": {"春": "spring"}}"#).unwrap();
        let (ok, failed) = doc.apply_char_translations(&g, "en");
        assert_eq!((ok, failed), (1, 1));
        assert_eq!(doc.entry('春').unwrap().translations["en"], "spring");
        assert_eq!(doc.entry('罕').unwrap().translations["en"], UNKNOWN_MARK);
    }

    #[test]
    fn line_translation_failures_substitute_marks() {
        let mut doc = PoemDocument::from_text("春眠不觉晓\n处处闻啼鸟");
        let g = Glossary::from_json_str(r#"{"en": {"春眠不觉晓": "Spring sleep"}}"#).unwrap();
        let (ok, failed) = doc.apply_line_translations(&g, "en");
        assert_eq!((ok, failed), (1, 1));
        assert_eq!(
            doc.line_translations["en"]["处处闻啼鸟"],
            UNKNOWN_MARK
        );
    }

    #[test]
    fn export_round_trips() {
        let mut doc = PoemDocument::demo();
        doc.apply_pinyin(&Lexicon::builtin());
        doc.apply_char_translations(&Glossary::builtin(), "en");
        doc.apply_line_translations(&Glossary::builtin(), "en");
        let json = doc.to_json().unwrap();
        assert!(json.contains("poemText"));
        assert!(json.contains("pinyinData"));
        assert!(json.contains("lineTranslations"));

        let back = PoemDocument::from_json(&json).unwrap();
        assert_eq!(back.lines, doc.lines);
        assert_eq!(back.chars, doc.chars);
        assert_eq!(back.line_translations, doc.line_translations);
    }

    #[test]
    fn comma_split() {
        let lines = split_lines("好雨知时节，当春乃发生。", SplitStrategy::Comma);
        assert_eq!(lines, vec!["好雨知时节，", "当春乃发生。"]);
    }

    #[test]
    fn full_stop_split() {
        let lines = split_lines(
            "好雨知时节，当春乃发生。随风潜入夜，润物细无声。",
            SplitStrategy::FullStop,
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "好雨知时节，当春乃发生。");
    }

    #[test]
    fn punctuation_split() {
        let lines = split_lines("一！二？三；四，五。", SplitStrategy::Punctuation);
        assert_eq!(lines, vec!["一！", "二？", "三；", "四，", "五。"]);
    }

    #[test]
    fn fixed_split_strips_punctuation_and_chunks() {
        let lines = split_lines("好雨知时节，当春乃发生。", SplitStrategy::Fixed(5));
        assert_eq!(lines, vec!["好雨知时节", "当春乃发生"]);
        let uneven = split_lines("好雨知时节", SplitStrategy::Fixed(3));
        assert_eq!(uneven, vec!["好雨知", "时节"]);
        assert!(split_lines("好雨", SplitStrategy::Fixed(0)).is_empty());
    }
}
