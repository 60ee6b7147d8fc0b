// src/html.rs
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::manifest::LabelManifest;
use crate::poem::PoemDocument;
use crate::translate::LANGUAGES;

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn lang_name(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Standalone poem page: each character carries a hover tooltip with its
/// pinyin and translation, each line is followed by its translations.
pub fn render_poem_page(doc: &PoemDocument, title: &str) -> String {
    let mut html = String::new();

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="zh">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>"#,
    );
    html.push_str(&html_escape(title));
    html.push_str(
        r#"</title>
  <style>
    body {
      margin: 0;
      padding: 32px 16px;
      background: #faf6ef;
      color: #2b2b2b;
      font-family: "Noto Serif CJK SC", "Songti SC", serif;
      display: flex;
      flex-direction: column;
      align-items: center;
    }
    h1 { font-size: 22px; font-weight: normal; letter-spacing: 0.2em; }
    .line { margin: 14px 0 4px 0; font-size: 34px; line-height: 1.6; }
    .hanzi { position: relative; cursor: default; padding: 0 2px; }
    .hanzi:hover { background: #f0e6d2; border-radius: 4px; }
    .hanzi .tip {
      visibility: hidden;
      position: absolute;
      bottom: 115%;
      left: 50%;
      transform: translateX(-50%);
      background: #2b2b2b;
      color: #faf6ef;
      font-size: 13px;
      padding: 6px 10px;
      border-radius: 6px;
      white-space: nowrap;
      z-index: 10;
    }
    .hanzi:hover .tip { visibility: visible; }
    .tip .py { color: #e8b04b; margin-right: 6px; }
    .trans { font-size: 13px; color: #8a8070; margin: 0 0 10px 0; }
    .trans .lang { color: #b2a68f; margin-right: 4px; }
  </style>
</head>
<body>
"#,
    );

    html.push_str("<h1>");
    html.push_str(&html_escape(title));
    html.push_str("</h1>\n");

    for line in &doc.lines {
        html.push_str("<div class=\"line\">");
        for ch in line.chars() {
            match doc.entry(ch) {
                Some(entry) => {
                    html.push_str("<span class=\"hanzi\">");
                    html.push_str(&html_escape(&ch.to_string()));
                    html.push_str("<span class=\"tip\"><span class=\"py\">");
                    html.push_str(&html_escape(&entry.pinyin));
                    html.push_str("</span>");
                    let words: Vec<String> = entry
                        .translations
                        .values()
                        .map(|w| html_escape(w))
                        .collect();
                    html.push_str(&words.join(" / "));
                    html.push_str("</span></span>");
                }
                None => html.push_str(&html_escape(&ch.to_string())),
            }
        }
        html.push_str("</div>\n");

        for (lang, map) in &doc.line_translations {
            if let Some(trans) = map.get(line) {
                html.push_str("<p class=\"trans\"><span class=\"lang\">");
                html.push_str(&html_escape(lang_name(lang)));
                html.push_str(":</span> ");
                html.push_str(&html_escape(trans));
                html.push_str("</p>\n");
            }
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

pub fn write_poem_page(doc: &PoemDocument, title: &str, path: &Path) -> Result<()> {
    fs::write(path, render_poem_page(doc, title))
        .with_context(|| format!("cannot write `{}`", path.display()))
}

/// Gallery index over a rendered label batch.
pub fn render_label_index(manifest: &LabelManifest) -> String {
    let mut html = String::new();

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="zh">
<head>
  <meta charset="UTF-8">
  <title>Labels</title>
  <style>
    body { margin: 0; padding: 24px; background: #1a1a1a; color: #eee; font-family: sans-serif; }
    .meta { color: #999; font-size: 13px; margin-bottom: 16px; }
    .grid { display: flex; flex-wrap: wrap; gap: 12px; }
    .card { background: #fff; border-radius: 8px; padding: 8px; text-align: center; }
    .card img { display: block; }
    .card .cap { color: #444; font-size: 12px; margin-top: 4px; }
  </style>
</head>
<body>
"#,
    );

    html.push_str(&format!(
        "<div class=\"meta\">{} labels · font {} · hanzi {}px · pinyin {}px · {}</div>\n",
        manifest.entry_count,
        html_escape(&manifest.font),
        manifest.hanzi_size,
        manifest.pinyin_size,
        html_escape(&manifest.created_at),
    ));

    html.push_str("<div class=\"grid\">\n");
    for entry in &manifest.entries {
        let file = Path::new(&entry.png.path)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        html.push_str("<div class=\"card\"><img src=\"");
        html.push_str(&html_escape(file));
        html.push_str("\" alt=\"");
        html.push_str(&html_escape(&entry.hanzi));
        html.push_str("\"><div class=\"cap\">");
        html.push_str(&html_escape(&entry.hanzi));
        html.push(' ');
        html.push_str(&html_escape(&entry.pinyin));
        html.push_str("</div></div>\n");
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

pub fn write_label_index(manifest: &LabelManifest, dir: &Path) -> Result<()> {
    let path = dir.join("index.html");
    fs::write(&path, render_label_index(manifest))
        .with_context(|| format!("cannot write `{}`", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{FileInfo, LabelEntry};
    use crate::pinyin::Lexicon;
    use crate::translate::Glossary;

    #[test]
    fn poem_page_carries_tooltips_and_translations() {
        let mut doc = PoemDocument::from_text("好雨知时节，当春乃发生。");
        doc.apply_pinyin(&Lexicon::builtin());
        doc.apply_char_translations(&Glossary::builtin(), "en");
        doc.line_translations
            .entry("en".to_string())
            .or_default()
            .insert("好雨知时节，当春乃发生。".to_string(), "A good rain".to_string());

        let html = render_poem_page(&doc, "春夜喜雨");
        assert!(html.contains("hao3"));
        assert!(html.contains("class=\"tip\""));
        assert!(html.contains("English"));
        assert!(html.contains("A good rain"));
    }

    #[test]
    fn escaping_is_applied() {
        assert_eq!(html_escape("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
        let doc = PoemDocument::from_text("春");
        let html = render_poem_page(&doc, "<script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn label_index_lists_every_entry() {
        let entry = LabelEntry {
            index: "0001".to_string(),
            hanzi: "好".to_string(),
            pinyin: "hao3".to_string(),
            png: FileInfo {
                path: "/tmp/labels/0001_好.png".to_string(),
                size: 17,
                blake3: "deadbeef".to_string(),
            },
        };
        let manifest = LabelManifest::new("好", "f.ttf", 60, 16, "#ff0000", vec![entry]);
        let html = render_label_index(&manifest);
        assert!(html.contains("0001_好.png"));
        assert!(html.contains("hao3"));
        assert!(html.contains("1 labels"));
    }
}
