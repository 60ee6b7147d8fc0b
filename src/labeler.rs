//! Batch label rendering: one PNG per unique CJK character of a text,
//! plus manifest, checksums, HTML index and an optional zip archive.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::Rgba;

use crate::compositor::{self, GlyphRasterizer};
use crate::html;
use crate::manifest::{file_info, LabelEntry, LabelManifest};
use crate::pinyin::{self, PinyinLookup};

pub struct LabelOptions {
    pub out_dir: PathBuf,
    pub hanzi_size: u32,
    pub pinyin_size: u32,
    pub color: Rgba<u8>,
    /// Original color string, recorded in the manifest.
    pub color_spec: String,
    /// Font name or path, recorded in the manifest.
    pub font_label: String,
    pub archive: bool,
    pub html_index: bool,
}

pub struct LabelReport {
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub manifest: LabelManifest,
}

/// Renders labels for every unique CJK character of `text`, in first
/// appearance order. Non-CJK input and characters the lookup does not
/// know are skipped with a log line; a failed save is counted and the
/// batch continues.
pub fn render_labels(
    text: &str,
    rasterizer: &dyn GlyphRasterizer,
    lookup: &dyn PinyinLookup,
    opts: &LabelOptions,
    logs: &mut Vec<String>,
) -> Result<LabelReport> {
    fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("cannot create `{}`", opts.out_dir.display()))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let (mut rendered, mut skipped, mut failed) = (0usize, 0usize, 0usize);

    for ch in text.chars() {
        if !compositor::is_cjk(ch) || !seen.insert(ch) {
            continue;
        }
        let syllable = lookup.lookup(ch);
        if pinyin::is_missing(ch, &syllable) {
            logs.push(format!("skip {ch}: no pinyin entry"));
            skipped += 1;
            continue;
        }
        if !rasterizer.has_glyph(ch) {
            logs.push(format!("FAIL {ch}: font has no glyph"));
            failed += 1;
            continue;
        }

        let surface = compositor::compose(
            rasterizer,
            ch,
            &syllable,
            opts.hanzi_size,
            opts.pinyin_size,
            opts.color,
        );

        let index = format!("{:04}", rendered + failed + 1);
        let path = opts.out_dir.join(format!("{index}_{ch}.png"));
        match surface.save(&path).map_err(anyhow::Error::from).and_then(|_| file_info(&path)) {
            Ok(png) => {
                logs.push(format!("{ch} → {}", path.display()));
                entries.push(LabelEntry {
                    index,
                    hanzi: ch.to_string(),
                    pinyin: syllable,
                    png,
                });
                rendered += 1;
            }
            Err(e) => {
                logs.push(format!("FAIL {ch}: {e}"));
                failed += 1;
            }
        }
    }

    let manifest = LabelManifest::new(
        text,
        &opts.font_label,
        opts.hanzi_size,
        opts.pinyin_size,
        &opts.color_spec,
        entries,
    );
    manifest.write(&opts.out_dir)?;
    logs.push(format!(
        "manifest.json + checksums.txt written ({} entries)",
        manifest.entry_count
    ));

    if opts.html_index {
        html::write_label_index(&manifest, &opts.out_dir)?;
        logs.push("index.html written".to_string());
    }

    if opts.archive {
        let zip_path = opts.out_dir.join("labels.zip");
        write_archive(&manifest, &zip_path)?;
        logs.push(format!("archive written: {}", zip_path.display()));
    }

    Ok(LabelReport {
        rendered,
        skipped,
        failed,
        manifest,
    })
}

/// Packs the rendered PNGs and the manifest into one zip.
fn write_archive(manifest: &LabelManifest, zip_path: &Path) -> Result<()> {
    let file = File::create(zip_path)
        .with_context(|| format!("cannot create `{}`", zip_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for entry in &manifest.entries {
        let path = Path::new(&entry.png.path);
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("bad file name in `{}`", entry.png.path))?;
        zip.start_file(name, options)?;
        zip.write_all(&fs::read(path)?)?;
    }

    zip.start_file("manifest.json", options)?;
    zip.write_all(serde_json::to_string_pretty(manifest)?.as_bytes())?;

    zip.finish()?;
    Ok(())
}

/// Resolves a font argument to an actual file. `auto` walks a ladder:
/// a `fonts/` directory next to the binary's cwd, the HANZI_FONT
/// environment variable, then the platform font directories, preferring
/// files whose name suggests CJK coverage. Returns the path and a note
/// about where it came from.
pub fn resolve_font_path(spec: &str) -> Result<(PathBuf, String)> {
    if spec != "auto" {
        let path = PathBuf::from(spec);
        if path.is_file() {
            return Ok((path, "argument".to_string()));
        }
        return Err(anyhow!("font `{spec}` not found"));
    }

    if let Some(path) = best_font_in_dir(Path::new("fonts")) {
        return Ok((path, "./fonts".to_string()));
    }

    if let Ok(env_path) = std::env::var("HANZI_FONT") {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Ok((path, "HANZI_FONT".to_string()));
        }
    }

    for dir in platform_font_dirs() {
        if let Some(path) = best_font_in_dir(&dir) {
            return Ok((path, dir.display().to_string()));
        }
    }

    Err(anyhow!(
        "no usable font found; pass --font, set HANZI_FONT, or drop a .ttf into ./fonts"
    ))
}

fn platform_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        dirs.push(PathBuf::from(home).join(".fonts"));
    }
    dirs
}

/// Picks a font file from `dir` (recursing one level), preferring names
/// that look like CJK faces.
fn best_font_in_dir(dir: &Path) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    collect_fonts(dir, 2, &mut candidates);
    candidates.sort();
    candidates
        .iter()
        .find(|p| {
            let name = p
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            ["cjk", "han", "hei", "song", "kai", "ming", "noto sans sc", "wqy"]
                .iter()
                .any(|hint| name.contains(hint))
        })
        .cloned()
        .or_else(|| candidates.into_iter().next())
}

fn collect_fonts(dir: &Path, depth: u32, out: &mut Vec<PathBuf>) {
    if depth == 0 {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_fonts(&path, depth - 1, out);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("ttf") | Some("otf") | Some("ttc")
        ) {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::GlyphBitmap;
    use crate::pinyin::Lexicon;

    struct SquareRasterizer;

    impl GlyphRasterizer for SquareRasterizer {
        fn rasterize(&self, _ch: char, px: f32) -> GlyphBitmap {
            let side = (px as u32 / 2).max(1);
            GlyphBitmap {
                width: side,
                height: side,
                coverage: vec![255; (side * side) as usize],
            }
        }
    }

    fn options(dir: &Path) -> LabelOptions {
        LabelOptions {
            out_dir: dir.to_path_buf(),
            hanzi_size: 40,
            pinyin_size: 8,
            color: Rgba([255, 0, 0, 255]),
            color_spec: "#ff0000".to_string(),
            font_label: "stub".to_string(),
            archive: true,
            html_index: true,
        }
    }

    #[test]
    fn batch_renders_unique_cjk_and_skips_the_rest() {
        let dir = std::env::temp_dir().join("poemstudio_labeler_test");
        fs::remove_dir_all(&dir).ok();

        let lex = Lexicon::from_tsv("好\thao3\n雨\tyu3").unwrap();
        let mut logs = Vec::new();
        // 好 twice, 罕 unknown, comma and latin letters never considered.
        let report = render_labels(
            "好雨好罕, ab",
            &SquareRasterizer,
            &lex,
            &options(&dir),
            &mut logs,
        )
        .unwrap();

        assert_eq!(report.rendered, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert!(dir.join("0001_好.png").is_file());
        assert!(dir.join("0002_雨.png").is_file());
        assert!(dir.join("manifest.json").is_file());
        assert!(dir.join("checksums.txt").is_file());
        assert!(dir.join("index.html").is_file());
        assert!(dir.join("labels.zip").is_file());
        assert!(logs.iter().any(|l| l.contains("no pinyin entry")));

        let manifest = LabelManifest::read(&dir).unwrap();
        assert_eq!(manifest.entry_count, 2);
        assert_eq!(manifest.entries[0].pinyin, "hao3");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn explicit_missing_font_is_an_error() {
        assert!(resolve_font_path("/nonexistent/font.ttf").is_err());
    }

    /// Covers everything except 雨, which gets an empty bitmap like a font
    /// with no outline for it.
    struct HoleyRasterizer;

    impl GlyphRasterizer for HoleyRasterizer {
        fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
            if ch == '雨' {
                return GlyphBitmap {
                    width: 0,
                    height: 0,
                    coverage: Vec::new(),
                };
            }
            SquareRasterizer.rasterize(ch, px)
        }
    }

    #[test]
    fn glyphless_character_is_faulted_not_saved_blank() {
        let dir = std::env::temp_dir().join("poemstudio_labeler_noglyph_test");
        fs::remove_dir_all(&dir).ok();

        let lex = Lexicon::from_tsv("好\thao3\n雨\tyu3").unwrap();
        let mut logs = Vec::new();
        let report =
            render_labels("好雨", &HoleyRasterizer, &lex, &options(&dir), &mut logs).unwrap();

        assert_eq!(report.rendered, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed, 1);
        assert!(dir.join("0001_好.png").is_file());
        assert!(!dir.join("0002_雨.png").exists());
        assert_eq!(report.manifest.entry_count, 1);
        assert!(logs.iter().any(|l| l.contains("font has no glyph")));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failed_save_does_not_abort_the_batch() {
        let dir = std::env::temp_dir().join("poemstudio_labeler_badpath_test");
        fs::remove_dir_all(&dir).ok();
        // A directory squatting on the first output path makes that save fail.
        fs::create_dir_all(dir.join("0001_好.png")).unwrap();

        let lex = Lexicon::from_tsv("好\thao3\n雨\tyu3").unwrap();
        let mut logs = Vec::new();
        let report =
            render_labels("好雨", &SquareRasterizer, &lex, &options(&dir), &mut logs).unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.rendered, 1);
        assert!(dir.join("0002_雨.png").is_file());
        assert_eq!(report.manifest.entry_count, 1);
        assert_eq!(report.manifest.entries[0].hanzi, "雨");
        assert!(logs.iter().any(|l| l.contains("FAIL 好")));

        fs::remove_dir_all(&dir).ok();
    }
}
