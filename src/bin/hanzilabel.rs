use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use poemstudio::compositor::{self, FontdueRasterizer};
use poemstudio::labeler::{self, LabelOptions};
use poemstudio::pinyin::Lexicon;

/// Batch renderer for pinyin-labeled character images.
///
/// Takes Chinese text, keeps each unique CJK character in order of first
/// appearance and renders one square PNG per character with its pinyin
/// syllable scattered over the background pixels around the glyph.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text to render labels for (alternative to --input)
    text: Option<String>,

    /// Read the text from a file instead
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for PNGs, manifest and index
    #[arg(short, long, default_value = "labels")]
    output: PathBuf,

    /// Font file. "auto" = ./fonts, then HANZI_FONT, then the platform
    /// font directories.
    #[arg(long, default_value = "auto")]
    font: String,

    /// Hanzi size in pixels
    #[arg(long, default_value_t = 60)]
    hanzi_size: u32,

    /// Pinyin letter size in pixels
    #[arg(long, default_value_t = 16)]
    pinyin_size: u32,

    /// Pinyin letter color (#rrggbb)
    #[arg(long, default_value = "#ff0000")]
    color: String,

    /// Extra pinyin lexicon (TSV, layered over the builtin table)
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Also pack the PNGs and manifest into labels.zip
    #[arg(long)]
    zip: bool,

    /// Skip the HTML gallery index
    #[arg(long)]
    no_index: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let text = match (&args.text, &args.input) {
        (Some(t), None) => t.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("cannot read `{}`", path.display()))?,
        (Some(_), Some(_)) => anyhow::bail!("give either TEXT or --input, not both"),
        (None, None) => anyhow::bail!("no text given; pass TEXT or --input <file>"),
    };

    let color = compositor::parse_color(&args.color)?;

    let (font_path, font_source) = labeler::resolve_font_path(&args.font)?;
    println!("Font: {} ({font_source})", font_path.display());

    let rasterizer = FontdueRasterizer::from_file(&font_path)?;

    let lexicon = match &args.lexicon {
        Some(path) => Lexicon::from_file(path)?,
        None => Lexicon::builtin(),
    };
    println!("Lexicon: {} entries", lexicon.len());

    let opts = LabelOptions {
        out_dir: args.output.clone(),
        hanzi_size: args.hanzi_size,
        pinyin_size: args.pinyin_size,
        color,
        color_spec: args.color.clone(),
        font_label: font_path.display().to_string(),
        archive: args.zip,
        html_index: !args.no_index,
    };

    let mut logs = Vec::new();
    let report = labeler::render_labels(&text, &rasterizer, &lexicon, &opts, &mut logs);

    for line in &logs {
        println!("{line}");
    }

    let report = report?;
    println!(
        "Done: {} rendered, {} skipped, {} failed → {}",
        report.rendered,
        report.skipped,
        report.failed,
        args.output.display()
    );
    if report.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
