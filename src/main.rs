use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use poemstudio::compositor::{self, FontdueRasterizer};
use poemstudio::html::write_poem_page;
use poemstudio::labeler::{self, LabelOptions};
use poemstudio::pinyin::Lexicon;
use poemstudio::poem::{split_lines, PoemDocument, SplitStrategy};
use poemstudio::translate::{Glossary, LANGUAGES};

/// PoemStudio
/// Interactive editor for annotated Chinese poems: pinyin, word and line
/// translations, JSON/HTML export and pinyin-labeled character images.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Poem JSON file to load (a previous export). Starts with a demo poem
    /// when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output root directory for exports and rendered labels
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Font file for label rendering. "auto" = ./fonts, then HANZI_FONT,
    /// then the platform font directories.
    #[arg(long, default_value = "auto")]
    font: String,

    /// Hanzi size in pixels for label rendering
    #[arg(long, default_value_t = 60)]
    hanzi_size: u32,

    /// Pinyin letter size in pixels for label rendering
    #[arg(long, default_value_t = 16)]
    pinyin_size: u32,

    /// Pinyin letter color (#rrggbb)
    #[arg(long, default_value = "#ff0000")]
    pinyin_color: String,

    /// Translation target language
    #[arg(long, default_value = "en")]
    lang: String,

    /// Extra pinyin lexicon (TSV, layered over the builtin table)
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Extra translation glossary (JSON, replaces the builtin one)
    #[arg(long)]
    glossary: Option<PathBuf>,

    /// Also pack rendered labels into labels.zip
    #[arg(long)]
    archive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiMode {
    Normal,
    InputText,
    SplitMenu,
    FixedWidthInput,
    EditLine,
    AddLine,
    EditPinyin,
    EditTranslation,
    EditOutput,
    LanguageMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusedPane {
    Lines,
    Characters,
    Detail,
    Log,
}

struct App {
    args: Args,
    doc: PoemDocument,
    title: String,
    output_root: PathBuf,
    lang: String,
    lexicon: Lexicon,
    glossary: Glossary,
    dirty: bool,
    selected_line: usize,
    selected_char: usize,
    focus: FocusedPane,
    mode: UiMode,
    edit_buffer: String,
    pending_text: String,
    fixed_width_input: String,
    log_lines: Vec<String>,
    log_scroll: usize,
    detail_scroll: usize,
    split_list_state: ListState,
    language_list_state: ListState,
}

/// The non-Fixed entries of the split menu; the last menu row is Fixed and
/// asks for a width.
const SPLIT_CHOICES: &[SplitStrategy] = &[
    SplitStrategy::Comma,
    SplitStrategy::FullStop,
    SplitStrategy::Punctuation,
];

impl App {
    fn new(args: Args, doc: PoemDocument, title: String, lexicon: Lexicon, glossary: Glossary) -> Self {
        let output_root = args.output.clone();
        let lang = args.lang.clone();

        let mut language_list_state = ListState::default();
        let lang_index = LANGUAGES
            .iter()
            .position(|(code, _)| *code == lang)
            .unwrap_or(0);
        language_list_state.select(Some(lang_index));

        let mut split_list_state = ListState::default();
        split_list_state.select(Some(0));

        let mut app = Self {
            args,
            doc,
            title,
            output_root,
            lang,
            lexicon,
            glossary,
            dirty: false,
            selected_line: 0,
            selected_char: 0,
            focus: FocusedPane::Lines,
            mode: UiMode::Normal,
            edit_buffer: String::new(),
            pending_text: String::new(),
            fixed_width_input: String::new(),
            log_lines: vec![],
            log_scroll: 0,
            detail_scroll: 0,
            split_list_state,
            language_list_state,
        };

        app.push_log("════════════════════════════════════════".to_string());
        app.push_log("PoemStudio – pinyin & translation editor".to_string());
        app.push_log("════════════════════════════════════════".to_string());
        app.push_log("".to_string());
        app.push_log("CONTROLS:".to_string());
        app.push_log("  ↑/↓: select line/character".to_string());
        app.push_log("  Enter: edit the focused item".to_string());
        app.push_log("  e: edit translation of selected character".to_string());
        app.push_log("  i: enter new poem text   s: re-split current text".to_string());
        app.push_log("  n: add line   R: reparse characters".to_string());
        app.push_log("  p: fill pinyin   t: translate characters   T: translate lines".to_string());
        app.push_log("  j: export JSON   w: export HTML   g: render labels".to_string());
        app.push_log("  L: language menu   o: change output root".to_string());
        app.push_log("  Tab/Shift+Tab: switch focus   PgUp/PgDn: page".to_string());
        app.push_log("  q: quit".to_string());
        app.push_log("".to_string());
        app.push_log("=== SETTINGS ===".to_string());
        app.push_log(format!("Language: {}", app.lang));
        app.push_log(format!("Output root: {}", app.output_root.display()));
        app.push_log(format!("Lexicon entries: {}", app.lexicon.len()));
        app.push_log(format!(
            "Poem: {} lines, {} unique characters",
            app.doc.lines.len(),
            app.doc.chars.len()
        ));
        app.push_log("Ready.".to_string());

        app
    }

    fn push_log(&mut self, line: String) {
        let timestamp = Local::now().format("[%H:%M:%S] ").to_string();
        self.log_lines.push(format!("{}{}", timestamp, line));
        if self.log_lines.len() > 1000 {
            let extra = self.log_lines.len() - 500;
            self.log_lines.drain(0..extra);
        }
        if self.log_scroll >= self.log_lines.len().saturating_sub(30) {
            self.auto_scroll_log();
        }
    }

    fn auto_scroll_log(&mut self) {
        let visible_lines = 20;
        let total_lines = self.log_lines.len();
        if total_lines > visible_lines {
            self.log_scroll = total_lines - visible_lines;
        }
    }

    fn next_line(&mut self) {
        if self.doc.lines.is_empty() {
            return;
        }
        self.selected_line = (self.selected_line + 1) % self.doc.lines.len();
    }

    fn prev_line(&mut self) {
        if self.doc.lines.is_empty() {
            return;
        }
        if self.selected_line == 0 {
            self.selected_line = self.doc.lines.len() - 1;
        } else {
            self.selected_line -= 1;
        }
    }

    fn next_char(&mut self) {
        if self.doc.chars.is_empty() {
            return;
        }
        self.selected_char = (self.selected_char + 1) % self.doc.chars.len();
    }

    fn prev_char(&mut self) {
        if self.doc.chars.is_empty() {
            return;
        }
        if self.selected_char == 0 {
            self.selected_char = self.doc.chars.len() - 1;
        } else {
            self.selected_char -= 1;
        }
    }

    fn up(&mut self) {
        match self.focus {
            FocusedPane::Lines => self.prev_line(),
            FocusedPane::Characters => self.prev_char(),
            FocusedPane::Detail => self.detail_scroll = self.detail_scroll.saturating_sub(1),
            FocusedPane::Log => self.log_scroll = self.log_scroll.saturating_sub(1),
        }
    }

    fn down(&mut self) {
        match self.focus {
            FocusedPane::Lines => self.next_line(),
            FocusedPane::Characters => self.next_char(),
            FocusedPane::Detail => self.detail_scroll = self.detail_scroll.saturating_add(1),
            FocusedPane::Log => self.log_scroll = self.log_scroll.saturating_add(1),
        }
    }

    fn page_up(&mut self) {
        for _ in 0..10 {
            self.up();
        }
    }

    fn page_down(&mut self) {
        for _ in 0..10 {
            self.down();
        }
    }

    fn next_focus(&mut self) {
        self.focus = match self.focus {
            FocusedPane::Lines => FocusedPane::Characters,
            FocusedPane::Characters => FocusedPane::Detail,
            FocusedPane::Detail => FocusedPane::Log,
            FocusedPane::Log => FocusedPane::Lines,
        };
    }

    fn prev_focus(&mut self) {
        self.focus = match self.focus {
            FocusedPane::Lines => FocusedPane::Log,
            FocusedPane::Characters => FocusedPane::Lines,
            FocusedPane::Detail => FocusedPane::Characters,
            FocusedPane::Log => FocusedPane::Detail,
        };
    }

    fn clamp_selection(&mut self) {
        if self.selected_line >= self.doc.lines.len() {
            self.selected_line = self.doc.lines.len().saturating_sub(1);
        }
        if self.selected_char >= self.doc.chars.len() {
            self.selected_char = self.doc.chars.len().saturating_sub(1);
        }
    }

    // ----- edit modes -----

    fn start_edit_focused(&mut self) {
        match self.focus {
            FocusedPane::Lines => {
                if let Some(line) = self.doc.lines.get(self.selected_line) {
                    self.mode = UiMode::EditLine;
                    self.edit_buffer = line.clone();
                    self.push_log("Editing line – Enter=confirm, Esc=cancel".to_string());
                }
            }
            FocusedPane::Characters => {
                if let Some(entry) = self.doc.chars.get(self.selected_char) {
                    self.mode = UiMode::EditPinyin;
                    self.edit_buffer = entry.pinyin.clone();
                    self.push_log(format!(
                        "Editing pinyin of {} – Enter=confirm, Esc=cancel",
                        entry.hanzi
                    ));
                }
            }
            _ => {}
        }
    }

    fn start_edit_translation(&mut self) {
        if let Some(entry) = self.doc.chars.get(self.selected_char) {
            self.mode = UiMode::EditTranslation;
            self.edit_buffer = entry
                .translations
                .get(&self.lang)
                .cloned()
                .unwrap_or_default();
            self.push_log(format!(
                "Editing {} translation of {} – Enter=confirm, Esc=cancel",
                self.lang, entry.hanzi
            ));
        }
    }

    fn start_input_text(&mut self) {
        self.mode = UiMode::InputText;
        self.edit_buffer.clear();
        self.push_log("Enter poem text as one run – Enter=choose split, Esc=cancel".to_string());
    }

    fn start_add_line(&mut self) {
        self.mode = UiMode::AddLine;
        self.edit_buffer.clear();
        self.push_log("New line – Enter=append, Esc=cancel".to_string());
    }

    fn start_edit_output(&mut self) {
        self.mode = UiMode::EditOutput;
        self.edit_buffer = self.output_root.to_string_lossy().to_string();
        self.push_log("Editing output root – Enter=confirm, Esc=cancel".to_string());
    }

    fn show_split_menu(&mut self) {
        self.mode = UiMode::SplitMenu;
        self.push_log(
            "Split strategy – ↑/↓: move, Enter: apply, Esc: cancel".to_string(),
        );
    }

    fn show_language_menu(&mut self) {
        self.mode = UiMode::LanguageMenu;
        self.push_log("Language – ↑/↓: move, Enter: select, Esc: cancel".to_string());
    }

    fn apply_edit(&mut self) {
        let trimmed = self.edit_buffer.trim().to_string();
        match self.mode {
            UiMode::EditLine => {
                if trimmed.is_empty() {
                    self.push_log("Empty line ignored.".to_string());
                } else if let Some(line) = self.doc.lines.get_mut(self.selected_line) {
                    *line = trimmed;
                    self.doc.reparse_characters();
                    self.clamp_selection();
                    self.dirty = true;
                    self.push_log("Line updated, characters reparsed.".to_string());
                }
            }
            UiMode::AddLine => {
                if trimmed.is_empty() {
                    self.push_log("Empty line ignored.".to_string());
                } else {
                    self.doc.add_line(&trimmed);
                    self.selected_line = self.doc.lines.len() - 1;
                    self.dirty = true;
                    self.push_log(format!("Line added ({} total).", self.doc.lines.len()));
                }
            }
            UiMode::EditPinyin => {
                if let Some(entry) = self.doc.chars.get_mut(self.selected_char) {
                    entry.pinyin = trimmed.clone();
                    let hanzi = entry.hanzi;
                    if !trimmed.is_empty() {
                        // Manual corrections survive a later auto-fill.
                        self.lexicon.insert(hanzi, trimmed);
                    }
                    self.dirty = true;
                    self.push_log(format!("Pinyin of {hanzi} set."));
                }
            }
            UiMode::EditTranslation => {
                let lang = self.lang.clone();
                if let Some(entry) = self.doc.chars.get_mut(self.selected_char) {
                    entry.translations.insert(lang, trimmed);
                    let hanzi = entry.hanzi;
                    self.dirty = true;
                    self.push_log(format!("Translation of {hanzi} set."));
                }
            }
            UiMode::InputText => {
                if trimmed.is_empty() {
                    self.push_log("No text entered.".to_string());
                } else {
                    self.pending_text = trimmed;
                    self.show_split_menu();
                    return;
                }
            }
            UiMode::EditOutput => {
                let new_path = PathBuf::from(&trimmed);
                if let Err(e) = fs::create_dir_all(&new_path) {
                    self.push_log(format!(
                        "Cannot create output root `{}`: {e}",
                        new_path.display()
                    ));
                } else {
                    self.output_root = new_path.clone();
                    self.push_log(format!("Output root set to `{}`", new_path.display()));
                }
            }
            _ => {}
        }
        self.mode = UiMode::Normal;
        self.edit_buffer.clear();
    }

    fn cancel_edit(&mut self) {
        self.mode = UiMode::Normal;
        self.edit_buffer.clear();
        self.pending_text.clear();
        self.push_log("Edit cancelled.".to_string());
    }

    fn handle_edit_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.cancel_edit(),
            KeyCode::Enter => self.apply_edit(),
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.edit_buffer.push(c);
            }
            _ => {}
        }
    }

    fn handle_split_menu_key(&mut self, key: KeyCode) {
        // Menu rows: the fixed strategies plus one "fixed width…" row.
        let row_count = SPLIT_CHOICES.len() + 1;
        match key {
            KeyCode::Esc => {
                self.mode = UiMode::Normal;
                self.pending_text.clear();
                self.push_log("Split cancelled.".to_string());
            }
            KeyCode::Up => {
                let sel = self.split_list_state.selected().unwrap_or(0);
                self.split_list_state
                    .select(Some(if sel == 0 { row_count - 1 } else { sel - 1 }));
            }
            KeyCode::Down => {
                let sel = self.split_list_state.selected().unwrap_or(0);
                self.split_list_state.select(Some((sel + 1) % row_count));
            }
            KeyCode::Enter => {
                let sel = self.split_list_state.selected().unwrap_or(0);
                if sel < SPLIT_CHOICES.len() {
                    self.apply_split(SPLIT_CHOICES[sel]);
                } else {
                    self.mode = UiMode::FixedWidthInput;
                    self.fixed_width_input.clear();
                    self.push_log(
                        "Characters per line – Enter=apply, Esc=back".to_string(),
                    );
                }
            }
            _ => {}
        }
    }

    fn handle_fixed_width_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.mode = UiMode::SplitMenu;
                self.fixed_width_input.clear();
            }
            KeyCode::Enter => match self.fixed_width_input.parse::<usize>() {
                Ok(n) if n > 0 => self.apply_split(SplitStrategy::Fixed(n)),
                _ => self.push_log("Width must be a positive number.".to_string()),
            },
            KeyCode::Backspace => {
                self.fixed_width_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.fixed_width_input.push(c);
            }
            _ => {}
        }
    }

    fn apply_split(&mut self, strategy: SplitStrategy) {
        let text = if self.pending_text.is_empty() {
            self.doc.text()
        } else {
            std::mem::take(&mut self.pending_text)
        };
        let lines = split_lines(&text, strategy);
        if lines.is_empty() {
            self.push_log("Split produced no lines, keeping the document.".to_string());
        } else {
            self.doc.set_lines(lines);
            self.selected_line = 0;
            self.clamp_selection();
            self.dirty = true;
            self.push_log(format!(
                "{} → {} lines, {} unique characters.",
                strategy.label(),
                self.doc.lines.len(),
                self.doc.chars.len()
            ));
        }
        self.mode = UiMode::Normal;
        self.fixed_width_input.clear();
    }

    fn handle_language_menu_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.mode = UiMode::Normal;
                self.push_log("Language selection cancelled.".to_string());
            }
            KeyCode::Up => {
                let sel = self.language_list_state.selected().unwrap_or(0);
                self.language_list_state
                    .select(Some(if sel == 0 { LANGUAGES.len() - 1 } else { sel - 1 }));
            }
            KeyCode::Down => {
                let sel = self.language_list_state.selected().unwrap_or(0);
                self.language_list_state.select(Some((sel + 1) % LANGUAGES.len()));
            }
            KeyCode::Enter => {
                if let Some(sel) = self.language_list_state.selected() {
                    if let Some((code, name)) = LANGUAGES.get(sel) {
                        self.lang = code.to_string();
                        self.push_log(format!("Language set to {code} ({name})."));
                        self.mode = UiMode::Normal;
                    }
                }
            }
            _ => {}
        }
    }

    // ----- bulk operations -----

    fn fill_pinyin(&mut self) {
        let resolved = self.doc.apply_pinyin(&self.lexicon);
        let total = self.doc.chars.len();
        self.dirty = true;
        self.push_log(format!(
            "Pinyin filled: {resolved}/{total} resolved, {} marked '?'.",
            total - resolved
        ));
    }

    fn translate_chars(&mut self) {
        let lang = self.lang.clone();
        let (ok, failed) = self.doc.apply_char_translations(&self.glossary, &lang);
        self.dirty = true;
        self.push_log(format!(
            "Character translations ({lang}): {ok} ok, {failed} marked '?'."
        ));
    }

    fn translate_lines(&mut self) {
        let lang = self.lang.clone();
        let (ok, failed) = self.doc.apply_line_translations(&self.glossary, &lang);
        self.dirty = true;
        self.push_log(format!(
            "Line translations ({lang}): {ok} ok, {failed} marked '?'."
        ));
    }

    fn reparse(&mut self) {
        self.doc.reparse_characters();
        self.clamp_selection();
        self.dirty = true;
        self.push_log(format!(
            "Reparsed: {} unique characters.",
            self.doc.chars.len()
        ));
    }

    fn export_json(&mut self) {
        let path = self.output_root.join("poem.json");
        let result = fs::create_dir_all(&self.output_root)
            .map_err(anyhow::Error::from)
            .and_then(|_| self.doc.to_json())
            .and_then(|json| fs::write(&path, json).map_err(anyhow::Error::from));
        match result {
            Ok(()) => {
                self.dirty = false;
                self.push_log(format!("JSON exported: {}", path.display()));
            }
            Err(e) => self.push_log(format!("JSON export failed: {e}")),
        }
    }

    fn export_html(&mut self) {
        let path = self.output_root.join("poem.html");
        let result = fs::create_dir_all(&self.output_root)
            .map_err(anyhow::Error::from)
            .and_then(|_| write_poem_page(&self.doc, &self.title, &path));
        match result {
            Ok(()) => self.push_log(format!("HTML exported: {}", path.display())),
            Err(e) => self.push_log(format!("HTML export failed: {e}")),
        }
    }

    fn render_labels(&mut self) {
        let color = match compositor::parse_color(&self.args.pinyin_color) {
            Ok(c) => c,
            Err(e) => {
                self.push_log(format!("Bad pinyin color: {e}"));
                return;
            }
        };
        let (font_path, font_source) = match labeler::resolve_font_path(&self.args.font) {
            Ok(found) => found,
            Err(e) => {
                self.push_log(format!("Font resolution failed: {e}"));
                return;
            }
        };
        self.push_log(format!(
            "Font: {} ({font_source})",
            font_path.display()
        ));
        let rasterizer = match FontdueRasterizer::from_file(&font_path) {
            Ok(r) => r,
            Err(e) => {
                self.push_log(format!("Cannot load font: {e}"));
                return;
            }
        };

        let opts = LabelOptions {
            out_dir: self.output_root.join("labels"),
            hanzi_size: self.args.hanzi_size,
            pinyin_size: self.args.pinyin_size,
            color,
            color_spec: self.args.pinyin_color.clone(),
            font_label: font_path.display().to_string(),
            archive: self.args.archive,
            html_index: true,
        };

        let text = self.doc.text();
        let mut local_logs = Vec::new();
        match labeler::render_labels(&text, &rasterizer, &self.lexicon, &opts, &mut local_logs) {
            Ok(report) => {
                for line in local_logs {
                    self.push_log(line);
                }
                self.push_log(format!(
                    "Labels done: {} rendered, {} skipped, {} failed.",
                    report.rendered, report.skipped, report.failed
                ));
            }
            Err(e) => {
                for line in local_logs {
                    self.push_log(line);
                }
                self.push_log(format!("Label rendering failed: {e}"));
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    fs::create_dir_all(&args.output).with_context(|| {
        format!("cannot create output root `{}`", args.output.display())
    })?;

    let lexicon = match &args.lexicon {
        Some(path) => Lexicon::from_file(path)?,
        None => Lexicon::builtin(),
    };
    let glossary = match &args.glossary {
        Some(path) => Glossary::from_file(path)?,
        None => Glossary::builtin(),
    };

    let (doc, title) = match &args.input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read `{}`", path.display()))?;
            let title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("poem")
                .to_string();
            (PoemDocument::from_json(&text)?, title)
        }
        None => (PoemDocument::demo(), "春夜喜雨".to_string()),
    };

    let mut app = App::new(args, doc, title, lexicon, glossary);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = res {
        eprintln!("Error: {e:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(200);
    let mut force_full_redraw = true;

    loop {
        if force_full_redraw {
            terminal.clear()?;
            force_full_redraw = false;
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    let mut needs_full_redraw = true;

                    match app.mode {
                        UiMode::Normal => match key.code {
                            KeyCode::Char('q') => return Ok(()),
                            KeyCode::Up => app.up(),
                            KeyCode::Down => app.down(),
                            KeyCode::PageUp => app.page_up(),
                            KeyCode::PageDown => app.page_down(),
                            KeyCode::Tab => app.next_focus(),
                            KeyCode::BackTab => app.prev_focus(),
                            KeyCode::Enter => app.start_edit_focused(),
                            KeyCode::Char('e') => app.start_edit_translation(),
                            KeyCode::Char('i') => app.start_input_text(),
                            KeyCode::Char('n') => app.start_add_line(),
                            KeyCode::Char('s') => app.show_split_menu(),
                            KeyCode::Char('o') => app.start_edit_output(),
                            KeyCode::Char('L') => app.show_language_menu(),
                            KeyCode::Char('p') => app.fill_pinyin(),
                            KeyCode::Char('t') => app.translate_chars(),
                            KeyCode::Char('T') => app.translate_lines(),
                            KeyCode::Char('R') => app.reparse(),
                            KeyCode::Char('j') => app.export_json(),
                            KeyCode::Char('w') => app.export_html(),
                            KeyCode::Char('g') => app.render_labels(),
                            _ => needs_full_redraw = false,
                        },
                        UiMode::EditLine
                        | UiMode::AddLine
                        | UiMode::EditPinyin
                        | UiMode::EditTranslation
                        | UiMode::InputText
                        | UiMode::EditOutput => app.handle_edit_key(key.code),
                        UiMode::SplitMenu => app.handle_split_menu_key(key.code),
                        UiMode::FixedWidthInput => app.handle_fixed_width_key(key.code),
                        UiMode::LanguageMenu => app.handle_language_menu_key(key.code),
                    }

                    if needs_full_redraw {
                        force_full_redraw = true;
                    }
                }
                Event::Mouse(me) => match me.kind {
                    MouseEventKind::ScrollUp => {
                        for _ in 0..3 {
                            app.up();
                        }
                        force_full_redraw = true;
                    }
                    MouseEventKind::ScrollDown => {
                        for _ in 0..3 {
                            app.down();
                        }
                        force_full_redraw = true;
                    }
                    _ => {}
                },
                Event::Resize(_, _) => {
                    force_full_redraw = true;
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame<'_>, app: &App) {
    render_main_ui(f, app);
    render_overlay_ui(f, app);
}

fn pane_title_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }
}

fn pane_border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn render_main_ui(f: &mut Frame<'_>, app: &App) {
    let area = f.size();

    let background_block = Block::default().style(Style::default().bg(Color::Black));
    f.render_widget(background_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Length(4),      // header
                Constraint::Percentage(45), // lines + characters
                Constraint::Percentage(20), // detail
                Constraint::Length(1),      // status bar
                Constraint::Percentage(30), // log
            ]
            .as_ref(),
        )
        .split(area);

    // ----- header -----
    let title_line = Line::from(vec![
        Span::styled(
            "PoemStudio",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" • "),
        Span::styled(
            "pinyin & translation editor",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    ]);

    let info_line = Line::from(vec![
        Span::raw("  "),
        Span::styled("Poem: ", Style::default().fg(Color::Cyan)),
        Span::raw(app.title.as_str()),
        Span::styled(
            if app.dirty { " *" } else { "" },
            Style::default().fg(Color::Red),
        ),
        Span::raw("  "),
        Span::styled("Lang: ", Style::default().fg(Color::Cyan)),
        Span::raw(app.lang.as_str()),
        Span::raw("  "),
        Span::styled("Output: ", Style::default().fg(Color::Cyan)),
        Span::raw(app.output_root.to_string_lossy().to_string()),
    ]);

    let mode_text = match app.mode {
        UiMode::Normal => Span::raw("Normal"),
        UiMode::InputText => Span::styled("Enter text", Style::default().fg(Color::Yellow)),
        UiMode::SplitMenu => Span::styled("Split menu", Style::default().fg(Color::Yellow)),
        UiMode::FixedWidthInput => Span::styled("Fixed width", Style::default().fg(Color::Yellow)),
        UiMode::EditLine => Span::styled("Edit line", Style::default().fg(Color::Yellow)),
        UiMode::AddLine => Span::styled("Add line", Style::default().fg(Color::Yellow)),
        UiMode::EditPinyin => Span::styled("Edit pinyin", Style::default().fg(Color::Yellow)),
        UiMode::EditTranslation => {
            Span::styled("Edit translation", Style::default().fg(Color::Yellow))
        }
        UiMode::EditOutput => Span::styled("Edit output", Style::default().fg(Color::Yellow)),
        UiMode::LanguageMenu => Span::styled("Language", Style::default().fg(Color::Yellow)),
    };

    let mode_line = Line::from(vec![
        Span::styled("Mode: ", Style::default().fg(Color::Yellow)),
        mode_text,
    ]);

    let header_block = Block::default()
        .title(Span::styled(" Status ", Style::default().fg(Color::Cyan)))
        .borders(Borders::ALL)
        .border_style(if matches!(app.mode, UiMode::Normal) {
            Style::default()
        } else {
            Style::default().fg(Color::Yellow)
        });

    let header = Paragraph::new(vec![title_line, info_line, mode_line])
        .alignment(Alignment::Left)
        .block(header_block);
    f.render_widget(header, chunks[0]);

    // ----- lines + characters -----
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);

    let line_items: Vec<ListItem> = app
        .doc
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let mut spans = Vec::new();
            spans.push(Span::styled(
                if i == app.selected_line { "▶ " } else { "  " },
                if i == app.selected_line {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                },
            ));
            spans.push(Span::styled(
                format!("{:2} ", i + 1),
                Style::default().fg(Color::DarkGray),
            ));
            spans.push(Span::styled(
                line.clone(),
                Style::default().fg(Color::White),
            ));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let lines_focused = matches!(app.focus, FocusedPane::Lines);
    let lines_block = Block::default()
        .title(Span::styled(
            format!(" Lines ({}) ", app.doc.lines.len()),
            pane_title_style(lines_focused),
        ))
        .borders(Borders::ALL)
        .border_style(pane_border_style(lines_focused));
    f.render_widget(List::new(line_items).block(lines_block), middle[0]);

    let char_items: Vec<ListItem> = app
        .doc
        .chars
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut spans = Vec::new();
            spans.push(Span::styled(
                if i == app.selected_char { "▶ " } else { "  " },
                if i == app.selected_char {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                },
            ));
            spans.push(Span::styled(
                format!("{} ", entry.hanzi),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
            let pinyin_style = if entry.pinyin == "?" {
                Style::default().fg(Color::Red)
            } else if entry.pinyin.is_empty() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Green)
            };
            spans.push(Span::styled(
                format!("{:8} ", if entry.pinyin.is_empty() { "-" } else { &entry.pinyin }),
                pinyin_style,
            ));
            let word = entry
                .translations
                .get(&app.lang)
                .map(String::as_str)
                .unwrap_or("-");
            spans.push(Span::styled(
                word.to_string(),
                if word == "?" {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::Gray)
                },
            ));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let chars_focused = matches!(app.focus, FocusedPane::Characters);
    let chars_block = Block::default()
        .title(Span::styled(
            format!(" Characters ({}) ", app.doc.chars.len()),
            pane_title_style(chars_focused),
        ))
        .borders(Borders::ALL)
        .border_style(pane_border_style(chars_focused));
    f.render_widget(List::new(char_items).block(chars_block), middle[1]);

    // ----- detail -----
    let mut detail_lines = Vec::new();

    if let Some(entry) = app.doc.chars.get(app.selected_char) {
        detail_lines.push(Line::from(vec![
            Span::styled("Character: ", Style::default().fg(Color::Cyan)),
            Span::styled(
                entry.hanzi.to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled("Pinyin: ", Style::default().fg(Color::Cyan)),
            Span::styled(
                if entry.pinyin.is_empty() { "-" } else { &entry.pinyin }.to_string(),
                Style::default().fg(Color::Green),
            ),
        ]));
        let mut trans_spans = vec![Span::styled(
            "Translations: ",
            Style::default().fg(Color::Cyan),
        )];
        if entry.translations.is_empty() {
            trans_spans.push(Span::styled("-", Style::default().fg(Color::DarkGray)));
        }
        for (lang, word) in &entry.translations {
            trans_spans.push(Span::styled(
                format!("{lang}:"),
                Style::default().fg(Color::DarkGray),
            ));
            trans_spans.push(Span::raw(format!("{word}  ")));
        }
        detail_lines.push(Line::from(trans_spans));
    } else {
        detail_lines.push(Line::from("No characters"));
    }

    if let Some(line) = app.doc.lines.get(app.selected_line) {
        detail_lines.push(Line::from(""));
        detail_lines.push(Line::from(vec![
            Span::styled("Line: ", Style::default().fg(Color::Cyan)),
            Span::raw(line.clone()),
        ]));
        for (lang, map) in &app.doc.line_translations {
            if let Some(trans) = map.get(line) {
                detail_lines.push(Line::from(vec![
                    Span::styled(format!("  {lang}: "), Style::default().fg(Color::DarkGray)),
                    Span::raw(trans.clone()),
                ]));
            }
        }
    }

    detail_lines.push(Line::from(""));
    detail_lines.push(Line::from(vec![
        Span::styled("p", Style::default().fg(Color::Yellow)),
        Span::raw(": pinyin  "),
        Span::styled("t", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("T", Style::default().fg(Color::Yellow)),
        Span::raw(": translate chars/lines  "),
        Span::styled("g", Style::default().fg(Color::Yellow)),
        Span::raw(": labels"),
    ]));
    detail_lines.push(Line::from(vec![
        Span::styled("j", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("w", Style::default().fg(Color::Yellow)),
        Span::raw(": export JSON/HTML  "),
        Span::styled("i", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("s", Style::default().fg(Color::Yellow)),
        Span::raw(": new text/split"),
    ]));

    let detail_focused = matches!(app.focus, FocusedPane::Detail);
    let detail_block = Block::default()
        .title(Span::styled(" Detail ", pane_title_style(detail_focused)))
        .borders(Borders::ALL)
        .border_style(pane_border_style(detail_focused));
    let detail = Paragraph::new(detail_lines)
        .block(detail_block)
        .scroll((app.detail_scroll as u16, 0));
    f.render_widget(detail, chunks[2]);

    // ----- status bar -----
    let total_chars = app.doc.chars.len();
    let with_pinyin = app
        .doc
        .chars
        .iter()
        .filter(|e| !e.pinyin.is_empty() && e.pinyin != "?")
        .count();
    let with_translation = app
        .doc
        .chars
        .iter()
        .filter(|e| {
            e.translations
                .get(&app.lang)
                .is_some_and(|w| w != "?")
        })
        .count();

    let status_line = Line::from(vec![
        Span::styled("Lines: ", Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{} ", app.doc.lines.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("• "),
        Span::styled("Pinyin: ", Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{with_pinyin}/{total_chars} "),
            Style::default().fg(if with_pinyin == total_chars && total_chars > 0 {
                Color::Green
            } else {
                Color::White
            }),
        ),
        Span::raw("• "),
        Span::styled(format!("{}: ", app.lang), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{with_translation}/{total_chars} "),
            Style::default().fg(if with_translation == total_chars && total_chars > 0 {
                Color::Green
            } else {
                Color::White
            }),
        ),
        Span::raw("• "),
        Span::styled("Font: ", Style::default().fg(Color::Cyan)),
        Span::raw(app.args.font.clone()),
    ]);

    let status_bar = Paragraph::new(status_line).block(Block::default().borders(Borders::NONE));
    f.render_widget(status_bar, chunks[3]);

    // ----- log -----
    let log_focused = matches!(app.focus, FocusedPane::Log);
    let log_lines: Vec<Line> = app
        .log_lines
        .iter()
        .map(|line| Line::from(Span::raw(line.clone())))
        .collect();

    let log_block = Block::default()
        .title(Span::styled(
            format!(" Log ({}) ", app.log_lines.len()),
            pane_title_style(log_focused),
        ))
        .borders(Borders::ALL)
        .border_style(pane_border_style(log_focused));

    let visible_log_height = chunks[4].height.saturating_sub(2);
    let total_log_lines = log_lines.len() as u16;
    let max_log_scroll = total_log_lines.saturating_sub(visible_log_height) as usize;
    let log_y = app.log_scroll.min(max_log_scroll) as u16;

    let logs = Paragraph::new(log_lines).block(log_block).scroll((log_y, 0));
    f.render_widget(logs, chunks[4]);
}

fn render_overlay_ui(f: &mut Frame<'_>, app: &App) {
    match app.mode {
        UiMode::SplitMenu => {
            let area = centered_rect(50, 40, f.size());

            let background_block = Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black));
            f.render_widget(background_block, area);

            let inner_area = Rect {
                x: area.x + 1,
                y: area.y + 1,
                width: area.width.saturating_sub(2),
                height: area.height.saturating_sub(2),
            };

            let title = Line::from(vec![
                Span::styled(
                    " Split strategy ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" (↑/↓ move, Enter apply, Esc cancel)"),
            ]);
            let title_block = Block::default().title(title).borders(Borders::NONE);

            let mut labels: Vec<String> =
                SPLIT_CHOICES.iter().map(|s| s.label()).collect();
            labels.push("Fixed width…".to_string());

            let items: Vec<ListItem> = labels
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let is_selected = Some(i) == app.split_list_state.selected();
                    let mut spans = vec![];
                    if is_selected {
                        spans.push(Span::styled("▶ ", Style::default().fg(Color::Yellow)));
                        spans.push(Span::styled(
                            label.clone(),
                            Style::default().fg(Color::Yellow),
                        ));
                    } else {
                        spans.push(Span::raw("  "));
                        spans.push(Span::styled(
                            label.clone(),
                            Style::default().fg(Color::White),
                        ));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect();

            let list = List::new(items).block(title_block).highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

            let mut state = app.split_list_state.clone();
            f.render_stateful_widget(list, inner_area, &mut state);
        }
        UiMode::LanguageMenu => {
            let area = centered_rect(40, 40, f.size());

            let background_block = Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black));
            f.render_widget(background_block, area);

            let inner_area = Rect {
                x: area.x + 1,
                y: area.y + 1,
                width: area.width.saturating_sub(2),
                height: area.height.saturating_sub(2),
            };

            let title = Line::from(vec![
                Span::styled(
                    " Language ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" (↑/↓ move, Enter select, Esc cancel)"),
            ]);
            let title_block = Block::default().title(title).borders(Borders::NONE);

            let items: Vec<ListItem> = LANGUAGES
                .iter()
                .enumerate()
                .map(|(i, (code, name))| {
                    let is_selected = Some(i) == app.language_list_state.selected();
                    let is_current = *code == app.lang;

                    let mut spans = vec![];
                    if is_selected {
                        spans.push(Span::styled("▶ ", Style::default().fg(Color::Yellow)));
                    } else {
                        spans.push(Span::raw("  "));
                    }

                    if is_current {
                        spans.push(Span::styled(
                            format!("{code:4} "),
                            Style::default()
                                .fg(Color::Green)
                                .add_modifier(Modifier::BOLD),
                        ));
                        spans.push(Span::styled(*name, Style::default().fg(Color::Green)));
                        spans.push(Span::raw(" (current)"));
                    } else if is_selected {
                        spans.push(Span::styled(
                            format!("{code:4} "),
                            Style::default().fg(Color::Yellow),
                        ));
                        spans.push(Span::styled(*name, Style::default().fg(Color::Yellow)));
                    } else {
                        spans.push(Span::styled(
                            format!("{code:4} "),
                            Style::default().fg(Color::White),
                        ));
                        spans.push(Span::styled(*name, Style::default().fg(Color::Gray)));
                    }

                    ListItem::new(Line::from(spans))
                })
                .collect();

            let list = List::new(items).block(title_block).highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

            let mut state = app.language_list_state.clone();
            f.render_stateful_widget(list, inner_area, &mut state);
        }
        UiMode::InputText
        | UiMode::EditLine
        | UiMode::AddLine
        | UiMode::EditPinyin
        | UiMode::EditTranslation
        | UiMode::EditOutput => {
            let (title, prompt) = match app.mode {
                UiMode::InputText => (" New poem text ", "Enter the poem as one run of text:"),
                UiMode::EditLine => (" Edit line ", "Line text:"),
                UiMode::AddLine => (" Add line ", "New line text:"),
                UiMode::EditPinyin => (" Edit pinyin ", "Tone-numeral syllable (e.g. hao3):"),
                UiMode::EditTranslation => (" Edit translation ", "Translation:"),
                _ => (" Edit output root ", "Output directory:"),
            };

            let area = centered_rect(60, 20, f.size());

            let background_block = Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black));
            f.render_widget(background_block, area);

            let inner_area = Rect {
                x: area.x + 1,
                y: area.y + 1,
                width: area.width.saturating_sub(2),
                height: area.height.saturating_sub(2),
            };

            let edit_block = Block::default()
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::NONE);

            let edit_text = vec![
                Line::from(prompt),
                Line::from(""),
                Line::from(vec![
                    Span::raw("> "),
                    Span::styled(app.edit_buffer.as_str(), Style::default().fg(Color::White)),
                    Span::styled("_", Style::default().fg(Color::Yellow)),
                ]),
                Line::from(""),
                Line::from("Enter: confirm, Esc: cancel"),
            ];

            let edit_paragraph = Paragraph::new(edit_text)
                .block(edit_block)
                .alignment(Alignment::Left);
            f.render_widget(edit_paragraph, inner_area);
        }
        UiMode::FixedWidthInput => {
            let area = centered_rect(40, 20, f.size());

            let background_block = Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black));
            f.render_widget(background_block, area);

            let inner_area = Rect {
                x: area.x + 1,
                y: area.y + 1,
                width: area.width.saturating_sub(2),
                height: area.height.saturating_sub(2),
            };

            let edit_block = Block::default()
                .title(Span::styled(
                    " Fixed width ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::NONE);

            let edit_text = vec![
                Line::from("Characters per line:"),
                Line::from(""),
                Line::from(vec![
                    Span::raw("> "),
                    Span::styled(
                        app.fixed_width_input.as_str(),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled("_", Style::default().fg(Color::Yellow)),
                ]),
                Line::from(""),
                Line::from("Enter: apply, Esc: back"),
            ];

            let edit_paragraph = Paragraph::new(edit_text)
                .block(edit_block)
                .alignment(Alignment::Left);
            f.render_widget(edit_paragraph, inner_area);
        }
        UiMode::Normal => {}
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
