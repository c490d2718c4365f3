//! # Rendering
//!
//! Turns a [`CmdResult`] into terminal text or JSON.
//!
//! ## Note List Layout
//!
//! ```text
//!  1. Shopping                                         milk
//!  3. Ideas                                            launch plan
//! ```
//!
//! The id column is right-aligned, the title is truncated to
//! [`COL_TITLE`] display columns and the body preview takes its first line.

use super::setup::OutputFormat;
use console::Style;
use gitnotesapp::commands::{CmdMessage, CmdResult, MessageLevel};
use gitnotesapp::model::{Note, Repository};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const COL_INDEX: usize = 4;
pub const COL_TITLE: usize = 40;
pub const COL_PREVIEW: usize = 40;

/// How listed notes are shown: one line each, or title and whole body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteView {
    Lines,
    Full,
}

pub fn print_result(result: &CmdResult, format: OutputFormat, view: NoteView) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => print!("{}", render_text(result, view)),
    }
    Ok(())
}

pub fn render_text(result: &CmdResult, view: NoteView) -> String {
    let mut out = String::new();
    match view {
        NoteView::Full => {
            let notes: Vec<String> = result.listed_notes.iter().map(render_full_note).collect();
            out.push_str(&notes.join("---\n"));
        }
        NoteView::Lines => {
            for note in &result.listed_notes {
                out.push_str(&render_note_line(note));
            }
        }
    }
    for repository in &result.repositories {
        out.push_str(&render_repository(repository));
    }
    for message in &result.messages {
        out.push_str(&render_message(message));
    }
    for note in &result.affected_notes {
        out.push_str(&render_note_line(note));
    }
    out
}

/// Cut `text` to at most `width` display columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn pad_to_width(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn render_note_line(note: &Note) -> String {
    let index = format!("{:>width$}.", note.id.get(), width = COL_INDEX - 1);
    let title = pad_to_width(&truncate_to_width(&note.title, COL_TITLE), COL_TITLE);
    let preview = note.body.lines().next().unwrap_or_default();
    let preview = truncate_to_width(preview, COL_PREVIEW);
    let dim = Style::new().dim();
    let mut line = format!("{} {} {}", dim.apply_to(index), title, dim.apply_to(preview))
        .trim_end()
        .to_string();
    line.push('\n');
    line
}

fn render_full_note(note: &Note) -> String {
    let mut out = format!("{}\n\n{}", Style::new().bold().apply_to(&note.title), note.body);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn render_repository(repository: &Repository) -> String {
    format!(
        "{}  {}\n",
        Style::new().bold().apply_to(repository.name()),
        Style::new().dim().apply_to(&repository.remote_link)
    )
}

fn render_message(message: &CmdMessage) -> String {
    let style = match message.level {
        MessageLevel::Info => Style::new(),
        MessageLevel::Success => Style::new().green(),
        MessageLevel::Warning => Style::new().yellow(),
        MessageLevel::Error => Style::new().red(),
    };
    format!("{}\n", style.apply_to(&message.content))
}
