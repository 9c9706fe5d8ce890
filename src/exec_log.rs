//! The execution log: an append-only record of what a batch ran and how it went.
//!
//! Entries form an outline. Level 1 is the run header, level 2 labels a
//! repository, level 3 is one command invocation with its output as body.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub const HEADER_LEVEL: usize = 1;
pub const LABEL_LEVEL: usize = 2;
pub const COMMAND_LEVEL: usize = 3;

const FAILED_TAG: &str = "[FAILED]";

/// Destination for execution log output.
pub trait LogSink {
    /// Discard previous content and start a new run under `header`.
    fn reset(&mut self, header: &str);
    fn heading(&mut self, level: usize, text: &str);
    /// Append text to the body of the current entry.
    fn body(&mut self, text: &str);
    /// Flag the current entry and every heading above it, except the run header.
    fn mark_failed(&mut self);

    /// Repository label currently open, if any.
    fn open_label(&self) -> Option<&str>;
    fn set_open_label(&mut self, label: Option<String>);

    /// Open a repository label. With `reuse_open`, an identical open label is
    /// kept so nested invocations for the same repository share it.
    fn label(&mut self, text: &str, reuse_open: bool) {
        if reuse_open && self.open_label() == Some(text) {
            return;
        }
        self.heading(LABEL_LEVEL, text);
        self.set_open_label(Some(text.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: usize,
    pub title: String,
    pub body: String,
    pub failed: bool,
}

/// Structured in-memory log with failure annotation on headings.
#[derive(Debug, Default, Clone)]
pub struct OutlineLog {
    entries: Vec<LogEntry>,
    open_label: Option<String>,
}

impl OutlineLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.failed)
    }

    /// Titles of all headings at `level`, in order.
    pub fn titles_at(&self, level: usize) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.title.as_str())
            .collect()
    }

    /// Render as an outline. `styled` adds terminal colors.
    pub fn render(&self, styled: bool) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if entry.level > 0 {
                let mut title = format!("{} {}", "*".repeat(entry.level), entry.title);
                if entry.failed {
                    title.push(' ');
                    title.push_str(FAILED_TAG);
                }
                let title = if !styled {
                    title
                } else if entry.failed {
                    style(title).red().bold().to_string()
                } else if entry.level == HEADER_LEVEL {
                    style(title).bold().to_string()
                } else if entry.level == LABEL_LEVEL {
                    style(title).cyan().to_string()
                } else {
                    title
                };
                out.push_str(&title);
                out.push('\n');
            }
            if !entry.body.is_empty() {
                out.push_str(&entry.body);
                if !entry.body.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render(false))
            .with_context(|| format!("Failed to write execution log to {}", path.display()))
    }
}

impl LogSink for OutlineLog {
    fn reset(&mut self, header: &str) {
        self.entries.clear();
        self.open_label = None;
        self.heading(HEADER_LEVEL, header);
    }

    fn heading(&mut self, level: usize, text: &str) {
        log::debug!("{} {text}", "*".repeat(level));
        self.entries.push(LogEntry {
            level,
            title: text.to_string(),
            body: String::new(),
            failed: false,
        });
    }

    fn body(&mut self, text: &str) {
        if self.entries.is_empty() {
            self.entries.push(LogEntry {
                level: 0,
                title: String::new(),
                body: String::new(),
                failed: false,
            });
        }
        if let Some(last) = self.entries.last_mut() {
            last.body.push_str(text);
        }
    }

    fn mark_failed(&mut self) {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return;
        };
        let mut level = self.entries[last].level;
        if level > HEADER_LEVEL {
            self.entries[last].failed = true;
        }
        for entry in self.entries[..last].iter_mut().rev() {
            if level <= HEADER_LEVEL {
                break;
            }
            if entry.level < level {
                level = entry.level;
                if level > HEADER_LEVEL {
                    entry.failed = true;
                }
            }
        }
    }

    fn open_label(&self) -> Option<&str> {
        self.open_label.as_deref()
    }

    fn set_open_label(&mut self, label: Option<String>) {
        self.open_label = label;
    }
}

/// Line-oriented sink for plain writers. Failures degrade to a marker line.
pub struct PlainLog<W: Write> {
    out: W,
    open_label: Option<String>,
}

impl<W: Write> PlainLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            open_label: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        let result = if line.ends_with('\n') {
            self.out.write_all(line.as_bytes())
        } else {
            writeln!(self.out, "{line}")
        };
        if let Err(e) = result {
            log::warn!("Failed to write execution log: {e}");
        }
    }
}

impl<W: Write> LogSink for PlainLog<W> {
    fn reset(&mut self, header: &str) {
        self.open_label = None;
        self.write_line(&format!("== {header}"));
    }

    fn heading(&mut self, level: usize, text: &str) {
        self.write_line(&format!("{} {text}", "*".repeat(level)));
    }

    fn body(&mut self, text: &str) {
        if !text.is_empty() {
            self.write_line(text);
        }
    }

    fn mark_failed(&mut self) {
        self.write_line("!! FAILED");
    }

    fn open_label(&self) -> Option<&str> {
        self.open_label.as_deref()
    }

    fn set_open_label(&mut self, label: Option<String>) {
        self.open_label = label;
    }
}
