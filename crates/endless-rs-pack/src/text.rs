//! Line-oriented text editing that preserves the source's formatting.
//!
//! Every pack transform is textual: the generator is sensitive to YAML
//! formatting, so files are never parsed and re-emitted, only edited line by
//! line with their original newline convention intact.

use std::path::Path;

use crate::error::PackError;

/// A text file split into lines, remembering how to put it back together.
#[derive(Debug, Clone)]
pub struct Document {
    pub lines: Vec<String>,
    newline: &'static str,
    trailing_newline: bool,
}

impl Document {
    pub fn read(path: &Path) -> Result<Self, PackError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
        Ok(Self::parse(&raw))
    }

    pub fn parse(raw: &str) -> Self {
        let newline = if raw.contains("\r\n") { "\r\n" } else { "\n" };
        let trailing_newline = raw.ends_with('\n') || raw.is_empty();
        let normalized = raw.replace("\r\n", "\n");
        let mut lines: Vec<String> = normalized.split('\n').map(String::from).collect();
        if trailing_newline && lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }
        Self {
            lines,
            newline,
            trailing_newline,
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.newline);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.newline);
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<(), PackError> {
        std::fs::write(path, self.render()).map_err(|e| PackError::io(path, e))
    }

    pub fn newline(&self) -> &'static str {
        self.newline
    }
}

/// Apply placeholder → value pairs in order. Callers order longest-first so
/// `DIM_PAL_SLOT_STONE` is consumed before `DIM_PAL_SLOT`.
pub fn substitute(text: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = text.to_string();
    for (placeholder, value) in pairs {
        if out.contains(placeholder) {
            out = out.replace(placeholder, value);
        }
    }
    out
}

/// Leading whitespace of a line.
pub fn indent_of(line: &str) -> &str {
    let end = line.len() - line.trim_start().len();
    &line[..end]
}
