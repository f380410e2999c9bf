//! Indent-aware scanning of the top-level `features:` block.
//!
//! Only the shape the transforms need is modeled: a top-level `features:`
//! key whose children are category names, each holding a YAML list. Nothing
//! else in the file is interpreted.

use crate::text::indent_of;

/// One category under `features:`, as line ranges into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub name: String,
    pub header_idx: usize,
    /// Content lines (exclusive of the header), `start..end`.
    pub content_start: usize,
    pub content_end: usize,
    pub indent: String,
}

/// The `features:` block, as line ranges into the document.
#[derive(Debug, Clone)]
pub struct FeaturesBlockRef {
    pub header_idx: usize,
    /// First line index past the block.
    pub end: usize,
    pub categories: Vec<CategoryRef>,
}

/// Locate the top-level `features:` block and its categories.
pub fn find_features_block(lines: &[String]) -> Option<FeaturesBlockRef> {
    let header_idx = lines
        .iter()
        .position(|l| l.trim_end() == "features:")?;

    let mut end = lines.len();
    for (i, line) in lines.iter().enumerate().skip(header_idx + 1) {
        if !line.trim().is_empty() && indent_of(line).is_empty() {
            end = i;
            break;
        }
    }

    // Categories sit at the shallowest indent inside the block.
    let mut cat_indent: Option<&str> = None;
    for line in &lines[header_idx + 1..end] {
        if line.trim().is_empty() {
            continue;
        }
        let ind = indent_of(line);
        match cat_indent {
            None => cat_indent = Some(ind),
            Some(current) if ind.len() < current.len() => cat_indent = Some(ind),
            _ => {}
        }
    }

    let mut categories = Vec::new();
    if let Some(cat_indent) = cat_indent {
        let mut i = header_idx + 1;
        while i < end {
            let line = &lines[i];
            let is_header = !line.trim().is_empty()
                && indent_of(line) == cat_indent
                && line.trim_start().contains(':');
            if is_header {
                let name = line.trim_start().split(':').next().unwrap_or("").to_string();
                let content_start = i + 1;
                let mut content_end = end;
                for (j, next) in lines.iter().enumerate().take(end).skip(content_start) {
                    let next_is_header = !next.trim().is_empty() && indent_of(next) == cat_indent;
                    if next_is_header {
                        content_end = j;
                        break;
                    }
                }
                categories.push(CategoryRef {
                    name,
                    header_idx: i,
                    content_start,
                    content_end,
                    indent: cat_indent.to_string(),
                });
                i = content_end;
            } else {
                i += 1;
            }
        }
    }

    Some(FeaturesBlockRef {
        header_idx,
        end,
        categories,
    })
}

/// Shift a line from one indentation base to another, leaving blank lines
/// alone.
pub fn reindent(line: &str, from: &str, to: &str) -> String {
    if line.trim().is_empty() {
        return line.to_string();
    }
    match line.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => line.to_string(),
    }
}
