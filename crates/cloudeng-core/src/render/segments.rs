//! Splitting message content around generated-diagram paths.

use std::path::{Path, PathBuf};

use regex::Regex;

/// Where the diagram tool server writes its images.
pub const DEFAULT_DIAGRAM_DIR: &str = "/tmp/generated-diagrams";

/// One piece of a message, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplaySegment {
    Text(String),
    Image(PathBuf),
}

/// Matches `<dir>/<name>.png` where the name is word characters, `-` and `.`.
#[derive(Debug, Clone)]
pub struct DiagramPattern {
    regex: Regex,
}

impl DiagramPattern {
    /// Builds the pattern for `dir`. A trailing slash on `dir` is ignored.
    ///
    /// # Errors
    /// Returns an error if the escaped pattern fails to compile.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, regex::Error> {
        let dir_str = dir.as_ref().to_string_lossy();
        let trimmed = match dir_str.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        let prefix = if trimmed == "/" { String::new() } else { regex::escape(trimmed) };
        let regex = Regex::new(&format!(r"{prefix}/[\w\-\.]+\.png"))?;
        Ok(Self { regex })
    }
}

impl Default for DiagramPattern {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGRAM_DIR).expect("default diagram pattern compiles")
    }
}

/// Splits `content` into ordered text and image segments.
///
/// With no diagram paths the content comes back as one untrimmed text segment
/// (nothing if blank). Otherwise the text between paths is trimmed and blank
/// fragments are dropped.
pub fn split_segments(content: &str, pattern: &DiagramPattern) -> Vec<DisplaySegment> {
    let mut matches = pattern.regex.find_iter(content).peekable();
    if matches.peek().is_none() {
        if content.trim().is_empty() {
            return Vec::new();
        }
        return vec![DisplaySegment::Text(content.to_string())];
    }

    let mut segments = Vec::new();
    let mut cursor = 0;
    for m in matches {
        push_fragment(&mut segments, &content[cursor..m.start()]);
        segments.push(DisplaySegment::Image(PathBuf::from(m.as_str())));
        cursor = m.end();
    }
    push_fragment(&mut segments, &content[cursor..]);
    segments
}

fn push_fragment(segments: &mut Vec<DisplaySegment>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        segments.push(DisplaySegment::Text(trimmed.to_string()));
    }
}
