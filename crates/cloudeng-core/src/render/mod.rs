//! Transcript rendering.
//!
//! Splits message content around generated-diagram paths and resolves each
//! path to a preview image. A missing or undecodable image becomes a warning
//! or error segment in place; it never stops the rest of the message.

mod segments;

use std::path::{Path, PathBuf};

pub use segments::{DEFAULT_DIAGRAM_DIR, DiagramPattern, DisplaySegment, split_segments};

use crate::images::{self, DiagramImage, PREVIEW_MAX_DIMS};

/// Caption shown under every inline diagram.
pub const DIAGRAM_CAPTION: &str = "Generated Diagram";

/// A display-ready piece of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedSegment {
    Markdown(String),
    Image {
        path: PathBuf,
        caption: String,
        image: DiagramImage,
    },
    /// The referenced image does not exist.
    Warning { path: PathBuf },
    /// The image exists but could not be loaded.
    Error { path: PathBuf, message: String },
}

impl RenderedSegment {
    /// Human-readable line for warning and error segments.
    pub fn notice(&self) -> Option<String> {
        match self {
            RenderedSegment::Warning { path } => {
                Some(format!("Image not found: {}", path.display()))
            }
            RenderedSegment::Error { message, .. } => {
                Some(format!("Error displaying image: {message}"))
            }
            _ => None,
        }
    }
}

/// Receives rendered segments in order.
pub trait SegmentSink {
    fn emit(&mut self, segment: RenderedSegment);
}

impl SegmentSink for Vec<RenderedSegment> {
    fn emit(&mut self, segment: RenderedSegment) {
        self.push(segment);
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pattern: DiagramPattern,
    max_dims: (u32, u32),
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            pattern: DiagramPattern::default(),
            max_dims: PREVIEW_MAX_DIMS,
        }
    }
}

impl Renderer {
    pub fn new(pattern: DiagramPattern) -> Self {
        Self {
            pattern,
            max_dims: PREVIEW_MAX_DIMS,
        }
    }

    /// Renderer for diagrams written under `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be turned into a pattern.
    pub fn for_dir(dir: impl AsRef<Path>) -> Result<Self, regex::Error> {
        DiagramPattern::new(dir).map(Self::new)
    }

    #[must_use]
    pub fn with_max_dims(mut self, max_dims: (u32, u32)) -> Self {
        self.max_dims = max_dims;
        self
    }

    /// Renders `content` into `sink`, in order.
    pub fn render(&self, content: &str, sink: &mut impl SegmentSink) {
        for segment in split_segments(content, &self.pattern) {
            match segment {
                DisplaySegment::Text(text) => sink.emit(RenderedSegment::Markdown(text)),
                DisplaySegment::Image(path) => sink.emit(self.resolve_image(path)),
            }
        }
    }

    pub fn render_to_vec(&self, content: &str) -> Vec<RenderedSegment> {
        let mut out = Vec::new();
        self.render(content, &mut out);
        out
    }

    fn resolve_image(&self, path: PathBuf) -> RenderedSegment {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "diagram image not found");
            return RenderedSegment::Warning { path };
        }
        match images::load_preview(&path, self.max_dims) {
            Ok(image) => {
                tracing::debug!(
                    path = %path.display(),
                    width = image.source_width,
                    height = image.source_height,
                    "loaded diagram"
                );
                RenderedSegment::Image {
                    path,
                    caption: DIAGRAM_CAPTION.to_string(),
                    image,
                }
            }
            Err(message) => {
                tracing::warn!(path = %path.display(), error = %message, "diagram image failed to load");
                RenderedSegment::Error { path, message }
            }
        }
    }
}
