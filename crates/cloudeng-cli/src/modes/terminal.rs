//! Plain terminal output for rendered transcripts.
//!
//! Markdown is written as-is. Diagrams become a caption line with the file
//! path and size, followed by an inline preview on Kitty-capable terminals.
//! Warnings and errors are printed in place of the image.

use std::io::{self, IsTerminal, Write};

use cloudeng_core::render::{RenderedSegment, Renderer, SegmentSink};
use cloudeng_core::tasks;
use cloudeng_core::transcript::{Message, Role};
use crossterm::style::{Color, Stylize};

use super::kitty;

/// Writes rendered segments to `out`.
///
/// [`SegmentSink::emit`] cannot fail, so the first write error is kept and
/// reported by [`TerminalSink::finish`].
pub struct TerminalSink<W: Write> {
    out: W,
    styled: bool,
    graphics: bool,
    error: Option<io::Error>,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, styled: bool) -> Self {
        Self {
            out,
            styled,
            graphics: false,
            error: None,
        }
    }

    /// Draws diagram previews inline with the Kitty graphics protocol.
    #[must_use]
    pub fn with_graphics(mut self, graphics: bool) -> Self {
        self.graphics = graphics;
        self
    }

    /// Flushes and returns the first write error, if any.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn line(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.out, "{text}") {
            self.error = Some(e);
        }
    }

    fn preview(&mut self, png: &[u8], width: u32) {
        if self.error.is_some() {
            return;
        }
        let result = kitty::image_sequence(png, kitty::columns_for(width), kitty::in_tmux())
            .and_then(|seq| self.out.write_all(&seq))
            .and_then(|()| writeln!(self.out));
        if let Err(e) = result {
            self.error = Some(e);
        }
    }
}

impl<W: Write> SegmentSink for TerminalSink<W> {
    fn emit(&mut self, segment: RenderedSegment) {
        let text = match &segment {
            RenderedSegment::Markdown(text) => text.clone(),
            RenderedSegment::Image {
                path,
                caption,
                image,
            } => {
                let mut line = format!(
                    "[{caption}] {} ({}x{})",
                    path.display(),
                    image.source_width,
                    image.source_height
                );
                if image.was_downscaled() {
                    line.push_str(&format!(", preview {}x{}", image.width, image.height));
                }
                let line = paint(line, Color::Cyan, self.styled);
                self.line(&line);
                if self.graphics {
                    self.preview(&image.png_bytes, image.width);
                }
                return;
            }
            RenderedSegment::Warning { .. } => {
                paint(segment.notice().unwrap_or_default(), Color::Yellow, self.styled)
            }
            RenderedSegment::Error { .. } => {
                paint(segment.notice().unwrap_or_default(), Color::Red, self.styled)
            }
        };
        self.line(&text);
    }
}

/// Whether stdout should get colors.
pub fn stdout_styled() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

pub fn paint(text: String, color: Color, styled: bool) -> String {
    if styled {
        text.with(color).to_string()
    } else {
        text
    }
}

pub fn role_label(role: Role, styled: bool) -> String {
    let (label, color) = match role {
        Role::User => ("You", Color::Green),
        Role::Assistant => ("Assistant", Color::Blue),
    };
    if styled {
        label.with(color).bold().to_string()
    } else {
        label.to_string()
    }
}

/// Renders `content` into `out`.
///
/// Styled output also gets inline diagram previews when stdout supports
/// Kitty graphics.
///
/// # Errors
/// Returns an error if `out` cannot be written.
pub fn write_content(
    out: &mut impl Write,
    styled: bool,
    renderer: &Renderer,
    content: &str,
) -> io::Result<()> {
    let graphics = styled && kitty::stdout_supported();
    let mut sink = TerminalSink::new(out, styled).with_graphics(graphics);
    renderer.render(content, &mut sink);
    sink.finish().map(|_| ())
}

/// Renders a transcript message under its role label.
///
/// # Errors
/// Returns an error if `out` cannot be written.
pub fn write_message(
    out: &mut impl Write,
    styled: bool,
    renderer: &Renderer,
    message: &Message,
) -> io::Result<()> {
    writeln!(out, "{}:", role_label(message.role(), styled))?;
    write_content(out, styled, renderer, message.content())
}

/// One line per predefined task: menu number, key, description.
///
/// # Errors
/// Returns an error if `out` cannot be written.
pub fn write_task_list(out: &mut impl Write) -> io::Result<()> {
    let width = tasks::all().iter().map(|t| t.key.len()).max().unwrap_or(0);
    for (i, task) in tasks::all().iter().enumerate() {
        writeln!(out, "{:>2}. {:<width$}  {}", i + 1, task.key, task.description)?;
    }
    Ok(())
}

/// Renders `content` to stdout.
///
/// # Errors
/// Returns an error if stdout cannot be written.
pub fn print_content(renderer: &Renderer, content: &str) -> io::Result<()> {
    write_content(&mut io::stdout().lock(), stdout_styled(), renderer, content)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn render_plain(renderer: &Renderer, content: &str) -> String {
        let mut sink = TerminalSink::new(Vec::new(), false);
        renderer.render(content, &mut sink);
        String::from_utf8(sink.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_markdown_passes_through() {
        let out = render_plain(&Renderer::default(), "# Buckets\n\n- logs");
        assert_eq!(out, "# Buckets\n\n- logs\n");
    }

    #[test]
    fn test_missing_diagram_prints_notice_in_place() {
        let dir = TempDir::new().unwrap();
        let renderer = Renderer::for_dir(dir.path()).unwrap();
        let missing = dir.path().join("gone.png");
        let content = format!("Before\n{}\nAfter", missing.display());

        let out = render_plain(&renderer, &content);

        assert_eq!(
            out,
            format!("Before\nImage not found: {}\nAfter\n", missing.display())
        );
    }

    #[test]
    fn test_undecodable_diagram_prints_error() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.png");
        fs::write(&bad, b"not a png").unwrap();
        let renderer = Renderer::for_dir(dir.path()).unwrap();

        let out = render_plain(&renderer, &bad.display().to_string());

        assert!(out.starts_with("Error displaying image: "), "{out}");
    }

    #[test]
    fn test_graphics_sink_draws_preview_after_caption() {
        let dir = TempDir::new().unwrap();
        let diagram = dir.path().join("vpc.png");
        image::RgbaImage::new(4, 2).save(&diagram).unwrap();
        let renderer = Renderer::for_dir(dir.path()).unwrap();

        let mut sink = TerminalSink::new(Vec::new(), false).with_graphics(true);
        renderer.render(&diagram.display().to_string(), &mut sink);
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();

        let (caption, rest) = out.split_once('\n').unwrap();
        assert_eq!(caption, format!("[Generated Diagram] {} (4x2)", diagram.display()));
        assert!(rest.contains("_Ga=T,f=100,q=2"), "{rest:?}");
        // PNG signature in base64.
        assert!(rest.contains("iVBORw0KGgo"), "{rest:?}");
        assert!(rest.ends_with("\x1b\\\n"), "{rest:?}");
    }

    #[test]
    fn test_plain_sink_prints_caption_only() {
        let dir = TempDir::new().unwrap();
        let diagram = dir.path().join("vpc.png");
        image::RgbaImage::new(4, 2).save(&diagram).unwrap();
        let renderer = Renderer::for_dir(dir.path()).unwrap();

        let out = render_plain(&renderer, &diagram.display().to_string());

        assert_eq!(out, format!("[Generated Diagram] {} (4x2)\n", diagram.display()));
    }

    #[test]
    fn test_message_gets_role_label() {
        let mut out = Vec::new();
        let message = Message::new(Role::Assistant, "Done.");
        write_message(&mut out, false, &Renderer::default(), &message).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Assistant:\nDone.\n");
    }

    #[test]
    fn test_task_list_is_numbered() {
        let mut out = Vec::new();
        write_task_list(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), tasks::all().len());
        assert!(lines[0].starts_with(" 1. ec2_status "));
        assert!(lines[10].starts_with("11. generate_diagram"));
    }

    #[test]
    fn test_role_labels_unstyled() {
        assert_eq!(role_label(Role::User, false), "You");
        assert_eq!(role_label(Role::Assistant, false), "Assistant");
    }
}
