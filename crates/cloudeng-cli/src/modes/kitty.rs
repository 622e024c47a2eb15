//! Inline diagram previews over the Kitty graphics protocol.
//!
//! The PNG is transmitted and displayed at the cursor in one command
//! (`a=T,f=100`). Inside tmux every command goes through DCS passthrough.

use std::io::{self, IsTerminal, Write};

use base64::Engine;

/// Max base64 payload bytes per graphics command.
const CHUNK_SIZE: usize = 4096;

pub fn in_tmux() -> bool {
    std::env::var_os("TMUX").is_some()
}

/// Whether stdout is a terminal that understands Kitty graphics.
pub fn stdout_supported() -> bool {
    if !io::stdout().is_terminal() {
        return false;
    }
    if std::env::var_os("KITTY_WINDOW_ID").is_some() {
        return true;
    }
    let term = std::env::var("TERM").unwrap_or_default();
    let program = std::env::var("TERM_PROGRAM").unwrap_or_default();
    term.contains("kitty")
        || term.contains("ghostty")
        || matches!(program.as_str(), "ghostty" | "WezTerm")
}

/// Terminal columns an image `width_px` wide should span, capped at the
/// window width. `None` when the cell size is unknown.
pub fn columns_for(width_px: u32) -> Option<u16> {
    let size = crossterm::terminal::window_size().ok()?;
    fit_columns(width_px, size.columns, size.width)
}

fn fit_columns(width_px: u32, columns: u16, window_px: u16) -> Option<u16> {
    if columns == 0 || window_px == 0 {
        return None;
    }
    let cell_w = u32::from((window_px / columns).max(1));
    let needed = width_px.div_ceil(cell_w).clamp(1, u32::from(columns));
    u16::try_from(needed).ok()
}

/// Builds the commands that display `png` at the cursor.
///
/// Empty input yields no commands.
///
/// # Errors
/// Returns an error if the command buffer cannot be written.
pub fn image_sequence(png: &[u8], columns: Option<u16>, tmux: bool) -> io::Result<Vec<u8>> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    let chunks: Vec<&[u8]> = encoded.as_bytes().chunks(CHUNK_SIZE).collect();
    let size = columns.map(|c| format!(",c={c}")).unwrap_or_default();

    let mut out = Vec::with_capacity(encoded.len() + chunks.len() * 32);
    for (i, chunk) in chunks.iter().enumerate() {
        let more = u8::from(i + 1 < chunks.len());
        let mut command = Vec::with_capacity(chunk.len() + 48);
        if i == 0 {
            write!(command, "\x1b_Ga=T,f=100,q=2{size},m={more};")?;
        } else {
            write!(command, "\x1b_Gm={more};")?;
        }
        command.extend_from_slice(chunk);
        command.extend_from_slice(b"\x1b\\");
        write_passthrough(&mut out, &command, tmux)?;
    }
    Ok(out)
}

fn write_passthrough(out: &mut impl Write, command: &[u8], tmux: bool) -> io::Result<()> {
    if !tmux {
        return out.write_all(command);
    }
    out.write_all(b"\x1bPtmux;")?;
    for &byte in command {
        if byte == 0x1b {
            out.write_all(b"\x1b\x1b")?;
        } else {
            out.write_all(&[byte])?;
        }
    }
    out.write_all(b"\x1b\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_small_image_is_one_command() {
        let seq = text(image_sequence(b"png", Some(12), false).unwrap());
        assert_eq!(seq, "\x1b_Ga=T,f=100,q=2,c=12,m=0;cG5n\x1b\\");
    }

    #[test]
    fn test_large_image_is_chunked() {
        // 3 input bytes per 4 base64 bytes: two full chunks and a short one.
        let png = vec![0u8; CHUNK_SIZE / 4 * 3 * 2 + 3];
        let seq = text(image_sequence(&png, None, false).unwrap());

        let commands: Vec<&str> = seq.split_terminator("\x1b\\").collect();
        assert_eq!(commands.len(), 3);
        assert!(commands[0].starts_with("\x1b_Ga=T,f=100,q=2,m=1;"));
        assert!(commands[1].starts_with("\x1b_Gm=1;"));
        assert_eq!(commands[2], "\x1b_Gm=0;AAAA");
        assert_eq!(commands[1].len(), "\x1b_Gm=1;".len() + CHUNK_SIZE);
    }

    #[test]
    fn test_tmux_wraps_and_doubles_escapes() {
        let seq = text(image_sequence(b"png", None, true).unwrap());
        assert_eq!(
            seq,
            "\x1bPtmux;\x1b\x1b_Ga=T,f=100,q=2,m=0;cG5n\x1b\x1b\\\x1b\\"
        );
    }

    #[test]
    fn test_empty_image_sends_nothing() {
        assert!(image_sequence(&[], Some(4), false).unwrap().is_empty());
    }

    #[test]
    fn test_fit_columns() {
        // 800px window over 100 columns: 8px cells.
        assert_eq!(fit_columns(160, 100, 800), Some(20));
        assert_eq!(fit_columns(161, 100, 800), Some(21));
        assert_eq!(fit_columns(4000, 100, 800), Some(100));
        assert_eq!(fit_columns(1, 100, 800), Some(1));
        assert_eq!(fit_columns(160, 100, 0), None);
        assert_eq!(fit_columns(160, 0, 800), None);
    }
}
