mod ascii;
mod halfblock;
mod kitty;

pub use ascii::AsciiRenderer;
pub use halfblock::HalfBlockRenderer;
pub use kitty::KittyRenderer;

use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    /// Pixels per terminal cell (columns, rows) this renderer expects.
    fn cell_pixels(&self) -> (usize, usize);
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

#[inline]
pub(crate) fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8) as u8
}

#[inline]
pub(crate) fn write_fg_rgb(out: &mut dyn Write, r: u8, g: u8, b: u8) -> anyhow::Result<()> {
    write!(out, "\x1b[38;2;{};{};{}m", r, g, b)?;
    Ok(())
}

pub(crate) fn write_hud_line(
    out: &mut dyn Write,
    row: usize,
    cols: usize,
    line: Option<&str>,
) -> anyhow::Result<()> {
    write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", row)?;
    if let Some(line) = line {
        let clipped: String = line.chars().take(cols).collect();
        write!(out, "{clipped}")?;
    }
    Ok(())
}

/// Validate a frame for a text renderer and emit the common preamble.
///
/// Returns `(cols, visual_rows, pixel_width, pixel_height)`, or `None` when
/// there is nothing to draw.
pub(crate) fn text_frame_begin(
    frame: &Frame<'_>,
    px_per_col: usize,
    px_per_row: usize,
    out: &mut dyn Write,
) -> anyhow::Result<Option<(usize, usize, usize, usize)>> {
    let cols = frame.term_cols as usize;
    let visual_rows = frame.visual_rows as usize;
    let w = frame.pixel_width;
    let h = frame.pixel_height;

    if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
        return Ok(None);
    }
    if w != cols.saturating_mul(px_per_col) || h != visual_rows.saturating_mul(px_per_row) {
        return Ok(None);
    }
    if frame.pixels_rgba.len() < w.saturating_mul(h).saturating_mul(4) {
        return Ok(None);
    }

    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    out.write_all(b"\x1b[H\x1b[0m")?;
    // Autowrap off while painting full-width rows.
    out.write_all(b"\x1b[?7l")?;
    Ok(Some((cols, visual_rows, w, h)))
}

pub(crate) fn text_frame_end(
    frame: &Frame<'_>,
    cols: usize,
    visual_rows: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut hud_lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write_hud_line(out, visual_rows + i + 1, cols, hud_lines.next())?;
    }

    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    out.write_all(b"\x1b[0m\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

/// Placement of the help card, in 1-based terminal cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupLayout {
    pub row: usize,
    pub col: usize,
    pub width: usize,
    pub title: String,
    pub body: Vec<String>,
}

/// Lay out overlay text as a card: the first line becomes the title in the
/// top border, the rest are `key  description` rows with the key column
/// aligned. Lines without a double-space separator are kept as they are.
///
/// Returns `None` when the terminal is too small to hold a card.
pub fn layout_popup(text: &str, term_cols: u16, term_rows: u16) -> Option<PopupLayout> {
    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 12 || rows < 4 {
        return None;
    }
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let title = lines.next()?.trim().to_string();

    let entries: Vec<(&str, &str)> = lines
        .map(|l| match l.split_once("  ") {
            Some((key, desc)) => (key.trim(), desc.trim()),
            None => ("", l.trim()),
        })
        .collect();
    let key_w = entries.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);

    // Border plus one space of padding each side.
    let max_inner = cols - 4;
    let body: Vec<String> = entries
        .iter()
        .map(|(key, desc)| {
            let line = if key.is_empty() {
                desc.to_string()
            } else {
                format!("{key:<key_w$}  {desc}")
            };
            line.chars().take(max_inner).collect()
        })
        .take(rows.saturating_sub(3))
        .collect();

    let inner = body
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count() + 2))
        .max()
        .unwrap_or(0)
        .min(max_inner);
    let width = inner + 4;
    let height = body.len() + 2;

    Some(PopupLayout {
        row: rows.saturating_sub(height) / 2 + 1,
        col: (cols - width) / 2 + 1,
        width,
        title: title.chars().take(inner.saturating_sub(2)).collect(),
        body,
    })
}

/// Draw the help card over whatever is on screen, in the smoke's own greys.
pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    let Some(card) = layout_popup(text, term_cols, term_rows) else {
        return Ok(());
    };
    let inner = card.width - 4;
    let rule = card.width - 2;

    out.write_all(b"\x1b[0m\x1b[38;2;196;196;200m\x1b[48;2;14;14;16m")?;
    let title_w = card.title.chars().count();
    write!(
        out,
        "\x1b[{};{}H\u{250c}\u{2500}\x1b[1m {} \x1b[22m{}\u{2510}",
        card.row,
        card.col,
        card.title,
        "\u{2500}".repeat(rule.saturating_sub(title_w + 3))
    )?;
    for (i, line) in card.body.iter().enumerate() {
        write!(
            out,
            "\x1b[{};{}H\u{2502} {:<inner$} \u{2502}",
            card.row + 1 + i,
            card.col,
            line
        )?;
    }
    write!(
        out,
        "\x1b[{};{}H\u{2514}{}\u{2518}",
        card.row + card.body.len() + 1,
        card.col,
        "\u{2500}".repeat(rule)
    )?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
