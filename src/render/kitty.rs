use crate::render::{draw_overlay_popup, write_hud_line, Frame, Renderer};
use anyhow::{Context, anyhow};
use base64::Engine;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KittyTransport {
    /// Pixels go to a temp file; the payload carries its path.
    File,
    /// Pixels inline, base64-chunked.
    Direct,
}

impl KittyTransport {
    fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Direct => "direct",
        }
    }
}

/// Real pixels via the Kitty graphics protocol, scaled by the terminal to the
/// visual area.
pub struct KittyRenderer {
    image_id: u32,
    density: usize,
    temp_path: PathBuf,
    temp_payload_b64: String,
    transports: Vec<KittyTransport>,
    active_transport_idx: usize,
    b64_buf: Vec<u8>,
    overlay_visible_last: bool,
    last_hud_rows: u16,
}

impl KittyRenderer {
    /// `density` is pixels per cell column; rows get twice as many.
    pub fn new(density: usize) -> Self {
        let pid = std::process::id();
        let temp_path = std::env::temp_dir().join(format!("ink-smoke-{pid}.rgba"));
        let temp_payload_b64 = base64::engine::general_purpose::STANDARD
            .encode(temp_path.to_string_lossy().as_bytes());

        Self {
            image_id: 1,
            density: density.clamp(1, 2),
            temp_path,
            temp_payload_b64,
            transports: pick_transport_chain(),
            active_transport_idx: 0,
            b64_buf: Vec::new(),
            overlay_visible_last: false,
            last_hud_rows: 0,
        }
    }

    fn write_frame_with_transport(
        &mut self,
        transport: KittyTransport,
        frame: &Frame<'_>,
        out: &mut dyn Write,
        cols: usize,
        visual_rows: usize,
    ) -> anyhow::Result<()> {
        let (w, h) = (frame.pixel_width, frame.pixel_height);
        match transport {
            KittyTransport::Direct => write_kitty_direct_rgba(
                out,
                frame.pixels_rgba,
                (w, h),
                (cols, visual_rows),
                self.image_id,
                &mut self.b64_buf,
            ),
            KittyTransport::File => {
                // Not an io::Error, so the transport loop falls back.
                fs::write(&self.temp_path, frame.pixels_rgba).map_err(|e| {
                    anyhow!("write kitty temp file {}: {e}", self.temp_path.display())
                })?;
                write!(
                    out,
                    "\x1b_Ga=T,f=32,s={},v={},t=f,i={},p=1,c={},r={},C=1,q=2,z=-1;{}\x1b\\",
                    w, h, self.image_id, cols, visual_rows, self.temp_payload_b64
                )?;
                Ok(())
            }
        }
    }
}

impl Renderer for KittyRenderer {
    fn name(&self) -> &'static str {
        "kitty"
    }

    fn cell_pixels(&self) -> (usize, usize) {
        (self.density, self.density * 2)
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let w = frame.pixel_width;
        let h = frame.pixel_height;

        if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }
        if frame.pixels_rgba.len() < w.saturating_mul(h).saturating_mul(4) {
            return Ok(());
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }

        if let Some(text) = frame.overlay {
            // Images sit above text; drop the image so the popup is readable.
            write!(out, "\x1b_Ga=d,d=I,i={}\x1b\\", self.image_id)?;
            clear_text_rows(out, frame.term_rows as usize)?;
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
            self.overlay_visible_last = true;
        } else {
            out.write_all(b"\x1b[H")?;
            if self.overlay_visible_last {
                clear_text_rows(out, visual_rows)?;
            }

            let start = self
                .active_transport_idx
                .min(self.transports.len().saturating_sub(1));
            let mut rendered = false;
            let mut last_err: Option<anyhow::Error> = None;
            for step in 0..self.transports.len() {
                let idx = (start + step) % self.transports.len();
                let transport = self.transports[idx];
                match self.write_frame_with_transport(transport, frame, out, cols, visual_rows) {
                    Ok(()) => {
                        if idx != self.active_transport_idx {
                            warn!(transport = transport.label(), "kitty transport fallback");
                        }
                        self.active_transport_idx = idx;
                        rendered = true;
                        break;
                    }
                    Err(err) => {
                        // Terminal I/O failures are not transport-specific.
                        if err.downcast_ref::<std::io::Error>().is_some() {
                            return Err(err);
                        }
                        last_err = Some(err.context(format!(
                            "kitty transport '{}' failed",
                            transport.label()
                        )));
                    }
                }
            }
            if !rendered {
                return Err(last_err.unwrap_or_else(|| anyhow!("no kitty transport succeeded")));
            }
            self.overlay_visible_last = false;
        }

        if frame.hud_rows != self.last_hud_rows {
            clear_text_rows(out, frame.term_rows as usize)?;
        }
        let mut hud_lines = frame.hud.lines();
        for i in 0..(frame.hud_rows as usize) {
            write_hud_line(out, visual_rows + i + 1, cols, hud_lines.next())?;
        }
        self.last_hud_rows = frame.hud_rows;

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for KittyRenderer {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}

fn pick_transport_chain() -> Vec<KittyTransport> {
    if let Ok(v) = std::env::var("INK_SMOKE_KITTY_TRANSPORT") {
        match v.trim().to_ascii_lowercase().as_str() {
            "direct" | "d" => return vec![KittyTransport::Direct],
            "file" | "f" | "temp" => return vec![KittyTransport::File],
            _ => {}
        }
    }
    vec![KittyTransport::Direct, KittyTransport::File]
}

fn write_kitty_direct_rgba(
    out: &mut dyn Write,
    rgba: &[u8],
    (w, h): (usize, usize),
    (cols, rows): (usize, usize),
    image_id: u32,
    b64_buf: &mut Vec<u8>,
) -> anyhow::Result<()> {
    // Multiple of 3 so every chunk but the last encodes without padding.
    const RAW_CHUNK: usize = 3 * 1024;

    if rgba.is_empty() {
        return Ok(());
    }

    let chunks = rgba.chunks(RAW_CHUNK);
    let count = chunks.len();
    for (i, chunk) in chunks.enumerate() {
        let b64_len = chunk.len().div_ceil(3) * 4;
        if b64_buf.len() < b64_len {
            b64_buf.resize(b64_len, 0);
        }
        let written = base64::engine::general_purpose::STANDARD
            .encode_slice(chunk, &mut b64_buf[..b64_len])
            .context("base64 encode pixels")?;

        let more = u8::from(i + 1 < count);
        if i == 0 {
            write!(
                out,
                "\x1b_Ga=T,f=32,s={},v={},t=d,i={},p=1,c={},r={},C=1,q=2,z=-1,m={};",
                w, h, image_id, cols, rows, more
            )?;
        } else {
            write!(out, "\x1b_Gm={};", more)?;
        }
        out.write_all(&b64_buf[..written])?;
        out.write_all(b"\x1b\\")?;
    }
    Ok(())
}

fn clear_text_rows(out: &mut dyn Write, rows: usize) -> anyhow::Result<()> {
    for row in 1..=rows {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", row)?;
    }
    Ok(())
}
