use crate::config::RendererMode;
use anyhow::Context;
use crossterm::{cursor, queue, terminal};
use std::io::{stdout, Stdout, Write};

const WINDOW_TITLE: &str = "ink smoke";

/// Owns the terminal while the smoke is on screen: raw mode, alternate
/// screen, hidden cursor. Everything is undone on drop, including any Kitty
/// image still placed when the renderer was Kitty.
pub struct TerminalGuard {
    kitty_images: bool,
}

impl TerminalGuard {
    pub fn enter(mode: RendererMode) -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Raw mode is on; from here Drop must run even if setup fails.
        let guard = Self {
            kitty_images: mode == RendererMode::Kitty,
        };

        let mut out = stdout();
        queue!(
            out,
            terminal::EnterAlternateScreen,
            terminal::SetTitle(WINDOW_TITLE),
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide,
            cursor::MoveTo(0, 0),
        )
        .context("prepare alternate screen")?;
        out.flush().context("flush terminal setup")?;

        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }
}

/// Bytes written on exit, before leaving the alternate screen: end any open
/// synchronized update, turn autowrap back on and reset colours.
pub fn restore_sequence(kitty_images: bool) -> Vec<u8> {
    let mut seq = Vec::with_capacity(32);
    if kitty_images {
        seq.extend_from_slice(b"\x1b_Ga=d,d=A\x1b\\");
    }
    seq.extend_from_slice(b"\x1b[?2026l\x1b[?7h\x1b[0m");
    seq
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        let _ = out.write_all(&restore_sequence(self.kitty_images));
        let _ = queue!(out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = out.flush();
    }
}
