//! Text terminal presentation.
use std::{
    fmt::Write as FmtWrite,
    io::Write,
    time::{Duration, Instant},
};

use chp8::prelude::*;

/// Draws frames as text, with a fixed set of held keys.
///
/// The surface closes by itself once the optional run time is over.
pub struct TerminalDevices<W: Write> {
    out: W,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    key_state: u16,
    deadline: Option<Instant>,
    frames: usize,
}

impl<W: Write> TerminalDevices<W> {
    pub fn new(out: W, run_for: Option<Duration>) -> Self {
        Self {
            out,
            key_state: 0,
            deadline: run_for.map(|duration| Instant::now() + duration),
            frames: 0,
        }
    }

    pub fn hold_key(&mut self, key: KeyCode) {
        self.key_state |= 1 << key.as_u8();
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    fn render(display: &Framebuffer) -> String {
        // Two pixel rows per text line, so the screen keeps its aspect.
        let mut buf = String::new();
        let rows = display.rows().collect::<Vec<_>>();

        for pair in rows.chunks(2) {
            let top = pair[0];
            let bottom = pair.get(1).copied();

            for (x, upper) in top.iter().enumerate() {
                let lower = bottom.map(|row| row[x]).unwrap_or(false);
                buf.push(match (*upper, lower) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            buf.push('\n');
        }

        buf
    }
}

impl<W: Write> Devices for TerminalDevices<W> {
    fn is_pressed(&self, key: KeyCode) -> bool {
        self.key_state & (1 << key.as_u8()) != 0
    }

    fn draw(&mut self, display: &Framebuffer) {
        let mut frame = String::new();
        // Move the cursor home and clear, then draw.
        if write!(frame, "\x1B[H\x1B[2J{}", Self::render(display)).is_err() {
            return;
        }

        if let Err(err) = self.out.write_all(frame.as_bytes()).and_then(|_| self.out.flush()) {
            log::warn!("failed to draw frame: {err}");
        }
        self.frames += 1;
    }

    fn is_open(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() < deadline,
            None => true,
        }
    }
}
