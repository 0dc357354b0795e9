//! Video self-test.
use std::time::Duration;

use crate::{clock::Clock, display::Framebuffer, error::OutOfBounds};

/// Sweeping pixel inversion pattern used to check a display end to end.
///
/// Each step inverts one pixel and moves the cursor along the row. When the
/// cursor runs off the bottom of the grid, the whole grid is inverted and the
/// pattern switches to its other phase.
pub struct InversionPattern {
    ix: usize,
    iy: usize,
    phase: Phase,
    clock: Clock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Every second column of every second row.
    One,
    /// Every column of every third row, at double speed.
    Two,
}

impl Phase {
    fn increments(self) -> (usize, usize) {
        match self {
            Self::One => (2, 2),
            Self::Two => (1, 3),
        }
    }

    fn interval(self) -> Duration {
        match self {
            Self::One => Duration::from_micros(200),
            Self::Two => Duration::from_micros(100),
        }
    }
}

impl InversionPattern {
    pub fn new() -> Self {
        Self {
            ix: 0,
            iy: 0,
            phase: Phase::One,
            clock: Clock::new(Phase::One.interval()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.ix, self.iy)
    }

    /// Advance the pattern by the elapsed time.
    ///
    /// Returns the number of steps taken.
    pub fn advance(
        &mut self,
        delta: Duration,
        display: &mut Framebuffer,
    ) -> Result<usize, OutOfBounds> {
        self.clock.advance(delta);

        let mut steps = 0;
        while self.clock.tick() {
            self.step(display)?;
            steps += 1;
        }

        Ok(steps)
    }

    /// Invert the pixel under the cursor, and move on.
    pub fn step(&mut self, display: &mut Framebuffer) -> Result<(), OutOfBounds> {
        let (x_inc, y_inc) = self.phase.increments();

        // Cursor may be stale after a mode change.
        let result = display.invert_pixel(self.ix, self.iy);

        self.ix += x_inc;
        if self.ix >= display.width() {
            self.ix = 0;
            self.iy += y_inc;
        }

        if self.iy >= display.height() {
            self.iy = 0;
            display.invert_all();
            self.phase = match self.phase {
                Phase::One => Phase::Two,
                Phase::Two => Phase::One,
            };
            self.clock.set_period(self.phase.interval());
        }

        result
    }
}

impl Default for InversionPattern {
    fn default() -> Self {
        Self::new()
    }
}
