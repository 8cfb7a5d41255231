//! Frame clock and resolution snapshots.
//!
//! The driver is the only writer of time and resolution. Both change strictly
//! between frames: `request_resize` only records a pending size, and
//! `begin_frame` applies it as one (width, height) pair before the frame's
//! uniforms are built.

use crate::shader::Uniforms;
use glam::Vec2;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Accumulates scaled shader time. Never runs backwards.
#[derive(Clone, Debug)]
pub struct FrameClock {
    last: Option<Instant>,
    time: f64,
    time_scale: f32,
    speed: f32,
    paused: bool,
}

impl FrameClock {
    pub fn new(time_scale: f32) -> Self {
        Self {
            last: None,
            time: 0.0,
            time_scale: time_scale.max(0.0),
            speed: 1.0,
            paused: false,
        }
    }

    /// Advance to `now` and return the shader time.
    pub fn tick(&mut self, now: Instant) -> f32 {
        if let Some(last) = self.last {
            let dt = now.saturating_duration_since(last);
            self.advance(dt);
        }
        self.last = Some(now);
        self.time as f32
    }

    /// Advance by a fixed wall-clock step; used by offline rendering.
    pub fn advance(&mut self, dt: Duration) {
        if !self.paused {
            self.time += dt.as_secs_f64() * f64::from(self.time_scale) * f64::from(self.speed);
        }
    }

    pub fn time(&self) -> f32 {
        self.time as f32
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(0.0, 8.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }
}

/// What the renderer gets for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    pub index: u64,
    pub resolution: Resolution,
    /// A pending resize was applied at the start of this frame.
    pub resized: bool,
    /// `None` when the resolution is degenerate; the frame is skipped.
    pub uniforms: Option<Uniforms>,
}

#[derive(Clone, Debug)]
pub struct FrameDriver {
    clock: FrameClock,
    resolution: Resolution,
    pending: Option<Resolution>,
    frames: u64,
}

impl FrameDriver {
    pub fn new(clock: FrameClock, initial: Resolution) -> Self {
        Self {
            clock,
            resolution: Resolution::default(),
            pending: Some(initial),
            frames: 0,
        }
    }

    /// Record a new surface size. Takes effect at the next `begin_frame`.
    pub fn request_resize(&mut self, width: usize, height: usize) {
        self.pending = Some(Resolution::new(width, height));
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn begin_frame(&mut self, now: Instant) -> FrameTick {
        let time = self.clock.tick(now);
        self.finish_begin(time)
    }

    /// Like `begin_frame`, but advances the clock by a fixed step instead of
    /// reading the wall clock.
    pub fn begin_frame_fixed(&mut self, dt: Duration) -> FrameTick {
        if self.frames > 0 {
            self.clock.advance(dt);
        }
        let time = self.clock.time();
        self.finish_begin(time)
    }

    fn finish_begin(&mut self, time: f32) -> FrameTick {
        let mut resized = false;
        if let Some(next) = self.pending.take() {
            if next != self.resolution {
                debug!(
                    from_w = self.resolution.width,
                    from_h = self.resolution.height,
                    to_w = next.width,
                    to_h = next.height,
                    "apply resize"
                );
                self.resolution = next;
                resized = true;
            }
        }

        let uniforms = if self.resolution.is_degenerate() {
            None
        } else {
            Uniforms::new(time, self.resolution.as_vec2())
        };

        let tick = FrameTick {
            index: self.frames,
            resolution: self.resolution,
            resized,
            uniforms,
        };
        self.frames += 1;
        tick
    }
}
