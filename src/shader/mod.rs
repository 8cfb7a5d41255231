//! The ink smoke fragment pipeline: noise -> fbm -> domain warp -> colour.
//!
//! Everything here is a pure function of (fragment coordinate, time,
//! resolution). Callers hand in a [`Uniforms`] snapshot per frame and may
//! evaluate pixels in any order or in parallel.

pub mod color;
pub mod fbm;
pub mod noise;
pub mod warp;

use glam::{Vec2, Vec4};

pub use color::{smoothstep, to_rgba8, Band, InkPalette};
pub use fbm::{Fbm, FbmParams};
pub use noise::{random, value_noise};
pub use warp::{domain_warp, WarpParams, WarpSample};

/// Per-frame values shared by every pixel evaluation.
///
/// Only constructible for a non-degenerate resolution, so the aspect
/// correction in [`InkSmoke::screen_coord`] never divides by zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Uniforms {
    time: f32,
    resolution: Vec2,
}

impl Uniforms {
    pub fn new(time: f32, resolution: Vec2) -> Option<Self> {
        let ok = resolution.x.is_finite()
            && resolution.y.is_finite()
            && resolution.x > 0.0
            && resolution.y > 0.0;
        ok.then_some(Self { time, resolution })
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    pub fn aspect(&self) -> f32 {
        self.resolution.x / self.resolution.y
    }
}

/// Everything computed for one pixel, kept for inspection and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelSample {
    pub st: Vec2,
    pub uv: Vec2,
    pub warp: WarpSample,
    pub color: Vec4,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InkSmoke {
    fbm: Fbm,
    warp: WarpParams,
    palette: InkPalette,
}

impl InkSmoke {
    pub fn new(fbm: FbmParams, warp: WarpParams, palette: InkPalette) -> Self {
        Self {
            fbm: Fbm::new(fbm),
            warp,
            palette,
        }
    }

    pub fn fbm(&self) -> &Fbm {
        &self.fbm
    }

    pub fn warp_params(&self) -> &WarpParams {
        &self.warp
    }

    pub fn palette(&self) -> &InkPalette {
        &self.palette
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.palette.exposure = exposure.max(0.0);
    }

    /// Aspect-corrected screen coordinate: y in [0, 1], x scaled by width/height.
    pub fn screen_coord(u: &Uniforms, frag_coord: Vec2) -> Vec2 {
        let mut st = frag_coord / u.resolution;
        st.x *= u.aspect();
        st
    }

    /// Full evaluation for one fragment. `frag_coord` is in device pixels with
    /// a bottom-left origin.
    pub fn evaluate(&self, u: &Uniforms, frag_coord: Vec2) -> PixelSample {
        let st = Self::screen_coord(u, frag_coord);
        let uv = frag_coord / u.resolution;
        let warp = domain_warp(&self.fbm, &self.warp, st, u.time);
        let color = self.palette.shade(warp.f, warp.r, uv);
        PixelSample {
            st,
            uv,
            warp,
            color,
        }
    }

    #[inline]
    pub fn shade(&self, u: &Uniforms, frag_coord: Vec2) -> Vec4 {
        self.evaluate(u, frag_coord).color
    }

    /// `render(time, resolution, coord) -> color`; `None` for a degenerate
    /// resolution.
    pub fn render(&self, time: f32, resolution: Vec2, frag_coord: Vec2) -> Option<Vec4> {
        let u = Uniforms::new(time, resolution)?;
        Some(self.shade(&u, frag_coord))
    }
}
