use glam::{Vec2, Vec3, Vec4};

/// Cubic Hermite step with clamping, as in GLSL.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Lower and upper edge of a [`smoothstep`] band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub lo: f32,
    pub hi: f32,
}

impl Band {
    pub const fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn step(self, x: f32) -> f32 {
        smoothstep(self.lo, self.hi, x)
    }
}

/// Two-tone ink look: dark grey paper, black ink, a faint highlight riding on
/// the second warp field and a radial vignette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InkPalette {
    pub background: Vec3,
    pub ink: Vec3,
    pub highlight: Vec3,
    /// Field range over which paper turns into ink.
    pub density: Band,
    /// `r.x` range over which the highlight fades in.
    pub highlight_band: Band,
    /// Distance from the centre over which the vignette darkens.
    pub vignette: Band,
    /// Final linear gain. 1.0 leaves the composition untouched.
    pub exposure: f32,
}

impl Default for InkPalette {
    fn default() -> Self {
        Self {
            background: Vec3::splat(0.12),
            ink: Vec3::ZERO,
            highlight: Vec3::splat(0.05),
            density: Band::new(0.2, 0.9),
            highlight_band: Band::new(0.4, 0.6),
            vignette: Band::new(0.5, 1.5),
            exposure: 1.0,
        }
    }
}

impl InkPalette {
    pub fn vignette_factor(&self, uv: Vec2) -> f32 {
        1.0 - self.vignette.step((uv - Vec2::splat(0.5)).length())
    }

    /// Colour for final field `f`, second warp vector `r` and surface uv.
    pub fn shade(&self, f: f32, r: Vec2, uv: Vec2) -> Vec4 {
        let mix_val = self.density.step(f);
        let mut color = self.background.lerp(self.ink, mix_val);
        color += Vec3::ZERO.lerp(self.highlight, self.highlight_band.step(r.x));
        color *= self.vignette_factor(uv);
        color *= self.exposure;
        color.extend(1.0)
    }
}

/// Quantize a linear colour to RGBA8.
#[inline]
pub fn to_rgba8(c: Vec4) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(c.x), q(c.y), q(c.z), q(c.w)]
}
