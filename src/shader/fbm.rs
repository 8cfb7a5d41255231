use crate::shader::noise::value_noise;
use glam::{Mat2, Vec2};

/// Octave recurrence for [`Fbm`].
///
/// Defaults reproduce the ink smoke look; they are tuning values, and the
/// tuning file can override each of them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FbmParams {
    pub octaves: u32,
    /// Weight of the first octave.
    pub amplitude: f32,
    /// Per-octave amplitude decay.
    pub gain: f32,
    /// Per-octave frequency multiplier.
    pub lacunarity: f32,
    /// Rotation between octaves, in radians.
    pub rotation: f32,
    /// Offset added after rotate-and-scale.
    pub shift: Vec2,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            octaves: 6,
            amplitude: 0.5,
            gain: 0.45,
            lacunarity: 2.1,
            rotation: 0.5,
            shift: Vec2::new(1.4, 2.3),
        }
    }
}

impl FbmParams {
    /// Sum of all octave weights; an upper bound on [`Fbm::sample`].
    pub fn total_gain(&self) -> f32 {
        let mut a = self.amplitude;
        let mut sum = 0.0;
        for _ in 0..self.octaves {
            sum += a;
            a *= self.gain;
        }
        sum
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Fbm {
    params: FbmParams,
    rot: Mat2,
}

impl Fbm {
    pub fn new(params: FbmParams) -> Self {
        Self {
            params,
            // Column-major mat2(cos, sin, -sin, cos).
            rot: Mat2::from_angle(params.rotation),
        }
    }

    pub fn params(&self) -> &FbmParams {
        &self.params
    }

    pub fn sample(&self, mut st: Vec2) -> f32 {
        let p = &self.params;
        let mut v = 0.0f32;
        let mut a = p.amplitude;
        for _ in 0..p.octaves {
            v += a * value_noise(st);
            st = self.rot * st * p.lacunarity + p.shift;
            a *= p.gain;
        }
        v
    }
}

impl Default for Fbm {
    fn default() -> Self {
        Self::new(FbmParams::default())
    }
}
