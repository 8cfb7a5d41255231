use crate::shader::fbm::Fbm;
use glam::{vec2, Vec2};

/// Offsets and time rates of the two-level warp.
///
/// Time advances the three fbm lookups at different rates so the warp fields
/// never drift in lockstep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarpParams {
    pub q_rate: f32,
    pub q_offset: Vec2,
    /// How far `q` pushes the second-level lookups.
    pub q_strength: f32,
    pub r_offsets: [Vec2; 2],
    pub r_rates: [f32; 2],
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            q_rate: 0.05,
            q_offset: Vec2::ONE,
            q_strength: 1.0,
            r_offsets: [Vec2::new(1.7, 9.2), Vec2::new(8.3, 2.8)],
            r_rates: [0.15, 0.126],
        }
    }
}

/// Intermediate and final fields of one warp evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarpSample {
    pub q: Vec2,
    pub r: Vec2,
    pub f: f32,
}

pub fn domain_warp(fbm: &Fbm, params: &WarpParams, st: Vec2, t: f32) -> WarpSample {
    let q = vec2(
        fbm.sample(st + params.q_rate * t),
        fbm.sample(st + params.q_offset),
    );

    let warped = st + params.q_strength * q;
    let r = vec2(
        fbm.sample(warped + params.r_offsets[0] + params.r_rates[0] * t),
        fbm.sample(warped + params.r_offsets[1] + params.r_rates[1] * t),
    );

    let f = fbm.sample(st + r);
    WarpSample { q, r, f }
}
