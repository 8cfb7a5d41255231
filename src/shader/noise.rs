use glam::{vec2, Vec2};

const HASH_DIR: Vec2 = Vec2::new(12.9898, 78.233);
const HASH_SCALE: f32 = 43_758.547;

/// GL-style `fract`: `x - floor(x)`, always in `[0, 1)`.
///
/// `f32::fract` keeps the sign of its input, which is not what shader code
/// expects for negative arguments.
#[inline]
pub fn fract_gl(x: f32) -> f32 {
    let f = x - x.floor();
    // Tiny negative inputs round up to exactly 1.0.
    if f >= 1.0 { 0.0 } else { f }
}

/// Sine hash over the plane. Deterministic, in `[0, 1)`.
#[inline]
pub fn random(st: Vec2) -> f32 {
    fract_gl(st.dot(HASH_DIR).sin() * HASH_SCALE)
}

#[inline]
fn quintic(f: Vec2) -> Vec2 {
    f * f * f * (f * (f * 6.0 - 15.0) + 10.0)
}

/// Value noise on the unit lattice, blended with the quintic fade curve so the
/// field is C2 across cell edges.
pub fn value_noise(st: Vec2) -> f32 {
    let i = st.floor();
    let f = st - i;
    let u = quintic(f);

    let a = random(i);
    let b = random(i + vec2(1.0, 0.0));
    let c = random(i + vec2(0.0, 1.0));
    let d = random(i + vec2(1.0, 1.0));

    a + (b - a) * u.x + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y
}
