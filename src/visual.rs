use crate::config::Quality;
use crate::shader::{to_rgba8, InkSmoke, Uniforms};
use glam::Vec2;
use rayon::prelude::*;

/// Evaluates the ink smoke pipeline into an RGBA8 buffer.
///
/// Rows are filled in parallel; each pixel only reads the frame's
/// [`Uniforms`] and the immutable shader, so no synchronization is needed.
pub struct SmokeEngine {
    shader: InkSmoke,
    pixels: Vec<u8>,
    w: usize,
    h: usize,
}

impl SmokeEngine {
    pub fn new(shader: InkSmoke) -> Self {
        Self {
            shader,
            pixels: Vec::new(),
            w: 0,
            h: 0,
        }
    }

    pub fn shader(&self) -> &InkSmoke {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut InkSmoke {
        &mut self.shader
    }

    pub fn size(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        let n = w.saturating_mul(h).saturating_mul(4);
        self.pixels.clear();
        self.pixels.resize(n, 0);
    }

    /// Render one frame. `scale` > 1 evaluates one pixel per `scale`x`scale`
    /// block and replicates it.
    ///
    /// Returns `None` (and leaves the buffer untouched) when the uniforms do
    /// not describe the buffer this engine was sized for.
    pub fn render(&mut self, uniforms: &Uniforms, scale: usize) -> Option<&[u8]> {
        let (w, h) = (self.w, self.h);
        if w == 0 || h == 0 {
            return None;
        }
        if uniforms.resolution() != Vec2::new(w as f32, h as f32) {
            return None;
        }

        let scale = scale.max(1);
        let shader = &self.shader;
        let band_len = w * 4 * scale;

        self.pixels
            .par_chunks_mut(band_len)
            .enumerate()
            .for_each(|(band, rows)| {
                let by = band * scale;
                let band_rows = rows.len() / (w * 4);
                // Buffer rows run top-down; GL fragment y runs bottom-up.
                let frag_y = (h - 1 - by) as f32 + 0.5;
                for bx in (0..w).step_by(scale) {
                    let frag = Vec2::new(bx as f32 + 0.5, frag_y);
                    let rgba = to_rgba8(shader.shade(uniforms, frag));
                    for dy in 0..band_rows {
                        let row = &mut rows[dy * w * 4..(dy + 1) * w * 4];
                        for x in bx..(bx + scale).min(w) {
                            row[x * 4..x * 4 + 4].copy_from_slice(&rgba);
                        }
                    }
                }
            });

        Some(&self.pixels)
    }
}

/// Block size used for a quality level.
pub fn quality_scale(q: Quality) -> usize {
    match q {
        Quality::High => 1,
        Quality::Balanced => 2,
        Quality::Fast => 3,
    }
}
