//! Optional key=value file that overrides the look constants.
//!
//! ```text
//! # slower, denser smoke
//! time.scale = 0.35
//! fbm.octaves = 7
//! fbm.shift = 1.4, 2.3
//! color.background = 0.10, 0.11, 0.13
//! color.density = 0.25, 0.85
//! ```
//!
//! Unlisted keys keep their defaults, which reproduce the reference look.

use crate::shader::{Band, FbmParams, InkPalette, InkSmoke, WarpParams};
use glam::{Vec2, Vec3};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TIME_SCALE: f32 = 0.5;
const MAX_OCTAVES: u32 = 16;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unknown key '{key}' at line {line}")]
    UnknownKey { line: usize, key: String },
    #[error("duplicate key '{key}' at line {line}")]
    Duplicate { line: usize, key: String },
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    pub fbm: FbmParams,
    pub warp: WarpParams,
    pub palette: InkPalette,
    /// Multiplier from wall-clock seconds to shader time.
    pub time_scale: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fbm: FbmParams::default(),
            warp: WarpParams::default(),
            palette: InkPalette::default(),
            time_scale: DEFAULT_TIME_SCALE,
        }
    }
}

impl Tuning {
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let text = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, TuningError> {
        let mut t = Self::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (line_idx, raw) in text.lines().enumerate() {
            let line = line_idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or(TuningError::Parse {
                line,
                message: "expected <key>=<value>".to_string(),
            })?;
            let key = key.trim();
            let value = value.trim();
            if !seen.insert(key.to_string()) {
                return Err(TuningError::Duplicate {
                    line,
                    key: key.to_string(),
                });
            }

            match key {
                "time.scale" => t.time_scale = parse_f32(value, line)?,
                "fbm.octaves" => t.fbm.octaves = parse_u32(value, line)?,
                "fbm.amplitude" => t.fbm.amplitude = parse_f32(value, line)?,
                "fbm.gain" => t.fbm.gain = parse_f32(value, line)?,
                "fbm.lacunarity" => t.fbm.lacunarity = parse_f32(value, line)?,
                "fbm.rotation" => t.fbm.rotation = parse_f32(value, line)?,
                "fbm.shift" => t.fbm.shift = parse_vec2(value, line)?,
                "warp.q_rate" => t.warp.q_rate = parse_f32(value, line)?,
                "warp.q_offset" => t.warp.q_offset = parse_vec2(value, line)?,
                "warp.q_strength" => t.warp.q_strength = parse_f32(value, line)?,
                "warp.r1_offset" => t.warp.r_offsets[0] = parse_vec2(value, line)?,
                "warp.r2_offset" => t.warp.r_offsets[1] = parse_vec2(value, line)?,
                "warp.r1_rate" => t.warp.r_rates[0] = parse_f32(value, line)?,
                "warp.r2_rate" => t.warp.r_rates[1] = parse_f32(value, line)?,
                "color.background" => t.palette.background = parse_vec3(value, line)?,
                "color.ink" => t.palette.ink = parse_vec3(value, line)?,
                "color.highlight" => t.palette.highlight = parse_vec3(value, line)?,
                "color.density" => t.palette.density = parse_band(value, line)?,
                "color.highlight_band" => t.palette.highlight_band = parse_band(value, line)?,
                "color.vignette" => t.palette.vignette = parse_band(value, line)?,
                "color.exposure" => t.palette.exposure = parse_f32(value, line)?,
                _ => {
                    return Err(TuningError::UnknownKey {
                        line,
                        key: key.to_string(),
                    });
                }
            }
        }

        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.fbm.octaves == 0 || self.fbm.octaves > MAX_OCTAVES {
            return Err(invalid(
                "fbm.octaves",
                format!("must be in 1..={MAX_OCTAVES}, got {}", self.fbm.octaves),
            ));
        }
        if !(0.0..1.0).contains(&self.fbm.gain) {
            return Err(invalid(
                "fbm.gain",
                format!("must be in [0, 1) to keep the sum bounded, got {}", self.fbm.gain),
            ));
        }
        if self.fbm.amplitude <= 0.0 {
            return Err(invalid("fbm.amplitude", "must be > 0".to_string()));
        }
        if self.fbm.lacunarity <= 0.0 {
            return Err(invalid("fbm.lacunarity", "must be > 0".to_string()));
        }
        if self.time_scale < 0.0 {
            return Err(invalid("time.scale", "must be >= 0".to_string()));
        }
        if self.palette.exposure < 0.0 {
            return Err(invalid("color.exposure", "must be >= 0".to_string()));
        }
        for (field, band) in [
            ("color.density", self.palette.density),
            ("color.highlight_band", self.palette.highlight_band),
            ("color.vignette", self.palette.vignette),
        ] {
            if band.lo >= band.hi {
                return Err(invalid(
                    field,
                    format!("lower edge {} must be below upper edge {}", band.lo, band.hi),
                ));
            }
        }
        Ok(())
    }

    pub fn shader(&self) -> InkSmoke {
        InkSmoke::new(self.fbm, self.warp, self.palette)
    }
}

fn invalid(field: &'static str, message: String) -> TuningError {
    TuningError::InvalidValue { field, message }
}

fn parse_f32(raw: &str, line: usize) -> Result<f32, TuningError> {
    let v = raw.parse::<f32>().map_err(|_| TuningError::Parse {
        line,
        message: format!("expected a number, got '{raw}'"),
    })?;
    if !v.is_finite() {
        return Err(TuningError::Parse {
            line,
            message: format!("expected a finite number, got '{raw}'"),
        });
    }
    Ok(v)
}

fn parse_u32(raw: &str, line: usize) -> Result<u32, TuningError> {
    raw.parse::<u32>().map_err(|_| TuningError::Parse {
        line,
        message: format!("expected an unsigned integer, got '{raw}'"),
    })
}

fn parse_csv<const N: usize>(raw: &str, line: usize) -> Result<[f32; N], TuningError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(TuningError::Parse {
            line,
            message: format!("expected {N} comma-separated numbers, got {}", parts.len()),
        });
    }
    let mut out = [0.0f32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = parse_f32(part, line)?;
    }
    Ok(out)
}

fn parse_vec2(raw: &str, line: usize) -> Result<Vec2, TuningError> {
    parse_csv::<2>(raw, line).map(Vec2::from_array)
}

fn parse_vec3(raw: &str, line: usize) -> Result<Vec3, TuningError> {
    parse_csv::<3>(raw, line).map(Vec3::from_array)
}

fn parse_band(raw: &str, line: usize) -> Result<Band, TuningError> {
    parse_csv::<2>(raw, line).map(|[lo, hi]| Band::new(lo, hi))
}
