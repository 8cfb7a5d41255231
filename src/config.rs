use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "ink-smoke", version, about = "Animated ink smoke background for the terminal")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    #[arg(long, value_enum, default_value_t = Quality::High)]
    pub quality: Quality,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub adaptive_quality: bool,

    /// Kitty pixels per cell multiplier (clamped to 1..=2).
    #[arg(long, default_value_t = 2)]
    pub density: u8,

    /// Wall-clock seconds to shader time; overrides the tuning file.
    #[arg(long)]
    pub time_scale: Option<f32>,

    /// Key=value file overriding the look constants.
    #[arg(long, value_name = "FILE")]
    pub tuning: Option<PathBuf>,

    /// Write tracing output here (the terminal itself is owned by the renderer).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value_t = false)]
    pub no_hud: bool,
}

impl Config {
    pub fn density(&self) -> usize {
        self.density.clamp(1, 2) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    Kitty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quality {
    High,
    Balanced,
    Fast,
}

impl Quality {
    pub fn lower(self) -> Self {
        match self {
            Self::High => Self::Balanced,
            Self::Balanced => Self::Fast,
            Self::Fast => Self::Fast,
        }
    }

    pub fn higher(self) -> Self {
        match self {
            Self::Fast => Self::Balanced,
            Self::Balanced => Self::High,
            Self::High => Self::High,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Self::Fast => 0,
            Self::Balanced => 1,
            Self::High => 2,
        }
    }
}
