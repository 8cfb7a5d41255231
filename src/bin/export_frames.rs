use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use ink_smoke::driver::{FrameClock, FrameDriver, Resolution};
use ink_smoke::tuning::Tuning;
use ink_smoke::visual::SmokeEngine;
use tracing::{debug, info};

const DEFAULT_PPM_DIR: &str = "frames";
const DEFAULT_MP4: &str = "ink_smoke.mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    /// Numbered binary PPM (P6) files in a directory.
    Ppm,
    /// H.264 video through ffmpeg.
    Mp4,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "export_frames",
    version,
    about = "Render the ink smoke offline to a PPM sequence or an MP4"
)]
pub(crate) struct Cli {
    /// Output directory (ppm) or file (mp4).
    #[arg(long, value_name = "PATH")]
    pub(crate) out: Option<PathBuf>,

    #[arg(long, default_value_t = 640)]
    pub(crate) width: usize,

    #[arg(long, default_value_t = 360)]
    pub(crate) height: usize,

    #[arg(long, default_value_t = 30)]
    pub(crate) fps: u32,

    #[arg(long, value_name = "SECONDS", default_value_t = 5.0)]
    pub(crate) duration: f32,

    /// Wall-clock seconds to skip before the first frame.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub(crate) start: f32,

    #[arg(long, value_enum, default_value_t = FormatArg::Ppm)]
    pub(crate) format: FormatArg,

    #[arg(long, value_name = "FILE")]
    pub(crate) tuning: Option<PathBuf>,
}

impl Cli {
    pub(crate) fn output_path(&self) -> PathBuf {
        match (&self.out, self.format) {
            (Some(p), _) => p.clone(),
            (None, FormatArg::Ppm) => PathBuf::from(DEFAULT_PPM_DIR),
            (None, FormatArg::Mp4) => PathBuf::from(DEFAULT_MP4),
        }
    }
}

pub(crate) fn compute_frame_count(duration_s: f32, fps: u32) -> usize {
    ((duration_s.max(0.0) * fps as f32).floor() as usize).max(1)
}

pub(crate) fn validate_args(args: &Cli) -> Result<()> {
    if args.width == 0 {
        bail!("--width must be >= 1");
    }
    if args.height == 0 {
        bail!("--height must be >= 1");
    }
    if args.fps == 0 {
        bail!("--fps must be >= 1");
    }
    if !args.duration.is_finite() || args.duration <= 0.0 {
        bail!("--duration must be > 0 seconds");
    }
    if !args.start.is_finite() || args.start < 0.0 {
        bail!("--start must be >= 0 seconds");
    }
    start_offset(args)?;
    if args.format == FormatArg::Mp4 && (args.width % 2 != 0 || args.height % 2 != 0) {
        bail!(
            "--width and --height must be even for mp4 (yuv420p), got {}x{}",
            args.width,
            args.height
        );
    }
    Ok(())
}

/// `--start` as a clock step; rejects values a `Duration` cannot hold.
pub(crate) fn start_offset(args: &Cli) -> Result<Duration> {
    Duration::try_from_secs_f32(args.start)
        .map_err(|e| anyhow!("--start {} is out of range: {e}", args.start))
}

pub(crate) fn frame_file_name(index: usize) -> String {
    format!("frame_{index:05}.ppm")
}

/// Binary PPM (P6). Alpha is dropped.
pub(crate) fn write_ppm(sink: &mut dyn Write, rgba: &[u8], width: usize, height: usize) -> Result<()> {
    let n = width.saturating_mul(height);
    if rgba.len() < n.saturating_mul(4) {
        bail!("pixel buffer too small for {width}x{height}");
    }
    write!(sink, "P6\n{width} {height}\n255\n")?;
    let mut rgb = Vec::with_capacity(n * 3);
    for px in rgba.chunks_exact(4).take(n) {
        rgb.extend_from_slice(&px[..3]);
    }
    sink.write_all(&rgb)?;
    Ok(())
}

fn main() -> Result<()> {
    ink_smoke::logging::init_stderr();
    let args = Cli::parse();
    run(args)
}

fn run(args: Cli) -> Result<()> {
    validate_args(&args)?;

    let tuning = match args.tuning.as_deref() {
        Some(path) => {
            Tuning::load(path).with_context(|| format!("load tuning {}", path.display()))?
        }
        None => Tuning::default(),
    };

    let frame_count = compute_frame_count(args.duration, args.fps);
    let out = args.output_path();
    info!(
        frames = frame_count,
        width = args.width,
        height = args.height,
        fps = args.fps,
        format = ?args.format,
        out = %out.display(),
        "export starting"
    );

    let mut engine = SmokeEngine::new(tuning.shader());
    let mut driver = FrameDriver::new(
        FrameClock::new(tuning.time_scale),
        Resolution::new(args.width, args.height),
    );
    driver.clock_mut().advance(start_offset(&args)?);

    match args.format {
        FormatArg::Ppm => {
            fs::create_dir_all(&out)
                .with_context(|| format!("create output directory {}", out.display()))?;
            render_frames(&mut engine, &mut driver, frame_count, args.fps, |idx, px| {
                let path = out.join(frame_file_name(idx));
                let file = fs::File::create(&path)
                    .with_context(|| format!("create {}", path.display()))?;
                let mut w = BufWriter::new(file);
                write_ppm(&mut w, px, args.width, args.height)?;
                w.flush()?;
                Ok(())
            })?;
        }
        FormatArg::Mp4 => {
            ensure_ffmpeg_available()?;
            let mut parent = out.parent().unwrap_or_else(|| Path::new(""));
            if parent == Path::new("") {
                parent = Path::new(".");
            }
            fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;

            let mut ffmpeg = spawn_ffmpeg(&out, args.width, args.height, args.fps)?;
            let mut ffmpeg_in = ffmpeg
                .stdin
                .take()
                .context("failed to open ffmpeg stdin for rawvideo input")?;
            let rendered = render_frames(&mut engine, &mut driver, frame_count, args.fps, |_, px| {
                ffmpeg_in
                    .write_all(px)
                    .context("write frame to ffmpeg stdin")
            });
            drop(ffmpeg_in);
            if let Err(err) = rendered {
                let _ = ffmpeg.kill();
                let _ = ffmpeg.wait();
                return Err(err);
            }

            let status = ffmpeg.wait().context("wait for ffmpeg")?;
            if !status.success() {
                bail!("ffmpeg exited with status {status}");
            }
        }
    }

    println!(
        "exported {} frames @ {} fps ({:.3}s) -> {}",
        frame_count,
        args.fps,
        frame_count as f32 / args.fps as f32,
        out.display()
    );
    Ok(())
}

fn render_frames(
    engine: &mut SmokeEngine,
    driver: &mut FrameDriver,
    frame_count: usize,
    fps: u32,
    mut sink: impl FnMut(usize, &[u8]) -> Result<()>,
) -> Result<()> {
    let dt = Duration::from_secs_f64(1.0 / fps as f64);
    for idx in 0..frame_count {
        let tick = driver.begin_frame_fixed(dt);
        if tick.resized {
            engine.resize(tick.resolution.width, tick.resolution.height);
        }
        let uniforms = tick
            .uniforms
            .ok_or_else(|| anyhow!("degenerate export resolution"))?;
        let pixels = engine
            .render(&uniforms, 1)
            .ok_or_else(|| anyhow!("engine not sized for frame {idx}"))?;
        sink(idx, pixels)?;

        if idx % fps as usize == 0 {
            debug!(frame = idx, time = uniforms.time(), "exported");
        }
    }
    Ok(())
}

fn ensure_ffmpeg_available() -> Result<()> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("ffmpeg not found in PATH (install ffmpeg and retry)")
        }
        Err(err) => Err(anyhow!("failed to run ffmpeg: {err}")),
    }
}

fn spawn_ffmpeg(
    out_path: &Path,
    width: usize,
    height: usize,
    fps: u32,
) -> Result<std::process::Child> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-y")
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgba")
        .arg("-video_size")
        .arg(format!("{width}x{height}"))
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg("-")
        .arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-movflags")
        .arg("+faststart")
        .arg(out_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    cmd.spawn()
        .with_context(|| format!("spawn ffmpeg for output {}", out_path.display()))
}
