use std::time::{Duration, Instant};

use anyhow::Result;
use ink_smoke::driver::{FrameClock, FrameDriver, Resolution};
use ink_smoke::shader::InkSmoke;
use ink_smoke::tuning::DEFAULT_TIME_SCALE;
use ink_smoke::visual::SmokeEngine;
use tracing::info;

struct Args {
    frames: usize,
    w: usize,
    h: usize,
    scale: usize,
    max_ms: Option<f64>,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 120,
        w: 160,
        h: 88,
        scale: 1,
        max_ms: None,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--width", Some(x)) | ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--height", Some(x)) | ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--scale", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.scale = n.clamp(1, 8);
                }
                i += 2;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = Some(v.max(0.1));
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    args
}

fn main() -> Result<()> {
    ink_smoke::logging::init_stderr();
    let args = parse_args();

    let mut engine = SmokeEngine::new(InkSmoke::default());
    let mut driver = FrameDriver::new(
        FrameClock::new(DEFAULT_TIME_SCALE),
        Resolution::new(args.w, args.h),
    );
    let dt = Duration::from_secs_f64(1.0 / 60.0);

    println!(
        "CPU benchmark: frames={} size={}x{} scale={} threads={}",
        args.frames,
        args.w,
        args.h,
        args.scale,
        rayon::current_num_threads()
    );

    let mut worst = Duration::ZERO;
    let mut total = Duration::ZERO;
    let mut lit = 0usize;
    for _ in 0..args.frames {
        let tick = driver.begin_frame_fixed(dt);
        if tick.resized {
            engine.resize(tick.resolution.width, tick.resolution.height);
        }
        let Some(uniforms) = tick.uniforms else {
            continue;
        };

        let start = Instant::now();
        let Some(px) = engine.render(&uniforms, args.scale) else {
            continue;
        };
        let took = start.elapsed();
        total += took;
        worst = worst.max(took);

        if px.chunks_exact(4).any(|p| p[0] != 0 || p[1] != 0 || p[2] != 0) {
            lit += 1;
        }
    }

    let avg_ms = total.as_secs_f64() * 1000.0 / args.frames as f64;
    let fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };
    let (rw, rh) = engine.size();
    println!(
        "CPU summary: {:>8.3} ms/frame avg  {:>8.3} ms worst  {:>7.2} FPS  lit={}/{}  rendered={}x{}",
        avg_ms,
        worst.as_secs_f64() * 1000.0,
        fps,
        lit,
        args.frames,
        rw,
        rh
    );
    info!(avg_ms, frames = args.frames, "benchmark finished");

    if let Some(max_ms) = args.max_ms {
        if avg_ms > max_ms {
            eprintln!("Budget: FAIL ({:.3} ms/frame > {:.3})", avg_ms, max_ms);
            anyhow::bail!("frame budget exceeded");
        }
        println!("Budget: PASS (max_ms={:.3})", max_ms);
    }

    Ok(())
}
