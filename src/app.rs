use crate::config::{Config, Quality, RendererMode};
use crate::driver::{FrameClock, FrameDriver, Resolution};
use crate::render::{AsciiRenderer, Frame, HalfBlockRenderer, KittyRenderer, Renderer};
use crate::terminal::TerminalGuard;
use crate::tuning::Tuning;
use crate::visual::{quality_scale, SmokeEngine};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Resolve the look constants: tuning file (if any), then CLI overrides.
pub fn load_tuning(cfg: &Config) -> anyhow::Result<Tuning> {
    let mut tuning = match cfg.tuning.as_deref() {
        Some(path) => {
            let t = Tuning::load(path).with_context(|| format!("load tuning {}", path.display()))?;
            info!(path = %path.display(), "loaded tuning file");
            t
        }
        None => Tuning::default(),
    };
    if let Some(scale) = cfg.time_scale {
        tuning.time_scale = scale;
        tuning.validate().context("--time-scale")?;
    }
    Ok(tuning)
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let tuning = load_tuning(&cfg)?;

    let mut renderer: Box<dyn Renderer> = match cfg.renderer {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
        RendererMode::Kitty => Box::new(KittyRenderer::new(cfg.density())),
    };
    let cell_px = renderer.cell_pixels();

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let _term = TerminalGuard::enter(cfg.renderer)?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    let mut ui = UiState::new(!cfg.no_hud, tuning.palette.exposure);
    let mut hud_rows = hud_rows_for_size(last_size, ui.show_hud);

    let mut engine = SmokeEngine::new(tuning.shader());
    let mut driver = FrameDriver::new(
        FrameClock::new(tuning.time_scale),
        surface_size(last_size, hud_rows, cell_px),
    );
    let mut runtime = RuntimeTuning::new(cfg.quality, cfg.adaptive_quality);
    let mut fps = FpsCounter::new();
    let mut last_engine_ms = 0.0f32;
    let mut last_render_ms = 0.0f32;

    info!(
        renderer = renderer.name(),
        cols = last_size.0,
        rows = last_size.1,
        time_scale = driver.clock().time_scale(),
        "starting"
    );

    loop {
        let now = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    let old_hud = ui.show_hud;
                    if handle_key(k.code, k.modifiers, &mut driver, &mut engine, &mut ui) {
                        info!(frames = fps.total, "quit");
                        return Ok(());
                    }
                    if ui.show_hud != old_hud {
                        hud_rows = hud_rows_for_size(last_size, ui.show_hud);
                        let r = surface_size(last_size, hud_rows, cell_px);
                        driver.request_resize(r.width, r.height);
                    }
                }
                Event::Resize(c, r) => {
                    last_size = (c, r);
                    hud_rows = hud_rows_for_size(last_size, ui.show_hud);
                    let r = surface_size(last_size, hud_rows, cell_px);
                    driver.request_resize(r.width, r.height);
                }
                _ => {}
            }
        }

        // Some terminals drop resize events; poll the size too.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
            hud_rows = hud_rows_for_size(last_size, ui.show_hud);
            let r = surface_size(last_size, hud_rows, cell_px);
            driver.request_resize(r.width, r.height);
        }

        let tick = driver.begin_frame(now);
        if tick.resized {
            info!(
                width = tick.resolution.width,
                height = tick.resolution.height,
                "surface resized"
            );
            engine.resize(tick.resolution.width, tick.resolution.height);
        }

        let (term_cols, term_rows) = last_size;
        let visual_rows = term_rows.saturating_sub(hud_rows);

        if let Some(uniforms) = tick.uniforms {
            let engine_start = Instant::now();
            let rendered = engine.render(&uniforms, quality_scale(runtime.quality()));
            last_engine_ms = engine_start.elapsed().as_secs_f32() * 1000.0;

            if let Some(pixels) = rendered {
                let hud = if ui.show_hud {
                    build_hud(
                        term_cols as usize,
                        &HudStats {
                            time: uniforms.time(),
                            speed: driver.clock().speed(),
                            paused: driver.clock().is_paused(),
                            exposure: ui.exposure,
                            quality: runtime.quality(),
                            fps: fps.fps(),
                            engine_ms: last_engine_ms,
                            render_ms: last_render_ms,
                            renderer: renderer.name(),
                            resolution: tick.resolution,
                        },
                    )
                } else {
                    String::new()
                };

                let frame = Frame {
                    term_cols,
                    term_rows,
                    visual_rows,
                    pixel_width: tick.resolution.width,
                    pixel_height: tick.resolution.height,
                    pixels_rgba: pixels,
                    hud: &hud,
                    hud_rows,
                    overlay: ui.show_help.then(help_popup_text),
                    sync_updates: cfg.sync_updates,
                };

                let render_start = Instant::now();
                renderer.render(&frame, &mut out)?;
                last_render_ms = render_start.elapsed().as_secs_f32() * 1000.0;
            }
        } else {
            debug!(frame = tick.index, "degenerate surface, frame skipped");
        }

        fps.tick();
        let total_ms = now.elapsed().as_secs_f32() * 1000.0;
        runtime.update(total_ms, 1000.0 / cfg.fps.max(1) as f32);

        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

struct UiState {
    show_hud: bool,
    show_help: bool,
    exposure: f32,
}

impl UiState {
    fn new(show_hud: bool, exposure: f32) -> Self {
        Self {
            show_hud,
            show_help: false,
            exposure,
        }
    }
}

/// Pixel size of the visual area (terminal minus HUD rows).
pub fn surface_size(size: (u16, u16), hud_rows: u16, cell_px: (usize, usize)) -> Resolution {
    let (cols, rows) = size;
    let visual_rows = rows.saturating_sub(hud_rows);
    Resolution::new(
        (cols as usize).saturating_mul(cell_px.0),
        (visual_rows as usize).saturating_mul(cell_px.1),
    )
}

pub fn hud_rows_for_size(size: (u16, u16), show_hud: bool) -> u16 {
    if !show_hud {
        return 0;
    }
    size.1.saturating_sub(1).min(2)
}

fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    driver: &mut FrameDriver,
    engine: &mut SmokeEngine,
    ui: &mut UiState,
) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return true,
        KeyCode::Char(' ') => {
            driver.clock_mut().toggle_pause();
            debug!(paused = driver.clock().is_paused(), "toggle pause");
        }
        KeyCode::Up => {
            let s = driver.clock().speed() * 1.25;
            driver.clock_mut().set_speed(s);
        }
        KeyCode::Down => {
            let s = driver.clock().speed() / 1.25;
            driver.clock_mut().set_speed(s);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            ui.exposure = (ui.exposure + 0.25).min(8.0);
            engine.shader_mut().set_exposure(ui.exposure);
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            ui.exposure = (ui.exposure - 0.25).max(0.25);
            engine.shader_mut().set_exposure(ui.exposure);
        }
        KeyCode::Char('r') | KeyCode::Char('R') => driver.clock_mut().reset(),
        KeyCode::Char('i') | KeyCode::Char('I') => ui.show_hud = !ui.show_hud,
        KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => {
            ui.show_help = !ui.show_help;
        }
        _ => {}
    }
    false
}

/// Values shown in the status line.
pub struct HudStats<'a> {
    pub time: f32,
    pub speed: f32,
    pub paused: bool,
    pub exposure: f32,
    pub quality: Quality,
    pub fps: f32,
    pub engine_ms: f32,
    pub render_ms: f32,
    pub renderer: &'a str,
    pub resolution: Resolution,
}

/// Status line plus key hints, each clipped to `cols` characters.
pub fn build_hud(cols: usize, s: &HudStats<'_>) -> String {
    let status = format!(
        "t {:>7.2}{} | speed {:>4.2} | exposure {:>4.2} | {}x{} | quality {:?} | {} | FPS {:>4.1} | ms(E/R) {:>4.1}/{:>4.1}",
        s.time,
        if s.paused { " (paused)" } else { "" },
        s.speed,
        s.exposure,
        s.resolution.width,
        s.resolution.height,
        s.quality,
        s.renderer,
        s.fps,
        s.engine_ms,
        s.render_ms,
    );
    let keys = "space pause | up/down speed | +/- exposure | r reset | i HUD | ? help | q quit";
    [status, keys.to_string()]
        .iter()
        .map(|l| l.chars().take(cols.max(1)).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn help_popup_text() -> &'static str {
    "Ink Smoke\n\
space  pause / resume\n\
up/down  animation speed\n\
+ / -  exposure\n\
r  restart time\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
q or esc  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
    total: u64,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
            total: 0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        self.total += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}

/// Drops to coarser block sizes when frames run long, and climbs back when
/// there is headroom, never above the requested quality.
pub struct RuntimeTuning {
    base_quality: Quality,
    quality: Quality,
    adaptive: bool,
    ema_ms: f32,
}

impl RuntimeTuning {
    pub fn new(base_quality: Quality, adaptive: bool) -> Self {
        Self {
            base_quality,
            quality: base_quality,
            adaptive,
            ema_ms: 0.0,
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn update(&mut self, frame_ms: f32, target_ms: f32) {
        if !self.adaptive {
            return;
        }
        self.ema_ms = if self.ema_ms == 0.0 {
            frame_ms
        } else {
            self.ema_ms * 0.95 + frame_ms * 0.05
        };

        let before = self.quality;
        if self.ema_ms > target_ms * 1.22 {
            self.quality = self.quality.lower();
        } else if self.ema_ms < target_ms * 0.72 && self.quality.rank() < self.base_quality.rank() {
            self.quality = self.quality.higher();
        }
        if self.quality != before {
            info!(from = ?before, to = ?self.quality, ema_ms = self.ema_ms, "quality changed");
            // Let the average settle at the new level.
            self.ema_ms = target_ms;
        }
    }
}
