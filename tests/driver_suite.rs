use glam::{vec2, Vec2};
use ink_smoke::config::Quality;
use ink_smoke::driver::{FrameClock, FrameDriver, Resolution};
use ink_smoke::shader::{to_rgba8, InkSmoke, Uniforms};
use ink_smoke::visual::{quality_scale, SmokeEngine};
use std::time::{Duration, Instant};

const STEP: Duration = Duration::from_millis(16);

#[test]
fn resize_lands_between_frames_as_a_pair() {
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(800, 600));
    let first = d.begin_frame_fixed(STEP);
    assert_eq!(first.uniforms.map(|u| u.resolution()), Some(vec2(800.0, 600.0)));

    // Requests between frames never leak into the current resolution.
    d.request_resize(400, 600);
    assert_eq!(d.resolution(), Resolution::new(800, 600));
    d.request_resize(400, 300);
    assert_eq!(d.resolution(), Resolution::new(800, 600));

    let next = d.begin_frame_fixed(STEP);
    assert!(next.resized);
    assert_eq!(next.resolution, Resolution::new(400, 300));
    let u = next.uniforms.expect("non-degenerate");
    assert_eq!(u.resolution(), vec2(400.0, 300.0));
    assert!((u.aspect() - 4.0 / 3.0).abs() < 1e-6);

    let after = d.begin_frame_fixed(STEP);
    assert!(!after.resized);
}

#[test]
fn engine_follows_driver_resizes() {
    let mut engine = SmokeEngine::new(InkSmoke::default());
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(80, 60));

    for (i, size) in [(80, 60), (80, 60), (40, 30), (40, 30)].into_iter().enumerate() {
        if i == 2 {
            d.request_resize(40, 30);
        }
        let tick = d.begin_frame_fixed(STEP);
        if tick.resized {
            engine.resize(tick.resolution.width, tick.resolution.height);
        }
        let u = tick.uniforms.expect("non-degenerate");
        let px = engine.render(&u, 1).expect("engine sized to the tick");
        assert_eq!(px.len(), size.0 * size.1 * 4);
    }
}

#[test]
fn stale_uniforms_are_rejected_by_the_engine() {
    let mut engine = SmokeEngine::new(InkSmoke::default());
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(8, 6));
    let old = d.begin_frame_fixed(STEP);
    engine.resize(8, 6);
    let old_u = old.uniforms.expect("non-degenerate");

    d.request_resize(4, 3);
    let new = d.begin_frame_fixed(STEP);
    engine.resize(new.resolution.width, new.resolution.height);
    assert!(engine.render(&old_u, 1).is_none());
}

#[test]
fn degenerate_resolution_skips_until_valid() {
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(0, 0));
    let tick = d.begin_frame_fixed(STEP);
    assert!(tick.uniforms.is_none());

    d.request_resize(0, 300);
    assert!(d.begin_frame_fixed(STEP).uniforms.is_none());

    d.request_resize(400, 300);
    let tick = d.begin_frame_fixed(STEP);
    assert!(tick.resized);
    assert!(tick.uniforms.is_some());
}

#[test]
fn fixed_steps_advance_scaled_time() {
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(4, 4));
    let times: Vec<f32> = (0..5)
        .map(|_| d.begin_frame_fixed(Duration::from_secs(1)).uniforms.map(|u| u.time()))
        .map(|t| t.expect("non-degenerate"))
        .collect();
    assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
}

#[test]
fn wall_clock_time_is_monotonic_and_pausable() {
    let start = Instant::now();
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(4, 4));
    let mut last = -1.0f32;
    for i in 0..10u64 {
        if i == 4 {
            d.clock_mut().pause();
        }
        if i == 7 {
            d.clock_mut().resume();
        }
        let t = d
            .begin_frame(start + Duration::from_millis(100 * i))
            .uniforms
            .expect("non-degenerate")
            .time();
        assert!(t >= last);
        if (4..=6).contains(&i) {
            assert_eq!(t, last);
        }
        last = t;
    }
    assert!((d.clock().time() - 0.3).abs() < 1e-5);
}

#[test]
fn reset_restarts_time() {
    let mut d = FrameDriver::new(FrameClock::new(1.0), Resolution::new(4, 4));
    d.begin_frame_fixed(STEP);
    d.begin_frame_fixed(Duration::from_secs(3));
    d.clock_mut().reset();
    let t = d.begin_frame_fixed(Duration::ZERO).uniforms.map(|u| u.time());
    assert_eq!(t, Some(0.0));
}

#[test]
fn clock_scales_elapsed_time() {
    let start = Instant::now();
    let mut clock = FrameClock::new(0.5);
    assert_eq!(clock.time_scale(), 0.5);
    assert_eq!(clock.tick(start), 0.0);
    let t = clock.tick(start + Duration::from_secs(4));
    assert!((t - 2.0).abs() < 1e-6);
}

#[test]
fn paused_clock_holds_time() {
    let start = Instant::now();
    let mut clock = FrameClock::new(0.5);
    clock.tick(start);
    clock.tick(start + Duration::from_secs(2));
    clock.pause();
    let held = clock.tick(start + Duration::from_secs(10));
    assert!((held - 1.0).abs() < 1e-6);
    clock.resume();
    let t = clock.tick(start + Duration::from_secs(12));
    assert!((t - 2.0).abs() < 1e-6);
}

#[test]
fn speed_change_does_not_jump() {
    let start = Instant::now();
    let mut clock = FrameClock::new(0.5);
    clock.tick(start);
    let before = clock.tick(start + Duration::from_secs(2));
    clock.set_speed(4.0);
    let after = clock.tick(start + Duration::from_secs(2));
    assert_eq!(before, after);
    // Speed multiplies on top of the configured scale.
    assert_eq!(clock.time_scale(), 0.5);
    let t = clock.tick(start + Duration::from_secs(3));
    assert!((t - (after + 2.0)).abs() < 1e-6);
}

#[test]
fn clock_ignores_instants_in_the_past() {
    let start = Instant::now();
    let mut clock = FrameClock::new(1.0);
    clock.tick(start + Duration::from_secs(3));
    let t = clock.tick(start);
    assert_eq!(t, 0.0);
}

#[test]
fn first_frame_applies_initial_resolution() {
    let mut d = FrameDriver::new(FrameClock::new(0.5), Resolution::new(800, 600));
    let tick = d.begin_frame(Instant::now());
    assert!(tick.resized);
    assert_eq!(tick.index, 0);
    assert_eq!(tick.resolution, Resolution::new(800, 600));
    assert!(tick.uniforms.is_some());
}

fn uniforms(w: usize, h: usize, t: f32) -> Uniforms {
    Uniforms::new(t, Vec2::new(w as f32, h as f32)).expect("non-degenerate")
}

#[test]
fn unsized_engine_skips() {
    let mut e = SmokeEngine::new(InkSmoke::default());
    assert_eq!(e.size(), (0, 0));
    assert!(e.render(&uniforms(4, 4, 0.0), 1).is_none());
}

#[test]
fn mismatched_uniforms_skip() {
    let mut e = SmokeEngine::new(InkSmoke::default());
    e.resize(8, 6);
    assert_eq!(e.size(), (8, 6));
    assert!(e.render(&uniforms(4, 3, 0.0), 1).is_none());
}

#[test]
fn top_left_pixel_uses_gl_coordinates() {
    let (w, h) = (16usize, 9usize);
    let mut e = SmokeEngine::new(InkSmoke::default());
    e.resize(w, h);
    let u = uniforms(w, h, 1.25);
    let buf = e.render(&u, 1).expect("sized").to_vec();
    let expected = to_rgba8(InkSmoke::default().shade(&u, Vec2::new(0.5, h as f32 - 0.5)));
    assert_eq!(&buf[0..4], &expected);
    assert!(buf.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn block_scale_replicates_samples() {
    let (w, h) = (9usize, 5usize);
    let mut e = SmokeEngine::new(InkSmoke::default());
    e.resize(w, h);
    let buf = e
        .render(&uniforms(w, h, 0.0), quality_scale(Quality::Balanced))
        .expect("sized")
        .to_vec();
    let px = |x: usize, y: usize| &buf[(y * w + x) * 4..(y * w + x) * 4 + 4];
    assert_eq!(px(0, 0), px(1, 1));
    assert_eq!(px(2, 2), px(3, 3));
    // Ragged last column/row still gets filled.
    assert_eq!(px(8, 4)[3], 255);
}

#[test]
fn quality_levels_map_to_block_sizes() {
    assert_eq!(quality_scale(Quality::High), 1);
    assert_eq!(quality_scale(Quality::Balanced), 2);
    assert_eq!(quality_scale(Quality::Fast), 3);
}
