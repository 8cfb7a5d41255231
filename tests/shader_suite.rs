use glam::{vec2, Mat2, Vec2, Vec3, Vec4};
use ink_smoke::shader::noise::fract_gl;
use ink_smoke::shader::{
    domain_warp, random, smoothstep, to_rgba8, value_noise, Fbm, FbmParams, InkPalette, InkSmoke,
    Uniforms, WarpParams,
};

fn grid(step: f32, n: i32) -> impl Iterator<Item = Vec2> {
    (-n..n).flat_map(move |y| (-n..n).map(move |x| vec2(x as f32 * step, y as f32 * step)))
}

#[test]
fn noise_is_deterministic_on_and_off_lattice() {
    for p in grid(0.37, 12) {
        let a = random(p);
        assert_eq!(a, random(p));
        assert!((0.0..=1.0).contains(&a), "random({p}) = {a}");

        let shifted = p + vec2(3.0, -7.0);
        assert_eq!(value_noise(shifted), value_noise(shifted));
    }
}

#[test]
fn smoothed_noise_has_no_seams() {
    let eps = 1e-4;
    for i in -6..6 {
        for j in 0..16 {
            let along = j as f32 / 16.0 + 0.01;
            let x = i as f32;
            let left = value_noise(vec2(x - eps, along));
            let right = value_noise(vec2(x + eps, along));
            assert!((left - right).abs() < 5e-3, "seam at x={x}: {left} vs {right}");

            let below = value_noise(vec2(along, x - eps));
            let above = value_noise(vec2(along, x + eps));
            assert!((below - above).abs() < 5e-3, "seam at y={x}: {below} vs {above}");
        }
    }
}

#[test]
fn fbm_stays_within_total_gain() {
    let fbm = Fbm::default();
    let bound = fbm.params().total_gain();
    assert!(bound < 1.0);
    for p in grid(1.93, 20) {
        let v = fbm.sample(p);
        assert!(v.is_finite());
        assert!((0.0..=bound + 1e-6).contains(&v), "fbm({p}) = {v}");
    }
    // Far from the origin the hash still behaves.
    let v = fbm.sample(vec2(1.0e4, -3.3e3));
    assert!((0.0..=bound + 1e-6).contains(&v));
}

#[test]
fn custom_octave_stack_is_bounded_too() {
    let fbm = Fbm::new(FbmParams {
        octaves: 10,
        gain: 0.6,
        ..FbmParams::default()
    });
    let bound = fbm.params().total_gain();
    for p in grid(0.71, 10) {
        assert!(fbm.sample(p) <= bound + 1e-6);
    }
}

#[test]
fn domain_warp_is_deterministic_and_continuous_in_time() {
    let fbm = Fbm::default();
    let params = WarpParams::default();
    for st in [vec2(0.0, 0.0), vec2(0.4, 0.8), vec2(1.2, 0.3)] {
        let a = domain_warp(&fbm, &params, st, 12.5);
        let b = domain_warp(&fbm, &params, st, 12.5);
        assert_eq!(a, b);

        let mut prev = domain_warp(&fbm, &params, st, 0.0).f;
        for step in 1..=2000 {
            let t = step as f32 * 0.001;
            let f = domain_warp(&fbm, &params, st, t).f;
            assert!((f - prev).abs() < 0.05, "jump at t={t} st={st}: {prev} -> {f}");
            prev = f;
        }
    }
}

#[test]
fn colour_mapping_is_pure() {
    let palette = InkPalette::default();
    let cases = [
        (0.0, vec2(0.0, 0.0), vec2(0.5, 0.5)),
        (0.55, vec2(0.5, 0.1), vec2(0.1, 0.9)),
        (0.9, vec2(0.7, 0.7), vec2(1.0, 1.0)),
    ];
    for (f, r, uv) in cases {
        let a = palette.shade(f, r, uv);
        let b = palette.shade(f, r, uv);
        assert_eq!(a, b);
        assert_eq!(to_rgba8(a), to_rgba8(b));
        assert_eq!(a.w, 1.0);
    }
}

#[test]
fn end_to_end_at_origin() {
    let smoke = InkSmoke::default();
    let u = Uniforms::new(0.0, vec2(800.0, 600.0)).expect("valid resolution");
    let s = smoke.evaluate(&u, Vec2::ZERO);

    let fbm = smoke.fbm();
    assert_eq!(s.st, Vec2::ZERO);
    assert_eq!(s.warp.q, vec2(fbm.sample(vec2(0.0, 0.0)), fbm.sample(vec2(1.0, 1.0))));

    let r = vec2(
        fbm.sample(s.warp.q + vec2(1.7, 9.2)),
        fbm.sample(s.warp.q + vec2(8.3, 2.8)),
    );
    let f = fbm.sample(r);
    assert!((s.warp.r - r).length() < 1e-6);
    assert!((s.warp.f - f).abs() < 1e-6);

    let body = Vec3::splat(0.12).lerp(Vec3::ZERO, smoothstep(0.2, 0.9, f))
        + Vec3::splat(0.05) * smoothstep(0.4, 0.6, r.x);
    let vignette = 1.0 - smoothstep(0.5, 1.5, 0.707);
    assert!((smoke.palette().vignette_factor(Vec2::ZERO) - vignette).abs() < 1e-3);
    assert!((s.color.truncate() - body * vignette).length() < 1e-3);
}

#[test]
fn render_is_a_pure_function_of_its_inputs() {
    let smoke = InkSmoke::default();
    let res = vec2(320.0, 180.0);
    let a = smoke.render(4.2, res, vec2(10.5, 20.5));
    let b = smoke.render(4.2, res, vec2(10.5, 20.5));
    assert!(a.is_some());
    assert_eq!(a, b);

    let u0 = Uniforms::new(4.2, res).expect("valid resolution");
    let u1 = Uniforms::new(40.2, res).expect("valid resolution");
    let frag = vec2(10.5, 20.5);
    assert_ne!(smoke.evaluate(&u0, frag).warp.r, smoke.evaluate(&u1, frag).warp.r);
}

#[test]
fn degenerate_resolution_is_a_no_op() {
    let smoke = InkSmoke::default();
    assert_eq!(smoke.render(1.0, Vec2::ZERO, Vec2::ZERO), None);
    assert_eq!(smoke.render(1.0, vec2(f32::NAN, 10.0), Vec2::ZERO), None);
}

#[test]
fn fract_gl_wraps_negative_inputs() {
    assert!((fract_gl(-0.25) - 0.75).abs() < 1e-6);
    assert!((fract_gl(2.5) - 0.5).abs() < 1e-6);
    assert_eq!(fract_gl(-1e-9), 0.0);
}

#[test]
fn value_noise_matches_corner_hashes_on_lattice() {
    for (x, y) in [(0.0, 0.0), (3.0, -2.0), (-7.0, 11.0)] {
        let p = vec2(x, y);
        assert!((value_noise(p) - random(p)).abs() < 1e-6);
    }
}

#[test]
fn fade_curve_is_symmetric_mid_cell() {
    // Halfway along a cell edge the fade weight is exactly one half.
    for (x, y) in [(0.0, 0.0), (-3.0, 5.0)] {
        let a = random(vec2(x, y));
        let b = random(vec2(x + 1.0, y));
        let mid = value_noise(vec2(x + 0.5, y));
        assert!((mid - (a + b) * 0.5).abs() < 1e-6, "({x}, {y})");
    }
}

#[test]
fn default_total_gain_is_below_one() {
    let g = FbmParams::default().total_gain();
    assert!((g - 0.904_6).abs() < 1e-3, "total gain {g}");
    assert!(g < 1.0);
}

#[test]
fn second_octave_is_rotated_scaled_and_shifted() {
    let params = FbmParams {
        octaves: 2,
        ..FbmParams::default()
    };
    let fbm = Fbm::new(params);
    let p = vec2(0.3, 4.7);
    // Column-major mat2(cos, sin, -sin, cos) at 0.5 rad.
    let rot = Mat2::from_cols(
        vec2(0.5f32.cos(), 0.5f32.sin()),
        vec2(-(0.5f32.sin()), 0.5f32.cos()),
    );
    let next = rot * p * params.lacunarity + params.shift;
    let expected = 0.5 * value_noise(p) + 0.5 * 0.45 * value_noise(next);
    assert!((fbm.sample(p) - expected).abs() < 1e-5);
}

#[test]
fn single_octave_is_scaled_value_noise() {
    let fbm = Fbm::new(FbmParams {
        octaves: 1,
        ..FbmParams::default()
    });
    let p = vec2(0.3, 4.7);
    assert!((fbm.sample(p) - 0.5 * value_noise(p)).abs() < 1e-6);
}

#[test]
fn zero_octaves_yield_zero() {
    let fbm = Fbm::new(FbmParams {
        octaves: 0,
        ..FbmParams::default()
    });
    assert_eq!(fbm.sample(vec2(1.0, 2.0)), 0.0);
}

#[test]
fn second_warp_stage_follows_the_first() {
    let fbm = Fbm::default();
    let params = WarpParams::default();
    let st = vec2(0.4, 0.8);
    let t = 3.0;
    let s = domain_warp(&fbm, &params, st, t);
    assert_eq!(s.q.y, fbm.sample(st + Vec2::ONE));

    let rx = fbm.sample(st + s.q + vec2(1.7, 9.2) + 0.15 * t);
    let ry = fbm.sample(st + s.q + vec2(8.3, 2.8) + 0.126 * t);
    assert!((s.r.x - rx).abs() < 1e-6);
    assert!((s.r.y - ry).abs() < 1e-6);
    assert!((s.f - fbm.sample(st + s.r)).abs() < 1e-6);
}

#[test]
fn time_only_moves_the_time_driven_lookups() {
    let fbm = Fbm::default();
    let params = WarpParams::default();
    let st = vec2(1.2, 0.3);
    let a = domain_warp(&fbm, &params, st, 0.0);
    let b = domain_warp(&fbm, &params, st, 10.0);
    assert_eq!(a.q.y, b.q.y);
    assert_ne!(a.q.x, b.q.x);
}

#[test]
fn screen_coord_is_aspect_corrected() {
    let u = Uniforms::new(0.0, vec2(800.0, 400.0)).expect("valid resolution");
    assert_eq!(u.aspect(), 2.0);
    let st = InkSmoke::screen_coord(&u, vec2(800.0, 400.0));
    assert!((st - vec2(2.0, 1.0)).length() < 1e-6);
    assert!(Uniforms::new(0.0, vec2(800.0, 0.0)).is_none());
    assert!(Uniforms::new(0.0, vec2(0.0, 600.0)).is_none());
}

#[test]
fn smoothstep_clamps_and_hits_midpoint() {
    assert_eq!(smoothstep(0.2, 0.9, 0.0), 0.0);
    assert_eq!(smoothstep(0.2, 0.9, 1.0), 1.0);
    assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
}

#[test]
fn thin_field_shows_background_at_centre() {
    let p = InkPalette::default();
    let c = p.shade(0.0, Vec2::ZERO, Vec2::splat(0.5));
    assert!((c.truncate() - Vec3::splat(0.12)).length() < 1e-6);
    assert_eq!(c.w, 1.0);
}

#[test]
fn dense_field_with_highlight_is_highlight_only() {
    let p = InkPalette::default();
    let c = p.shade(1.0, vec2(1.0, 0.0), Vec2::splat(0.5));
    assert!((c.truncate() - Vec3::splat(0.05)).length() < 1e-6);
}

#[test]
fn output_stays_in_dark_range() {
    let p = InkPalette::default();
    for i in 0..=10 {
        for j in 0..=10 {
            let f = i as f32 / 10.0;
            let rx = j as f32 / 10.0;
            let c = p.shade(f, vec2(rx, 0.0), vec2(0.3, 0.7));
            for ch in c.truncate().to_array() {
                assert!((0.0..=0.17 + 1e-6).contains(&ch), "channel {ch}");
            }
        }
    }
}

#[test]
fn corner_vignette_matches_reference() {
    let p = InkPalette::default();
    let expected = 1.0 - smoothstep(0.5, 1.5, 0.5f32.hypot(0.5));
    assert!((p.vignette_factor(Vec2::ZERO) - expected).abs() < 1e-6);
    assert_eq!(p.vignette_factor(Vec2::splat(0.5)), 1.0);
}

#[test]
fn exposure_scales_rgb_not_alpha() {
    let p = InkPalette {
        exposure: 2.0,
        ..InkPalette::default()
    };
    let c = p.shade(0.0, Vec2::ZERO, Vec2::splat(0.5));
    assert!((c.x - 0.24).abs() < 1e-6);
    assert_eq!(c.w, 1.0);
}

#[test]
fn rgba8_quantizes_and_clamps() {
    assert_eq!(to_rgba8(Vec4::new(0.12, 0.0, 1.5, 1.0)), [31, 0, 255, 255]);
}
