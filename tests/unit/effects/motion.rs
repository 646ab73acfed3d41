use super::*;
use crate::effects::derivative::derivative;
use crate::render::passes::DerivativePass;

fn noise(x: i64, y: i64) -> f32 {
    let mut h = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 29;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 32;
    (h >> 40) as f32 / (1u64 << 24) as f32
}

fn gray(w: u32, h: u32, f: impl Fn(i64, i64) -> f32) -> Image {
    let mut data = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let v = f(i64::from(x), i64::from(y));
            data.push([v, v, v, 1.0]);
        }
    }
    Image::from_texels(w, h, data).unwrap()
}

fn derivs(a: &Image, b: &Image, enabled: bool) -> (Image, Image) {
    let pass = DerivativePass {
        denoise: 0.01,
        kernel_half_size: 1,
        enabled,
    };
    let mut prev = Image::filled(a.width(), a.height(), [0.0; 4]).unwrap();
    derivative(&pass, a, None, &mut prev).unwrap();
    let mut cur = Image::filled(b.width(), b.height(), [0.0; 4]).unwrap();
    derivative(&pass, b, Some(&prev), &mut cur).unwrap();
    (prev, cur)
}

fn motion_pass(block_size: u32) -> MotionPass {
    MotionPass {
        block_size,
        quality: 1.0,
        contrast: 100.0,
        velocity_scale: 1.0,
        eigen_min: None,
        use_derivative: true,
        tensor_radius: 1,
    }
}

fn run(pass: &MotionPass, a: &Image, b: &Image) -> Image {
    let (prev, cur) = derivs(a, b, pass.use_derivative);
    let grid = cur.canvas().block_grid(pass.block_size);
    let mut out = Image::filled(grid.width, grid.height, [7.0; 4]).unwrap();
    estimate_motion(pass, &cur, &prev, &mut out).unwrap();
    out
}

#[test]
fn candidates_are_sorted_shortest_first() {
    let c = search_candidates(2, 1);
    assert_eq!(c.len(), 25);
    assert_eq!(c[0], (0, 0));
    let coarse = search_candidates(4, 3);
    assert!(coarse.contains(&(3, -3)));
    assert!(!coarse.contains(&(4, 0)));
}

#[test]
fn identical_frames_estimate_zero_motion() {
    let a = gray(32, 32, noise);
    let out = run(&motion_pass(4), &a, &a.clone());
    for t in out.texels() {
        assert_eq!(*t, [0.0; 4]);
    }
}

#[test]
fn one_block_shift_is_found_exactly() {
    let a = gray(64, 64, noise);
    let b = gray(64, 64, |x, y| noise(x - 4, y));
    let out = run(&motion_pass(4), &a, &b);

    assert_eq!(out.canvas(), Canvas::new(16, 16).unwrap());
    for by in 0..16 {
        for bx in 1..16 {
            let t = out.get(bx, by);
            assert_eq!((t[VEC_X], t[VEC_Y]), (4.0, 0.0), "block ({bx},{by})");
            assert_eq!(t[CONFIDENCE], 1.0);
            assert!(t[ACTIVITY] > 0.0);
        }
    }
}

#[test]
fn diagonal_subblock_shift_is_found() {
    let a = gray(32, 32, noise);
    let b = gray(32, 32, |x, y| noise(x - 2, y + 1));
    let out = run(&motion_pass(8), &a, &b);

    let t = out.get(2, 1);
    assert_eq!((t[VEC_X], t[VEC_Y]), (2.0, -1.0));
}

#[test]
fn velocity_scale_scales_vectors() {
    let a = gray(32, 32, noise);
    let b = gray(32, 32, |x, y| noise(x, y - 3));
    let pass = MotionPass {
        velocity_scale: 2.0,
        ..motion_pass(4)
    };
    let out = run(&pass, &a, &b);
    let t = out.get(3, 3);
    assert_eq!((t[VEC_X], t[VEC_Y]), (0.0, 6.0));
}

#[test]
fn changes_below_denoise_produce_no_motion() {
    let a = gray(16, 16, |x, y| 0.5 + 0.2 * noise(x, y));
    let b = gray(16, 16, |x, y| 0.505 + 0.2 * noise(x, y));
    let out = run(&motion_pass(4), &a, &b);
    assert!(out.texels().iter().all(|t| *t == [0.0; 4]));
}

#[test]
fn eigen_gate_rejects_aperture_limited_blocks() {
    let stripes = |x: i64, _y: i64| if x.rem_euclid(4) < 2 { 0.2 } else { 0.8 };
    let a = gray(32, 32, stripes);
    let b = gray(32, 32, |x, y| stripes(x - 1, y));

    let ungated = run(&motion_pass(4), &a, &b);
    assert!(ungated.get(3, 3)[CONFIDENCE] > 0.5);

    let gated_pass = MotionPass {
        eigen_min: Some(1e-4),
        ..motion_pass(4)
    };
    let gated = run(&gated_pass, &a, &b);
    assert_eq!(gated.get(3, 3)[CONFIDENCE], 0.0);
}

#[test]
fn eigen_gate_keeps_textured_single_pixel_blocks() {
    let a = gray(16, 16, noise);
    let b = gray(16, 16, |x, y| noise(x - 1, y));
    let pass = MotionPass {
        eigen_min: Some(0.0005),
        contrast: 50.0,
        ..motion_pass(1)
    };
    let out = run(&pass, &a, &b);

    assert_eq!(out.canvas(), Canvas::new(16, 16).unwrap());
    let trusted = out
        .texels()
        .iter()
        .filter(|t| t[VEC_X] == 1.0 && t[CONFIDENCE] > 0.0)
        .count();
    assert!(trusted > 128, "only {trusted} of 256 single-pixel blocks kept");
}

#[test]
fn default_contrast_saturates_on_textured_blocks() {
    let a = gray(64, 64, noise);
    let b = gray(64, 64, |x, y| noise(x - 4, y));
    let pass = MotionPass {
        quality: 0.8,
        contrast: 50.0,
        eigen_min: Some(0.0005),
        ..motion_pass(4)
    };
    let out = run(&pass, &a, &b);
    for by in 0..16 {
        for bx in 1..16 {
            let t = out.get(bx, by);
            assert_eq!((t[VEC_X], t[VEC_Y], t[CONFIDENCE]), (4.0, 0.0, 1.0));
        }
    }
}

#[test]
fn low_contrast_gain_attenuates_confidence() {
    let a = gray(32, 32, noise);
    let b = gray(32, 32, |x, y| noise(x - 1, y));
    let pass = MotionPass {
        contrast: 0.01,
        ..motion_pass(4)
    };
    let out = run(&pass, &a, &b);
    let t = out.get(2, 2);
    assert_eq!((t[VEC_X], t[VEC_Y]), (1.0, 0.0));
    assert!(t[CONFIDENCE] < 0.1);
}

#[test]
fn without_derivative_stage_confidence_is_match_improvement() {
    let a = gray(32, 32, noise);
    let b = gray(32, 32, |x, y| noise(x - 1, y));
    let pass = MotionPass {
        contrast: 0.0,
        use_derivative: false,
        ..motion_pass(4)
    };
    let out = run(&pass, &a, &b);
    let t = out.get(2, 2);
    assert_eq!((t[VEC_X], t[CONFIDENCE]), (1.0, 1.0));
}

#[test]
fn partial_edge_blocks_are_estimated() {
    let a = gray(10, 6, noise);
    let b = gray(10, 6, |x, y| noise(x - 1, y));
    let out = run(&motion_pass(4), &a, &b);
    assert_eq!(out.canvas(), Canvas::new(3, 2).unwrap());
    assert!(out.texels().iter().all(|t| t.iter().all(|c| c.is_finite())));
}

#[test]
fn wrong_field_size_is_rejected() {
    let a = gray(16, 16, noise);
    let (prev, cur) = derivs(&a, &a, true);
    let mut out = Image::filled(3, 3, [0.0; 4]).unwrap();
    assert!(estimate_motion(&motion_pass(4), &cur, &prev, &mut out).is_err());
}
