//! Block motion estimation over derivative buffers.
//!
//! Each macroblock searches a grid of candidate offsets (radius = block size, spacing from the
//! quality control) for the one that best explains the current luma from the previous luma. The
//! resulting confidence is attenuated by match improvement, gradient contrast and, when gating is
//! on, the smaller eigenvalue of the structure tensor. Contrast and the tensor are measured over
//! the block grown by the derivative kernel half-size, so even one-pixel blocks see a 2D
//! neighbourhood.

use rayon::prelude::*;

use crate::effects::derivative::{GRAD_X, GRAD_Y, LUMA, TEMPORAL};
use crate::foundation::core::Canvas;
use crate::foundation::error::{MoshError, MoshResult};
use crate::foundation::math::{Texel, min_eigenvalue_sym2};
use crate::render::passes::MotionPass;
use crate::render::surface::Image;

/// Channel layout of a motion field texel.
pub(crate) const VEC_X: usize = 0;
pub(crate) const VEC_Y: usize = 1;
pub(crate) const CONFIDENCE: usize = 2;
pub(crate) const ACTIVITY: usize = 3;

/// Estimate one motion vector per macroblock of `derivative` against `prev_derivative`.
///
/// `out` must have the block-grid dimensions of the derivative buffer.
pub fn estimate_motion(
    pass: &MotionPass,
    derivative: &Image,
    prev_derivative: &Image,
    out: &mut Image,
) -> MoshResult<()> {
    let canvas = derivative.canvas();
    if prev_derivative.canvas() != canvas {
        return Err(MoshError::evaluation(
            "motion estimation expects current and previous derivative buffers of equal size",
        ));
    }
    let bs = pass.block_size.max(1);
    let grid = canvas.block_grid(bs);
    if out.canvas() != grid {
        return Err(MoshError::evaluation(format!(
            "motion field must be {}x{} for block size {bs}, got {}x{}",
            grid.width,
            grid.height,
            out.width(),
            out.height()
        )));
    }

    let candidates = search_candidates(bs, pass.search_step());
    let gw = grid.width as usize;
    out.texels_mut()
        .par_chunks_mut(gw)
        .enumerate()
        .for_each(|(by, row)| {
            for (bx, texel) in row.iter_mut().enumerate() {
                let block = BlockRect::new(canvas, bs, bx as u32, by as u32);
                let window = block.padded(canvas, pass.tensor_radius);
                *texel =
                    estimate_block(pass, derivative, prev_derivative, block, window, &candidates);
            }
        });
    out.quantize_in_place();
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct BlockRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl BlockRect {
    fn new(canvas: Canvas, bs: u32, bx: u32, by: u32) -> Self {
        let x0 = (bx * bs).min(canvas.width - 1);
        let y0 = (by * bs).min(canvas.height - 1);
        Self {
            x0,
            y0,
            x1: (x0 + bs).min(canvas.width),
            y1: (y0 + bs).min(canvas.height),
        }
    }

    /// Grow by `pad` texels on every side, clamped to the canvas.
    fn padded(self, canvas: Canvas, pad: u32) -> Self {
        Self {
            x0: self.x0.saturating_sub(pad),
            y0: self.y0.saturating_sub(pad),
            x1: self.x1.saturating_add(pad).min(canvas.width),
            y1: self.y1.saturating_add(pad).min(canvas.height),
        }
    }

    fn pixel_count(self) -> f32 {
        ((self.x1 - self.x0) * (self.y1 - self.y0)) as f32
    }

    fn pixels(self) -> impl Iterator<Item = (u32, u32)> {
        (self.y0..self.y1).flat_map(move |y| (self.x0..self.x1).map(move |x| (x, y)))
    }
}

/// Candidate offsets within `[-radius, radius]²` on a `step` grid, shortest first.
fn search_candidates(radius: u32, step: u32) -> Vec<(i64, i64)> {
    let r = i64::from(radius);
    let s = i64::from(step.max(1));
    let mut out = Vec::new();
    let mut dy = -(r / s) * s;
    while dy <= r {
        let mut dx = -(r / s) * s;
        while dx <= r {
            out.push((dx, dy));
            dx += s;
        }
        dy += s;
    }
    out.sort_by_key(|&(dx, dy)| (dx * dx + dy * dy, dy, dx));
    out
}

fn match_cost(cur: &Image, prev: &Image, block: BlockRect, d: (i64, i64)) -> f32 {
    let mut sum = 0.0f32;
    for (x, y) in block.pixels() {
        let c = cur.get(x, y)[LUMA];
        let p = prev.get_clamped(i64::from(x) - d.0, i64::from(y) - d.1)[LUMA];
        sum += (c - p).abs();
    }
    sum / block.pixel_count()
}

fn estimate_block(
    pass: &MotionPass,
    cur: &Image,
    prev: &Image,
    block: BlockRect,
    window: BlockRect,
    candidates: &[(i64, i64)],
) -> Texel {
    let mut activity = 0.0f32;
    for (x, y) in block.pixels() {
        activity += cur.get(x, y)[TEMPORAL].abs();
    }
    activity /= block.pixel_count();
    if activity == 0.0 {
        return [0.0; 4];
    }

    let cost0 = match_cost(cur, prev, block, (0, 0));
    let mut best = (0i64, 0i64);
    let mut best_cost = cost0;
    for &d in candidates {
        if d == (0, 0) {
            continue;
        }
        let c = match_cost(cur, prev, block, d);
        if c < best_cost {
            best = d;
            best_cost = c;
        }
    }

    let mut confidence = if cost0 > 0.0 {
        ((cost0 - best_cost) / cost0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if pass.use_derivative {
        let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
        for (x, y) in window.pixels() {
            let t = cur.get(x, y);
            sxx += t[GRAD_X] * t[GRAD_X];
            sxy += t[GRAD_X] * t[GRAD_Y];
            syy += t[GRAD_Y] * t[GRAD_Y];
        }
        let n = window.pixel_count();
        let rms = ((sxx + syy) / n).sqrt();
        confidence *= (pass.contrast * rms).clamp(0.0, 1.0);
        if let Some(eigen_min) = pass.eigen_min
            && min_eigenvalue_sym2(sxx / n, sxy / n, syy / n) < eigen_min
        {
            confidence = 0.0;
        }
    }

    let mut texel = [0.0; 4];
    texel[VEC_X] = best.0 as f32 * pass.velocity_scale;
    texel[VEC_Y] = best.1 as f32 * pass.velocity_scale;
    texel[CONFIDENCE] = confidence;
    texel[ACTIVITY] = activity;
    texel
}

#[cfg(test)]
#[path = "../../tests/unit/effects/motion.rs"]
mod tests;
