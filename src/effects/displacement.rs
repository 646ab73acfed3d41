//! Displacement field accumulation.
//!
//! The field is advected along itself, integrates confidence-weighted motion, then decays and
//! diffuses by `diffusion`. An optional gaussian blur pulls it toward a coarser level of detail.

use rayon::prelude::*;

use crate::effects::blur::blur_texels;
use crate::effects::motion::{CONFIDENCE, VEC_X, VEC_Y};
use crate::foundation::error::{MoshError, MoshResult};
use crate::foundation::math::lerp;
use crate::render::passes::AccumulatePass;
use crate::render::surface::Image;

/// Advect `prev` along itself, add `motion` and diffuse into `out`.
///
/// All three fields share the block-grid resolution. Output texels are `(dx, dy, 0, 0)`.
pub fn accumulate(
    pass: &AccumulatePass,
    motion: &Image,
    prev: &Image,
    out: &mut Image,
) -> MoshResult<()> {
    let canvas = out.canvas();
    if motion.canvas() != canvas || prev.canvas() != canvas {
        return Err(MoshError::evaluation(
            "accumulate expects motion, previous and output fields of equal size",
        ));
    }

    let bs = pass.block_size.max(1) as f32;
    let r = pass.diffusion.clamp(0.0, 1.0);
    let w = canvas.width as usize;

    // Advection and integration.
    let mut integrated = vec![[0.0f32; 2]; canvas.texel_count()];
    integrated
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(j, row)| {
            for (i, c) in row.iter_mut().enumerate() {
                let o = prev.get(i as u32, j as u32);
                let a = prev.sample_nearest(i as f32 - o[0] / bs, j as f32 - o[1] / bs);
                let m = motion.get(i as u32, j as u32);
                *c = [
                    a[0] + m[VEC_X] * m[CONFIDENCE],
                    a[1] + m[VEC_Y] * m[CONFIDENCE],
                ];
            }
        });

    // Decay and 4-neighbour diffusion.
    let (wi, hi) = (canvas.width as i64, canvas.height as i64);
    let at = |x: i64, y: i64| integrated[(y.clamp(0, hi - 1) * wi + x.clamp(0, wi - 1)) as usize];
    out.texels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(j, row)| {
            let j = j as i64;
            for (i, texel) in row.iter_mut().enumerate() {
                let i = i as i64;
                let c = at(i, j);
                let n = [at(i - 1, j), at(i + 1, j), at(i, j - 1), at(i, j + 1)];
                let mut d = [0.0f32; 2];
                for (k, v) in d.iter_mut().enumerate() {
                    let avg = 0.25 * (n[0][k] + n[1][k] + n[2][k] + n[3][k]);
                    *v = (1.0 - r) * ((1.0 - r) * c[k] + r * avg);
                }
                *texel = [d[0], d[1], 0.0, 0.0];
            }
        });

    if let Some(lod) = pass.lod_bias.filter(|l| *l > 0.0) {
        let radius = (2.0 * lod).ceil() as u32;
        let blurred = blur_texels(out.texels(), canvas.width, canvas.height, radius, lod)?;
        let weight = lod.min(1.0);
        for (t, b) in out.texels_mut().iter_mut().zip(blurred) {
            t[0] = lerp(t[0], b[0], weight);
            t[1] = lerp(t[1], b[1], weight);
        }
    }

    out.quantize_in_place();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/displacement.rs"]
mod tests;
