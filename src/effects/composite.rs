use rayon::prelude::*;

use crate::foundation::error::{MoshError, MoshResult};
use crate::foundation::math::{Texel, lerp_texel};
use crate::render::passes::CompositePass;
use crate::render::surface::Image;

/// Blend the live texel toward the warped feedback texel. `mix = 0` returns `live` exactly.
pub fn feedback_mix(live: Texel, warped: Texel, mix: f32) -> Texel {
    lerp_texel(live, warped, mix.clamp(0.0, 1.0))
}

/// Warp `prev` through the block-resolution `displacement` and blend with `source` into `out`.
pub fn composite(
    pass: &CompositePass,
    source: &Image,
    displacement: &Image,
    prev: &Image,
    out: &mut Image,
) -> MoshResult<()> {
    let canvas = source.canvas();
    if out.canvas() != canvas || prev.canvas() != canvas {
        return Err(MoshError::evaluation(
            "composite expects source, previous and output of equal dimensions",
        ));
    }
    let bs = pass.block_size.max(1);
    if displacement.canvas() != canvas.block_grid(bs) {
        return Err(MoshError::evaluation(format!(
            "displacement field {}x{} does not cover {}x{} at block size {bs}",
            displacement.width(),
            displacement.height(),
            canvas.width,
            canvas.height
        )));
    }

    let inv_bs = 1.0 / bs as f32;
    let w = canvas.width as usize;
    out.texels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            let fy = y as f32;
            let dv = (fy + 0.5) * inv_bs - 0.5;
            for (x, texel) in row.iter_mut().enumerate() {
                let fx = x as f32;
                let d = displacement.sample_bilinear((fx + 0.5) * inv_bs - 0.5, dv);
                let warped = prev.sample_bilinear(fx - d[0], fy - d[1]);
                *texel = feedback_mix(source.get(x as u32, y as u32), warped, pass.mix);
            }
        });
    out.quantize_in_place();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
