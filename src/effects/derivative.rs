use rayon::prelude::*;

use crate::foundation::error::{MoshError, MoshResult};
use crate::foundation::math::luma;
use crate::render::passes::DerivativePass;
use crate::render::surface::Image;

/// Channel layout of a derivative buffer texel.
pub(crate) const LUMA: usize = 0;
pub(crate) const GRAD_X: usize = 1;
pub(crate) const GRAD_Y: usize = 2;
pub(crate) const TEMPORAL: usize = 3;

/// Compute `(L, gx, gy, it)` for every source pixel into `out`.
///
/// `prev` is the previous frame's derivative buffer; only its luma channel is read. Without it the
/// temporal derivative is zero.
pub fn derivative(
    pass: &DerivativePass,
    source: &Image,
    prev: Option<&Image>,
    out: &mut Image,
) -> MoshResult<()> {
    let canvas = source.canvas();
    if out.canvas() != canvas || prev.is_some_and(|p| p.canvas() != canvas) {
        return Err(MoshError::evaluation(
            "derivative expects source, previous and output of equal dimensions",
        ));
    }

    let w = canvas.width as usize;
    let luma_plane: Vec<f32> = source.texels().iter().map(|&t| luma(t)).collect();
    let k = i64::from(pass.kernel_half_size.max(1));
    let (wi, hi) = (i64::from(canvas.width), i64::from(canvas.height));
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, wi - 1) as usize;
        let cy = y.clamp(0, hi - 1) as usize;
        luma_plane[cy * w + cx]
    };
    let norm = 1.0 / ((2 * k) as f32 * (2 * k + 1) as f32);

    out.texels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for (x, texel) in row.iter_mut().enumerate() {
                let x = x as i64;
                let l = at(x, y);

                let (gx, gy) = if pass.enabled {
                    let mut sx = 0.0f32;
                    let mut sy = 0.0f32;
                    for j in -k..=k {
                        sx += at(x + k, y + j) - at(x - k, y + j);
                        sy += at(x + j, y + k) - at(x + j, y - k);
                    }
                    (sx * norm, sy * norm)
                } else {
                    (0.0, 0.0)
                };

                let it = match prev {
                    Some(p) => {
                        let d = l - p.get(x as u32, y as u32)[LUMA];
                        if pass.enabled && d.abs() < pass.denoise {
                            0.0
                        } else {
                            d
                        }
                    }
                    None => 0.0,
                };

                *texel = [l, gx, gy, it];
            }
        });
    out.quantize_in_place();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/derivative.rs"]
mod tests;
