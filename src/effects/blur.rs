use rayon::prelude::*;

use crate::foundation::error::{MoshError, MoshResult};
use crate::foundation::math::Texel;

/// Normalized gaussian weights for offsets `-radius..=radius`.
pub(crate) fn gaussian_kernel(radius: u32, sigma: f32) -> MoshResult<Vec<f32>> {
    if radius == 0 {
        return Ok(vec![1.0]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(MoshError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(MoshError::evaluation("gaussian kernel sum is zero"));
    }
    Ok(weights.into_iter().map(|w| (w / sum) as f32).collect())
}

/// Separable gaussian blur of a `width * height` texel plane with clamp-to-edge sampling.
pub(crate) fn blur_texels(
    src: &[Texel],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> MoshResult<Vec<Texel>> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| MoshError::evaluation("blur buffer size overflow"))?;
    if src.len() != len {
        return Err(MoshError::evaluation(
            "blur_texels expects src matching width*height",
        ));
    }
    if radius == 0 || len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel(radius, sigma)?;
    let mut tmp = vec![[0.0f32; 4]; len];
    let mut out = vec![[0.0f32; 4]; len];
    horizontal_pass(src, &mut tmp, width, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn horizontal_pass(src: &[Texel], dst: &mut [Texel], width: u32, k: &[f32]) {
    let radius = (k.len() / 2) as i64;
    let w = width as usize;
    dst.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let line = &src[y * w..(y + 1) * w];
        for (x, texel) in row.iter_mut().enumerate() {
            let mut acc = [0.0f32; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x as i64 + ki as i64 - radius).clamp(0, w as i64 - 1) as usize;
                for (a, s) in acc.iter_mut().zip(line[sx]) {
                    *a += kw * s;
                }
            }
            *texel = acc;
        }
    });
}

fn vertical_pass(src: &[Texel], dst: &mut [Texel], width: u32, height: u32, k: &[f32]) {
    let radius = (k.len() / 2) as i64;
    let w = width as usize;
    let h = height as i64;
    dst.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, texel) in row.iter_mut().enumerate() {
            let mut acc = [0.0f32; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y as i64 + ki as i64 - radius).clamp(0, h - 1) as usize;
                for (a, s) in acc.iter_mut().zip(src[sy * w + x]) {
                    *a += kw * s;
                }
            }
            *texel = acc;
        }
    });
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
