/// One RGBA texel in linear floating point.
pub type Texel = [f32; 4];

/// Rec. 709 luma weights for linear RGB.
pub(crate) const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

pub(crate) fn luma(t: Texel) -> f32 {
    LUMA_WEIGHTS[0] * t[0] + LUMA_WEIGHTS[1] * t[1] + LUMA_WEIGHTS[2] * t[2]
}

/// `a + (b - a) * t`. Exact when `a == b`.
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub(crate) fn lerp_texel(a: Texel, b: Texel, t: f32) -> Texel {
    [
        lerp(a[0], b[0], t),
        lerp(a[1], b[1], t),
        lerp(a[2], b[2], t),
        lerp(a[3], b[3], t),
    ]
}

pub(crate) fn quantize_f16(v: f32) -> f32 {
    half::f16::from_f32(v).to_f32()
}

pub(crate) fn vec_len(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

/// Smaller eigenvalue of the symmetric matrix `[[a, b], [b, c]]`.
pub(crate) fn min_eigenvalue_sym2(a: f32, b: f32, c: f32) -> f32 {
    let mean = 0.5 * (a + c);
    let half_diff = 0.5 * (a - c);
    mean - (half_diff * half_diff + b * b).sqrt()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
