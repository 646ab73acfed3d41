use crate::{
    foundation::error::MoshResult,
    foundation::math::Texel,
    params::ParamSet,
    render::surface::Image,
};

/// Optional pipeline stages. Disabling them yields the simpler variants of the effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageFeatures {
    /// Spatial/temporal derivative stage with denoise threshold and contrast weighting.
    pub derivative_stage: bool,
    /// Reject motion from blocks whose structure tensor is nearly singular.
    pub confidence_gate: bool,
    /// Coarse-scale blur of the displacement field.
    pub lod_blur: bool,
}

impl Default for StageFeatures {
    fn default() -> Self {
        Self {
            derivative_stage: true,
            confidence_gate: true,
            lod_blur: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Luma, spatial gradients and denoised temporal derivative. Output: `(L, gx, gy, it)`.
pub struct DerivativePass {
    /// `|it|` below this is zeroed.
    pub denoise: f32,
    /// Half-size of the gradient kernel.
    pub kernel_half_size: u32,
    /// When `false`, gradients are zero and `it` is the raw luma difference.
    pub enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Per-block motion search. Output: `(vx, vy, confidence, activity)` per macroblock.
pub struct MotionPass {
    /// Macroblock side in pixels; also the search radius.
    pub block_size: u32,
    /// `1 - entropy`; controls the search step.
    pub quality: f32,
    /// Gradient-RMS confidence gain.
    pub contrast: f32,
    /// Scale applied to the winning offset.
    pub velocity_scale: f32,
    /// `Some` when confidence gating is active.
    pub eigen_min: Option<f32>,
    /// Weight confidence by gradient contrast.
    pub use_derivative: bool,
    /// Texels added around each block when measuring contrast and the structure tensor.
    pub tensor_radius: u32,
}

impl MotionPass {
    /// Spacing of the search grid in pixels.
    pub fn search_step(&self) -> u32 {
        let entropy = (1.0 - self.quality).clamp(0.0, 1.0);
        ((entropy * self.block_size as f32).round() as u32).max(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Advect, integrate and diffuse the displacement field.
pub struct AccumulatePass {
    /// Converts pixel offsets to field texels during advection.
    pub block_size: u32,
    /// Decay and neighbour smoothing rate.
    pub diffusion: f32,
    /// `Some` when the level-of-detail blur is active.
    pub lod_bias: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Warp the previous composite through the displacement field and blend with the source.
pub struct CompositePass {
    /// Maps pixels onto displacement texels.
    pub block_size: u32,
    /// 0 shows the source, 1 keeps the warped feedback.
    pub mix: f32,
}

/// The passes of one frame, resolved from a sanitized parameter set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePasses {
    /// Stage 1a.
    pub derivative: DerivativePass,
    /// Stage 1b.
    pub motion: MotionPass,
    /// Stage 2.
    pub accumulate: AccumulatePass,
    /// Stage 3.
    pub composite: CompositePass,
}

impl FramePasses {
    /// Resolve pass parameters. `params` is expected to be sanitized already.
    pub fn resolve(params: &ParamSet, features: StageFeatures) -> Self {
        let block_size = params.block_size.max(1);
        let derivative = features.derivative_stage;
        Self {
            derivative: DerivativePass {
                denoise: params.denoise,
                kernel_half_size: params.kernel_half_size.max(1),
                enabled: derivative,
            },
            motion: MotionPass {
                block_size,
                quality: params.quality,
                contrast: params.contrast,
                velocity_scale: params.velocity_scale,
                eigen_min: (features.confidence_gate && derivative).then_some(params.eigen_min),
                use_derivative: derivative,
                tensor_radius: params.kernel_half_size.max(1),
            },
            accumulate: AccumulatePass {
                block_size,
                diffusion: params.diffusion,
                lod_bias: (features.lod_blur && params.lod_bias > 0.0).then_some(params.lod_bias),
            },
            composite: CompositePass {
                block_size,
                mix: params.displace,
            },
        }
    }
}

/// Executes pipeline passes. Outputs are always distinct surfaces from every input.
pub trait PassBackend {
    /// Fill `out` with `value`.
    fn exec_clear(&mut self, out: &mut Image, value: Texel) -> MoshResult<()>;

    /// Copy `src` into `out` (same dimensions).
    fn exec_copy(&mut self, src: &Image, out: &mut Image) -> MoshResult<()>;

    /// See [`DerivativePass`].
    fn exec_derivative(
        &mut self,
        pass: &DerivativePass,
        source: &Image,
        prev: Option<&Image>,
        out: &mut Image,
    ) -> MoshResult<()>;

    /// See [`MotionPass`].
    fn exec_motion(
        &mut self,
        pass: &MotionPass,
        derivative: &Image,
        prev_derivative: &Image,
        out: &mut Image,
    ) -> MoshResult<()>;

    /// See [`AccumulatePass`].
    fn exec_accumulate(
        &mut self,
        pass: &AccumulatePass,
        motion: &Image,
        prev: &Image,
        out: &mut Image,
    ) -> MoshResult<()>;

    /// See [`CompositePass`].
    fn exec_composite(
        &mut self,
        pass: &CompositePass,
        source: &Image,
        displacement: &Image,
        prev: &Image,
        out: &mut Image,
    ) -> MoshResult<()>;
}

#[cfg(test)]
#[path = "../../tests/unit/render/passes.rs"]
mod tests;
