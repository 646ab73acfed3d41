//! Datamosh is a real-time feedback effect for video frames.
//!
//! Every frame runs four passes over linear floating-point RGBA:
//!
//! - a derivative pass producing luma, spatial gradients and a denoised temporal derivative;
//! - block motion estimation against the previous frame;
//! - accumulation of confidence-weighted motion into a decaying, diffusing displacement field;
//! - a composite that warps the previous output through that field and blends it with the live
//!   source.
//!
//! The entry point is [`Pipeline`], which owns the persistent buffers and processes each distinct
//! [`FrameIndex`] exactly once.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Per-pass image kernels.
pub mod effects;
/// Parameter descriptors and parameter sets.
pub mod params;
/// Images, the buffer pool and the pass backend seam.
pub mod render;
/// The pipeline driver.
pub mod session;

pub use crate::foundation::core::{Canvas, FrameIndex};
pub use crate::foundation::error::{MoshError, MoshResult};
pub use crate::foundation::math::Texel;

pub use crate::params::{PARAM_TABLE, ParamDesc, ParamKind, ParamSet, ParamTable};
pub use crate::render::cpu::CpuBackend;
pub use crate::render::passes::{
    AccumulatePass, CompositePass, DerivativePass, FramePasses, MotionPass, PassBackend,
    StageFeatures,
};
pub use crate::render::surface::{FilterMode, Image, PixelFormat, SurfaceDesc, SurfaceId};
pub use crate::render::surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};
pub use crate::session::pipeline::{DebugViews, Pipeline, PipelineOpts, PipelineStats};
