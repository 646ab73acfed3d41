use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{MoshError, MoshResult};
use crate::params::{ParamSet, ParamTable};
use crate::render::cpu::CpuBackend;
use crate::render::passes::{FramePasses, PassBackend, StageFeatures};
use crate::render::surface::{Image, PixelFormat};
use crate::render::surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};
use crate::session::frame::{initialize, run_frame};
use crate::session::state::{BufferDescs, Lifecycle, MoshState};

/// Options controlling a [`Pipeline`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineOpts {
    /// Buffer pool limits.
    pub pool: SurfacePoolOpts,
    /// Precision of the composited buffer and source copy.
    pub composite_format: PixelFormat,
    /// Optional stages.
    pub features: StageFeatures,
}

/// Frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Distinct frames that produced output, including initialization frames.
    pub frames_processed: u64,
    /// Frames skipped because their identifier matched the last processed one.
    pub frames_duplicate: u64,
    /// Times the persistent buffers were (re)allocated.
    pub initializations: u64,
}

/// Read-only views of every persistent buffer.
#[derive(Clone, Copy, Debug)]
pub struct DebugViews<'a> {
    /// Copy of the last processed source frame.
    pub source: &'a Image,
    /// `(L, gx, gy, it)` at full resolution.
    pub derivative: &'a Image,
    /// `(vx, vy, confidence, activity)` per macroblock.
    pub motion: &'a Image,
    /// `(dx, dy, 0, 0)` per macroblock.
    pub displacement: &'a Image,
    /// The presented output.
    pub composite: &'a Image,
}

/// Datamosh pipeline driver.
///
/// Owns the persistent buffers and runs derivative, motion, accumulate and composite passes
/// exactly once per distinct [`FrameIndex`]. Feedback buffers are never written in place: each
/// frame produces a new generation and the previous one goes back to the pool only after every
/// pass succeeded.
pub struct Pipeline<B: PassBackend = CpuBackend> {
    backend: B,
    pool: SurfacePool,
    opts: PipelineOpts,
    table: ParamTable,
    lifecycle: Lifecycle,
    stats: PipelineStats,
}

impl Pipeline<CpuBackend> {
    /// Create a pipeline on the CPU backend.
    pub fn new(opts: PipelineOpts) -> MoshResult<Self> {
        Self::with_backend(CpuBackend::new(), opts)
    }
}

impl<B: PassBackend> Pipeline<B> {
    /// Create a pipeline on a custom backend. Validates the parameter table.
    pub fn with_backend(backend: B, opts: PipelineOpts) -> MoshResult<Self> {
        let table = ParamTable::builtin()?;
        Ok(Self {
            backend,
            pool: SurfacePool::new(opts.pool),
            opts,
            table,
            lifecycle: Lifecycle::default(),
            stats: PipelineStats::default(),
        })
    }

    /// Options the pipeline was built with.
    pub fn opts(&self) -> &PipelineOpts {
        &self.opts
    }

    /// Validated parameter descriptors.
    pub fn param_table(&self) -> &ParamTable {
        &self.table
    }

    /// The pass backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// `true` once persistent buffers exist.
    pub fn is_ready(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Ready(_))
    }

    /// Identifier of the last processed frame.
    pub fn last_frame(&self) -> Option<FrameIndex> {
        match &self.lifecycle {
            Lifecycle::Ready(state) => Some(state.last_frame),
            Lifecycle::Uninitialized { .. } => None,
        }
    }

    /// Process one source frame and return the composited output.
    ///
    /// The first frame (and the first after [`Pipeline::enable`], [`Pipeline::disable`] or a
    /// resolution/block-size change) initializes the buffers and presents the source unchanged.
    /// A frame whose identifier equals the last processed one re-presents the previous output
    /// without running any pass. On error the previous state is untouched.
    #[tracing::instrument(
        skip(self, source, params),
        fields(width = source.width(), height = source.height())
    )]
    pub fn process(
        &mut self,
        frame: FrameIndex,
        source: &Image,
        params: &ParamSet,
    ) -> MoshResult<&Image> {
        if self.last_frame() == Some(frame) {
            tracing::debug!(frame = frame.0, "duplicate frame; re-presenting previous output");
            self.stats.frames_duplicate += 1;
            return self.current_output();
        }

        let params = params.sanitized();
        let passes = FramePasses::resolve(&params, self.opts.features);
        let descs = BufferDescs::new(
            source.canvas(),
            passes.motion.block_size,
            self.opts.composite_format,
        );

        if let Lifecycle::Ready(state) = &self.lifecycle
            && !state.matches(&descs)
        {
            tracing::warn!(
                from_width = state.descs.canvas.width,
                from_height = state.descs.canvas.height,
                from_block_size = state.descs.block_size,
                to_width = descs.canvas.width,
                to_height = descs.canvas.height,
                to_block_size = descs.block_size,
                "source resolution or block size changed; reinitializing"
            );
            self.release_state(None);
        }

        match &mut self.lifecycle {
            Lifecycle::Ready(state) => {
                run_frame(
                    &mut self.backend,
                    &mut self.pool,
                    state,
                    &passes,
                    frame,
                    source,
                )?;
            }
            Lifecycle::Uninitialized { hint } => {
                if let Some(hint) = *hint
                    && hint != descs.canvas
                {
                    tracing::warn!(
                        hint_width = hint.width,
                        hint_height = hint.height,
                        width = descs.canvas.width,
                        height = descs.canvas.height,
                        "first frame does not match the resolution hint"
                    );
                }
                let state = initialize(
                    &mut self.backend,
                    &mut self.pool,
                    descs,
                    &passes,
                    frame,
                    source,
                )?;
                tracing::info!(
                    width = descs.canvas.width,
                    height = descs.canvas.height,
                    block_size = descs.block_size,
                    "pipeline initialized"
                );
                self.lifecycle = Lifecycle::Ready(Box::new(state));
                self.stats.initializations += 1;
            }
        }

        self.stats.frames_processed += 1;
        self.current_output()
    }

    /// Drop back to the uninitialized state, optionally recording the expected resolution.
    ///
    /// Nothing is allocated until the next [`Pipeline::process`].
    pub fn enable(&mut self, hint: Option<Canvas>) {
        self.release_state(hint);
    }

    /// Release every persistent buffer and empty the pool.
    pub fn disable(&mut self) {
        self.release_state(None);
        self.pool.clear();
        tracing::info!("pipeline disabled");
    }

    /// The current composited buffer, if initialized.
    pub fn output(&self) -> Option<&Image> {
        match &self.lifecycle {
            Lifecycle::Ready(state) => Some(&state.buffers.composite),
            Lifecycle::Uninitialized { .. } => None,
        }
    }

    /// Read-only views of the persistent buffers, if initialized.
    pub fn debug_views(&self) -> Option<DebugViews<'_>> {
        match &self.lifecycle {
            Lifecycle::Ready(state) => Some(DebugViews {
                source: &state.buffers.source,
                derivative: &state.buffers.derivative,
                motion: &state.buffers.motion,
                displacement: &state.buffers.displacement,
                composite: &state.buffers.composite,
            }),
            Lifecycle::Uninitialized { .. } => None,
        }
    }

    /// Frame counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Buffer pool counters.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.pool.stats()
    }

    fn current_output(&self) -> MoshResult<&Image> {
        self.output()
            .ok_or_else(|| MoshError::evaluation("pipeline has no composited buffer"))
    }

    fn release_state(&mut self, hint: Option<Canvas>) {
        let prev = std::mem::replace(&mut self.lifecycle, Lifecycle::Uninitialized { hint });
        if let Lifecycle::Ready(state) = prev {
            let MoshState { descs, buffers, .. } = *state;
            buffers.release(&mut self.pool);
            tracing::info!(
                width = descs.canvas.width,
                height = descs.canvas.height,
                "released pipeline buffers"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/pipeline.rs"]
mod tests;
