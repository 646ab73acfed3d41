use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{MoshError, MoshResult};
use crate::render::surface::{FilterMode, Image, PixelFormat, SurfaceDesc};
use crate::render::surface_pool::SurfacePool;

/// Descriptors of the persistent buffers for one resolution and block size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BufferDescs {
    pub(crate) canvas: Canvas,
    pub(crate) block_size: u32,
    /// Composited buffer and source copy.
    pub(crate) color: SurfaceDesc,
    pub(crate) derivative: SurfaceDesc,
    /// Motion and displacement fields.
    pub(crate) field: SurfaceDesc,
}

impl BufferDescs {
    pub(crate) fn new(canvas: Canvas, block_size: u32, composite_format: PixelFormat) -> Self {
        let block_size = block_size.max(1);
        Self {
            canvas,
            block_size,
            color: SurfaceDesc {
                width: canvas.width,
                height: canvas.height,
                format: composite_format,
                filter: FilterMode::Bilinear,
            },
            derivative: SurfaceDesc::field(canvas),
            field: SurfaceDesc::field(canvas.block_grid(block_size)),
        }
    }
}

/// One generation of pipeline buffers.
#[derive(Debug)]
pub(crate) struct FrameBuffers {
    pub(crate) source: Image,
    pub(crate) composite: Image,
    pub(crate) derivative: Image,
    pub(crate) motion: Image,
    pub(crate) displacement: Image,
}

impl FrameBuffers {
    /// Acquire a full generation. On failure every buffer already acquired goes back to the pool.
    pub(crate) fn acquire(pool: &mut SurfacePool, descs: &BufferDescs) -> MoshResult<Self> {
        let order = [
            descs.color,
            descs.color,
            descs.derivative,
            descs.field,
            descs.field,
        ];
        let [source, composite, derivative, motion, displacement] = acquire_all(pool, order)?;
        Ok(Self {
            source,
            composite,
            derivative,
            motion,
            displacement,
        })
    }

    pub(crate) fn release(self, pool: &mut SurfacePool) {
        pool.release(Some(self.source));
        pool.release(Some(self.composite));
        pool.release(Some(self.derivative));
        pool.release(Some(self.motion));
        pool.release(Some(self.displacement));
    }
}

fn acquire_all<const N: usize>(
    pool: &mut SurfacePool,
    descs: [SurfaceDesc; N],
) -> MoshResult<[Image; N]> {
    let mut acquired = Vec::with_capacity(N);
    for desc in descs {
        match pool.acquire(desc) {
            Ok(img) => acquired.push(img),
            Err(e) => {
                for img in acquired {
                    pool.release(Some(img));
                }
                return Err(e);
            }
        }
    }
    acquired
        .try_into()
        .map_err(|_| MoshError::evaluation("buffer generation is incomplete"))
}

/// Persistent state of an initialized pipeline.
#[derive(Debug)]
pub(crate) struct MoshState {
    pub(crate) descs: BufferDescs,
    pub(crate) last_frame: FrameIndex,
    pub(crate) buffers: FrameBuffers,
}

impl MoshState {
    pub(crate) fn matches(&self, descs: &BufferDescs) -> bool {
        self.descs == *descs
    }
}

pub(crate) enum Lifecycle {
    Uninitialized { hint: Option<Canvas> },
    Ready(Box<MoshState>),
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::Uninitialized { hint: None }
    }
}
