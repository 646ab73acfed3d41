//! Stage sequencing for one frame.
//!
//! Every stage writes into a freshly acquired generation of buffers and only reads the previous
//! generation, so a failure part-way leaves the persistent state exactly as it was.

use crate::foundation::core::FrameIndex;
use crate::foundation::error::MoshResult;
use crate::render::passes::{FramePasses, PassBackend};
use crate::render::surface::Image;
use crate::render::surface_pool::SurfacePool;
use crate::session::state::{BufferDescs, FrameBuffers, MoshState};

/// Allocate the persistent buffers and seed them from the first frame.
///
/// A second generation is allocated and parked in the pool so steady-state frames never allocate.
pub(crate) fn initialize<B: PassBackend + ?Sized>(
    backend: &mut B,
    pool: &mut SurfacePool,
    descs: BufferDescs,
    passes: &FramePasses,
    frame: FrameIndex,
    source: &Image,
) -> MoshResult<MoshState> {
    let mut buffers = FrameBuffers::acquire(pool, &descs)?;
    if let Err(e) = seed(backend, passes, source, &mut buffers) {
        buffers.release(pool);
        return Err(e);
    }
    prewarm(pool, &descs);
    Ok(MoshState {
        descs,
        last_frame: frame,
        buffers,
    })
}

fn prewarm(pool: &mut SurfacePool, descs: &BufferDescs) {
    match FrameBuffers::acquire(pool, descs) {
        Ok(spare) => spare.release(pool),
        // The next frame retries the acquisition and reports the failure there.
        Err(e) => tracing::debug!(error = %e, "could not pre-allocate the next buffer generation"),
    }
}

fn seed<B: PassBackend + ?Sized>(
    backend: &mut B,
    passes: &FramePasses,
    source: &Image,
    buffers: &mut FrameBuffers,
) -> MoshResult<()> {
    backend.exec_clear(&mut buffers.motion, [0.0; 4])?;
    backend.exec_clear(&mut buffers.displacement, [0.0; 4])?;
    backend.exec_derivative(&passes.derivative, source, None, &mut buffers.derivative)?;
    backend.exec_copy(source, &mut buffers.composite)?;
    backend.exec_copy(source, &mut buffers.source)
}

/// Run derivative, motion, accumulate and composite into a new generation and commit it.
pub(crate) fn run_frame<B: PassBackend + ?Sized>(
    backend: &mut B,
    pool: &mut SurfacePool,
    state: &mut MoshState,
    passes: &FramePasses,
    frame: FrameIndex,
    source: &Image,
) -> MoshResult<()> {
    let mut next = FrameBuffers::acquire(pool, &state.descs)?;
    if let Err(e) = run_stages(backend, passes, source, &state.buffers, &mut next) {
        next.release(pool);
        return Err(e);
    }

    let old = std::mem::replace(&mut state.buffers, next);
    old.release(pool);
    state.last_frame = frame;
    Ok(())
}

fn run_stages<B: PassBackend + ?Sized>(
    backend: &mut B,
    passes: &FramePasses,
    source: &Image,
    prev: &FrameBuffers,
    next: &mut FrameBuffers,
) -> MoshResult<()> {
    backend.exec_derivative(
        &passes.derivative,
        source,
        Some(&prev.derivative),
        &mut next.derivative,
    )?;
    backend.exec_motion(
        &passes.motion,
        &next.derivative,
        &prev.derivative,
        &mut next.motion,
    )?;
    backend.exec_accumulate(
        &passes.accumulate,
        &next.motion,
        &prev.displacement,
        &mut next.displacement,
    )?;
    backend.exec_composite(
        &passes.composite,
        source,
        &next.displacement,
        &prev.composite,
        &mut next.composite,
    )?;
    backend.exec_copy(source, &mut next.source)
}

#[cfg(test)]
#[path = "../../tests/unit/session/frame.rs"]
mod tests;
