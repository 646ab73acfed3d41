use crate::effects::{composite, derivative, displacement, motion};
use crate::foundation::error::MoshResult;
use crate::foundation::math::Texel;
use crate::render::passes::{
    AccumulatePass, CompositePass, DerivativePass, MotionPass, PassBackend,
};
use crate::render::surface::Image;

/// Executes every pass on the CPU, parallelised over output rows with `rayon`.
#[derive(Debug, Default)]
pub struct CpuBackend {
    passes_executed: u64,
}

impl CpuBackend {
    /// Create a backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes run since construction.
    pub fn passes_executed(&self) -> u64 {
        self.passes_executed
    }

    fn begin(&mut self, out: &Image, inputs: &[&Image]) {
        debug_assert!(
            inputs.iter().all(|i| i.id() != out.id()),
            "pass output {:?} aliases one of its inputs",
            out.id()
        );
        self.passes_executed += 1;
    }
}

impl PassBackend for CpuBackend {
    fn exec_clear(&mut self, out: &mut Image, value: Texel) -> MoshResult<()> {
        self.begin(out, &[]);
        out.texels_mut().fill(value);
        out.quantize_in_place();
        Ok(())
    }

    fn exec_copy(&mut self, src: &Image, out: &mut Image) -> MoshResult<()> {
        self.begin(out, &[src]);
        out.copy_from(src)
    }

    fn exec_derivative(
        &mut self,
        pass: &DerivativePass,
        source: &Image,
        prev: Option<&Image>,
        out: &mut Image,
    ) -> MoshResult<()> {
        match prev {
            Some(p) => self.begin(out, &[source, p]),
            None => self.begin(out, &[source]),
        }
        derivative::derivative(pass, source, prev, out)
    }

    fn exec_motion(
        &mut self,
        pass: &MotionPass,
        derivative: &Image,
        prev_derivative: &Image,
        out: &mut Image,
    ) -> MoshResult<()> {
        self.begin(out, &[derivative, prev_derivative]);
        motion::estimate_motion(pass, derivative, prev_derivative, out)
    }

    fn exec_accumulate(
        &mut self,
        pass: &AccumulatePass,
        motion: &Image,
        prev: &Image,
        out: &mut Image,
    ) -> MoshResult<()> {
        self.begin(out, &[motion, prev]);
        displacement::accumulate(pass, motion, prev, out)
    }

    fn exec_composite(
        &mut self,
        pass: &CompositePass,
        source: &Image,
        displacement: &Image,
        prev: &Image,
        out: &mut Image,
    ) -> MoshResult<()> {
        self.begin(out, &[source, displacement, prev]);
        composite::composite(pass, source, displacement, prev, out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
