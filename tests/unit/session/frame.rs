use super::*;
use crate::foundation::core::Canvas;
use crate::foundation::error::MoshError;
use crate::foundation::math::Texel;
use crate::params::ParamSet;
use crate::render::passes::{
    AccumulatePass, CompositePass, DerivativePass, MotionPass, StageFeatures,
};
use crate::render::surface::PixelFormat;
use crate::render::surface_pool::SurfacePoolOpts;

#[derive(Default)]
struct MockBackend {
    calls: Vec<&'static str>,
    fail_on: Option<&'static str>,
}

impl MockBackend {
    fn record(&mut self, name: &'static str) -> MoshResult<()> {
        self.calls.push(name);
        if self.fail_on == Some(name) {
            return Err(MoshError::evaluation(format!("{name} failed")));
        }
        Ok(())
    }
}

impl PassBackend for MockBackend {
    fn exec_clear(&mut self, _out: &mut Image, _value: Texel) -> MoshResult<()> {
        self.record("clear")
    }

    fn exec_copy(&mut self, _src: &Image, _out: &mut Image) -> MoshResult<()> {
        self.record("copy")
    }

    fn exec_derivative(
        &mut self,
        _pass: &DerivativePass,
        _source: &Image,
        prev: Option<&Image>,
        _out: &mut Image,
    ) -> MoshResult<()> {
        self.record(if prev.is_some() {
            "derivative"
        } else {
            "derivative_seed"
        })
    }

    fn exec_motion(
        &mut self,
        _pass: &MotionPass,
        _derivative: &Image,
        _prev_derivative: &Image,
        _out: &mut Image,
    ) -> MoshResult<()> {
        self.record("motion")
    }

    fn exec_accumulate(
        &mut self,
        _pass: &AccumulatePass,
        _motion: &Image,
        _prev: &Image,
        _out: &mut Image,
    ) -> MoshResult<()> {
        self.record("accumulate")
    }

    fn exec_composite(
        &mut self,
        _pass: &CompositePass,
        _source: &Image,
        _displacement: &Image,
        _prev: &Image,
        _out: &mut Image,
    ) -> MoshResult<()> {
        self.record("composite")
    }
}

fn setup() -> (SurfacePool, BufferDescs, FramePasses, Image) {
    let pool = SurfacePool::new(SurfacePoolOpts::default());
    let descs = BufferDescs::new(Canvas::new(8, 8).unwrap(), 4, PixelFormat::RgbaF32);
    let passes = FramePasses::resolve(&ParamSet::default(), StageFeatures::default());
    let source = Image::filled(8, 8, [0.5; 4]).unwrap();
    (pool, descs, passes, source)
}

#[test]
fn initialize_seeds_buffers_in_order() {
    let (mut pool, descs, passes, source) = setup();
    let mut backend = MockBackend::default();
    let state =
        initialize(&mut backend, &mut pool, descs, &passes, FrameIndex(3), &source).unwrap();

    assert_eq!(
        backend.calls,
        vec!["clear", "clear", "derivative_seed", "copy", "copy"]
    );
    assert_eq!(state.last_frame, FrameIndex(3));
    assert_eq!(pool.stats().live_surfaces, 5);
    assert_eq!(pool.stats().retained_surfaces, 5);
    assert_eq!(pool.stats().alloc_surfaces, 10);
    assert_eq!(state.buffers.motion.canvas(), Canvas::new(2, 2).unwrap());
}

#[test]
fn run_frame_executes_stages_in_order() {
    let (mut pool, descs, passes, source) = setup();
    let mut backend = MockBackend::default();
    let mut state =
        initialize(&mut backend, &mut pool, descs, &passes, FrameIndex(0), &source).unwrap();
    backend.calls.clear();

    run_frame(&mut backend, &mut pool, &mut state, &passes, FrameIndex(1), &source).unwrap();
    assert_eq!(
        backend.calls,
        vec!["derivative", "motion", "accumulate", "composite", "copy"]
    );
    assert_eq!(state.last_frame, FrameIndex(1));
    assert_eq!(pool.stats().live_surfaces, 5);
    assert_eq!(pool.stats().retained_surfaces, 5);
    assert_eq!(pool.stats().alloc_surfaces, 10);
    assert_eq!(pool.stats().reused_surfaces, 5);
}

#[test]
fn failed_stage_leaves_state_untouched() {
    let (mut pool, descs, passes, source) = setup();
    let mut backend = MockBackend::default();
    let mut state =
        initialize(&mut backend, &mut pool, descs, &passes, FrameIndex(0), &source).unwrap();
    let composite_id = state.buffers.composite.id();

    backend.fail_on = Some("accumulate");
    let err = run_frame(&mut backend, &mut pool, &mut state, &passes, FrameIndex(1), &source)
        .unwrap_err();
    assert!(matches!(err, MoshError::Evaluation(_)));
    assert_eq!(state.last_frame, FrameIndex(0));
    assert_eq!(state.buffers.composite.id(), composite_id);
    assert_eq!(pool.stats().live_surfaces, 5);
    assert!(pool.is_live(composite_id));
}

#[test]
fn failed_seed_releases_partial_buffers() {
    let (mut pool, descs, passes, source) = setup();
    let mut backend = MockBackend {
        fail_on: Some("derivative_seed"),
        ..MockBackend::default()
    };
    assert!(initialize(&mut backend, &mut pool, descs, &passes, FrameIndex(0), &source).is_err());
    assert_eq!(pool.stats().live_surfaces, 0);
}

#[test]
fn acquisition_failure_releases_partial_buffers() {
    let mut pool = SurfacePool::new(SurfacePoolOpts {
        max_live_bytes: Some(2500),
        ..SurfacePoolOpts::default()
    });
    let (_, descs, passes, source) = setup();
    let mut backend = MockBackend::default();
    let err = initialize(&mut backend, &mut pool, descs, &passes, FrameIndex(0), &source)
        .unwrap_err();
    assert!(err.is_resource());
    assert!(backend.calls.is_empty());
    assert_eq!(pool.stats().live_surfaces, 0);
    assert_eq!(pool.stats().live_bytes, 0);
}

#[test]
fn initialize_succeeds_when_only_one_generation_fits() {
    let mut pool = SurfacePool::new(SurfacePoolOpts {
        max_live_bytes: Some(4000),
        ..SurfacePoolOpts::default()
    });
    let (_, descs, passes, source) = setup();
    let mut backend = MockBackend::default();
    initialize(&mut backend, &mut pool, descs, &passes, FrameIndex(0), &source).unwrap();
    assert_eq!(pool.stats().live_surfaces, 5);
    assert_eq!(pool.stats().live_bytes, 3200);
    assert_eq!(pool.stats().retained_surfaces, 0);
}
