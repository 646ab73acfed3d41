use super::*;

fn frame(w: u32, h: u32, v: f32) -> Image {
    Image::filled(w, h, [v, v * 0.5, 1.0 - v, 1.0]).unwrap()
}

#[test]
fn new_pipeline_is_uninitialized() {
    let p = Pipeline::new(PipelineOpts::default()).unwrap();
    assert!(!p.is_ready());
    assert!(p.output().is_none());
    assert!(p.debug_views().is_none());
    assert_eq!(p.last_frame(), None);
    assert_eq!(p.pool_stats().live_surfaces, 0);
    assert_eq!(p.param_table().descs().len(), crate::params::PARAM_TABLE.len());
}

#[test]
fn first_frame_presents_source() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    let src = frame(8, 6, 0.25);
    let out = p.process(FrameIndex(0), &src, &ParamSet::default()).unwrap();
    assert_eq!(out.texels(), src.texels());
    assert_ne!(out.id(), src.id());

    let stats = p.stats();
    assert_eq!(stats.initializations, 1);
    assert_eq!(stats.frames_processed, 1);
    assert_eq!(p.pool_stats().live_surfaces, 5);
    assert_eq!(p.backend().passes_executed(), 5);
}

#[test]
fn duplicate_identifier_skips_all_passes() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    let params = ParamSet::default();
    p.process(FrameIndex(0), &frame(8, 8, 0.2), &params).unwrap();
    p.process(FrameIndex(1), &frame(8, 8, 0.4), &params).unwrap();
    let executed = p.backend().passes_executed();
    let id = p.output().unwrap().id();

    let out = p.process(FrameIndex(1), &frame(8, 8, 0.9), &params).unwrap();
    assert_eq!(out.id(), id);
    assert_eq!(p.backend().passes_executed(), executed);
    assert_eq!(p.stats().frames_duplicate, 1);
    assert_eq!(p.stats().frames_processed, 2);
}

#[test]
fn each_frame_swaps_in_a_new_generation() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    let params = ParamSet::default();
    let first = p.process(FrameIndex(0), &frame(8, 8, 0.2), &params).unwrap().id();
    let second = p.process(FrameIndex(1), &frame(8, 8, 0.3), &params).unwrap().id();
    assert_ne!(first, second);
    assert_eq!(p.last_frame(), Some(FrameIndex(1)));
    assert_eq!(p.pool_stats().live_surfaces, 5);
}

#[test]
fn half_precision_composite_is_quantized() {
    let opts = PipelineOpts {
        composite_format: PixelFormat::RgbaF16,
        ..PipelineOpts::default()
    };
    let mut p = Pipeline::new(opts).unwrap();
    let src = Image::filled(4, 4, [0.1, 0.2, 0.3, 1.0]).unwrap();
    let out = p.process(FrameIndex(0), &src, &ParamSet::default()).unwrap();
    assert_eq!(out.desc().format, PixelFormat::RgbaF16);
    assert_eq!(out.get(0, 0)[0], crate::foundation::math::quantize_f16(0.1));
}

#[test]
fn resolution_change_reinitializes() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    let params = ParamSet::default();
    p.process(FrameIndex(0), &frame(8, 8, 0.2), &params).unwrap();
    p.process(FrameIndex(1), &frame(8, 8, 0.3), &params).unwrap();

    let src = frame(12, 4, 0.7);
    let out = p.process(FrameIndex(2), &src, &params).unwrap();
    assert_eq!(out.texels(), src.texels());
    assert_eq!(p.stats().initializations, 2);
    assert_eq!(p.pool_stats().live_surfaces, 5);
    let views = p.debug_views().unwrap();
    assert_eq!(views.motion.canvas(), Canvas::new(3, 1).unwrap());
}

#[test]
fn block_size_change_reinitializes() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    p.process(FrameIndex(0), &frame(8, 8, 0.2), &ParamSet::default())
        .unwrap();
    let coarse = ParamSet {
        block_size: 8,
        ..ParamSet::default()
    };
    p.process(FrameIndex(1), &frame(8, 8, 0.3), &coarse).unwrap();
    assert_eq!(p.stats().initializations, 2);
    assert_eq!(
        p.debug_views().unwrap().displacement.canvas(),
        Canvas::new(1, 1).unwrap()
    );
}

#[test]
fn disable_releases_everything() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    let params = ParamSet::default();
    p.process(FrameIndex(0), &frame(8, 8, 0.2), &params).unwrap();
    p.process(FrameIndex(1), &frame(8, 8, 0.3), &params).unwrap();

    p.disable();
    assert!(!p.is_ready());
    let stats = p.pool_stats();
    assert_eq!(stats.live_surfaces, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.retained_surfaces, 0);

    // Same identifier after disable is a fresh start, not a duplicate.
    let src = frame(8, 8, 0.6);
    let out = p.process(FrameIndex(1), &src, &params).unwrap();
    assert_eq!(out.texels(), src.texels());
    assert_eq!(p.stats().frames_duplicate, 0);
}

#[test]
fn enable_with_hint_defers_allocation() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    p.enable(Some(Canvas::new(16, 16).unwrap()));
    assert!(!p.is_ready());
    assert_eq!(p.pool_stats().alloc_surfaces, 0);

    // A mismatching hint is only logged.
    p.process(FrameIndex(0), &frame(8, 8, 0.2), &ParamSet::default())
        .unwrap();
    assert!(p.is_ready());
}

#[test]
fn out_of_range_params_are_sanitized() {
    let mut p = Pipeline::new(PipelineOpts::default()).unwrap();
    let wild = ParamSet {
        block_size: 100_000,
        diffusion: f32::NAN,
        displace: 7.0,
        ..ParamSet::default()
    };
    p.process(FrameIndex(0), &frame(8, 8, 0.2), &wild).unwrap();
    p.process(FrameIndex(1), &frame(8, 8, 0.4), &wild).unwrap();
    let views = p.debug_views().unwrap();
    assert_eq!(views.motion.canvas(), Canvas::new(1, 1).unwrap());
    assert!(views.composite.texels().iter().flatten().all(|c| c.is_finite()));
}

#[test]
fn budget_failure_keeps_previous_output() {
    let opts = PipelineOpts {
        pool: SurfacePoolOpts {
            max_live_bytes: Some(4000),
            ..SurfacePoolOpts::default()
        },
        ..PipelineOpts::default()
    };
    let mut p = Pipeline::new(opts).unwrap();
    let params = ParamSet::default();
    let first = frame(8, 8, 0.2);
    p.process(FrameIndex(0), &first, &params).unwrap();
    assert_eq!(p.pool_stats().live_bytes, 3200);

    let err = p
        .process(FrameIndex(1), &frame(8, 8, 0.8), &params)
        .unwrap_err();
    assert!(err.is_resource());
    assert_eq!(p.last_frame(), Some(FrameIndex(0)));
    assert_eq!(p.output().unwrap().texels(), first.texels());
    assert_eq!(p.pool_stats().live_surfaces, 5);
}
