pub(crate) mod blur;
/// Feedback compositor.
pub mod composite;
/// Luma, gradient and temporal derivative pass.
pub mod derivative;
/// Displacement field accumulator.
pub mod displacement;
/// Block motion estimator.
pub mod motion;
