pub(crate) mod frame;
/// Frame-by-frame datamosh driver.
pub mod pipeline;
pub(crate) mod state;
