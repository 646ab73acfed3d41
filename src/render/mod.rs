/// CPU pass backend.
pub mod cpu;
/// Pass descriptors and the backend seam.
pub mod passes;
/// Images, descriptors and sampling.
pub mod surface;
/// Buffer pool with lifetime tracking.
pub mod surface_pool;
