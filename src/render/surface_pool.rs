use std::collections::{HashMap, HashSet};

use crate::foundation::error::{MoshError, MoshResult};
use crate::render::surface::{FilterMode, Image, PixelFormat, SurfaceDesc, SurfaceId};

/// Pool configuration for cached surfaces.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained surfaces per (w, h, format, filter) bucket.
    pub max_surfaces_per_bucket: usize,
    /// Budget for surfaces handed out and not yet released. `None` means unbounded.
    pub max_live_bytes: Option<usize>,
}

impl Default for SurfacePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_surfaces_per_bucket: 8,
            max_live_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SurfaceKey {
    w: u32,
    h: u32,
    format: PixelFormat,
    filter: FilterMode,
}

impl SurfaceKey {
    fn from_desc(desc: SurfaceDesc) -> Self {
        Self {
            w: desc.width,
            h: desc.height,
            format: desc.format,
            filter: desc.filter,
        }
    }

    fn desc(self) -> SurfaceDesc {
        SurfaceDesc {
            width: self.w,
            height: self.h,
            format: self.format,
            filter: self.filter,
        }
    }

    fn byte_len(self) -> usize {
        self.desc().byte_len()
    }
}

/// Counters describing pool activity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SurfacePoolStats {
    /// Surfaces currently handed out.
    pub live_surfaces: usize,
    /// Bytes of surfaces currently handed out.
    pub live_bytes: usize,
    /// Surfaces parked in buckets awaiting reuse.
    pub retained_surfaces: usize,
    /// Bytes parked in buckets awaiting reuse.
    pub retained_bytes: usize,
    /// Fresh allocations since construction.
    pub alloc_surfaces: u64,
    /// Bytes of fresh allocations since construction.
    pub alloc_bytes: u64,
    /// Acquisitions served from a bucket.
    pub reused_surfaces: u64,
    /// Releases that dropped the surface instead of retaining it.
    pub dropped_on_release: u64,
}

struct Bucket {
    key: SurfaceKey,
    surfaces: Vec<Image>,
}

/// Bounded pooled allocator for pipeline images.
///
/// Keyed by `(width, height, format, filter)`. Acquire/release happens at pass granularity, never
/// per texel. Reused surfaces keep stale content; callers that need a defined initial state must
/// run a clear pass.
pub struct SurfacePool {
    opts: SurfacePoolOpts,
    stats: SurfacePoolStats,

    live: HashSet<SurfaceId>,
    bucket_idx_by_key: HashMap<SurfaceKey, usize>,
    buckets: Vec<Bucket>,
}

impl SurfacePool {
    /// Create an empty pool.
    pub fn new(opts: SurfacePoolOpts) -> Self {
        Self {
            opts,
            stats: SurfacePoolStats::default(),
            live: HashSet::new(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> SurfacePoolStats {
        self.stats.clone()
    }

    /// Return `true` when `id` was acquired from this pool and not yet released.
    pub fn is_live(&self, id: SurfaceId) -> bool {
        self.live.contains(&id)
    }

    /// Hand out a surface matching `desc`, reusing a retained one when possible.
    pub fn acquire(&mut self, desc: SurfaceDesc) -> MoshResult<Image> {
        if desc.width == 0 || desc.height == 0 {
            return Err(MoshError::validation(format!(
                "cannot acquire a {}x{} surface",
                desc.width, desc.height
            )));
        }
        let key = SurfaceKey::from_desc(desc);
        let bytes = key.byte_len();

        if let Some(budget) = self.opts.max_live_bytes
            && self.stats.live_bytes.saturating_add(bytes) > budget
        {
            return Err(MoshError::resource(format!(
                "live surface budget exceeded: {} + {bytes} > {budget} bytes",
                self.stats.live_bytes
            )));
        }

        let img = match self.pop_retained(key) {
            Some(img) => {
                self.stats.reused_surfaces = self.stats.reused_surfaces.saturating_add(1);
                img
            }
            None => {
                let img = Image::try_alloc(desc)?;
                self.stats.alloc_surfaces = self.stats.alloc_surfaces.saturating_add(1);
                self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(bytes as u64);
                img
            }
        };

        self.live.insert(img.id());
        self.stats.live_surfaces = self.live.len();
        self.stats.live_bytes = self.stats.live_bytes.saturating_add(bytes);
        Ok(img)
    }

    /// Return a surface to the pool. `None` and surfaces this pool does not consider live are
    /// ignored.
    pub fn release(&mut self, image: Option<Image>) {
        let Some(image) = image else {
            return;
        };
        if !self.live.remove(&image.id()) {
            tracing::debug!(id = image.id().0, "release of non-live surface ignored");
            return;
        }

        let key = SurfaceKey::from_desc(image.desc());
        let bytes = key.byte_len();
        self.stats.live_surfaces = self.live.len();
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(bytes);

        if self.opts.max_pool_bytes == 0 || self.opts.max_surfaces_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bi = match self.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    key,
                    surfaces: Vec::new(),
                });
                self.bucket_idx_by_key.insert(key, i);
                i
            }
        };

        let bucket = &mut self.buckets[bi];
        if bucket.surfaces.len() >= self.opts.max_surfaces_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.surfaces.push(image);
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }

    /// Drop every retained surface. Live surfaces are unaffected.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.surfaces.clear();
        }
        self.stats.retained_surfaces = 0;
        self.stats.retained_bytes = 0;
    }

    fn pop_retained(&mut self, key: SurfaceKey) -> Option<Image> {
        let &bi = self.bucket_idx_by_key.get(&key)?;
        let bucket = &mut self.buckets[bi];
        debug_assert_eq!(bucket.key, key);
        let img = bucket.surfaces.pop()?;
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(key.byte_len());
        Some(img)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface_pool.rs"]
mod tests;
