use crate::foundation::error::{MoshError, MoshResult};

/// Host-supplied frame identifier used for duplicate-delivery detection.
///
/// Any monotonically increasing counter works; the pipeline only compares identifiers for
/// equality with the last processed one.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// The identifier following this one (saturating).
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create validated dimensions (both sides must be non-zero).
    pub fn new(width: u32, height: u32) -> MoshResult<Self> {
        if width == 0 || height == 0 {
            return Err(MoshError::validation(format!(
                "canvas dimensions must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of texels covered by the canvas.
    pub fn texel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Dimensions of the macroblock grid covering this canvas.
    ///
    /// Partial edge blocks count as whole blocks. `block_size` is clamped to at least 1.
    pub fn block_grid(self, block_size: u32) -> Canvas {
        let bs = block_size.max(1);
        Canvas {
            width: self.width.div_ceil(bs).max(1),
            height: self.height.div_ceil(bs).max(1),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
