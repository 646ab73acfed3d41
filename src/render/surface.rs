use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::Canvas;
use crate::foundation::error::{MoshError, MoshResult};
use crate::foundation::math::{Texel, lerp_texel, quantize_f16, vec_len};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an [`Image`] allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    fn fresh() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Storage precision of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 32-bit float per channel.
    #[default]
    RgbaF32,
    /// 16-bit float per channel. Texels are kept as `f32` in memory but every pass output is
    /// rounded through binary16.
    RgbaF16,
}

impl PixelFormat {
    /// Bytes per texel a render target of this format occupies.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            PixelFormat::RgbaF32 => 16,
            PixelFormat::RgbaF16 => 8,
        }
    }
}

/// How [`Image::sample`] reconstructs values between texel centres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel. Required for motion and displacement fields so unrelated vectors never mix.
    #[default]
    Nearest,
    /// Bilinear interpolation of the four surrounding texels.
    Bilinear,
}

/// Surface declaration: dimensions, pixel format and filter mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Storage precision.
    pub format: PixelFormat,
    /// Sampling filter.
    pub filter: FilterMode,
}

impl SurfaceDesc {
    /// Full-precision, nearest-filtered surface (fields and derivative buffers).
    pub fn field(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            format: PixelFormat::RgbaF32,
            filter: FilterMode::Nearest,
        }
    }

    /// Dimensions of the surface.
    pub fn canvas(self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub(crate) fn texel_count(self) -> usize {
        self.canvas().texel_count()
    }

    pub(crate) fn byte_len(self) -> usize {
        self.texel_count()
            .saturating_mul(self.format.bytes_per_texel())
    }
}

/// A 2D grid of linear RGBA `f32` texels, row-major and tightly packed.
pub struct Image {
    id: SurfaceId,
    desc: SurfaceDesc,
    data: Vec<Texel>,
}

impl Clone for Image {
    // A clone is a distinct surface and gets its own id.
    fn clone(&self) -> Self {
        Self {
            id: SurfaceId::fresh(),
            desc: self.desc,
            data: self.data.clone(),
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Allocate a zero-filled image, reporting allocation failure instead of aborting.
    pub(crate) fn try_alloc(desc: SurfaceDesc) -> MoshResult<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(MoshError::validation(format!(
                "surface dimensions must be non-zero, got {}x{}",
                desc.width, desc.height
            )));
        }
        let len = desc.texel_count();
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            MoshError::resource(format!(
                "failed to allocate {}x{} surface: {e}",
                desc.width, desc.height
            ))
        })?;
        data.resize(len, [0.0; 4]);
        Ok(Self {
            id: SurfaceId::fresh(),
            desc,
            data,
        })
    }

    /// Build an image from host texels (full precision, nearest filtering).
    pub fn from_texels(width: u32, height: u32, data: Vec<Texel>) -> MoshResult<Self> {
        let canvas = Canvas::new(width, height)?;
        if data.len() != canvas.texel_count() {
            return Err(MoshError::validation(format!(
                "texel data length ({}) must equal width * height ({})",
                data.len(),
                canvas.texel_count()
            )));
        }
        Ok(Self {
            id: SurfaceId::fresh(),
            desc: SurfaceDesc::field(canvas),
            data,
        })
    }

    /// Build an image filled with a single texel value.
    pub fn filled(width: u32, height: u32, texel: Texel) -> MoshResult<Self> {
        let canvas = Canvas::new(width, height)?;
        Self::from_texels(width, height, vec![texel; canvas.texel_count()])
    }

    /// Build an image from tightly packed RGBA8 bytes, mapping `0..=255` to `0.0..=1.0`.
    ///
    /// The bytes are taken as already linear.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> MoshResult<Self> {
        let canvas = Canvas::new(width, height)?;
        let expected = canvas.texel_count().saturating_mul(4);
        if bytes.len() != expected {
            return Err(MoshError::validation(format!(
                "rgba8 data length ({}) must equal width * height * 4 ({expected})",
                bytes.len()
            )));
        }
        let data = bytes
            .chunks_exact(4)
            .map(|px| {
                [
                    f32::from(px[0]) / 255.0,
                    f32::from(px[1]) / 255.0,
                    f32::from(px[2]) / 255.0,
                    f32::from(px[3]) / 255.0,
                ]
            })
            .collect();
        Self::from_texels(width, height, data)
    }

    /// Convert to tightly packed RGBA8, clamping to `[0, 1]` and rounding.
    pub fn to_rgba8(&self) -> Vec<u8> {
        fn to_u8(v: f32) -> u8 {
            if v.is_nan() {
                return 0;
            }
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for t in &self.data {
            out.extend(t.iter().map(|&c| to_u8(c)));
        }
        out
    }

    /// Return a copy with a different format and filter mode.
    ///
    /// Converting to [`PixelFormat::RgbaF16`] rounds every texel through binary16.
    pub fn with_format(&self, format: PixelFormat, filter: FilterMode) -> Self {
        let mut out = self.clone();
        out.desc.format = format;
        out.desc.filter = filter;
        out.quantize_in_place();
        out
    }

    /// Surface identifier.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Surface declaration.
    pub fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    /// Dimensions.
    pub fn canvas(&self) -> Canvas {
        self.desc.canvas()
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// All texels, row-major.
    pub fn texels(&self) -> &[Texel] {
        &self.data
    }

    pub(crate) fn texels_mut(&mut self) -> &mut [Texel] {
        &mut self.data
    }

    /// Texel at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Texel {
        assert!(
            x < self.desc.width && y < self.desc.height,
            "texel ({x}, {y}) out of bounds for {}x{}",
            self.desc.width,
            self.desc.height
        );
        self.data[(y as usize) * (self.desc.width as usize) + (x as usize)]
    }

    /// Texel at `(x, y)` with coordinates clamped to the edge.
    pub fn get_clamped(&self, x: i64, y: i64) -> Texel {
        let cx = x.clamp(0, i64::from(self.desc.width) - 1) as usize;
        let cy = y.clamp(0, i64::from(self.desc.height) - 1) as usize;
        self.data[cy * (self.desc.width as usize) + cx]
    }

    /// Sample at texel-space `(x, y)` using this image's filter mode.
    pub fn sample(&self, x: f32, y: f32) -> Texel {
        match self.desc.filter {
            FilterMode::Nearest => self.sample_nearest(x, y),
            FilterMode::Bilinear => self.sample_bilinear(x, y),
        }
    }

    /// Nearest texel to texel-space `(x, y)`; integer coordinates are texel centres.
    pub fn sample_nearest(&self, x: f32, y: f32) -> Texel {
        if !x.is_finite() || !y.is_finite() {
            return self.get_clamped(0, 0);
        }
        self.get_clamped(x.round() as i64, y.round() as i64)
    }

    /// Bilinear sample at texel-space `(x, y)`; integer coordinates hit texel centres exactly.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> Texel {
        if !x.is_finite() || !y.is_finite() {
            return self.get_clamped(0, 0);
        }
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let top = if tx == 0.0 {
            self.get_clamped(ix, iy)
        } else {
            lerp_texel(self.get_clamped(ix, iy), self.get_clamped(ix + 1, iy), tx)
        };
        if ty == 0.0 {
            return top;
        }
        let bottom = if tx == 0.0 {
            self.get_clamped(ix, iy + 1)
        } else {
            lerp_texel(
                self.get_clamped(ix, iy + 1),
                self.get_clamped(ix + 1, iy + 1),
                tx,
            )
        };
        lerp_texel(top, bottom, ty)
    }

    /// Copy all texels from `src`, which must have the same dimensions.
    pub(crate) fn copy_from(&mut self, src: &Image) -> MoshResult<()> {
        if src.canvas() != self.canvas() {
            return Err(MoshError::evaluation(format!(
                "copy expects equal dimensions, got {}x{} -> {}x{}",
                src.width(),
                src.height(),
                self.width(),
                self.height()
            )));
        }
        self.data.copy_from_slice(&src.data);
        self.quantize_in_place();
        Ok(())
    }

    /// Round every texel to the storage precision of this image's format.
    pub(crate) fn quantize_in_place(&mut self) {
        if self.desc.format == PixelFormat::RgbaF16 {
            for t in &mut self.data {
                for c in t.iter_mut() {
                    *c = quantize_f16(*c);
                }
            }
        }
    }

    /// Largest `(r, g)` vector length over all texels; used for motion and displacement fields.
    pub fn max_vector_len(&self) -> f32 {
        self.data
            .iter()
            .map(|t| vec_len(t[0], t[1]))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
