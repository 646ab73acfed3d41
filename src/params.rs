use std::collections::HashSet;

use crate::foundation::error::{MoshError, MoshResult};

/// Value domain of a tunable parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamKind {
    /// Integer control, inclusive range.
    Int {
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// Floating-point control, inclusive range.
    Float {
        /// Smallest accepted value.
        min: f32,
        /// Largest accepted value.
        max: f32,
    },
}

/// Descriptor of one named control in a [`ParamSet`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamDesc {
    /// Binding name.
    pub name: &'static str,
    /// Value domain.
    pub kind: ParamKind,
    /// Default value.
    pub default: f64,
    /// Short description for host UIs.
    pub doc: &'static str,
}

impl ParamDesc {
    /// Clamp `value` into this descriptor's domain (integers are rounded).
    pub fn clamp(&self, value: f64) -> f64 {
        match self.kind {
            ParamKind::Int { min, max } => value.round().clamp(min as f64, max as f64),
            ParamKind::Float { min, max } => value.clamp(f64::from(min), f64::from(max)),
        }
    }

    fn contains(&self, value: f64) -> bool {
        match self.kind {
            ParamKind::Int { min, max } => {
                value.fract() == 0.0 && value >= min as f64 && value <= max as f64
            }
            ParamKind::Float { min, max } => value >= f64::from(min) && value <= f64::from(max),
        }
    }
}

/// Descriptor table for every control exposed by [`ParamSet`].
pub const PARAM_TABLE: &[ParamDesc] = &[
    ParamDesc {
        name: "block_size",
        kind: ParamKind::Int { min: 1, max: 256 },
        default: 4.0,
        doc: "Size of compression macroblock in pixels.",
    },
    ParamDesc {
        name: "denoise",
        kind: ParamKind::Float { min: 0.0, max: 1.0 },
        default: 0.01,
        doc: "Temporal luma changes below this are treated as noise.",
    },
    ParamDesc {
        name: "kernel_half_size",
        kind: ParamKind::Int { min: 1, max: 8 },
        default: 1.0,
        doc: "Half-size of the spatial derivative kernel.",
    },
    ParamDesc {
        name: "quality",
        kind: ParamKind::Float { min: 0.0, max: 1.0 },
        default: 0.8,
        doc: "Search precision (1 - entropy); lower values search a coarser grid.",
    },
    ParamDesc {
        name: "contrast",
        kind: ParamKind::Float {
            min: 0.0,
            max: 1000.0,
        },
        default: 50.0,
        doc: "Gain on gradient RMS; blocks reaching 1/contrast keep full match confidence.",
    },
    ParamDesc {
        name: "velocity_scale",
        kind: ParamKind::Float {
            min: 0.0,
            max: 16.0,
        },
        default: 1.0,
        doc: "Scale applied to estimated motion vectors.",
    },
    ParamDesc {
        name: "diffusion",
        kind: ParamKind::Float { min: 0.0, max: 1.0 },
        default: 0.1,
        doc: "Per-frame decay and neighbour smoothing of the displacement field.",
    },
    ParamDesc {
        name: "lod_bias",
        kind: ParamKind::Float { min: 0.0, max: 8.0 },
        default: 0.0,
        doc: "Coarse-scale blur of the displacement field (0 disables).",
    },
    ParamDesc {
        name: "eigen_min",
        kind: ParamKind::Float { min: 0.0, max: 1.0 },
        default: 0.0005,
        doc: "Minimum structure-tensor eigenvalue for a block's motion to be trusted.",
    },
    ParamDesc {
        name: "displace",
        kind: ParamKind::Float { min: 0.0, max: 1.0 },
        default: 0.9,
        doc: "Feedback mix: 1 keeps displaced content, 0 shows live video.",
    },
];

/// Validated view over [`PARAM_TABLE`].
#[derive(Clone, Copy, Debug)]
pub struct ParamTable {
    descs: &'static [ParamDesc],
}

impl ParamTable {
    /// Validate the built-in table: unique names, defaults inside their domains and matching
    /// [`ParamSet::default`].
    pub fn builtin() -> MoshResult<Self> {
        Self::validate(PARAM_TABLE)
    }

    pub(crate) fn validate(descs: &'static [ParamDesc]) -> MoshResult<Self> {
        let mut seen = HashSet::new();
        let defaults = ParamSet::default();
        for d in descs {
            if !seen.insert(d.name) {
                return Err(MoshError::validation(format!(
                    "duplicate parameter '{}'",
                    d.name
                )));
            }
            if !d.contains(d.default) {
                return Err(MoshError::validation(format!(
                    "default of '{}' is outside its range",
                    d.name
                )));
            }
            let actual = defaults.get(d.name)?;
            if (actual - d.default).abs() > 1e-6 {
                return Err(MoshError::validation(format!(
                    "default of '{}' disagrees with ParamSet::default ({actual} vs {})",
                    d.name, d.default
                )));
            }
        }
        Ok(Self { descs })
    }

    /// All descriptors in table order.
    pub fn descs(&self) -> &'static [ParamDesc] {
        self.descs
    }

    /// Look up a descriptor by name.
    pub fn find(&self, name: &str) -> Option<&'static ParamDesc> {
        self.descs.iter().find(|d| d.name == name)
    }
}

/// Flat set of named scalar controls. Immutable during a frame, mutable between frames.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamSet {
    /// Macroblock side in pixels.
    pub block_size: u32,
    /// Temporal derivative noise floor.
    pub denoise: f32,
    /// Spatial derivative kernel half-size.
    pub kernel_half_size: u32,
    /// Search precision (`1 - entropy`).
    pub quality: f32,
    /// Gradient-magnitude confidence gain.
    pub contrast: f32,
    /// Motion vector scale.
    pub velocity_scale: f32,
    /// Displacement decay/smoothing rate.
    pub diffusion: f32,
    /// Level-of-detail blur of the displacement field.
    pub lod_bias: f32,
    /// Minimum structure-tensor eigenvalue.
    pub eigen_min: f32,
    /// Feedback mix factor.
    pub displace: f32,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            block_size: 4,
            denoise: 0.01,
            kernel_half_size: 1,
            quality: 0.8,
            contrast: 50.0,
            velocity_scale: 1.0,
            diffusion: 0.1,
            lod_bias: 0.0,
            eigen_min: 0.0005,
            displace: 0.9,
        }
    }
}

impl ParamSet {
    /// Parse a JSON object. Missing fields take defaults; the result is sanitized.
    pub fn from_json_str(s: &str) -> MoshResult<Self> {
        let parsed: ParamSet =
            serde_json::from_str(s).map_err(|e| MoshError::serde(e.to_string()))?;
        Ok(parsed.sanitized())
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> MoshResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| MoshError::serde(e.to_string()))
    }

    /// Read a control by name.
    pub fn get(&self, name: &str) -> MoshResult<f64> {
        self.field(name)
            .ok_or_else(|| MoshError::validation(format!("unknown parameter '{name}'")))
    }

    fn field(&self, name: &str) -> Option<f64> {
        let v = match name {
            "block_size" => f64::from(self.block_size),
            "denoise" => f64::from(self.denoise),
            "kernel_half_size" => f64::from(self.kernel_half_size),
            "quality" => f64::from(self.quality),
            "contrast" => f64::from(self.contrast),
            "velocity_scale" => f64::from(self.velocity_scale),
            "diffusion" => f64::from(self.diffusion),
            "lod_bias" => f64::from(self.lod_bias),
            "eigen_min" => f64::from(self.eigen_min),
            "displace" => f64::from(self.displace),
            _ => return None,
        };
        Some(v)
    }

    /// Write a control by name, clamping into its range.
    pub fn set(&mut self, name: &str, value: f64) -> MoshResult<()> {
        let Some(desc) = PARAM_TABLE.iter().find(|d| d.name == name) else {
            return Err(MoshError::validation(format!("unknown parameter '{name}'")));
        };
        if !value.is_finite() {
            return Err(MoshError::validation(format!("parameter '{name}' must be finite")));
        }
        self.assign(desc, desc.clamp(value));
        Ok(())
    }

    /// Clamp every control into its range; non-finite values fall back to the default.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        for desc in PARAM_TABLE {
            let raw = self
                .field(desc.name)
                .filter(|v| v.is_finite())
                .unwrap_or(desc.default);
            out.assign(desc, desc.clamp(raw));
        }
        out
    }

    /// Store an already clamped value into the field named by `desc`.
    fn assign(&mut self, desc: &ParamDesc, v: f64) {
        match desc.name {
            "block_size" => self.block_size = v as u32,
            "denoise" => self.denoise = v as f32,
            "kernel_half_size" => self.kernel_half_size = v as u32,
            "quality" => self.quality = v as f32,
            "contrast" => self.contrast = v as f32,
            "velocity_scale" => self.velocity_scale = v as f32,
            "diffusion" => self.diffusion = v as f32,
            "lod_bias" => self.lod_bias = v as f32,
            "eigen_min" => self.eigen_min = v as f32,
            "displace" => self.displace = v as f32,
            other => debug_assert!(false, "parameter '{other}' has no ParamSet field"),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/params.rs"]
mod tests;
