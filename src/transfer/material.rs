use super::ramp::{ColorRamp, FloatCurve};

/// Host-side volume material the transfer function is sampled from.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMaterial {
    /// Scalar-to-color ramp; its alpha is the density unless a curve is set.
    pub color_ramp: Option<ColorRamp>,
    /// Scalar-to-density curve, overrides the ramp alpha.
    pub density_curve: Option<FloatCurve>,
    /// Scalar range mapped onto the color map.
    pub domain: [f32; 2],
    /// Density multiplier applied by the server.
    pub base_density: f32,
}

impl Default for VolumeMaterial {
    fn default() -> Self {
        Self {
            color_ramp: None,
            density_curve: None,
            domain: [0.0, 1.0],
            base_density: 1.0,
        }
    }
}

impl VolumeMaterial {
    /// Material with a color ramp.
    #[must_use]
    pub fn with_ramp(mut self, ramp: ColorRamp) -> Self {
        self.color_ramp = Some(ramp);
        self
    }

    /// Material with a density curve.
    #[must_use]
    pub fn with_density_curve(mut self, curve: FloatCurve) -> Self {
        self.density_curve = Some(curve);
        self
    }

    /// Material with an explicit scalar domain.
    #[must_use]
    pub const fn with_domain(mut self, lo: f32, hi: f32) -> Self {
        self.domain = [lo, hi];
        self
    }
}
