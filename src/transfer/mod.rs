//! Volume transfer function: scalar value to color and density.
//!
//! The server expects a fixed-length sampled color map plus the scalar
//! domain it spans and a base density. [`TransferFunction`] guarantees the
//! color map length so the wire never sees a short array.

mod material;
mod ramp;

pub use material::VolumeMaterial;
pub use ramp::{ColorRamp, ColorStop, FloatCurve, Interpolation};

/// Number of RGBA entries in the sampled color map.
pub const COLOR_MAP_COUNT: usize = 1024;

/// Color used when a material has no ramp.
const DEFAULT_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Sampled transfer function pushed wholesale on every render iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    color_map: Vec<[f32; 4]>,
    domain: [f32; 2],
    base_density: f32,
}

impl Default for TransferFunction {
    fn default() -> Self {
        Self::from_material(None)
    }
}

impl TransferFunction {
    /// Sample `material` at `v / COLOR_MAP_COUNT` for every entry `v`.
    ///
    /// Each entry is `(r, g, b, density)`. Without a material everything,
    /// including domain and base density, is zero.
    #[must_use]
    pub fn from_material(material: Option<&VolumeMaterial>) -> Self {
        let Some(material) = material else {
            return Self {
                color_map: vec![[0.0; 4]; COLOR_MAP_COUNT],
                domain: [0.0; 2],
                base_density: 0.0,
            };
        };

        let color_map = (0..COLOR_MAP_COUNT)
            .map(|v| {
                let t = v as f32 / COLOR_MAP_COUNT as f32;
                let color = material
                    .color_ramp
                    .as_ref()
                    .map_or(DEFAULT_COLOR, |ramp| ramp.evaluate(t));
                let density = material
                    .density_curve
                    .as_ref()
                    .map_or(color[3], |curve| curve.evaluate(t));
                [color[0], color[1], color[2], density]
            })
            .collect();

        Self {
            color_map,
            domain: material.domain,
            base_density: material.base_density,
        }
    }

    /// The `COLOR_MAP_COUNT` RGBA entries in ascending scalar order.
    #[must_use]
    pub fn color_map(&self) -> &[[f32; 4]] {
        &self.color_map
    }

    /// Scalar domain `[lo, hi]`.
    #[must_use]
    pub const fn domain(&self) -> [f32; 2] {
        self.domain
    }

    /// Base density.
    #[must_use]
    pub const fn base_density(&self) -> f32 {
        self.base_density
    }

    /// Replace the domain, keeping the sampled colors.
    pub fn set_domain(&mut self, domain: [f32; 2]) {
        self.domain = domain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_material_is_all_zero() {
        let tf = TransferFunction::from_material(None);
        assert_eq!(tf.color_map().len(), COLOR_MAP_COUNT);
        assert!(tf.color_map().iter().all(|c| *c == [0.0; 4]));
        assert_eq!(tf.domain(), [0.0, 0.0]);
        assert_eq!(tf.base_density(), 0.0);
    }

    #[test]
    fn material_without_ramp_uses_defaults() {
        let material = VolumeMaterial::default();
        let tf = TransferFunction::from_material(Some(&material));
        assert_eq!(tf.color_map().len(), COLOR_MAP_COUNT);
        assert!(tf.color_map().iter().all(|c| *c == [1.0, 0.0, 0.0, 1.0]));
        assert_eq!(tf.domain(), [0.0, 1.0]);
        assert_eq!(tf.base_density(), 1.0);
    }

    #[test]
    fn ramp_alpha_is_density_unless_curve_given() {
        let ramp = ColorRamp::new(
            vec![
                ColorStop {
                    position: 0.0,
                    color: [0.0, 0.0, 1.0, 0.0],
                },
                ColorStop {
                    position: 1.0,
                    color: [1.0, 1.0, 0.0, 1.0],
                },
            ],
            Interpolation::Linear,
        );
        let material = VolumeMaterial::default().with_ramp(ramp);
        let tf = TransferFunction::from_material(Some(&material));
        let map = tf.color_map();
        // Ascending sample positions: entry 512 sits at t = 0.5.
        assert_eq!(map[0], [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(map[512], [0.5, 0.5, 0.5, 0.5]);
        assert!(map.windows(2).all(|w| w[0][3] <= w[1][3]));

        let curve = FloatCurve::new(vec![[0.0, 0.25], [1.0, 0.25]]);
        let tf = TransferFunction::from_material(Some(
            &material.with_density_curve(curve).with_domain(-2.0, 8.0),
        ));
        assert_eq!(tf.color_map()[512], [0.5, 0.5, 0.5, 0.25]);
        assert_eq!(tf.domain(), [-2.0, 8.0]);
    }
}
