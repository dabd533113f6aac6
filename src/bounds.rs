//! Spatial bounds and scalar range of the dataset being rendered.

use glam::Vec3;

use crate::error::ClientError;
use crate::session::Session;
use crate::transfer::{TransferFunction, VolumeMaterial};
use crate::transport::{DatasetRange, TransportBinding};

/// Axis-aligned bounds of the dataset with derived size and center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Lower corner.
    pub lower: Vec3,
    /// Upper corner.
    pub upper: Vec3,
    /// `upper - lower`.
    pub size: Vec3,
    /// `lower + size / 2`.
    pub center: Vec3,
    /// Scalar value range `[lo, hi]`.
    pub scalar_range: [f32; 2],
}

impl From<DatasetRange> for BoundingBox {
    fn from(range: DatasetRange) -> Self {
        let lower = Vec3::from_array(range.lower);
        let upper = Vec3::from_array(range.upper);
        let size = upper - lower;
        Self {
            lower,
            upper,
            size,
            center: lower + size / 2.0,
            scalar_range: range.scalar_range,
        }
    }
}

impl BoundingBox {
    /// Fit the material's domain to the dataset's scalar range.
    pub fn calibrate(&self, material: &mut VolumeMaterial) {
        material.domain = self.scalar_range;
    }

    /// Fit an already sampled transfer function's domain.
    pub fn calibrate_transfer_function(&self, tf: &mut TransferFunction) {
        tf.set_domain(self.scalar_range);
    }
}

/// Dataset bounds from the server state of the session's last frame,
/// `None` before the first frame. Nothing is sent to the server.
///
/// # Errors
///
/// [`ClientError::NotConnected`] if the session is not open.
pub fn query_bounds<B: TransportBinding>(
    session: &Session<B>,
) -> Result<Option<BoundingBox>, ClientError> {
    Ok(session.query_range()?.map(BoundingBox::from))
}
