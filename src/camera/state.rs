use glam::Mat4;

use crate::error::ClientError;

/// How the sensor size is fitted to the frame aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorFit {
    /// Fit along the larger frame dimension.
    #[default]
    Auto,
    /// Fit the sensor width to the frame width.
    Horizontal,
    /// Fit the sensor height to the frame height.
    Vertical,
}

impl SensorFit {
    /// Integer code used on the wire.
    #[must_use]
    pub const fn wire_code(self) -> i32 {
        match self {
            Self::Auto => 0,
            Self::Horizontal => 1,
            Self::Vertical => 2,
        }
    }
}

impl TryFrom<&str> for SensorFit {
    type Error = ClientError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name.to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "HORIZONTAL" => Ok(Self::Horizontal),
            "VERTICAL" => Ok(Self::Vertical),
            _ => Err(ClientError::InvalidCameraMode(format!(
                "unknown sensor fit '{name}'"
            ))),
        }
    }
}

/// Camera pose and projection as understood by the render server.
///
/// A plain value compared structurally on every redraw: any difference
/// (including float noise) counts as a camera change and restarts
/// accumulation on the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Camera-to-world transform, row-major.
    pub transform: [f32; 16],
    /// Field of view in degrees.
    pub fov: f32,
    /// Near clip distance.
    pub clip_start: f32,
    /// Far clip distance.
    pub clip_end: f32,
    /// Sensor width in millimetres.
    pub sensor_width: f32,
    /// Sensor height in millimetres.
    pub sensor_height: f32,
    /// Sensor fit mode.
    pub sensor_fit: SensorFit,
    /// Viewport zoom while looking through a scene camera.
    pub zoom: f32,
    /// Viewport pan offset while looking through a scene camera.
    pub offset: [f32; 2],
    /// The view is locked to a scene camera.
    pub camera_locked: bool,
    /// Lens shift (x, y).
    pub shift: [f32; 2],
}

impl CameraState {
    /// Camera-to-world transform as a column-major glam matrix.
    #[must_use]
    pub fn transform_matrix(&self) -> Mat4 {
        Mat4::from_cols_array(&self.transform).transpose()
    }

    /// Eye position in world space.
    #[must_use]
    pub fn position(&self) -> glam::Vec3 {
        self.transform_matrix().w_axis.truncate()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY.transpose().to_cols_array(),
            fov: 39.6,
            clip_start: 0.01,
            clip_end: 1000.0,
            sensor_width: 36.0,
            sensor_height: 24.0,
            sensor_fit: SensorFit::Auto,
            zoom: 1.0,
            offset: [0.0; 2],
            camera_locked: false,
            shift: [0.0; 2],
        }
    }
}
