use glam::Mat4;

use super::state::{CameraState, SensorFit};
use crate::error::ClientError;

/// Sensor size of the free viewport, in millimetres.
pub const VIEWPORT_SENSOR_SIZE: f32 = 72.0;

/// Projection of the host viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPerspective {
    /// Free perspective view.
    Perspective,
    /// Free orthographic view.
    Orthographic,
    /// Looking through a scene camera.
    Camera,
}

/// Projection type of a scene camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraProjection {
    /// Pinhole perspective.
    Perspective,
    /// Parallel projection.
    Orthographic,
    /// Panoramic/fisheye projection.
    Panoramic,
}

/// Scene camera data the view is locked to.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraObject {
    /// Projection type.
    pub projection: CameraProjection,
    /// Focal length in millimetres.
    pub lens: f32,
    /// Near clip distance.
    pub clip_start: f32,
    /// Far clip distance.
    pub clip_end: f32,
    /// Sensor width in millimetres.
    pub sensor_width: f32,
    /// Sensor height in millimetres.
    pub sensor_height: f32,
    /// Host name of the sensor fit mode (`AUTO`, `HORIZONTAL`, `VERTICAL`).
    pub sensor_fit: String,
    /// Horizontal lens shift.
    pub shift_x: f32,
    /// Vertical lens shift.
    pub shift_y: f32,
}

/// Everything the host tells us about its viewport on one redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewInput {
    /// Region width in pixels.
    pub width: u32,
    /// Region height in pixels.
    pub height: u32,
    /// Viewport projection.
    pub perspective: ViewPerspective,
    /// World-to-view matrix of the viewport.
    pub view_matrix: Mat4,
    /// Viewport focal length in millimetres.
    pub lens: f32,
    /// Viewport near clip.
    pub clip_start: f32,
    /// Viewport far clip.
    pub clip_end: f32,
    /// Scene camera, required in [`ViewPerspective::Camera`].
    pub camera: Option<CameraObject>,
    /// Zoom of the camera view.
    pub camera_zoom: f32,
    /// Pan offset of the camera view.
    pub camera_offset: [f32; 2],
}

impl ViewInput {
    /// Free perspective view of the given size looking through `view_matrix`.
    #[must_use]
    pub fn perspective(width: u32, height: u32, view_matrix: Mat4) -> Self {
        Self {
            width,
            height,
            perspective: ViewPerspective::Perspective,
            view_matrix,
            lens: 50.0,
            clip_start: 0.01,
            clip_end: 1000.0,
            camera: None,
            camera_zoom: 0.0,
            camera_offset: [0.0; 2],
        }
    }

    /// Ratio of the larger to the smaller region dimension.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let max = self.width.max(self.height).max(1) as f32;
        let min = self.width.min(self.height).max(1) as f32;
        max / min
    }
}

/// Comparable render settings of the viewport: camera plus resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSettings {
    /// Camera sent to the server.
    pub camera: CameraState,
    /// Render width, at least 1.
    pub width: u32,
    /// Render height, at least 1.
    pub height: u32,
}

impl ViewportSettings {
    /// Derive settings from a host view.
    ///
    /// `cam_rotation_x` is applied about X on top of the inverted view
    /// matrix, matching the server's up-axis convention.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidCameraMode`] for orthographic views,
    /// non-perspective scene cameras, a camera view without a camera, or an
    /// unknown sensor fit.
    pub fn from_view(
        view: &ViewInput,
        cam_rotation_x: f32,
    ) -> Result<Self, ClientError> {
        let ratio = view.aspect_ratio();
        let transform = (Mat4::from_rotation_x(cam_rotation_x)
            * view.view_matrix.inverse())
        .transpose()
        .to_cols_array();

        let camera = match view.perspective {
            ViewPerspective::Perspective => CameraState {
                transform,
                fov: fov_degrees(view.lens, ratio),
                clip_start: view.clip_start,
                clip_end: view.clip_end,
                sensor_width: VIEWPORT_SENSOR_SIZE,
                sensor_height: VIEWPORT_SENSOR_SIZE,
                sensor_fit: SensorFit::Auto,
                zoom: 1.0,
                offset: [0.0; 2],
                camera_locked: false,
                shift: [0.0; 2],
            },
            ViewPerspective::Camera => {
                let object = view.camera.as_ref().ok_or_else(|| {
                    ClientError::InvalidCameraMode(
                        "camera view without a scene camera".to_owned(),
                    )
                })?;
                from_camera_object(object, transform, ratio, view)?
            }
            ViewPerspective::Orthographic => {
                return Err(ClientError::InvalidCameraMode(
                    "orthographic viewport is not supported".to_owned(),
                ));
            }
        };

        Ok(Self {
            camera,
            width: view.width.max(1),
            height: view.height.max(1),
        })
    }

    /// `(width, height)` of the render.
    #[must_use]
    pub const fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn from_camera_object(
    object: &CameraObject,
    transform: [f32; 16],
    ratio: f32,
    view: &ViewInput,
) -> Result<CameraState, ClientError> {
    if object.projection != CameraProjection::Perspective {
        return Err(ClientError::InvalidCameraMode(format!(
            "{:?} scene cameras are not supported",
            object.projection
        )));
    }
    Ok(CameraState {
        transform,
        fov: fov_degrees(object.lens, ratio),
        clip_start: object.clip_start,
        clip_end: object.clip_end,
        sensor_width: object.sensor_width,
        sensor_height: object.sensor_height,
        sensor_fit: SensorFit::try_from(object.sensor_fit.as_str())?,
        zoom: view.camera_zoom,
        offset: view.camera_offset,
        camera_locked: true,
        shift: [object.shift_x, object.shift_y],
    })
}

/// Field of view (degrees) of a `lens` mm focal length on the viewport
/// sensor, narrowed by the frame aspect ratio.
fn fov_degrees(lens: f32, ratio: f32) -> f32 {
    (2.0 * (0.5 * VIEWPORT_SENSOR_SIZE / lens / ratio).atan()).to_degrees()
}
