//! Fixed-layout packets exchanged with the render server.
//!
//! Every packet is `#[repr(C)]` plain old data made of 4-byte fields, so
//! its byte image is exactly the documented field order with no padding.

use bytemuck::{Pod, Zeroable};

use crate::camera::CameraState;
use crate::transfer::TransferFunction;

/// Acknowledgement byte for a successful message.
pub const ACK_OK: u8 = 0;

/// Camera block of a [`FrameRequest`].
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraPacket {
    /// First three rows of the row-major camera-to-world matrix.
    pub transform: [f32; 12],
    /// Field of view in degrees.
    pub lens: f32,
    /// Near clip.
    pub clip_start: f32,
    /// Far clip.
    pub clip_end: f32,
    /// Sensor width.
    pub sensor_width: f32,
    /// Sensor height.
    pub sensor_height: f32,
    /// Sensor fit code (0 auto, 1 horizontal, 2 vertical).
    pub sensor_fit: i32,
    /// Horizontal lens shift.
    pub shift_x: f32,
    /// Vertical lens shift.
    pub shift_y: f32,
    /// Stereo eye separation, unused.
    pub interocular_distance: f32,
    /// Stereo convergence, unused.
    pub convergence_distance: f32,
    /// Camera view zoom.
    pub view_camera_zoom: f32,
    /// Camera view pan offset.
    pub view_camera_offset: [f32; 2],
    /// Non-zero when looking through a scene camera.
    pub use_view_camera: i32,
}

impl From<&CameraState> for CameraPacket {
    fn from(camera: &CameraState) -> Self {
        let mut transform = [0.0; 12];
        transform.copy_from_slice(&camera.transform[..12]);
        Self {
            transform,
            lens: camera.fov,
            clip_start: camera.clip_start,
            clip_end: camera.clip_end,
            sensor_width: camera.sensor_width,
            sensor_height: camera.sensor_height,
            sensor_fit: camera.sensor_fit.wire_code(),
            shift_x: camera.shift[0],
            shift_y: camera.shift[1],
            interocular_distance: 0.0,
            convergence_distance: 0.0,
            view_camera_zoom: camera.zoom,
            view_camera_offset: camera.offset,
            use_view_camera: i32::from(camera.camera_locked),
        }
    }
}

/// Header sent on the camera channel before every frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameRequest {
    /// Framebuffer width.
    pub width: i32,
    /// Framebuffer height.
    pub height: i32,
    /// Non-zero asks the server to drop this client and listen again.
    pub reset: i32,
    /// Camera for the frame.
    pub camera: CameraPacket,
}

impl FrameRequest {
    /// Request a frame of `width` x `height` seen through `camera`.
    #[must_use]
    pub fn new(width: u32, height: u32, camera: &CameraState) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            reset: 0,
            camera: camera.into(),
        }
    }

    /// Disconnect request.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            reset: 1,
            ..Self::zeroed()
        }
    }
}

/// Server state sent on the data channel after every frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ServerState {
    /// Spatial lower corner of the dataset.
    pub lower: [f32; 3],
    /// Spatial upper corner of the dataset.
    pub upper: [f32; 3],
    /// Scalar value range of the dataset.
    pub scalars_range: [f32; 2],
    /// Samples accumulated for the current camera.
    pub samples: i32,
    /// Server-side frame rate.
    pub fps: f32,
}

/// Byte images of the three volume-parameter messages, in send order.
#[must_use]
pub fn volume_params(tf: &TransferFunction) -> [Vec<u8>; 3] {
    let domain = tf.domain();
    let density = [tf.base_density()];
    [
        bytemuck::cast_slice(tf.color_map()).to_vec(),
        bytemuck::cast_slice(&domain).to_vec(),
        bytemuck::cast_slice(&density).to_vec(),
    ]
}
