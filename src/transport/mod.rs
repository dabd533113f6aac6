//! Request/response plumbing to the render server.
//!
//! [`TransportBinding`] is the seam between the session logic and the
//! wire: every method maps to one remote round trip or to a cached value
//! from the last one. [`TcpBinding`] speaks the two-channel TCP protocol;
//! tests substitute recording bindings.
//!
//! # Channels
//!
//! The *camera channel* carries a [`wire::FrameRequest`] followed by the
//! volume parameters for every frame. The *data channel* carries the RGBA8
//! pixels followed by a [`wire::ServerState`]. Both use the acknowledged
//! framing of [`channel::Channel`].

pub mod channel;
mod frame;
mod tcp;
pub mod wire;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing;

use std::sync::Arc;

pub use frame::{Frame, FrameHandle};
pub use tcp::TcpBinding;
use web_time::Duration;

use crate::camera::CameraState;
use crate::error::ClientError;
use crate::options::ConnectionOptions;
use crate::transfer::TransferFunction;

/// Address of one render server: a host and its two channel ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Server host name or address.
    pub host: String,
    /// Camera-channel port (timestep 0).
    pub cam_port: u16,
    /// Data-channel port (timestep 0).
    pub data_port: u16,
}

impl From<&ConnectionOptions> for Endpoint {
    fn from(options: &ConnectionOptions) -> Self {
        Self {
            host: options.host.clone(),
            cam_port: options.cam_port,
            data_port: options.data_port,
        }
    }
}

/// How to open channels against a server that may still be starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Attempts per channel, 0 for unlimited.
    pub attempts: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
    /// Socket read/write timeout.
    pub io_timeout: Option<Duration>,
}

impl From<&ConnectionOptions> for ConnectPolicy {
    fn from(options: &ConnectionOptions) -> Self {
        Self {
            attempts: options.connect_attempts,
            retry_interval: options.retry_interval(),
            io_timeout: options.io_timeout(),
        }
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self::from(&ConnectionOptions::default())
    }
}

/// Spatial bounds and scalar range of the loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DatasetRange {
    /// Lower spatial corner.
    pub lower: [f32; 3],
    /// Upper spatial corner.
    pub upper: [f32; 3],
    /// Scalar value range `[lo, hi]`.
    pub scalar_range: [f32; 2],
}

/// Blocking calls against one remote render server.
///
/// Every method other than [`connect`](Self::connect),
/// [`disconnect`](Self::disconnect), [`is_connected`](Self::is_connected)
/// and [`latest_frame`](Self::latest_frame) returns
/// [`ClientError::NotConnected`] while no connection is established.
pub trait TransportBinding: Send {
    /// Open the camera channel, then the data channel.
    ///
    /// # Errors
    ///
    /// [`ClientError::ConnectFailed`] if either channel cannot be opened; no
    /// channel stays open in that case.
    fn connect(
        &mut self,
        endpoint: &Endpoint,
        width: u32,
        height: u32,
    ) -> Result<(), ClientError>;

    /// Tell the server to drop us and close all channels. Idempotent.
    fn disconnect(&mut self);

    /// Whether channels for the current timestep are open.
    fn is_connected(&self) -> bool;

    /// Change the framebuffer size requested from the server and drop the
    /// current frame.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), ClientError>;

    /// Switch to the channels of animation timestep `index`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`, or
    /// [`ClientError::ConnectFailed`] if the timestep's ports are closed.
    fn set_timestep(&mut self, index: u32) -> Result<(), ClientError>;

    /// Send the frame request carrying `camera`.
    ///
    /// # Errors
    ///
    /// [`ClientError::TransportCallFailed`] on any wire failure.
    fn push_camera(&mut self, camera: &CameraState) -> Result<(), ClientError>;

    /// Send color map, domain and base density.
    ///
    /// # Errors
    ///
    /// [`ClientError::TransportCallFailed`] on any wire failure.
    fn push_volume_params(
        &mut self,
        tf: &TransferFunction,
    ) -> Result<(), ClientError>;

    /// Block until the next frame arrives. Returns the samples added since
    /// the previous frame.
    ///
    /// # Errors
    ///
    /// [`ClientError::TransportCallFailed`] on any wire failure.
    fn pull_frame(&mut self) -> Result<u32, ClientError>;

    /// Samples accumulated for the current camera.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`.
    fn current_samples(&self) -> Result<u32, ClientError>;

    /// Frame rate reported by the server.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`.
    fn remote_fps(&self) -> Result<f32, ClientError>;

    /// Smoothed rate at which frames arrive here.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`.
    fn local_fps(&self) -> Result<f32, ClientError>;

    /// Bounds and scalar range of the dataset from the last server state.
    /// Never touches the wire; `None` until a frame has been pulled.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`.
    fn query_range(&self) -> Result<Option<DatasetRange>, ClientError>;

    /// Handle of the resident frame, `None` until one has been pulled at the
    /// current size.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `connect`.
    fn texture_handle(&self) -> Result<Option<FrameHandle>, ClientError>;

    /// The resident frame.
    fn latest_frame(&self) -> Option<Arc<Frame>>;
}
