//! Connection parameters and lifecycle of one render server session.
//!
//! A [`Session`] owns its [`TransportBinding`]. The viewport driver owns the
//! session and shares it with the render loop worker behind a mutex; there
//! is no process-wide state.

use std::sync::Arc;

use crate::camera::CameraState;
use crate::error::ClientError;
use crate::transfer::TransferFunction;
use crate::transport::{DatasetRange, Endpoint, Frame, TransportBinding};

/// Parameters a session is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Server address.
    pub endpoint: Endpoint,
    /// Initial framebuffer width.
    pub width: u32,
    /// Initial framebuffer height.
    pub height: u32,
    /// Number of animation timesteps the server exposes (at least 1).
    pub timesteps: u32,
}

/// One logical connection to a render server.
pub struct Session<B: TransportBinding> {
    params: SessionParams,
    binding: B,
    scene_frame: u32,
}

impl<B: TransportBinding> Session<B> {
    /// Store `params` without connecting. Zero sizes and timestep counts are
    /// raised to 1.
    pub fn init(mut params: SessionParams, binding: B) -> Self {
        params.width = params.width.max(1);
        params.height = params.height.max(1);
        params.timesteps = params.timesteps.max(1);
        Self {
            params,
            binding,
            scene_frame: 0,
        }
    }

    /// Connect both channels.
    ///
    /// # Errors
    ///
    /// [`ClientError::ConnectFailed`] if the server cannot be reached.
    pub fn open(&mut self) -> Result<(), ClientError> {
        let SessionParams {
            endpoint,
            width,
            height,
            ..
        } = &self.params;
        log::info!(
            "Opening session to {}:{}/{}",
            endpoint.host,
            endpoint.cam_port,
            endpoint.data_port
        );
        self.binding.connect(endpoint, *width, *height)
    }

    /// Disconnect. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.binding.disconnect();
    }

    /// Whether the binding is connected.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.binding.is_connected()
    }

    /// Session parameters, with the current resolution.
    #[must_use]
    pub const fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Current `(width, height)`.
    #[must_use]
    pub const fn resolution(&self) -> (u32, u32) {
        (self.params.width, self.params.height)
    }

    /// Store a new resolution and forward it when connected.
    ///
    /// # Errors
    ///
    /// Propagates binding failures.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(), ClientError> {
        self.params.width = width.max(1);
        self.params.height = height.max(1);
        if self.binding.is_connected() {
            self.binding.resize(self.params.width, self.params.height)?;
        }
        Ok(())
    }

    /// Record the host's current animation frame.
    pub fn set_scene_frame(&mut self, frame: u32) {
        self.scene_frame = frame;
    }

    /// Timestep the next iteration renders, `None` for single-timestep
    /// data.
    #[must_use]
    pub const fn timestep(&self) -> Option<u32> {
        if self.params.timesteps > 1 {
            Some(self.scene_frame % self.params.timesteps)
        } else {
            None
        }
    }

    /// One render round trip: select the timestep, push camera and volume
    /// parameters, pull the frame. Returns the accumulated sample count.
    ///
    /// # Errors
    ///
    /// The first failing transport call aborts the iteration.
    pub fn render_iteration(
        &mut self,
        camera: &CameraState,
        tf: &TransferFunction,
    ) -> Result<u32, ClientError> {
        if let Some(timestep) = self.timestep() {
            self.binding.set_timestep(timestep)?;
        }
        self.binding.push_camera(camera)?;
        self.binding.push_volume_params(tf)?;
        let delta = self.binding.pull_frame()?;
        log::debug!("Pulled frame (+{delta} samples)");
        self.binding.current_samples()
    }

    /// Samples accumulated for the current camera.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `open`.
    pub fn current_samples(&self) -> Result<u32, ClientError> {
        self.binding.current_samples()
    }

    /// Frame rate reported by the server.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `open`.
    pub fn remote_fps(&self) -> Result<f32, ClientError> {
        self.binding.remote_fps()
    }

    /// Rate at which frames arrive locally.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `open`.
    pub fn local_fps(&self) -> Result<f32, ClientError> {
        self.binding.local_fps()
    }

    /// Bounds and scalar range from the last pulled frame, `None` before
    /// the first one. No round trip.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] before `open`.
    pub fn query_range(&self) -> Result<Option<DatasetRange>, ClientError> {
        self.binding.query_range()
    }

    /// The resident frame.
    #[must_use]
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.binding.latest_frame()
    }

    /// The underlying binding.
    #[must_use]
    pub const fn binding(&self) -> &B {
        &self.binding
    }
}

impl<B: TransportBinding> Drop for Session<B> {
    fn drop(&mut self) {
        self.close();
    }
}
