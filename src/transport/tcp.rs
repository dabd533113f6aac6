use std::sync::Arc;

use bytemuck::Zeroable;
use rustc_hash::FxHashMap;

use super::channel::Channel;
use super::wire::{self, FrameRequest, ServerState};
use super::{
    ConnectPolicy, DatasetRange, Endpoint, Frame, FrameHandle,
    TransportBinding,
};
use crate::camera::CameraState;
use crate::error::ClientError;
use crate::transfer::TransferFunction;
use crate::util::frame_timing::FrameTiming;

/// Camera and data channel of one timestep.
#[derive(Debug)]
struct Link {
    cam: Channel,
    data: Channel,
}

impl Link {
    fn open(
        endpoint: &Endpoint,
        offset: u32,
        policy: &ConnectPolicy,
    ) -> Result<Self, ClientError> {
        let cam_port = offset_port(endpoint.cam_port, offset, &endpoint.host)?;
        let data_port =
            offset_port(endpoint.data_port, offset, &endpoint.host)?;
        // Camera first: the server accepts in that order.
        let cam = Channel::connect(&endpoint.host, cam_port, policy)?;
        let data = Channel::connect(&endpoint.host, data_port, policy)?;
        log::info!(
            "Opened timestep {offset} channels {} / {}",
            cam.addr(),
            data.addr()
        );
        Ok(Self { cam, data })
    }

    fn close(self, send_reset: bool) {
        let Self { mut cam, data } = self;
        if send_reset {
            let reset = FrameRequest::reset();
            if let Err(e) = cam.send("reset", &[bytemuck::bytes_of(&reset)]) {
                log::debug!("Reset on {} not acknowledged: {e}", cam.addr());
            }
        }
        cam.close();
        data.close();
    }
}

fn offset_port(base: u16, offset: u32, host: &str) -> Result<u16, ClientError> {
    u16::try_from(offset)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or_else(|| ClientError::ConnectFailed {
            addr: format!("{host}:{base}+{offset}"),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "timestep port out of range",
            ),
        })
}

/// [`TransportBinding`] over the two-channel TCP protocol.
///
/// Channels of every visited timestep stay open until
/// [`disconnect`](TransportBinding::disconnect), so scrubbing back to a
/// timestep does not reconnect.
pub struct TcpBinding {
    policy: ConnectPolicy,
    endpoint: Option<Endpoint>,
    links: FxHashMap<u32, Link>,
    timestep: u32,
    width: u32,
    height: u32,
    generation: u64,
    frame: Option<Arc<Frame>>,
    state: Option<ServerState>,
    timing: FrameTiming,
}

impl TcpBinding {
    /// Binding that connects according to `policy`.
    #[must_use]
    pub fn new(policy: ConnectPolicy) -> Self {
        Self {
            policy,
            endpoint: None,
            links: FxHashMap::default(),
            timestep: 0,
            width: 1,
            height: 1,
            generation: 0,
            frame: None,
            state: None,
            timing: FrameTiming::new(),
        }
    }

    /// Current timestep index.
    #[must_use]
    pub const fn timestep(&self) -> u32 {
        self.timestep
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn link(&mut self) -> Result<&mut Link, ClientError> {
        if self.endpoint.is_none() {
            return Err(ClientError::NotConnected);
        }
        self.links
            .get_mut(&self.timestep)
            .ok_or(ClientError::NotConnected)
    }

    /// Run `f` on the current link; a failure drops every channel.
    fn with_link<T>(
        &mut self,
        f: impl FnOnce(&mut Link) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let result = f(self.link()?);
        if let Err(e) = &result {
            log::warn!("Dropping server connection: {e}");
            for (_, link) in self.links.drain() {
                link.close(false);
            }
            self.endpoint = None;
        }
        result
    }

    fn invalidate_frame(&mut self) {
        self.frame = None;
    }
}

impl TransportBinding for TcpBinding {
    fn connect(
        &mut self,
        endpoint: &Endpoint,
        width: u32,
        height: u32,
    ) -> Result<(), ClientError> {
        self.disconnect();
        let link = Link::open(endpoint, self.timestep, &self.policy)?;
        drop(self.links.insert(self.timestep, link));
        self.endpoint = Some(endpoint.clone());
        self.width = width.max(1);
        self.height = height.max(1);
        self.state = None;
        self.timing.reset();
        log::info!(
            "Connected to render server {} ({}x{})",
            endpoint.host,
            self.width,
            self.height
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        let was_connected = self.endpoint.take().is_some();
        for (_, link) in self.links.drain() {
            link.close(was_connected);
        }
        self.invalidate_frame();
        if was_connected {
            log::info!("Disconnected from render server");
        }
    }

    fn is_connected(&self) -> bool {
        self.endpoint.is_some() && self.links.contains_key(&self.timestep)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.width = width.max(1);
        self.height = height.max(1);
        self.invalidate_frame();
        log::debug!("Framebuffer resized to {}x{}", self.width, self.height);
        Ok(())
    }

    fn set_timestep(&mut self, index: u32) -> Result<(), ClientError> {
        let Some(endpoint) = self.endpoint.clone() else {
            return Err(ClientError::NotConnected);
        };
        if index == self.timestep && self.links.contains_key(&index) {
            return Ok(());
        }
        if !self.links.contains_key(&index) {
            let link = Link::open(&endpoint, index, &self.policy)?;
            drop(self.links.insert(index, link));
        }
        self.timestep = index;
        self.state = None;
        self.invalidate_frame();
        Ok(())
    }

    fn push_camera(&mut self, camera: &CameraState) -> Result<(), ClientError> {
        let request = FrameRequest::new(self.width, self.height, camera);
        self.with_link(|link| {
            link.cam.send("push_camera", &[bytemuck::bytes_of(&request)])
        })?;
        Ok(())
    }

    fn push_volume_params(
        &mut self,
        tf: &TransferFunction,
    ) -> Result<(), ClientError> {
        let [color_map, domain, density] = wire::volume_params(tf);
        self.with_link(|link| {
            link.cam
                .send("push_volume_params", &[&color_map, &domain, &density])
        })
    }

    fn pull_frame(&mut self) -> Result<u32, ClientError> {
        let (width, height) = (self.width, self.height);
        let (pixels, state) = self.with_link(|link| {
            let mut pixels = vec![0_u8; Frame::byte_len(width, height)];
            link.data.recv("pull_frame", &mut pixels)?;
            let mut state = ServerState::zeroed();
            link.data
                .recv("pull_frame", bytemuck::bytes_of_mut(&mut state))?;
            Ok((pixels, state))
        })?;

        let samples = state.samples.max(0) as u32;
        let previous = self.state.map_or(0, |s| s.samples.max(0) as u32);
        // A drop means the server restarted accumulation.
        let delta = samples.checked_sub(previous).unwrap_or(samples);

        self.generation += 1;
        self.frame = Some(Arc::new(Frame {
            handle: FrameHandle {
                generation: self.generation,
                width,
                height,
            },
            pixels,
            samples,
        }));
        self.state = Some(state);
        self.timing.end_frame();
        Ok(delta)
    }

    fn current_samples(&self) -> Result<u32, ClientError> {
        self.ensure_connected()?;
        Ok(self.state.map_or(0, |s| s.samples.max(0) as u32))
    }

    fn remote_fps(&self) -> Result<f32, ClientError> {
        self.ensure_connected()?;
        Ok(self.state.map_or(0.0, |s| s.fps))
    }

    fn local_fps(&self) -> Result<f32, ClientError> {
        self.ensure_connected()?;
        Ok(self.timing.fps())
    }

    fn query_range(&self) -> Result<Option<DatasetRange>, ClientError> {
        self.ensure_connected()?;
        Ok(self.state.map(|state| DatasetRange {
            lower: state.lower,
            upper: state.upper,
            scalar_range: state.scalars_range,
        }))
    }

    fn texture_handle(&self) -> Result<Option<FrameHandle>, ClientError> {
        self.ensure_connected()?;
        Ok(self.frame.as_ref().map(|f| f.handle))
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.frame.clone()
    }
}

impl Drop for TcpBinding {
    fn drop(&mut self) {
        self.disconnect();
    }
}
