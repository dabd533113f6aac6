//! Test doubles: a TCP server speaking the wire protocol and a recording
//! binding.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytemuck::Zeroable;
use web_time::Duration;

use super::wire::{CameraPacket, FrameRequest, ServerState, ACK_OK};
use super::{
    ConnectPolicy, DatasetRange, Endpoint, Frame, FrameHandle,
    TransportBinding,
};
use crate::camera::CameraState;
use crate::error::ClientError;
use crate::transfer::{TransferFunction, COLOR_MAP_COUNT};

/// What the mock server observed.
#[derive(Debug, Default)]
pub(crate) struct MockLog {
    pub frames: u32,
    pub last_size: (u32, u32),
    pub last_domain: [f32; 2],
    pub got_reset: bool,
}

/// Single-client render server on ephemeral ports.
pub(crate) struct MockServer {
    cam_port: u16,
    data_port: u16,
    handle: JoinHandle<MockLog>,
}

impl MockServer {
    pub const SCALAR_RANGE: [f32; 2] = [0.5, 9.5];

    pub fn policy() -> ConnectPolicy {
        ConnectPolicy {
            attempts: 50,
            retry_interval: Duration::from_millis(20),
            io_timeout: Some(Duration::from_secs(10)),
        }
    }

    pub fn spawn(lower: [f32; 3], upper: [f32; 3]) -> Self {
        Self::start(lower, upper, None)
    }

    /// Server that drops both channels after `frames` frames.
    pub fn spawn_closing_after(frames: u32) -> Self {
        Self::start([0.0; 3], [1.0; 3], Some(frames))
    }

    fn start(
        lower: [f32; 3],
        upper: [f32; 3],
        close_after: Option<u32>,
    ) -> Self {
        let cam = TcpListener::bind("127.0.0.1:0").unwrap();
        let data = TcpListener::bind("127.0.0.1:0").unwrap();
        let cam_port = cam.local_addr().unwrap().port();
        let data_port = data.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (cam, _) = cam.accept().unwrap();
            let (data, _) = data.accept().unwrap();
            serve(cam, data, lower, upper, close_after)
        });
        Self {
            cam_port,
            data_port,
            handle,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: "127.0.0.1".to_owned(),
            cam_port: self.cam_port,
            data_port: self.data_port,
        }
    }

    /// Wait for the client to leave and return what the server saw.
    pub fn join(self) -> MockLog {
        self.handle.join().unwrap()
    }
}

fn serve(
    mut cam: TcpStream,
    mut data: TcpStream,
    lower: [f32; 3],
    upper: [f32; 3],
    close_after: Option<u32>,
) -> MockLog {
    let mut log = MockLog::default();
    let mut samples = 0;
    let mut last_camera: Option<CameraPacket> = None;
    let mut ack = [0_u8; 1];

    loop {
        let mut request = FrameRequest::zeroed();
        if cam.read_exact(bytemuck::bytes_of_mut(&mut request)).is_err() {
            break;
        }
        cam.write_all(&[ACK_OK]).unwrap();
        if request.reset != 0 {
            log.got_reset = true;
            break;
        }

        let mut volume = vec![0_u8; COLOR_MAP_COUNT * 16 + 8 + 4];
        if cam.read_exact(&mut volume).is_err() {
            break;
        }
        cam.write_all(&[ACK_OK]).unwrap();
        let domain = &volume[COLOR_MAP_COUNT * 16..COLOR_MAP_COUNT * 16 + 8];
        log.last_domain = bytemuck::pod_read_unaligned(domain);

        let size = (request.width as u32, request.height as u32);
        if last_camera != Some(request.camera) || size != log.last_size {
            samples = 0;
        }
        last_camera = Some(request.camera);
        log.last_size = size;
        samples += 1;

        let pixels = vec![samples as u8; Frame::byte_len(size.0, size.1)];
        data.write_all(&pixels).unwrap();
        data.read_exact(&mut ack).unwrap();
        let state = ServerState {
            lower,
            upper,
            scalars_range: MockServer::SCALAR_RANGE,
            samples,
            fps: 30.0,
        };
        data.write_all(bytemuck::bytes_of(&state)).unwrap();
        data.read_exact(&mut ack).unwrap();

        log.frames += 1;
        if close_after == Some(log.frames) {
            break;
        }
    }
    log
}

/// Transport call observed by a [`RecordingBinding`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Connect(u32, u32),
    Disconnect,
    Resize(u32, u32),
    Timestep(u32),
    Camera(CameraState),
    Volume([f32; 2]),
    Pull,
}

/// Shared record of calls, inspectable while the binding is owned
/// elsewhere.
pub(crate) type CallLog = Arc<Mutex<Vec<Call>>>;

/// In-memory binding that records every call.
pub(crate) struct RecordingBinding {
    calls: CallLog,
    connected: bool,
    width: u32,
    height: u32,
    samples: u32,
    pulls: u32,
    pull_delay: Duration,
    fail_at_pull: Option<u32>,
    last_camera: Option<CameraState>,
    frame: Option<Arc<Frame>>,
}

impl RecordingBinding {
    pub fn new() -> (Self, CallLog) {
        let calls = CallLog::default();
        (Self::sharing(&calls), calls)
    }

    /// Binding appending to an existing log.
    pub fn sharing(calls: &CallLog) -> Self {
        Self {
            calls: Arc::clone(calls),
            connected: false,
            width: 1,
            height: 1,
            samples: 0,
            pulls: 0,
            pull_delay: Duration::ZERO,
            fail_at_pull: None,
            last_camera: None,
            frame: None,
        }
    }

    /// Every pull blocks for `delay` first.
    pub fn with_pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = delay;
        self
    }

    /// The `n`-th pull (1-based) fails like a lost server.
    pub fn failing_at_pull(mut self, n: u32) -> Self {
        self.fail_at_pull = Some(n);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

impl TransportBinding for RecordingBinding {
    fn connect(
        &mut self,
        _endpoint: &Endpoint,
        width: u32,
        height: u32,
    ) -> Result<(), ClientError> {
        self.record(Call::Connect(width, height));
        self.connected = true;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.record(Call::Disconnect);
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.record(Call::Resize(width, height));
        self.width = width;
        self.height = height;
        self.frame = None;
        Ok(())
    }

    fn set_timestep(&mut self, index: u32) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.record(Call::Timestep(index));
        Ok(())
    }

    fn push_camera(&mut self, camera: &CameraState) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.record(Call::Camera(*camera));
        if self.last_camera != Some(*camera) {
            self.samples = 0;
        }
        self.last_camera = Some(*camera);
        Ok(())
    }

    fn push_volume_params(
        &mut self,
        tf: &TransferFunction,
    ) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.record(Call::Volume(tf.domain()));
        Ok(())
    }

    fn pull_frame(&mut self) -> Result<u32, ClientError> {
        self.ensure_connected()?;
        self.record(Call::Pull);
        std::thread::sleep(self.pull_delay);
        self.pulls += 1;
        if self.fail_at_pull == Some(self.pulls) {
            self.connected = false;
            return Err(ClientError::TransportCallFailed {
                call: "pull_frame",
                reason: "connection reset".to_owned(),
            });
        }
        self.samples += 1;
        self.frame = Some(Arc::new(Frame {
            handle: FrameHandle {
                generation: u64::from(self.pulls),
                width: self.width,
                height: self.height,
            },
            pixels: vec![0; Frame::byte_len(self.width, self.height)],
            samples: self.samples,
        }));
        Ok(1)
    }

    fn current_samples(&self) -> Result<u32, ClientError> {
        self.ensure_connected()?;
        Ok(self.samples)
    }

    fn remote_fps(&self) -> Result<f32, ClientError> {
        self.ensure_connected()?;
        Ok(30.0)
    }

    fn local_fps(&self) -> Result<f32, ClientError> {
        self.ensure_connected()?;
        Ok(25.0)
    }

    fn query_range(&self) -> Result<Option<DatasetRange>, ClientError> {
        self.ensure_connected()?;
        Ok((self.pulls > 0).then_some(DatasetRange {
            lower: [-1.0, 0.0, 2.0],
            upper: [3.0, 4.0, 10.0],
            scalar_range: [0.25, 0.75],
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
