//! Background render loop driving the session in lock-step.
//!
//! One worker thread per active session repeatedly pushes the camera and
//! transfer function and pulls a frame. The GUI thread steers it only
//! through [`LoopCommand`]s, so the worker is the single writer on the
//! wire while rendering. Frames and the dataset range flow back through
//! lock-free triple buffers and status lines through the [`RenderHost`].
//!
//! ```text
//! Idle --start--> Syncing --> Rendering --Stop--> Stopping --> Idle
//!                                 |
//!                          transport error --> Idle
//! ```

mod command;
mod status;
mod worker;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc, Mutex, Weak};
use std::thread::JoinHandle;

pub use command::LoopCommand;
pub use status::{RenderStatus, STATUS_ERROR, STATUS_RENDER, STATUS_SYNC};
use worker::Worker;

use crate::camera::CameraState;
use crate::error::ClientError;
use crate::session::Session;
use crate::transfer::TransferFunction;
use crate::transport::{DatasetRange, Frame, TransportBinding};

/// The application hosting the viewport.
///
/// Called from the worker thread; implementations forward to their GUI
/// thread as needed.
pub trait RenderHost: Send + Sync {
    /// Show a status line. `kind` is one of [`STATUS_SYNC`],
    /// [`STATUS_RENDER`] or [`STATUS_ERROR`].
    fn update_stats(&self, kind: &str, info: &str);

    /// Ask for the viewport to be redrawn.
    fn tag_redraw(&self);
}

/// Lifecycle state of the render loop.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No worker running.
    Idle = 0,
    /// Worker started, reporting startup.
    Syncing = 1,
    /// Worker waiting for or serving restart requests.
    Rendering = 2,
    /// Worker finishing its last round trip.
    Stopping = 3,
}

impl LoopState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Syncing,
            2 => Self::Rendering,
            3 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// Owner of the render loop worker thread.
pub struct RenderLoop<B: TransportBinding + 'static> {
    session: Arc<Mutex<Session<B>>>,
    host: Weak<dyn RenderHost>,
    state: Arc<AtomicU8>,
    command_tx: Option<mpsc::Sender<LoopCommand>>,
    frames: Option<triple_buffer::Output<Option<Arc<Frame>>>>,
    ranges: Option<triple_buffer::Output<Option<DatasetRange>>>,
    range: Option<DatasetRange>,
    thread: Option<JoinHandle<Result<(), ClientError>>>,
    camera: CameraState,
    tf: Arc<TransferFunction>,
    error: Option<ClientError>,
}

impl<B: TransportBinding + 'static> RenderLoop<B> {
    /// Controller for `session` reporting to `host`. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(
        session: Arc<Mutex<Session<B>>>,
        host: Weak<dyn RenderHost>,
    ) -> Self {
        Self {
            session,
            host,
            state: Arc::new(AtomicU8::new(LoopState::Idle as u8)),
            command_tx: None,
            frames: None,
            ranges: None,
            range: None,
            thread: None,
            camera: CameraState::default(),
            tf: Arc::new(TransferFunction::default()),
            error: None,
        }
    }

    /// Spawn the worker. A no-op while a worker is already running; a
    /// worker that ended on its own is reaped first.
    ///
    /// The worker renders nothing until the first restart request
    /// ([`LoopCommand`] other than `Stop`).
    ///
    /// # Errors
    ///
    /// [`ClientError::ThreadSpawn`] if the thread cannot be created.
    pub fn start(&mut self) -> Result<(), ClientError> {
        if self.thread.is_some() {
            if !self.has_finished() {
                return Ok(());
            }
            self.reap();
        }

        let (command_tx, commands) = mpsc::channel();
        let (frames_in, frames_out) = triple_buffer::triple_buffer(&None);
        let (ranges_in, ranges_out) = triple_buffer::triple_buffer(&None);
        let worker = Worker {
            session: Arc::clone(&self.session),
            host: self.host.clone(),
            state: Arc::clone(&self.state),
            commands,
            frames: frames_in,
            ranges: ranges_in,
            camera: self.camera,
            tf: Arc::clone(&self.tf),
        };

        self.state.store(LoopState::Syncing as u8, Ordering::Release);
        let thread = std::thread::Builder::new()
            .name("render-loop".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.state.store(LoopState::Idle as u8, Ordering::Release);
                ClientError::ThreadSpawn(e)
            })?;

        self.command_tx = Some(command_tx);
        self.frames = Some(frames_out);
        self.ranges = Some(ranges_out);
        self.thread = Some(thread);
        self.error = None;
        log::info!("Render loop started");
        Ok(())
    }

    /// Ask the worker to stop and wait for it. After this returns no
    /// transport call happens until the next [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// The error the worker terminated with, if any.
    pub fn stop(&mut self) -> Result<(), ClientError> {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(LoopCommand::Stop);
        }
        if self.thread.is_some() {
            self.reap();
            log::info!("Render loop stopped");
        }
        self.error.take().map_or(Ok(()), Err)
    }

    /// Queue a command. Camera and transfer function are remembered and
    /// seed the next worker.
    pub fn send(&mut self, command: LoopCommand) {
        match &command {
            LoopCommand::Camera(camera) => self.camera = *camera,
            LoopCommand::TransferFunction(tf) => self.tf = Arc::clone(tf),
            _ => {}
        }
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(command);
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// A worker exists and has not finished.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// The worker ended without being asked to (error or host gone).
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.thread.as_ref().is_some_and(JoinHandle::is_finished)
    }

    /// Error of a worker that ended on its own. Reaps the worker.
    pub fn take_error(&mut self) -> Option<ClientError> {
        if self.has_finished() {
            self.reap();
        }
        self.error.take()
    }

    /// Newest frame published by the worker; repeats the previous one when
    /// nothing new arrived. Never blocks.
    pub fn latest_frame(&mut self) -> Option<Arc<Frame>> {
        self.frames.as_mut().and_then(|out| out.read().clone())
    }

    /// Bounds and scalar range from the server state of the newest frame.
    /// Kept across restarts; `None` until a frame has arrived. Never blocks
    /// and never touches the session.
    pub fn latest_range(&mut self) -> Option<DatasetRange> {
        if let Some(range) = self.ranges.as_mut().and_then(|out| *out.read())
        {
            self.range = Some(range);
        }
        self.range
    }

    /// Last camera handed to the loop.
    #[must_use]
    pub const fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// The shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<Mutex<Session<B>>> {
        &self.session
    }

    fn reap(&mut self) {
        self.command_tx = None;
        if let Some(handle) = self.thread.take() {
            let outcome =
                handle.join().unwrap_or(Err(ClientError::WorkerPanicked));
            if let Err(e) = outcome {
                self.error = Some(e);
            }
        }
        self.state.store(LoopState::Idle as u8, Ordering::Release);
    }
}

impl<B: TransportBinding + 'static> Drop for RenderLoop<B> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use web_time::{Duration, Instant};

    use super::*;
    use crate::session::SessionParams;
    use crate::transport::testing::{Call, CallLog, RecordingBinding};
    use crate::transport::Endpoint;

    #[derive(Default)]
    struct TestHost {
        stats: Mutex<Vec<(String, String)>>,
        redraws: AtomicUsize,
    }

    impl TestHost {
        fn infos(&self, kind: &str) -> Vec<String> {
            self.stats
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| k == kind)
                .map(|(_, info)| info.clone())
                .collect()
        }
    }

    impl RenderHost for TestHost {
        fn update_stats(&self, kind: &str, info: &str) {
            self.stats
                .lock()
                .unwrap()
                .push((kind.to_owned(), info.to_owned()));
        }

        fn tag_redraw(&self) {
            let _ = self.redraws.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn setup(
        binding: RecordingBinding,
    ) -> (RenderLoop<RecordingBinding>, Arc<TestHost>) {
        let params = SessionParams {
            endpoint: Endpoint {
                host: "localhost".to_owned(),
                cam_port: 7000,
                data_port: 7001,
            },
            width: 64,
            height: 32,
            timesteps: 1,
        };
        let mut session = Session::init(params, binding);
        session.open().unwrap();
        let host = Arc::new(TestHost::default());
        let dyn_host: Arc<dyn RenderHost> = host.clone();
        let weak = Arc::downgrade(&dyn_host);
        let render_loop = RenderLoop::new(Arc::new(Mutex::new(session)), weak);
        (render_loop, host)
    }

    fn pulls(calls: &CallLog) -> usize {
        calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == Call::Pull)
            .count()
    }

    #[test]
    fn dataset_range_is_published_without_the_session_lock() {
        let (binding, _calls) = RecordingBinding::new();
        let (mut render_loop, _host) = setup(binding);
        assert!(render_loop.latest_range().is_none());

        render_loop.start().unwrap();
        render_loop.send(LoopCommand::Restart);
        let deadline = Instant::now() + Duration::from_secs(5);
        while render_loop.latest_range().is_none() {
            assert!(Instant::now() < deadline, "no range published");
            std::thread::sleep(Duration::from_millis(5));
        }
        render_loop.stop().unwrap();

        let session = Arc::clone(render_loop.session());
        let _guard = session.lock().unwrap();
        let range = render_loop.latest_range().unwrap();
        assert_eq!(range.scalar_range, [0.25, 0.75]);
    }

    #[test]
    fn waits_for_restart_before_rendering() {
        let (binding, calls) = RecordingBinding::new();
        let (mut render_loop, host) = setup(binding);
        render_loop.start().unwrap();
        wait_until("rendering state", || {
            render_loop.state() == LoopState::Rendering
        });
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(pulls(&calls), 0);
        assert_eq!(host.infos(STATUS_SYNC), vec!["Starting..."]);
        assert_eq!(host.infos(STATUS_RENDER), vec!["Starting..."]);

        render_loop.send(LoopCommand::Restart);
        wait_until("frames", || pulls(&calls) >= 3);
        assert!(render_loop.latest_frame().is_some());
        assert!(host.redraws.load(Ordering::Relaxed) > 0);
        render_loop.stop().unwrap();
        assert_eq!(render_loop.state(), LoopState::Idle);
    }

    #[test]
    fn no_transport_calls_after_stop() {
        let (binding, calls) = RecordingBinding::new();
        let (mut render_loop, _host) = setup(binding);
        render_loop.start().unwrap();
        render_loop.send(LoopCommand::Camera(CameraState::default()));
        wait_until("frames", || pulls(&calls) >= 2);

        render_loop.stop().unwrap();
        assert!(!render_loop.is_running());
        let after_stop = calls.lock().unwrap().len();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.lock().unwrap().len(), after_stop);
        // The last round trip completed before the worker exited.
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Pull));

        // Commands to a stopped loop go nowhere.
        render_loop.send(LoopCommand::Restart);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.lock().unwrap().len(), after_stop);
    }

    #[test]
    fn stop_during_blocking_pull_returns_after_round_trip() {
        let (binding, calls) = RecordingBinding::new();
        let binding = binding.with_pull_delay(Duration::from_millis(200));
        let (mut render_loop, _host) = setup(binding);
        render_loop.start().unwrap();
        render_loop.send(LoopCommand::Restart);
        wait_until("pull in flight", || pulls(&calls) >= 1);

        let begin = Instant::now();
        render_loop.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(2));
        assert_eq!(pulls(&calls), 1);
        assert_eq!(render_loop.state(), LoopState::Idle);
    }

    #[test]
    fn restart_resets_sample_counter() {
        let (binding, calls) = RecordingBinding::new();
        let (mut render_loop, host) = setup(binding);
        render_loop.start().unwrap();
        render_loop.send(LoopCommand::Camera(CameraState::default()));
        wait_until("frames", || pulls(&calls) >= 3);

        let moved = CameraState {
            fov: 10.0,
            ..CameraState::default()
        };
        render_loop.send(LoopCommand::Camera(moved));
        wait_until("moved camera", || {
            calls.lock().unwrap().contains(&Call::Camera(moved))
        });
        wait_until("more frames", || {
            host.infos(STATUS_RENDER)
                .iter()
                .filter(|s| s.contains("Samples: 1 |"))
                .count()
                >= 2
        });
        render_loop.stop().unwrap();
        assert_eq!(render_loop.camera(), &moved);
    }

    #[test]
    fn transport_error_ends_loop_without_retry() {
        let (binding, calls) = RecordingBinding::new();
        let (mut render_loop, host) = setup(binding.failing_at_pull(2));
        render_loop.start().unwrap();
        render_loop.send(LoopCommand::Restart);
        wait_until("worker exit", || render_loop.has_finished());

        assert_eq!(render_loop.state(), LoopState::Idle);
        assert!(matches!(
            render_loop.take_error(),
            Some(ClientError::TransportCallFailed { .. })
        ));
        assert_eq!(host.infos(STATUS_ERROR).len(), 1);
        assert_eq!(pulls(&calls), 2);
        assert!(render_loop.stop().is_ok());
    }

    #[test]
    fn dropped_host_stops_worker() {
        let (binding, _calls) = RecordingBinding::new();
        let (mut render_loop, host) = setup(binding);
        render_loop.start().unwrap();
        drop(host);
        render_loop.send(LoopCommand::Restart);
        wait_until("worker exit", || render_loop.has_finished());
        assert!(render_loop.take_error().is_none());
    }

    #[test]
    fn restart_after_stop_seeds_last_inputs() {
        let (binding, calls) = RecordingBinding::new();
        let (mut render_loop, _host) = setup(binding);
        let camera = CameraState {
            clip_end: 42.0,
            ..CameraState::default()
        };
        render_loop.send(LoopCommand::Camera(camera));
        render_loop.start().unwrap();
        render_loop.start().unwrap();
        render_loop.send(LoopCommand::Restart);
        wait_until("frames", || pulls(&calls) >= 1);
        render_loop.stop().unwrap();
        assert!(calls.lock().unwrap().contains(&Call::Camera(camera)));
    }
}
