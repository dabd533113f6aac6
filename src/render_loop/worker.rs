//! Body of the render loop thread.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, Weak};

use web_time::Instant;

use super::command::LoopCommand;
use super::status::{RenderStatus, STATUS_ERROR, STATUS_RENDER, STATUS_SYNC};
use super::{LoopState, RenderHost};
use crate::camera::CameraState;
use crate::error::ClientError;
use crate::session::Session;
use crate::transfer::TransferFunction;
use crate::transport::{DatasetRange, Frame, TransportBinding};

/// Result of draining the command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drained {
    Nothing,
    Restart,
    Stop,
}

/// Everything the worker thread owns.
pub(super) struct Worker<B: TransportBinding> {
    pub session: Arc<Mutex<Session<B>>>,
    pub host: Weak<dyn RenderHost>,
    pub state: Arc<AtomicU8>,
    pub commands: mpsc::Receiver<LoopCommand>,
    pub frames: triple_buffer::Input<Option<Arc<Frame>>>,
    pub ranges: triple_buffer::Input<Option<DatasetRange>>,
    pub camera: CameraState,
    pub tf: Arc<TransferFunction>,
}

impl<B: TransportBinding> Worker<B> {
    /// Run until stopped, the host goes away, or a transport call fails.
    ///
    /// # Errors
    ///
    /// The transport failure that ended the loop.
    pub(super) fn run(mut self) -> Result<(), ClientError> {
        let result = self.render_loop();
        if let Err(e) = &result {
            log::error!("Render loop terminated: {e}");
            self.notify(STATUS_ERROR, &e.to_string());
        }
        self.set_state(LoopState::Idle);
        result
    }

    fn render_loop(&mut self) -> Result<(), ClientError> {
        self.notify(STATUS_SYNC, "Starting...");
        self.set_state(LoopState::Rendering);
        self.notify(STATUS_RENDER, "Starting...");

        'outer: loop {
            // Idle until something asks for a (re)start.
            if !self.wait_for_restart()? {
                break;
            }
            let mut begin = Instant::now();

            loop {
                match self.drain()? {
                    Drained::Stop => break 'outer,
                    Drained::Restart => {
                        begin = Instant::now();
                        continue;
                    }
                    Drained::Nothing => {}
                }
                let Some(host) = self.host.upgrade() else {
                    log::info!("Render host dropped, stopping render loop");
                    break 'outer;
                };

                let (samples, frame, range) = {
                    let mut session = self.lock_session()?;
                    let samples =
                        session.render_iteration(&self.camera, &self.tf)?;
                    (samples, session.latest_frame(), session.query_range()?)
                };
                self.frames.write(frame);
                self.ranges.write(range);

                let status = RenderStatus {
                    elapsed: begin.elapsed(),
                    samples,
                };
                log::debug!("{status}");
                host.update_stats(STATUS_RENDER, &status.to_string());
                host.tag_redraw();
            }
        }

        self.set_state(LoopState::Stopping);
        Ok(())
    }

    /// Block for the next restart request. `false` means stop.
    fn wait_for_restart(&mut self) -> Result<bool, ClientError> {
        while let Ok(command) = self.commands.recv() {
            match self.apply(command)? {
                Drained::Stop => return Ok(false),
                Drained::Restart => {
                    // Fold anything queued behind it into the same restart.
                    return Ok(self.drain()? != Drained::Stop);
                }
                Drained::Nothing => {}
            }
        }
        Ok(false)
    }

    /// Apply every queued command without blocking.
    fn drain(&mut self) -> Result<Drained, ClientError> {
        let mut outcome = Drained::Nothing;
        loop {
            match self.commands.try_recv() {
                Ok(command) => match self.apply(command)? {
                    Drained::Stop => return Ok(Drained::Stop),
                    Drained::Restart => outcome = Drained::Restart,
                    Drained::Nothing => {}
                },
                Err(mpsc::TryRecvError::Empty) => return Ok(outcome),
                Err(mpsc::TryRecvError::Disconnected) => {
                    return Ok(Drained::Stop)
                }
            }
        }
    }

    fn apply(&mut self, command: LoopCommand) -> Result<Drained, ClientError> {
        match command {
            LoopCommand::Stop => return Ok(Drained::Stop),
            LoopCommand::Camera(camera) => self.camera = camera,
            LoopCommand::TransferFunction(tf) => self.tf = tf,
            LoopCommand::SceneFrame(frame) => {
                self.lock_session()?.set_scene_frame(frame);
            }
            LoopCommand::Restart => {}
        }
        Ok(Drained::Restart)
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Session<B>>, ClientError> {
        self.session.lock().map_err(|_| ClientError::WorkerPanicked)
    }

    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn notify(&self, kind: &str, info: &str) {
        if let Some(host) = self.host.upgrade() {
            host.update_stats(kind, info);
        }
    }
}
