//! Per-redraw glue between the host viewport and the render loop.
//!
//! [`ViewportDriver::draw`] runs on the GUI thread for every redraw. It
//! compares the derived [`ViewportSettings`] with the last applied ones,
//! hands camera changes to the render loop and presents whatever frame is
//! newest. Only a resolution change blocks: the worker is stopped, the
//! session resized and a fresh worker started.

mod presenter;

use std::sync::{Arc, Mutex, Weak};

#[cfg(feature = "gpu")]
pub use presenter::TexturePresenter;
pub use presenter::{FramePresenter, RetainedFrame};

use crate::bounds::BoundingBox;
use crate::camera::{ViewInput, ViewportSettings};
use crate::error::ClientError;
use crate::options::ClientOptions;
use crate::process::ServerStatus;
use crate::render_loop::{LoopCommand, LoopState, RenderHost, RenderLoop};
use crate::session::{Session, SessionParams};
use crate::transfer::{TransferFunction, VolumeMaterial};
use crate::transport::{ConnectPolicy, TcpBinding, TransportBinding};

/// Creates a fresh binding for every sync.
type BindingFactory<B> = Box<dyn FnMut(&ClientOptions) -> B>;

/// Drives one remote render session from the host's redraw callback.
pub struct ViewportDriver<B: TransportBinding + 'static> {
    options: ClientOptions,
    host: Weak<dyn RenderHost>,
    new_binding: BindingFactory<B>,
    render_loop: Option<RenderLoop<B>>,
    last_settings: Option<ViewportSettings>,
    resolution: (u32, u32),
    tf: Arc<TransferFunction>,
    scene_frame: u32,
    camera_updates: u64,
    // Set once the loop ends on its own; draw is inert until the next sync.
    ended: bool,
}

impl ViewportDriver<TcpBinding> {
    /// Driver connecting over TCP as configured in `options`.
    #[must_use]
    pub fn tcp(options: ClientOptions, host: Weak<dyn RenderHost>) -> Self {
        Self::new(options, host, |options| {
            TcpBinding::new(ConnectPolicy::from(&options.connection))
        })
    }
}

impl<B: TransportBinding + 'static> ViewportDriver<B> {
    /// Driver creating bindings with `new_binding`.
    pub fn new(
        options: ClientOptions,
        host: Weak<dyn RenderHost>,
        new_binding: impl FnMut(&ClientOptions) -> B + 'static,
    ) -> Self {
        Self {
            options,
            host,
            new_binding: Box::new(new_binding),
            render_loop: None,
            last_settings: None,
            resolution: (1, 1),
            tf: Arc::new(TransferFunction::default()),
            scene_frame: 0,
            camera_updates: 0,
            ended: false,
        }
    }

    /// First sync with the scene: open the session and start rendering.
    /// Any previous session is shut down first.
    ///
    /// # Errors
    ///
    /// [`ClientError::ProcessNotStarted`] if `server` is not running,
    /// [`ClientError::InvalidCameraMode`] for an unsupported view, or the
    /// connect failure.
    pub fn sync(
        &mut self,
        view: &ViewInput,
        server: &mut impl ServerStatus,
    ) -> Result<(), ClientError> {
        if !server.is_running() {
            return Err(ClientError::ProcessNotStarted(
                "start the render server before syncing".to_owned(),
            ));
        }
        let settings = ViewportSettings::from_view(
            view,
            self.options.server.cam_rotation_x,
        )?;
        self.shutdown();

        let (width, height) = settings.resolution();
        let params = SessionParams {
            endpoint: (&self.options.connection).into(),
            width,
            height,
            timesteps: self.options.server.timesteps,
        };
        let mut session =
            Session::init(params, (self.new_binding)(&self.options));
        session.set_scene_frame(self.scene_frame);
        session.open()?;

        let mut render_loop =
            RenderLoop::new(Arc::new(Mutex::new(session)), self.host.clone());
        render_loop.send(LoopCommand::TransferFunction(Arc::clone(&self.tf)));
        render_loop.start()?;

        self.render_loop = Some(render_loop);
        self.resolution = (width, height);
        self.last_settings = None;
        self.ended = false;
        log::info!("Viewport synced at {width}x{height}");
        Ok(())
    }

    /// Redraw tick: forward camera/resolution changes and present the
    /// newest frame. Returns without doing anything when not synced, after
    /// the render loop has ended, or for an empty region.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidCameraMode`] for an unsupported view, or a
    /// failure while restarting the loop on resize.
    pub fn draw(
        &mut self,
        view: &ViewInput,
        presenter: &mut impl FramePresenter,
    ) -> Result<(), ClientError> {
        let Some(render_loop) = self.render_loop.as_mut() else {
            return Ok(());
        };
        if render_loop.has_finished() {
            self.ended = true;
        }
        if self.ended || view.width == 0 || view.height == 0 {
            return Ok(());
        }

        let settings = ViewportSettings::from_view(
            view,
            self.options.server.cam_rotation_x,
        )?;
        if self.last_settings != Some(settings) {
            self.last_settings = Some(settings);
            if settings.resolution() != self.resolution {
                let (width, height) = settings.resolution();
                render_loop.stop().inspect_err(|_| self.ended = true)?;
                render_loop
                    .session()
                    .lock()
                    .map_err(|_| ClientError::WorkerPanicked)?
                    .resize(width, height)?;
                render_loop.start()?;
                self.resolution = (width, height);
                log::debug!("Viewport resized to {width}x{height}");
            }
            render_loop.send(LoopCommand::Camera(settings.camera));
            self.camera_updates += 1;
        }

        if let Some(frame) = render_loop.latest_frame() {
            presenter.present(&frame);
        }
        Ok(())
    }

    /// Replace the transfer function; unchanged values are not resent.
    pub fn set_transfer_function(&mut self, tf: TransferFunction) {
        if *self.tf == tf {
            return;
        }
        self.tf = Arc::new(tf);
        if let Some(render_loop) = self.render_loop.as_mut() {
            let tf = Arc::clone(&self.tf);
            render_loop.send(LoopCommand::TransferFunction(tf));
        }
    }

    /// Resample the transfer function from the host's volume material.
    pub fn set_material(&mut self, material: Option<&VolumeMaterial>) {
        self.set_transfer_function(TransferFunction::from_material(material));
    }

    /// Follow the host's animation frame. Only animated data restarts the
    /// loop.
    pub fn set_scene_frame(&mut self, frame: u32) {
        if frame == self.scene_frame {
            return;
        }
        self.scene_frame = frame;
        if self.options.server.timesteps > 1 {
            if let Some(render_loop) = self.render_loop.as_mut() {
                render_loop.send(LoopCommand::SceneFrame(frame));
            }
        }
    }

    /// Dataset bounds from the server state of the newest frame, `None`
    /// until the render loop has pulled one. Never blocks and sends
    /// nothing to the server.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] when not synced.
    pub fn query_bounds(&mut self) -> Result<Option<BoundingBox>, ClientError> {
        let render_loop =
            self.render_loop.as_mut().ok_or(ClientError::NotConnected)?;
        let bounds = render_loop.latest_range().map(BoundingBox::from);
        if let Some(b) = &bounds {
            log::debug!(
                "Dataset bounds {} .. {}, scalars {:?}",
                b.lower,
                b.upper,
                b.scalar_range
            );
        }
        Ok(bounds)
    }

    /// Whether a session has been synced and not shut down.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.render_loop.is_some()
    }

    /// State of the render loop, `Idle` when not synced.
    #[must_use]
    pub fn loop_state(&self) -> LoopState {
        self.render_loop
            .as_ref()
            .map_or(LoopState::Idle, RenderLoop::state)
    }

    /// Error that ended the render loop, if it ended on its own.
    pub fn take_error(&mut self) -> Option<ClientError> {
        let error = self.render_loop.as_mut().and_then(RenderLoop::take_error);
        if error.is_some() {
            self.ended = true;
        }
        error
    }

    /// Number of camera changes handed to the render loop.
    #[must_use]
    pub const fn camera_updates(&self) -> u64 {
        self.camera_updates
    }

    /// Render resolution currently requested from the server.
    #[must_use]
    pub const fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Stop the loop and close the session.
    pub fn shutdown(&mut self) {
        if let Some(mut render_loop) = self.render_loop.take() {
            if let Err(e) = render_loop.stop() {
                log::warn!("Render loop ended with error: {e}");
            }
            match render_loop.session().lock() {
                Ok(mut session) => session.close(),
                Err(_) => log::warn!("Session lock poisoned on shutdown"),
            }
        }
        self.last_settings = None;
    }
}

impl<B: TransportBinding + 'static> Drop for ViewportDriver<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
