use std::sync::Arc;

use crate::camera::CameraState;
use crate::transfer::TransferFunction;

/// Message from the GUI thread to the render loop worker.
///
/// Every variant except [`LoopCommand::Stop`] is a restart request: the
/// worker abandons the current accumulation and begins a fresh one.
#[derive(Debug, Clone)]
pub enum LoopCommand {
    /// New camera for subsequent frames.
    Camera(CameraState),
    /// New transfer function for subsequent frames.
    TransferFunction(Arc<TransferFunction>),
    /// Host animation frame changed.
    SceneFrame(u32),
    /// Restart accumulation with unchanged inputs.
    Restart,
    /// Finish the current round trip and exit.
    Stop,
}
