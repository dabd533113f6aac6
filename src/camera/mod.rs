//! Camera description sent to the render server.
//!
//! The host application describes its viewport with a [`view::ViewInput`]
//! every redraw; [`view::ViewportSettings::from_view`] turns it into a
//! comparable [`state::CameraState`] plus render resolution.

/// Remote camera value type and sensor-fit modes.
pub mod state;
/// Derivation of camera state from the host viewport.
pub mod view;

pub use state::{CameraState, SensorFit};
pub use view::{
    CameraObject, CameraProjection, ViewInput, ViewPerspective,
    ViewportSettings,
};
