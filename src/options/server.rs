use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Server", inline)]
#[serde(default)]
/// Render server launch and scene-level settings.
pub struct ServerOptions {
    /// Full server command line.
    #[schemars(title = "Command")]
    pub command: String,
    /// Number of animation timesteps served on consecutive port pairs.
    #[schemars(title = "Time Steps", range(min = 1, max = 100))]
    pub timesteps: u32,
    /// Extra rotation about X applied to the view transform, in radians.
    #[schemars(title = "Cam Rotation X", range(min = -6.2832, max = 6.2832))]
    pub cam_rotation_x: f32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            command: String::new(),
            timesteps: 1,
            cam_rotation_x: 0.0,
        }
    }
}
