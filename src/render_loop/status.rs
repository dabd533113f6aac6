use std::fmt;

use web_time::Duration;

/// Status kind reported while the worker starts.
pub const STATUS_SYNC: &str = "Sync";
/// Status kind reported for every rendered frame.
pub const STATUS_RENDER: &str = "Render";
/// Status kind reported when the loop terminates on an error.
pub const STATUS_ERROR: &str = "Error";

/// Progress of the current accumulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStatus {
    /// Time since the last restart.
    pub elapsed: Duration,
    /// Samples accumulated since the last restart.
    pub samples: u32,
}

impl RenderStatus {
    /// Samples per second since the last restart, 0 before any time has
    /// passed.
    #[must_use]
    pub fn fps(&self) -> f32 {
        let secs = self.elapsed.as_secs_f32();
        if secs > 0.0 {
            self.samples as f32 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time: {:.1} sec | Samples: {} | FPS: {:.1}",
            self.elapsed.as_secs_f32(),
            self.samples,
            self.fps()
        )
    }
}
