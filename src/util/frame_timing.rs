//! Client-side frame rate measurement.

use web_time::Instant;

/// Smoothed rate of completed frames.
pub struct FrameTiming {
    /// Last frame timestamp
    last_frame: Option<Instant>,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTiming {
    /// Create a timer reporting 0 until two frames have completed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_frame: None,
            smoothed_fps: 0.0,
            smoothing: 0.05,
        }
    }

    /// Call after each completed frame.
    pub fn end_frame(&mut self) {
        self.end_frame_at(Instant::now());
    }

    fn end_frame_at(&mut self, now: Instant) {
        let Some(last) = self.last_frame.replace(now) else {
            return;
        };
        let frame_time = now.duration_since(last).as_secs_f32();
        if frame_time <= 0.0 {
            return;
        }
        let instant_fps = 1.0 / frame_time;
        // First measurement seeds the average
        self.smoothed_fps = if self.smoothed_fps == 0.0 {
            instant_fps
        } else {
            self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing
        };
    }

    /// Forget history, e.g. after a reconnect.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Get the current FPS (smoothed)
    #[must_use]
    pub const fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use web_time::Duration;

    use super::*;

    #[test]
    fn first_interval_seeds_then_smooths() {
        let start = Instant::now();
        let mut timing = FrameTiming::new();
        timing.end_frame_at(start);
        assert_eq!(timing.fps(), 0.0);

        timing.end_frame_at(start + Duration::from_millis(100));
        assert!((timing.fps() - 10.0).abs() < 1e-3);

        // A single 50 fps frame moves the average by 5% of the gap.
        timing.end_frame_at(start + Duration::from_millis(120));
        assert!((timing.fps() - 12.0).abs() < 1e-2);

        timing.reset();
        assert_eq!(timing.fps(), 0.0);
    }
}
