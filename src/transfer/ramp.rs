//! Piecewise color and scalar curves sampled into the color map.

/// Interpolation between neighbouring ramp stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Straight blend.
    #[default]
    Linear,
    /// Hold the left stop until the next one.
    Constant,
    /// Smoothstep blend.
    Ease,
}

/// One stop of a [`ColorRamp`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// Position in `[0, 1]`.
    pub position: f32,
    /// RGBA color at the stop.
    pub color: [f32; 4],
}

/// Ordered color stops evaluated at a normalized position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
    /// How colors blend between stops.
    pub interpolation: Interpolation,
}

impl ColorRamp {
    /// Build a ramp from stops in any order. Stops at a NaN position are
    /// dropped.
    #[must_use]
    pub fn new(
        mut stops: Vec<ColorStop>,
        interpolation: Interpolation,
    ) -> Self {
        stops.retain(|s| !s.position.is_nan());
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self {
            stops,
            interpolation,
        }
    }

    /// The sorted stops.
    #[must_use]
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at `t`, clamped to the first/last stop outside their range.
    /// An empty ramp is transparent black; a NaN `t` reads the first stop.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> [f32; 4] {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last())
        else {
            return [0.0; 4];
        };
        if t.is_nan() || t <= first.position {
            return first.color;
        }
        if t >= last.position {
            return last.color;
        }
        let right = self.stops.partition_point(|s| s.position <= t);
        let (a, b) = (&self.stops[right - 1], &self.stops[right]);
        let span = b.position - a.position;
        let f = if span > 0.0 {
            (t - a.position) / span
        } else {
            1.0
        };
        let f = match self.interpolation {
            Interpolation::Linear => f,
            Interpolation::Constant => 0.0,
            Interpolation::Ease => f * f * (3.0 - 2.0 * f),
        };
        std::array::from_fn(|i| a.color[i] + (b.color[i] - a.color[i]) * f)
    }
}

/// Piecewise-linear scalar curve over `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloatCurve {
    points: Vec<[f32; 2]>,
}

impl FloatCurve {
    /// Build a curve from `(x, y)` control points in any order. Points with
    /// a NaN `x` are dropped.
    #[must_use]
    pub fn new(mut points: Vec<[f32; 2]>) -> Self {
        points.retain(|p| !p[0].is_nan());
        points.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Self { points }
    }

    /// Value at `x`, clamped outside the control points. An empty curve is
    /// zero everywhere; a NaN `x` reads the first point.
    #[must_use]
    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) =
            (self.points.first(), self.points.last())
        else {
            return 0.0;
        };
        if x.is_nan() || x <= first[0] {
            return first[1];
        }
        if x >= last[0] {
            return last[1];
        }
        let right = self.points.partition_point(|p| p[0] <= x);
        let (a, b) = (self.points[right - 1], self.points[right]);
        let span = b[0] - a[0];
        if span <= 0.0 {
            return b[1];
        }
        a[1] + (b[1] - a[1]) * (x - a[0]) / span
    }
}
