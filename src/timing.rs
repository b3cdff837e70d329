//! Timing curves that map linear animation progress to eased progress.

/// Maps normalized time in `[0, 1]` to normalized progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingFunction {
    Linear,
    /// Cubic Bézier from `(0, 0)` to `(1, 1)` with the two given control points.
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// Spring that settles within the animation's duration.
    ///
    /// `damping_ratio` of 1 is critically damped (no overshoot), smaller values bounce.
    Spring { damping_ratio: f32 },
}

impl TimingFunction {
    pub const EASE_IN_EASE_OUT: Self = Self::CubicBezier {
        x1: 0.42,
        y1: 0.0,
        x2: 0.58,
        y2: 1.0,
    };

    pub const CRITICALLY_DAMPED: Self = Self::Spring { damping_ratio: 1.0 };

    /// Eased progress for normalized time `t`. Out-of-range input is clamped; `1.0` always maps
    /// to exactly `1.0`.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return 1.0;
        }
        match *self {
            TimingFunction::Linear => t,
            TimingFunction::CubicBezier { x1, y1, x2, y2 } => {
                let s = solve_bezier_x(t, x1, x2);
                bezier_component(s, y1, y2)
            }
            TimingFunction::Spring { damping_ratio } => spring(t, damping_ratio),
        }
    }
}

/// Angular frequency, in units of the normalized duration, chosen so the critically damped
/// spring is within 0.05% of its target at `t = 1`.
const SPRING_STIFFNESS: f32 = 10.0;

fn spring(t: f32, damping_ratio: f32) -> f32 {
    let omega = SPRING_STIFFNESS;
    let zeta = damping_ratio.clamp(0.05, 1.0);
    if zeta >= 1.0 {
        return 1.0 - (1.0 + omega * t) * (-omega * t).exp();
    }
    let damped = omega * (1.0 - zeta * zeta).sqrt();
    let envelope = (-zeta * omega * t).exp();
    1.0 - envelope * ((damped * t).cos() + (zeta * omega / damped) * (damped * t).sin())
}

fn bezier_component(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_derivative(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Finds the curve parameter whose x coordinate is `x`. Newton steps first, bisection when the
/// slope is too flat to trust.
fn solve_bezier_x(x: f32, x1: f32, x2: f32) -> f32 {
    let mut s = x;
    for _ in 0..8 {
        let error = bezier_component(s, x1, x2) - x;
        if error.abs() < 1e-6 {
            return s;
        }
        let slope = bezier_derivative(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s = (s - error / slope).clamp(0.0, 1.0);
    }

    let (mut low, mut high) = (0.0_f32, 1.0_f32);
    s = x;
    for _ in 0..32 {
        let value = bezier_component(s, x1, x2);
        if (value - x).abs() < 1e-6 {
            break;
        }
        if value < x {
            low = s;
        } else {
            high = s;
        }
        s = (low + high) / 2.0;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_monotonic(function: TimingFunction) {
        let mut previous = function.evaluate(0.0);
        for step in 1..=100 {
            let value = function.evaluate(step as f32 / 100.0);
            assert!(
                value + 1e-5 >= previous,
                "{function:?} decreased at step {step}: {previous} -> {value}"
            );
            previous = value;
        }
    }

    #[test]
    fn endpoints_are_exact() {
        for function in [
            TimingFunction::Linear,
            TimingFunction::EASE_IN_EASE_OUT,
            TimingFunction::CRITICALLY_DAMPED,
        ] {
            assert!(function.evaluate(0.0).abs() < 1e-5, "{function:?}");
            assert_eq!(function.evaluate(1.0), 1.0, "{function:?}");
            assert_eq!(function.evaluate(2.0), 1.0, "{function:?}");
        }
    }

    #[test]
    fn ease_in_ease_out_is_symmetric() {
        let f = TimingFunction::EASE_IN_EASE_OUT;
        assert!((f.evaluate(0.5) - 0.5).abs() < 1e-3);
        for step in 1..10 {
            let t = step as f32 / 10.0;
            let mirrored = 1.0 - f.evaluate(1.0 - t);
            assert!((f.evaluate(t) - mirrored).abs() < 1e-3, "t={t}");
        }
        // Slow start.
        assert!(f.evaluate(0.1) < 0.1);
    }

    #[test]
    fn curves_are_monotonic() {
        assert_monotonic(TimingFunction::Linear);
        assert_monotonic(TimingFunction::EASE_IN_EASE_OUT);
        assert_monotonic(TimingFunction::CRITICALLY_DAMPED);
    }

    #[test]
    fn critically_damped_spring_settles_without_overshoot() {
        let f = TimingFunction::CRITICALLY_DAMPED;
        for step in 0..=100 {
            assert!(f.evaluate(step as f32 / 100.0) <= 1.0);
        }
        assert!(f.evaluate(0.99) > 0.999);
    }

    #[test]
    fn underdamped_spring_overshoots() {
        let f = TimingFunction::Spring { damping_ratio: 0.3 };
        let peak = (1..100)
            .map(|step| f.evaluate(step as f32 / 100.0))
            .fold(0.0_f32, f32::max);
        assert!(peak > 1.0);
    }
}
