//! Tuning constants for the peel interaction and the [`PeelConfig`] value that carries them.
//!
//! The constants are the values the interaction ships with. `PeelConfig::default()` uses all of
//! them; the `with_*` setters exist for hosts that want a slower or subtler peel.

use std::time::Duration;

use thiserror::Error;

/// Size of the 3D viewport relative to the sticker bounds.
///
/// Rendering into a viewport larger than the sticker leaves room for the lifted edge and the
/// translated reflection, which would otherwise be clipped.
pub const SCALE_FACTOR: f32 = 1.7;

/// Duration of both the peel-in and the peel-out animations.
pub const ANIMATION_DURATION: Duration = Duration::from_millis(800);

/// How long a touch has to stay down before it is recognized as a peel rather than a tap.
pub const MINIMUM_PRESS_DURATION: Duration = Duration::from_millis(200);

/// How far a touch may travel, in points, before the press fails to be recognized.
pub const ALLOWABLE_MOVEMENT: f32 = 10.0;

/// Lift distance as a fraction of the camera distance.
pub const LIFT_FRACTION: f32 = 0.25;

/// Reflection blur radius when fully peeled. The resting radius is zero.
pub const MAX_BLUR_RADIUS: f32 = 11.0;

/// Reflection transparency at rest.
pub const RESTING_TRANSPARENCY: f32 = 0.6;

/// Reflection transparency when fully peeled.
pub const PEELED_TRANSPARENCY: f32 = 0.4;

/// Distance the reflection drops below the sticker when fully peeled.
pub const REFLECTION_OFFSET: f32 = 30.0;

/// Number of subdivisions along each edge of the plane mesh.
pub const TESSELLATION: u16 = 50;

/// Vertical field of view used when the toolkit does not provide one.
pub const FIELD_OF_VIEW_DEGREES: f32 = 60.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("scale factor must be greater than 1, got {0}")]
    ScaleFactorTooSmall(f32),
    #[error("animation duration must be non-zero")]
    ZeroDuration,
    #[error("tessellation must be between 1 and 255 subdivisions, got {0}")]
    Tessellation(u16),
    #[error("field of view must be within (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("transparency range [{peeled}, {resting}] is outside [0, 1]")]
    Transparency { peeled: f32, resting: f32 },
    #[error("{name} must be finite and non-negative, got {value}")]
    Negative { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeelConfig {
    pub scale_factor: f32,
    pub animation_duration: Duration,
    pub minimum_press_duration: Duration,
    pub allowable_movement: f32,
    pub lift_fraction: f32,
    pub max_blur_radius: f32,
    pub resting_transparency: f32,
    pub peeled_transparency: f32,
    pub reflection_offset: f32,
    pub tessellation: u16,
    pub field_of_view_degrees: f32,
}

impl Default for PeelConfig {
    fn default() -> Self {
        Self {
            scale_factor: SCALE_FACTOR,
            animation_duration: ANIMATION_DURATION,
            minimum_press_duration: MINIMUM_PRESS_DURATION,
            allowable_movement: ALLOWABLE_MOVEMENT,
            lift_fraction: LIFT_FRACTION,
            max_blur_radius: MAX_BLUR_RADIUS,
            resting_transparency: RESTING_TRANSPARENCY,
            peeled_transparency: PEELED_TRANSPARENCY,
            reflection_offset: REFLECTION_OFFSET,
            tessellation: TESSELLATION,
            field_of_view_degrees: FIELD_OF_VIEW_DEGREES,
        }
    }
}

impl PeelConfig {
    pub fn with_animation_duration(mut self, duration: Duration) -> Self {
        self.animation_duration = duration;
        self
    }

    pub fn with_minimum_press_duration(mut self, duration: Duration) -> Self {
        self.minimum_press_duration = duration;
        self
    }

    pub fn with_allowable_movement(mut self, points: f32) -> Self {
        self.allowable_movement = points;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_tessellation(mut self, subdivisions: u16) -> Self {
        self.tessellation = subdivisions;
        self
    }

    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view_degrees = degrees;
        self
    }

    /// Delay applied to the reflection's transparency and offset animations when peeling in,
    /// `duration / 2.5`.
    pub fn reflection_delay(&self) -> Duration {
        self.animation_duration * 2 / 5
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale_factor > 1.0) {
            return Err(ConfigError::ScaleFactorTooSmall(self.scale_factor));
        }
        if self.animation_duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        // 256 x 256 quads would overflow u16 vertex indices.
        if self.tessellation == 0 || self.tessellation > 255 {
            return Err(ConfigError::Tessellation(self.tessellation));
        }
        if !(self.field_of_view_degrees > 0.0 && self.field_of_view_degrees < 180.0) {
            return Err(ConfigError::FieldOfView(self.field_of_view_degrees));
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.peeled_transparency) || !in_unit(self.resting_transparency) {
            return Err(ConfigError::Transparency {
                peeled: self.peeled_transparency,
                resting: self.resting_transparency,
            });
        }
        for (name, value) in [
            ("allowable movement", self.allowable_movement),
            ("lift fraction", self.lift_fraction),
            ("blur radius", self.max_blur_radius),
            ("reflection offset", self.reflection_offset),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(PeelConfig::default().validate(), Ok(()));
    }

    #[test]
    fn reflection_delay_is_a_fraction_of_the_duration() {
        let delay = PeelConfig::default().reflection_delay();
        assert_eq!(delay, Duration::from_millis(320));
    }

    #[test]
    fn rejects_scale_factor_at_or_below_one() {
        let config = PeelConfig::default().with_scale_factor(1.0);
        assert_eq!(config.validate(), Err(ConfigError::ScaleFactorTooSmall(1.0)));
    }

    #[test]
    fn rejects_oversized_tessellation() {
        let config = PeelConfig::default().with_tessellation(300);
        assert_eq!(config.validate(), Err(ConfigError::Tessellation(300)));
    }

    #[test]
    fn rejects_zero_duration() {
        let config = PeelConfig::default().with_animation_duration(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration));
    }
}
