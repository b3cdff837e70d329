//! Geometry aliases shared across the crate.
//!
//! 2D values are in the host window's coordinate space (points), 3D values are in scene units.

use euclid::default;

pub type Point = default::Point2D<f32>;
pub type Vector = default::Vector2D<f32>;
pub type Size = default::Size2D<f32>;
pub type Rect = default::Rect<f32>;
pub type Point3 = default::Point3D<f32>;
pub type Transform3 = default::Transform3D<f32>;

/// Scales `rect` by `factor` while keeping its center fixed.
pub fn scale_about_center(rect: &Rect, factor: f32) -> Rect {
    let size = rect.size * factor;
    let center = rect.center();
    Rect::new(
        Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0),
        size,
    )
}

pub(crate) fn lerp_rect(from: &Rect, to: &Rect, t: f32) -> Rect {
    Rect::new(from.origin.lerp(to.origin, t), from.size.lerp(to.size, t))
}
