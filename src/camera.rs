//! The camera that frames a sticker plane.
//!
//! The camera sits on the +z axis looking at the origin. Its distance is chosen so the field of
//! view, applied to the dominant axis of the viewport, spans exactly `max(width, height)` scene
//! units at the plane. With a viewport `scale_factor` times larger than the sticker bounds and a
//! plane `scale_factor` times smaller, the plane lands exactly on the sticker bounds.

use euclid::Angle;

use crate::geometry::{Point3, Size, Transform3};

/// Near clip plane distance.
pub const Z_NEAR: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub field_of_view: Angle<f32>,
    pub distance: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    /// Camera whose view exactly frames a `bounds`-sized plane at the origin.
    pub fn framing(bounds: Size, field_of_view: Angle<f32>) -> Self {
        let distance = framing_distance(bounds, field_of_view);
        Self {
            field_of_view,
            distance,
            z_near: Z_NEAR,
            z_far: distance.ceil(),
        }
    }

    pub fn view(&self) -> Transform3 {
        Transform3::translation(0.0, 0.0, -self.distance)
    }

    /// Perspective projection into wgpu clip space (depth in `[0, 1]`) for a viewport with the
    /// given aspect ratio (width / height).
    pub fn projection(&self, aspect: f32) -> Transform3 {
        let focal = 1.0 / (self.field_of_view.radians / 2.0).tan();
        let (sx, sy) = if aspect >= 1.0 {
            (focal, focal * aspect)
        } else {
            (focal / aspect, focal)
        };
        let range = self.z_near - self.z_far;
        // Row-vector convention: clip = point * projection.
        #[rustfmt::skip]
        let projection = Transform3::new(
            sx, 0.0, 0.0, 0.0,
            0.0, sy, 0.0, 0.0,
            0.0, 0.0, self.z_far / range, -1.0,
            0.0, 0.0, self.z_near * self.z_far / range, 0.0,
        );
        projection
    }

    pub fn view_projection(&self, aspect: f32) -> Transform3 {
        self.view().then(&self.projection(aspect))
    }

    /// Projects a scene point to normalized device coordinates, or `None` when it lies behind
    /// the camera.
    pub fn project(&self, point: Point3, aspect: f32) -> Option<Point3> {
        self.view_projection(aspect).transform_point3d(point)
    }
}

/// `max(w, h) / (2 * tan(fov / 2))`
pub fn framing_distance(bounds: Size, field_of_view: Angle<f32>) -> f32 {
    bounds.width.max(bounds.height) / (2.0 * (field_of_view.radians / 2.0).tan())
}

/// Column-major matrix for a WGSL `mat4x4<f32>` computing `matrix * column_vector`.
pub fn to_columns(transform: &Transform3) -> [[f32; 4]; 4] {
    // A row-vector matrix laid out row by row is its column-vector transpose laid out column by
    // column.
    transform.to_arrays()
}
