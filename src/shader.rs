//! The peel shader: how far each point of the sticker has lifted for a given peel progress, and
//! how much highlight it catches.
//!
//! Both formulas are evaluated per point from two inputs: `peeled`, the overall progress in
//! `[0, 1]`, and `v`, the point's vertical texture coordinate (0 at the top edge, 1 at the
//! bottom). The curl starts at the top edge and sweeps down: at `peeled = 0.5` the top edge is
//! fully lifted while the bottom edge has not started moving.
//!
//! The Rust functions here are the reference for [`PLANE_SHADER_WGSL`], which evaluates the same
//! formulas on the GPU. Keep the two in sync.

use std::f32::consts::PI;

/// Local progress of the point at texture coordinate `v`, in `[0, 1]`.
#[inline]
pub fn peel_progress(peeled: f32, v: f32) -> f32 {
    2.0 * (peeled - v / 2.0).clamp(0.0, 0.5)
}

/// Cubic ease-in/ease-out over `[0, 1]`.
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
    }
}

/// Rounds to three decimal digits.
///
/// Neighbouring vertices on tessellated edges otherwise end up with slightly different
/// displacements for the same progress, which shows up as cracks.
#[inline]
pub fn quantize(t: f32) -> f32 {
    (t * 1000.0).round() / 1000.0
}

/// Eased and quantized lift factor in `[0, 1]` for the vertex at `v`.
#[inline]
pub fn lift(peeled: f32, v: f32) -> f32 {
    quantize(ease_in_out(peel_progress(peeled, v)))
}

/// Distance the vertex at `v` moves along its normal.
#[inline]
pub fn displacement(peeled: f32, v: f32, lift_distance: f32) -> f32 {
    lift_distance * lift(peeled, v)
}

/// Brightness added to the fragment at `v`, in `[0, 1/8]`.
#[inline]
pub fn highlight(peeled: f32, v: f32) -> f32 {
    let t = peel_progress(peeled, v);
    (PI * t).sin().max(0.0).powi(12) / 8.0
}

/// Uniform block shared by both planes.
///
/// The reflection ignores `peeled` and `lift_distance`; the front plane ignores `blur_radius`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PlaneUniforms {
    /// Column-major view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
    pub peeled: f32,
    pub lift_distance: f32,
    pub opacity: f32,
    pub blur_radius: f32,
    /// Size of one texel in texture coordinates.
    pub texel_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl Default for PlaneUniforms {
    fn default() -> Self {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        Self {
            view_proj: identity,
            model: identity,
            peeled: 0.0,
            lift_distance: 0.0,
            opacity: 1.0,
            blur_radius: 0.0,
            texel_size: [0.0, 0.0],
            _pad: [0.0, 0.0],
        }
    }
}

/// Vertex and fragment stages for the front plane (`vs_front`/`fs_front`) and the reflection
/// plane (`vs_reflection`/`fs_reflection`).
pub const PLANE_SHADER_WGSL: &str = r#"
const PI: f32 = 3.14159265;

struct PlaneUniforms {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    peeled: f32,
    lift_distance: f32,
    opacity: f32,
    blur_radius: f32,
    texel_size: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> u: PlaneUniforms;
@group(1) @binding(0) var t_image: texture_2d<f32>;
@group(1) @binding(1) var s_image: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

fn peel_progress(peeled: f32, v: f32) -> f32 {
    return 2.0 * clamp(peeled - v / 2.0, 0.0, 0.5);
}

fn ease_in_out(t: f32) -> f32 {
    if (t < 0.5) {
        return 4.0 * t * t * t;
    }
    return (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0;
}

@vertex
fn vs_front(in: VertexInput) -> VertexOutput {
    var t = ease_in_out(peel_progress(u.peeled, in.uv.y));
    t = round(t * 1000.0) / 1000.0;
    let displaced = in.position + in.normal * u.lift_distance * t;

    var out: VertexOutput;
    out.position = u.view_proj * u.model * vec4<f32>(displaced, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_front(in: VertexOutput) -> @location(0) vec4<f32> {
    let t = peel_progress(u.peeled, in.uv.y);
    var color = textureSample(t_image, s_image, in.uv);
    let bump = pow(max(sin(PI * t), 0.0), 12.0) / 8.0;
    color = vec4<f32>(min(color.rgb + vec3<f32>(bump), vec3<f32>(1.0)), color.a);
    return color;
}

@vertex
fn vs_reflection(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = u.view_proj * u.model * vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    return out;
}

// Gaussian over a fixed 9x9 tap grid whose spacing grows with the radius.
@fragment
fn fs_reflection(in: VertexOutput) -> @location(0) vec4<f32> {
    let radius = max(u.blur_radius, 0.0);
    let sigma = max(radius / 2.0, 0.001);
    let spacing = u.texel_size * (radius / 4.0);
    var color = vec4<f32>(0.0);
    var total = 0.0;
    for (var i = -4; i <= 4; i++) {
        for (var j = -4; j <= 4; j++) {
            let offset = vec2<f32>(f32(i), f32(j));
            let dist = length(offset) * radius / 4.0;
            let weight = exp(-(dist * dist) / (2.0 * sigma * sigma));
            color += textureSampleLevel(t_image, s_image, in.uv + offset * spacing, 0.0) * weight;
            total += weight;
        }
    }
    color = color / total;
    return vec4<f32>(color.rgb, color.a * u.opacity);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const PEELED: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
    const V: [f32; 3] = [0.0, 0.5, 1.0];

    #[test]
    fn progress_is_bounded() {
        for peeled in PEELED {
            for v in V {
                let t = peel_progress(peeled, v);
                assert!((0.0..=1.0).contains(&t), "t={t} for peeled={peeled}, v={v}");
            }
        }
    }

    #[test]
    fn progress_sweeps_from_top_to_bottom() {
        assert_eq!(peel_progress(0.0, 0.0), 0.0);
        assert_eq!(peel_progress(0.5, 0.0), 1.0);
        assert_eq!(peel_progress(0.5, 1.0), 0.0);
        assert_eq!(peel_progress(1.0, 1.0), 1.0);
        assert_eq!(peel_progress(0.75, 0.5), 1.0);
        assert_eq!(peel_progress(0.25, 0.0), 0.5);
    }

    #[test]
    fn ease_is_monotonic_and_bounded() {
        let mut previous = ease_in_out(0.0);
        assert_eq!(previous, 0.0);
        for step in 1..=100 {
            let t = step as f32 / 100.0;
            let eased = ease_in_out(t);
            assert!(eased >= previous, "ease decreased at t={t}");
            assert!((0.0..=1.0).contains(&eased));
            previous = eased;
        }
        assert!((ease_in_out(1.0) - 1.0).abs() < 1e-6);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn quantize_is_idempotent() {
        for step in 0..=200 {
            let t = ease_in_out(step as f32 / 200.0);
            let once = quantize(t);
            assert_eq!(quantize(once), once);
        }
    }

    #[test]
    fn displacement_is_deterministic_and_scaled_by_lift_distance() {
        for peeled in PEELED {
            for v in V {
                let a = displacement(peeled, v, 40.0);
                let b = displacement(peeled, v, 40.0);
                assert_eq!(a, b);
                assert!((0.0..=40.0).contains(&a));
            }
        }
        assert_eq!(displacement(1.0, 0.5, 40.0), 40.0);
        assert_eq!(displacement(0.0, 0.0, 40.0), 0.0);
    }

    #[test]
    fn highlight_is_bounded_and_peaks_mid_curl() {
        for peeled in PEELED {
            for v in V {
                let h = highlight(peeled, v);
                assert!((0.0..=0.125).contains(&h), "h={h}");
            }
        }
        // t = 0.5 is the brightest point of the curl.
        assert!((highlight(0.25, 0.0) - 0.125).abs() < 1e-6);
        assert!(highlight(0.0, 0.0) < 1e-6);
        assert!(highlight(1.0, 0.0) < 1e-6);
    }

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<PlaneUniforms>(), 160);
    }
}
