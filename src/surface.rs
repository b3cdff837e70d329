//! The 3D scene behind a peeling sticker.
//!
//! A [`PeelableSurface`] owns a camera and two planes textured with the same image: the front
//! plane, which curls off according to its `peeled` progress, and a reflection plane behind it
//! that blurs, fades and drops as the sticker lifts. The surface owns its planes outright;
//! animation callbacks never hold a reference back into it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use euclid::Angle;
use image::RgbaImage;

use crate::animation::{AnimatedValue, AnimationGroup, Attached, BasicAnimation};
use crate::camera::{to_columns, Camera};
use crate::config::PeelConfig;
use crate::geometry::{scale_about_center, Rect, Size, Transform3};
use crate::scheduler::SchedulerHandle;
use crate::shader::PlaneUniforms;
use crate::timing::TimingFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionProperty {
    BlurRadius,
    Transparency,
    OffsetY,
}

/// Appearance of the reflection plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionState {
    pub blur_radius: f32,
    pub transparency: f32,
    /// Vertical translation in scene units; negative values move the reflection down.
    pub offset_y: f32,
}

impl ReflectionState {
    /// Reflection appearance for a sticker peeled by `progress`.
    pub fn at(progress: f32, config: &PeelConfig) -> Self {
        let resting = config.resting_transparency;
        Self {
            blur_radius: config.max_blur_radius * progress,
            transparency: resting + (config.peeled_transparency - resting) * progress,
            offset_y: -config.reflection_offset * progress,
        }
    }

    fn set(&mut self, property: ReflectionProperty, value: f32) {
        match property {
            ReflectionProperty::BlurRadius => self.blur_radius = value,
            ReflectionProperty::Transparency => self.transparency = value,
            ReflectionProperty::OffsetY => self.offset_y = value,
        }
    }
}

#[derive(Debug)]
struct FrontPlane {
    peeled: AnimatedValue<f32>,
    lift_distance: f32,
}

#[derive(Debug)]
struct ReflectionPlane {
    model: ReflectionState,
    presentation: ReflectionState,
    running: Option<Attached<AnimationGroup<ReflectionProperty>>>,
}

impl ReflectionPlane {
    fn update(&mut self, now: Duration) {
        let Some(running) = &mut self.running else {
            return;
        };
        let elapsed = running.elapsed(now);
        for (property, value) in running.animation.sample(elapsed) {
            self.presentation.set(property, value);
        }
        if elapsed >= running.animation.duration() {
            self.presentation = self.model;
            self.running = None;
        }
    }
}

pub struct PeelableSurface {
    id: SurfaceId,
    bounds: Size,
    config: PeelConfig,
    camera: Camera,
    front: FrontPlane,
    reflection: ReflectionPlane,
    image: Option<Arc<RgbaImage>>,
    image_generation: u64,
    scheduler: SchedulerHandle,
}

impl PeelableSurface {
    /// A flat surface for a sticker with the given bounds. Callbacks from
    /// [`set_peeled`](Self::set_peeled) are delivered through `scheduler`.
    pub fn new(bounds: Size, config: &PeelConfig, scheduler: SchedulerHandle) -> Self {
        let camera = Camera::framing(bounds, Angle::degrees(config.field_of_view_degrees));
        let resting = ReflectionState::at(0.0, config);
        Self {
            id: SurfaceId::next(),
            bounds,
            config: config.clone(),
            front: FrontPlane {
                peeled: AnimatedValue::new(0.0),
                lift_distance: camera.distance * config.lift_fraction,
            },
            camera,
            reflection: ReflectionPlane {
                model: resting,
                presentation: resting,
                running: None,
            },
            image: None,
            image_generation: 0,
            scheduler,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Size of both planes in scene units.
    pub fn plane_size(&self) -> Size {
        self.bounds / self.config.scale_factor
    }

    pub fn tessellation(&self) -> u16 {
        self.config.tessellation
    }

    pub fn lift_distance(&self) -> f32 {
        self.front.lift_distance
    }

    /// Region to render the scene into for a sticker occupying `frame`.
    pub fn viewport(&self, frame: &Rect) -> Rect {
        scale_about_center(frame, self.config.scale_factor)
    }

    /// Sets the texture of both planes.
    pub fn set_image(&mut self, image: Arc<RgbaImage>) {
        self.image = Some(image);
        self.image_generation += 1;
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    /// Incremented on every [`set_image`](Self::set_image), so renderers know when to re-upload.
    pub fn image_generation(&self) -> u64 {
        self.image_generation
    }

    /// Model value of the peel progress: the target of the last `set_peeled`.
    pub fn peeled(&self) -> f32 {
        self.front.peeled.model()
    }

    /// Peel progress as currently drawn.
    pub fn presented_peeled(&self) -> f32 {
        self.front.peeled.presentation()
    }

    pub fn reflection(&self) -> ReflectionState {
        self.reflection.presentation
    }

    pub fn reflection_model(&self) -> ReflectionState {
        self.reflection.model
    }

    pub fn is_animating(&self) -> bool {
        self.front.peeled.is_animating() || self.reflection.running.is_some()
    }

    /// Peels the sticker to `progress`.
    ///
    /// When `animated`, the front plane moves linearly over the configured duration while the
    /// reflection's blur follows the full duration and its transparency and offset start late
    /// when peeling in. `on_start` runs on the frame after the animation is attached and
    /// `on_complete` once the duration has elapsed; without animation both run on the next frame.
    pub fn set_peeled(
        &mut self,
        progress: f32,
        animated: bool,
        on_start: impl FnOnce() + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
    ) {
        let target = if progress.is_nan() {
            tracing::warn!("peel progress is NaN, using 0");
            0.0
        } else if !(0.0..=1.0).contains(&progress) {
            tracing::warn!(progress, "peel progress outside [0, 1], clamping");
            progress.clamp(0.0, 1.0)
        } else {
            progress
        };

        let reflection_target = ReflectionState::at(target, &self.config);
        if !animated {
            self.front.peeled.set(target);
            self.reflection.model = reflection_target;
            self.reflection.presentation = reflection_target;
            self.reflection.running = None;
            self.scheduler.post(on_start);
            self.scheduler.post(on_complete);
            return;
        }

        let duration = self.config.animation_duration;
        let from = self.front.peeled.presentation();
        let peeling_in = target > from;
        let delay = if peeling_in {
            self.config.reflection_delay()
        } else {
            Duration::ZERO
        };
        tracing::debug!(surface = self.id.0, from, to = target, ?duration, "peel animation");

        self.front
            .peeled
            .animate(BasicAnimation::new(from, target, duration));

        let reflection_from = self.reflection.presentation;
        let staggered = |from: f32, to: f32| {
            BasicAnimation::new(from, to, duration - delay)
                .with_begin_offset(delay)
                .with_timing(TimingFunction::EASE_IN_EASE_OUT)
        };
        let group = AnimationGroup::new(duration)
            .with(
                ReflectionProperty::BlurRadius,
                BasicAnimation::new(
                    reflection_from.blur_radius,
                    reflection_target.blur_radius,
                    duration,
                ),
            )
            .with(
                ReflectionProperty::Transparency,
                staggered(
                    reflection_from.transparency,
                    reflection_target.transparency,
                ),
            )
            .with(
                ReflectionProperty::OffsetY,
                staggered(reflection_from.offset_y, reflection_target.offset_y),
            );
        self.reflection.model = reflection_target;
        self.reflection.running = Some(Attached::new(group));

        self.scheduler.post(on_start);
        self.scheduler.post_after(duration, on_complete);
    }

    /// Samples running animations at `now`.
    pub fn update(&mut self, now: Duration) {
        let peeled = self.front.peeled.update(now);
        self.reflection.update(now);
        tracing::trace!(surface = self.id.0, peeled, "surface sampled");
    }

    /// Uniforms for the front and reflection planes as currently presented.
    pub fn uniforms(&self) -> (PlaneUniforms, PlaneUniforms) {
        let aspect = self.bounds.width / self.bounds.height.max(f32::EPSILON);
        let view_proj = to_columns(&self.camera.view_projection(aspect));
        let texel_size = self
            .image
            .as_ref()
            .map(|image| {
                [
                    1.0 / image.width().max(1) as f32,
                    1.0 / image.height().max(1) as f32,
                ]
            })
            .unwrap_or([0.0, 0.0]);

        let front = PlaneUniforms {
            view_proj,
            peeled: self.front.peeled.presentation(),
            lift_distance: self.front.lift_distance,
            texel_size,
            ..PlaneUniforms::default()
        };

        let reflection_state = self.reflection.presentation;
        let reflection = PlaneUniforms {
            view_proj,
            model: to_columns(&Transform3::translation(0.0, reflection_state.offset_y, 0.0)),
            opacity: reflection_state.transparency,
            blur_radius: reflection_state.blur_radius,
            texel_size,
            ..PlaneUniforms::default()
        };

        (front, reflection)
    }
}

impl std::fmt::Debug for PeelableSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeelableSurface")
            .field("id", &self.id)
            .field("bounds", &self.bounds)
            .field("peeled", &self.front.peeled)
            .field("reflection", &self.reflection.presentation)
            .field("image_generation", &self.image_generation)
            .finish()
    }
}
