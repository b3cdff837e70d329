pub use euclid;
pub use image;
pub use wgpu;

pub mod animation;
pub mod camera;
pub mod config;
mod error;
mod geometry;
mod gesture;
mod host;
pub mod lifecycle;
pub mod mesh;
mod pipeline;
pub mod recognizer;
mod renderer;
pub mod scheduler;
pub mod shader;
mod surface;
pub mod timing;

pub use config::{ConfigError, PeelConfig};
pub use error::RenderError;
pub use geometry::{scale_about_center, Point, Point3, Rect, Size, Transform3, Vector};
pub use gesture::GestureBinding;
pub use host::{OverlayId, OverlayLayer, SourceElement};
pub use lifecycle::{LifecyclePhase, LifecycleState, Overlay, OverlayLifecycle};
pub use pipeline::{PlaneKind, IMAGE_FORMAT};
pub use recognizer::{CompetitorState, GestureKind, GesturePhase, LongPressRecognizer};
pub use renderer::PeelRenderer;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use surface::{PeelableSurface, ReflectionProperty, ReflectionState, SurfaceId};
