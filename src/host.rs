//! What the embedding UI toolkit provides.
//!
//! The interaction runs on the UI thread and only ever touches the host through these traits, so
//! they take `&self`; implementations use interior mutability for whatever they change.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::geometry::Rect;

/// Identifies an overlay inside the window overlay layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

impl OverlayId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The window-level layer floating overlays are placed in. Frames are in window coordinates.
pub trait OverlayLayer {
    fn insert(&self, id: OverlayId, frame: Rect);
    fn set_frame(&self, id: OverlayId, frame: Rect);
    fn remove(&self, id: OverlayId);
}

/// The visual element a sticker is peeled off.
pub trait SourceElement {
    /// Frame of the element in window coordinates, or `None` when it is not in a window.
    fn frame_in_window(&self) -> Option<Rect>;

    /// A rendering of the element at its current size.
    fn snapshot(&self) -> Option<RgbaImage>;

    fn set_hidden(&self, hidden: bool);

    /// Overlay layer of the element's window, or `None` when it is not in a window.
    fn overlay_layer(&self) -> Option<Rc<dyn OverlayLayer>>;
}
