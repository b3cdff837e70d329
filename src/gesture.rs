use std::rc::Rc;
use std::time::Duration;

use smallvec::SmallVec;

use crate::config::{ConfigError, PeelConfig};
use crate::geometry::Point;
use crate::host::SourceElement;
use crate::lifecycle::{LifecyclePhase, Overlay, OverlayLifecycle};
use crate::recognizer::{
    CompetitorState, GestureEvent, GestureKind, GesturePhase, LongPressRecognizer,
};
use crate::scheduler::SchedulerHandle;
use crate::surface::SurfaceId;

/// Makes an element peelable.
///
/// The binding owns a long-press recognizer and the overlay lifecycle, and routes recognized
/// phases from one to the other. The host feeds it touches in window coordinates and calls
/// [`update`](Self::update) once per frame, right after
/// [`Scheduler::advance_to`](crate::scheduler::Scheduler::advance_to).
pub struct GestureBinding {
    config: PeelConfig,
    element: Option<Rc<dyn SourceElement>>,
    recognizer: Option<LongPressRecognizer>,
    lifecycle: OverlayLifecycle,
    /// Whether the gesture in flight lifted an overlay. Rejected gestures are not routed further.
    routing: bool,
}

impl GestureBinding {
    pub fn new(config: PeelConfig, scheduler: SchedulerHandle) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            lifecycle: OverlayLifecycle::new(config.clone(), scheduler),
            config,
            element: None,
            recognizer: None,
            routing: false,
        })
    }

    pub fn config(&self) -> &PeelConfig {
        &self.config
    }

    /// Installs the recognizer on `element`. An existing attachment is detached first.
    pub fn attach(&mut self, element: Rc<dyn SourceElement>) {
        if self.is_attached() {
            self.detach();
        }
        self.recognizer = Some(LongPressRecognizer::new(&self.config));
        self.element = Some(element);
        tracing::debug!("peel gesture attached");
    }

    /// Tears down any live overlay, revealing the element, and removes the recognizer.
    pub fn detach(&mut self) {
        self.lifecycle.tear_down();
        self.recognizer = None;
        self.element = None;
        self.routing = false;
        tracing::debug!("peel gesture detached");
    }

    pub fn is_attached(&self) -> bool {
        self.element.is_some()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    pub fn gesture_phase(&self) -> Option<GesturePhase> {
        self.recognizer.as_ref().map(LongPressRecognizer::phase)
    }

    pub fn lifecycle(&self) -> &OverlayLifecycle {
        &self.lifecycle
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.lifecycle.overlay()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        self.lifecycle.overlay_mut()
    }

    /// Surface of the live overlay. Every other surface this binding created is retired.
    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.overlay().map(|overlay| overlay.surface().id())
    }

    pub fn touch_began(&mut self, location: Point, now: Duration) {
        self.with_recognizer(|recognizer| recognizer.touch_began(location, now));
    }

    pub fn touch_moved(&mut self, location: Point, now: Duration) {
        self.with_recognizer(|recognizer| recognizer.touch_moved(location, now));
    }

    pub fn touch_ended(&mut self, location: Point, now: Duration) {
        self.with_recognizer(|recognizer| recognizer.touch_ended(location, now));
    }

    pub fn touch_cancelled(&mut self, now: Duration) {
        self.with_recognizer(|recognizer| recognizer.touch_cancelled(now));
    }

    /// Reports a state change of another recognizer on the same touch.
    pub fn competitor_changed(&mut self, kind: GestureKind, state: CompetitorState) {
        self.with_recognizer(|recognizer| recognizer.competitor_changed(kind, state));
    }

    /// Runs the press timer, then applies animation callbacks and samples animations.
    pub fn update(&mut self, now: Duration) {
        self.with_recognizer(|recognizer| recognizer.update(now));
        self.lifecycle.update(now);
    }

    fn with_recognizer(&mut self, f: impl FnOnce(&mut LongPressRecognizer)) {
        let Some(recognizer) = &mut self.recognizer else {
            tracing::trace!("peel gesture not attached, ignoring input");
            return;
        };
        f(recognizer);
        let events: SmallVec<[GestureEvent; 4]> = recognizer.drain().collect();
        for event in events {
            self.route(event);
        }
    }

    fn route(&mut self, event: GestureEvent) {
        tracing::trace!(phase = ?event.phase, location = ?event.location, "gesture event");
        match event.phase {
            GesturePhase::Possible => {}
            GesturePhase::Began => {
                let Some(element) = &self.element else {
                    return;
                };
                self.routing = self.lifecycle.begin(element, event.location);
            }
            GesturePhase::Changed => {
                if self.routing {
                    self.lifecycle.track(event.location);
                }
            }
            GesturePhase::Ended | GesturePhase::Cancelled | GesturePhase::Failed => {
                if std::mem::take(&mut self.routing) {
                    self.lifecycle.end();
                }
            }
        }
    }
}

impl std::fmt::Debug for GestureBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureBinding")
            .field("attached", &self.is_attached())
            .field("recognizer", &self.recognizer)
            .field("lifecycle", &self.lifecycle)
            .field("routing", &self.routing)
            .finish()
    }
}
