//! The overlay state machine behind a peel gesture.
//!
//! On `begin` the element is snapshotted and a floating overlay carrying a [`PeelableSurface`]
//! takes its place in the window overlay layer; the element itself is hidden as soon as the
//! peel-in animation has started. The overlay follows the touch until `end`, then springs back
//! onto the element while peeling back down, and is torn down when that animation completes.
//!
//! Animation callbacks never reach into the lifecycle. They send a [`LifecycleMessage`] tagged
//! with the overlay's cycle number, and [`OverlayLifecycle::update`] applies the messages that
//! still belong to the current overlay.

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::animation::{Attached, BasicAnimation};
use crate::config::PeelConfig;
use crate::geometry::{Point, Rect, Vector};
use crate::host::{OverlayId, OverlayLayer, SourceElement};
use crate::scheduler::SchedulerHandle;
use crate::surface::PeelableSurface;
use crate::timing::TimingFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleMessage {
    /// The peel-in animation of the given cycle has started.
    PeelInStarted(u64),
    /// The peel-out animation of the given cycle has completed.
    PeelOutFinished(u64),
}

/// Which state the lifecycle is in, without the data it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    PeelingIn,
    Tracking,
    PeelingOut,
}

/// The floating stand-in for the element while it is peeled.
pub struct Overlay {
    id: OverlayId,
    cycle: u64,
    frame: Rect,
    frame_animation: Option<Attached<BasicAnimation<Rect>>>,
    surface: PeelableSurface,
    source: Rc<dyn SourceElement>,
    layer: Rc<dyn OverlayLayer>,
    source_hidden: bool,
}

impl Overlay {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current frame in window coordinates.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn surface(&self) -> &PeelableSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut PeelableSurface {
        &mut self.surface
    }

    pub fn is_source_hidden(&self) -> bool {
        self.source_hidden
    }

    /// Region the host renders the surface into, in window coordinates.
    pub fn viewport(&self) -> Rect {
        self.surface.viewport(&self.frame)
    }

    fn move_to(&mut self, frame: Rect) {
        self.frame = frame;
        self.layer.set_frame(self.id, frame);
    }

    fn update(&mut self, now: Duration) {
        self.surface.update(now);
        let Some(running) = &mut self.frame_animation else {
            return;
        };
        let elapsed = running.elapsed(now);
        let frame = running.animation.sample(elapsed);
        if elapsed >= running.animation.end() {
            self.frame_animation = None;
        }
        self.move_to(frame);
    }

    /// Reveals the element and takes the overlay out of the window.
    fn tear_down(self) {
        if self.source_hidden {
            self.source.set_hidden(false);
        }
        self.layer.remove(self.id);
        tracing::debug!(overlay = self.id.0, cycle = self.cycle, "overlay torn down");
    }
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("id", &self.id)
            .field("cycle", &self.cycle)
            .field("frame", &self.frame)
            .field("source_hidden", &self.source_hidden)
            .field("surface", &self.surface)
            .finish()
    }
}

#[derive(Debug, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    PeelingIn {
        overlay: Overlay,
        /// Touch location relative to the overlay origin.
        offset: Vector,
    },
    Tracking {
        overlay: Overlay,
        offset: Vector,
    },
    PeelingOut {
        overlay: Overlay,
    },
}

impl LifecycleState {
    pub fn phase(&self) -> LifecyclePhase {
        match self {
            LifecycleState::Idle => LifecyclePhase::Idle,
            LifecycleState::PeelingIn { .. } => LifecyclePhase::PeelingIn,
            LifecycleState::Tracking { .. } => LifecyclePhase::Tracking,
            LifecycleState::PeelingOut { .. } => LifecyclePhase::PeelingOut,
        }
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        match self {
            LifecycleState::Idle => None,
            LifecycleState::PeelingIn { overlay, .. }
            | LifecycleState::Tracking { overlay, .. }
            | LifecycleState::PeelingOut { overlay } => Some(overlay),
        }
    }

    fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        match self {
            LifecycleState::Idle => None,
            LifecycleState::PeelingIn { overlay, .. }
            | LifecycleState::Tracking { overlay, .. }
            | LifecycleState::PeelingOut { overlay } => Some(overlay),
        }
    }

    fn into_overlay(self) -> Option<Overlay> {
        match self {
            LifecycleState::Idle => None,
            LifecycleState::PeelingIn { overlay, .. }
            | LifecycleState::Tracking { overlay, .. }
            | LifecycleState::PeelingOut { overlay } => Some(overlay),
        }
    }
}

fn notify(
    sender: &Sender<LifecycleMessage>,
    message: LifecycleMessage,
) -> impl FnOnce() + Send + 'static {
    let sender = sender.clone();
    move || {
        if sender.send(message).is_err() {
            tracing::debug!(?message, "lifecycle dropped before callback");
        }
    }
}

pub struct OverlayLifecycle {
    config: PeelConfig,
    scheduler: SchedulerHandle,
    state: LifecycleState,
    sender: Sender<LifecycleMessage>,
    receiver: Receiver<LifecycleMessage>,
    next_cycle: u64,
}

impl OverlayLifecycle {
    pub fn new(config: PeelConfig, scheduler: SchedulerHandle) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            config,
            scheduler,
            state: LifecycleState::Idle,
            sender,
            receiver,
            next_cycle: 1,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.state.phase()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.state.overlay()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        self.state.overlay_mut()
    }

    /// Lifts `element` into a new overlay for a press at `location`.
    ///
    /// Returns `false` when nothing was lifted: another overlay is still alive, or the element
    /// has no window, overlay layer or snapshot.
    pub fn begin(&mut self, element: &Rc<dyn SourceElement>, location: Point) -> bool {
        if !matches!(self.state, LifecycleState::Idle) {
            tracing::warn!(phase = ?self.phase(), "peel already in progress, rejecting new gesture");
            return false;
        }
        // Snapshot before anything else touches the element.
        let Some(image) = element.snapshot() else {
            tracing::debug!("element has no snapshot, not peeling");
            return false;
        };
        let Some(layer) = element.overlay_layer() else {
            tracing::debug!("element has no overlay layer, not peeling");
            return false;
        };
        let Some(frame) = element.frame_in_window() else {
            tracing::debug!("element is not in a window, not peeling");
            return false;
        };

        let cycle = self.next_cycle;
        self.next_cycle += 1;
        let id = OverlayId::next();

        let mut surface = PeelableSurface::new(frame.size, &self.config, self.scheduler.clone());
        surface.set_image(Arc::new(image));
        layer.insert(id, frame);
        surface.set_peeled(
            1.0,
            true,
            notify(&self.sender, LifecycleMessage::PeelInStarted(cycle)),
            || {},
        );

        tracing::debug!(overlay = id.0, cycle, ?frame, "peeling in");
        self.state = LifecycleState::PeelingIn {
            overlay: Overlay {
                id,
                cycle,
                frame,
                frame_animation: None,
                surface,
                source: element.clone(),
                layer,
                source_hidden: false,
            },
            offset: location - frame.origin,
        };
        true
    }

    /// Moves the overlay so the press offset stays under the touch.
    pub fn track(&mut self, location: Point) {
        self.state = match std::mem::take(&mut self.state) {
            LifecycleState::PeelingIn {
                mut overlay,
                offset,
            }
            | LifecycleState::Tracking {
                mut overlay,
                offset,
            } => {
                let frame = Rect::new(location - offset, overlay.frame.size);
                overlay.move_to(frame);
                LifecycleState::Tracking { overlay, offset }
            }
            other => {
                tracing::debug!(phase = ?other.phase(), "no overlay to track");
                other
            }
        };
    }

    /// Sends the overlay back onto the element and peels it down.
    pub fn end(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            LifecycleState::PeelingIn { mut overlay, .. }
            | LifecycleState::Tracking { mut overlay, .. } => {
                match overlay.source.frame_in_window() {
                    Some(home) => {
                        let animation = BasicAnimation::new(
                            overlay.frame,
                            home,
                            self.config.animation_duration,
                        )
                        .with_timing(TimingFunction::CRITICALLY_DAMPED);
                        overlay.frame_animation = Some(Attached::new(animation));
                    }
                    None => tracing::debug!("element left its window, overlay peels out in place"),
                }
                overlay.surface.set_peeled(
                    0.0,
                    true,
                    || {},
                    notify(&self.sender, LifecycleMessage::PeelOutFinished(overlay.cycle)),
                );
                tracing::debug!(overlay = overlay.id.0, cycle = overlay.cycle, "peeling out");
                LifecycleState::PeelingOut { overlay }
            }
            other => {
                tracing::debug!(phase = ?other.phase(), "nothing to end");
                other
            }
        };
    }

    /// Applies pending callback messages and samples the overlay's animations at `now`.
    pub fn update(&mut self, now: Duration) {
        let messages: Vec<LifecycleMessage> = self.receiver.try_iter().collect();
        for message in messages {
            self.apply(message);
        }
        if let Some(overlay) = self.state.overlay_mut() {
            overlay.update(now);
        }
    }

    /// Tears down any live overlay immediately, skipping the peel-out animation.
    pub fn tear_down(&mut self) {
        if let Some(overlay) = std::mem::take(&mut self.state).into_overlay() {
            overlay.tear_down();
        }
    }

    fn apply(&mut self, message: LifecycleMessage) {
        match message {
            LifecycleMessage::PeelInStarted(cycle) => match self.state.overlay_mut() {
                Some(overlay) if overlay.cycle == cycle => {
                    if !overlay.source_hidden {
                        overlay.source.set_hidden(true);
                        overlay.source_hidden = true;
                    }
                }
                _ => tracing::debug!(cycle, "discarding stale peel-in start"),
            },
            LifecycleMessage::PeelOutFinished(cycle) => {
                let current = matches!(
                    &self.state,
                    LifecycleState::PeelingOut { overlay } if overlay.cycle == cycle
                );
                if current {
                    self.tear_down();
                } else {
                    tracing::debug!(cycle, "discarding stale peel-out completion");
                }
            }
        }
    }
}

impl Drop for OverlayLifecycle {
    fn drop(&mut self) {
        self.tear_down();
    }
}

impl std::fmt::Debug for OverlayLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayLifecycle")
            .field("state", &self.state)
            .field("next_cycle", &self.next_cycle)
            .finish()
    }
}
