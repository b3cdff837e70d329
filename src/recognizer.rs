//! Long-press recognition from raw touches.
//!
//! A touch becomes a peel once it has stayed down for the minimum press duration without
//! travelling further than the allowable movement. After that every move is reported as
//! `Changed` until the touch lifts or is cancelled.
//!
//! Drag-class competitors (pans and drags on the same element or its ancestors) take precedence:
//! while one of them might still recognize, the long press waits for it; if it begins, the long
//! press fails.

use std::collections::VecDeque;
use std::time::Duration;

use smallvec::SmallVec;

use crate::config::PeelConfig;
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Possible,
    Began,
    Changed,
    Ended,
    Cancelled,
    Failed,
}

impl GesturePhase {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            GesturePhase::Ended | GesturePhase::Cancelled | GesturePhase::Failed
        )
    }
}

/// Another recognizer attached to the same touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Pan,
    Drag,
    Tap,
    Pinch,
    Rotation,
    Other,
}

impl GestureKind {
    /// Whether a long press has to wait for this kind of gesture to fail.
    pub fn blocks_long_press(self) -> bool {
        matches!(self, GestureKind::Pan | GestureKind::Drag)
    }
}

/// State of a competing recognizer, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitorState {
    Possible,
    Began,
    Ended,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub phase: GesturePhase,
    /// Touch location in window coordinates.
    pub location: Point,
}

#[derive(Debug, Clone, Copy)]
struct Touch {
    start: Point,
    location: Point,
    pressed_at: Duration,
}

#[derive(Debug)]
pub struct LongPressRecognizer {
    minimum_press_duration: Duration,
    allowable_movement: f32,
    phase: GesturePhase,
    touch: Option<Touch>,
    /// Drag-class competitors that have not failed yet.
    pending_competitors: SmallVec<[GestureKind; 2]>,
    events: VecDeque<GestureEvent>,
}

impl LongPressRecognizer {
    pub fn new(config: &PeelConfig) -> Self {
        Self {
            minimum_press_duration: config.minimum_press_duration,
            allowable_movement: config.allowable_movement,
            phase: GesturePhase::Possible,
            touch: None,
            pending_competitors: SmallVec::new(),
            events: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Whether recognition is on hold for a competing drag gesture.
    pub fn is_waiting(&self) -> bool {
        self.phase == GesturePhase::Possible
            && self.touch.is_some()
            && !self.pending_competitors.is_empty()
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = GestureEvent> + '_ {
        self.events.drain(..)
    }

    pub fn touch_began(&mut self, location: Point, now: Duration) {
        if self.touch.is_some() {
            tracing::trace!("ignoring additional touch");
            return;
        }
        if self.phase.is_finished() {
            self.phase = GesturePhase::Possible;
        }
        self.touch = Some(Touch {
            start: location,
            location,
            pressed_at: now,
        });
    }

    pub fn touch_moved(&mut self, location: Point, now: Duration) {
        self.poll(now);
        let Some(touch) = &mut self.touch else {
            return;
        };
        touch.location = location;
        match self.phase {
            GesturePhase::Possible => {
                if (location - touch.start).length() > self.allowable_movement {
                    tracing::debug!("touch moved too far, long press failed");
                    self.finish(GesturePhase::Failed, location);
                }
            }
            GesturePhase::Began | GesturePhase::Changed => {
                self.transition(GesturePhase::Changed, location);
            }
            _ => {}
        }
    }

    pub fn touch_ended(&mut self, location: Point, now: Duration) {
        self.poll(now);
        if self.touch.is_none() {
            return;
        }
        match self.phase {
            GesturePhase::Possible => self.finish(GesturePhase::Failed, location),
            GesturePhase::Began | GesturePhase::Changed => {
                self.finish(GesturePhase::Ended, location)
            }
            _ => self.release_touch(),
        }
    }

    pub fn touch_cancelled(&mut self, now: Duration) {
        self.poll(now);
        let Some(touch) = self.touch else {
            return;
        };
        match self.phase {
            GesturePhase::Possible => self.finish(GesturePhase::Failed, touch.location),
            GesturePhase::Began | GesturePhase::Changed => {
                self.finish(GesturePhase::Cancelled, touch.location)
            }
            _ => self.release_touch(),
        }
    }

    pub fn competitor_changed(&mut self, kind: GestureKind, state: CompetitorState) {
        if !kind.blocks_long_press() {
            return;
        }
        match state {
            CompetitorState::Possible => {
                if !self.pending_competitors.contains(&kind) {
                    self.pending_competitors.push(kind);
                }
            }
            CompetitorState::Began => {
                self.pending_competitors.retain(|pending| *pending != kind);
                if self.phase == GesturePhase::Possible {
                    if let Some(touch) = self.touch {
                        tracing::debug!(?kind, "competing gesture began, long press failed");
                        self.finish(GesturePhase::Failed, touch.location);
                    }
                }
            }
            CompetitorState::Ended | CompetitorState::Cancelled | CompetitorState::Failed => {
                self.pending_competitors.retain(|pending| *pending != kind);
            }
        }
    }

    /// Recognizes the press once it has been held long enough and nothing blocks it.
    pub fn update(&mut self, now: Duration) {
        self.poll(now);
    }

    fn poll(&mut self, now: Duration) {
        if self.phase != GesturePhase::Possible || !self.pending_competitors.is_empty() {
            return;
        }
        let Some(touch) = self.touch else {
            return;
        };
        if now.saturating_sub(touch.pressed_at) >= self.minimum_press_duration {
            self.transition(GesturePhase::Began, touch.location);
        }
    }

    fn transition(&mut self, phase: GesturePhase, location: Point) {
        self.phase = phase;
        self.events.push_back(GestureEvent { phase, location });
    }

    fn finish(&mut self, phase: GesturePhase, location: Point) {
        self.transition(phase, location);
        self.release_touch();
    }

    /// Competitors belong to the touch; unresolved ones must not hold up the next press.
    fn release_touch(&mut self) {
        self.touch = None;
        self.pending_competitors.clear();
    }
}
