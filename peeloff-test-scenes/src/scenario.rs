use std::rc::Rc;
use std::time::Duration;

use peeloff::{GestureBinding, PeelConfig, Point, Rect, Scheduler, SourceElement};

use crate::host::RecordingElement;

/// Time between two simulated frames.
pub const FRAME: Duration = Duration::from_millis(16);

/// Drives a binding attached to a [`RecordingElement`] the way a host run loop would: touches
/// arrive between frames, and every frame advances the scheduler before updating the binding.
pub struct Scenario {
    pub scheduler: Scheduler,
    pub binding: GestureBinding,
    pub element: Rc<RecordingElement>,
    config: PeelConfig,
    now: Duration,
}

impl Scenario {
    pub fn new(frame: Rect) -> Self {
        Self::with_element(RecordingElement::in_window(frame), PeelConfig::default())
    }

    pub fn with_element(element: Rc<RecordingElement>, config: PeelConfig) -> Self {
        let scheduler = Scheduler::new();
        let mut binding = GestureBinding::new(config.clone(), scheduler.handle())
            .expect("scenario config is valid");
        binding.attach(element.clone() as Rc<dyn SourceElement>);
        Self {
            scheduler,
            binding,
            element,
            config,
            now: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &PeelConfig {
        &self.config
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Runs one frame.
    pub fn step(&mut self) {
        self.now += FRAME;
        self.scheduler.advance_to(self.now);
        self.binding.update(self.now);
    }

    /// Runs frames until at least `duration` has passed.
    pub fn run_for(&mut self, duration: Duration) {
        let end = self.now + duration;
        while self.now < end {
            self.step();
        }
    }

    pub fn press(&mut self, location: Point) {
        self.binding.touch_began(location, self.now);
    }

    /// Presses and holds for the minimum press duration.
    pub fn long_press(&mut self, location: Point) {
        self.press(location);
        self.run_for(self.config.minimum_press_duration);
    }

    pub fn drag_to(&mut self, location: Point) {
        self.binding.touch_moved(location, self.now);
    }

    pub fn release(&mut self, location: Point) {
        self.binding.touch_ended(location, self.now);
    }

    pub fn cancel(&mut self) {
        self.binding.touch_cancelled(self.now);
    }

    /// Runs long enough for a peel animation started before this call to complete.
    pub fn finish_animation(&mut self) {
        self.run_for(self.config.animation_duration + FRAME);
    }
}
