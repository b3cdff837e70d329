//! Property animations with a model/presentation split.
//!
//! Setting an animated property changes its *model* value right away, while its *presentation*
//! value (what gets drawn) follows the running animation until it finishes. Animations are
//! attached without a start time and pick one up on the first frame that samples them, so an
//! animation added between frames starts on the next frame instead of partway through.

use std::time::Duration;

use smallvec::SmallVec;

use crate::geometry::{lerp_rect, Rect};
use crate::timing::TimingFunction;

pub trait Animatable: Copy {
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

impl Animatable for f32 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Animatable for Rect {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        lerp_rect(self, to, t)
    }
}

/// Animates a value from `from` to `to` over `duration`, starting `begin_offset` after the
/// animation is attached. Before the offset the animation holds `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicAnimation<T> {
    pub from: T,
    pub to: T,
    pub begin_offset: Duration,
    pub duration: Duration,
    pub timing: TimingFunction,
}

impl<T: Animatable> BasicAnimation<T> {
    pub fn new(from: T, to: T, duration: Duration) -> Self {
        Self {
            from,
            to,
            begin_offset: Duration::ZERO,
            duration,
            timing: TimingFunction::Linear,
        }
    }

    pub fn with_begin_offset(mut self, begin_offset: Duration) -> Self {
        self.begin_offset = begin_offset;
        self
    }

    pub fn with_timing(mut self, timing: TimingFunction) -> Self {
        self.timing = timing;
        self
    }

    /// Time after attachment at which the animation reaches `to`.
    pub fn end(&self) -> Duration {
        self.begin_offset + self.duration
    }

    pub fn sample(&self, elapsed: Duration) -> T {
        if elapsed <= self.begin_offset {
            return self.from;
        }
        if elapsed >= self.end() || self.duration.is_zero() {
            return self.to;
        }
        let local = (elapsed - self.begin_offset).as_secs_f32() / self.duration.as_secs_f32();
        self.from.interpolate(&self.to, self.timing.evaluate(local))
    }
}

/// Animations for several properties that start together and are cut off at a shared duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationGroup<K> {
    animations: SmallVec<[(K, BasicAnimation<f32>); 4]>,
    duration: Duration,
}

impl<K: Copy + PartialEq> AnimationGroup<K> {
    pub fn new(duration: Duration) -> Self {
        Self {
            animations: SmallVec::new(),
            duration,
        }
    }

    pub fn with(mut self, key: K, animation: BasicAnimation<f32>) -> Self {
        self.animations.push((key, animation));
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.animations.iter().map(|(key, _)| *key)
    }

    pub fn sample(&self, elapsed: Duration) -> impl Iterator<Item = (K, f32)> + '_ {
        let clipped = elapsed.min(self.duration);
        let finished = elapsed >= self.duration;
        self.animations.iter().map(move |(key, animation)| {
            // A child that would outlive the group is snapped to its target when the group ends.
            let value = if finished {
                animation.to
            } else {
                animation.sample(clipped)
            };
            (*key, value)
        })
    }
}

/// An animation waiting for, or running since, its first sampled frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attached<A> {
    pub(crate) animation: A,
    started_at: Option<Duration>,
}

impl<A> Attached<A> {
    pub(crate) fn new(animation: A) -> Self {
        Self {
            animation,
            started_at: None,
        }
    }

    /// Time since the animation started. The first call fixes the start at `now`.
    pub(crate) fn elapsed(&mut self, now: Duration) -> Duration {
        let started_at = *self.started_at.get_or_insert(now);
        now.saturating_sub(started_at)
    }
}

/// A property with a model value and a presentation value driven by at most one animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedValue<T> {
    model: T,
    presentation: T,
    running: Option<Attached<BasicAnimation<T>>>,
}

impl<T: Animatable> AnimatedValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            model: value,
            presentation: value,
            running: None,
        }
    }

    pub fn model(&self) -> T {
        self.model
    }

    pub fn presentation(&self) -> T {
        self.presentation
    }

    pub fn is_animating(&self) -> bool {
        self.running.is_some()
    }

    /// Jumps to `value`, discarding any running animation.
    pub fn set(&mut self, value: T) {
        self.model = value;
        self.presentation = value;
        self.running = None;
    }

    /// Replaces any running animation. The model value becomes the animation's target.
    pub fn animate(&mut self, animation: BasicAnimation<T>) {
        self.model = animation.to;
        self.running = Some(Attached::new(animation));
    }

    pub fn update(&mut self, now: Duration) -> T {
        if let Some(running) = &mut self.running {
            let elapsed = running.elapsed(now);
            self.presentation = running.animation.sample(elapsed);
            if elapsed >= running.animation.end() {
                self.presentation = self.model;
                self.running = None;
            }
        }
        self.presentation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn basic_animation_fills_backwards_before_its_offset() {
        let animation = BasicAnimation::new(0.6_f32, 0.4, ms(480)).with_begin_offset(ms(320));
        assert_eq!(animation.sample(Duration::ZERO), 0.6);
        assert_eq!(animation.sample(ms(320)), 0.6);
        assert!((animation.sample(ms(560)) - 0.5).abs() < 1e-4);
        assert_eq!(animation.sample(ms(800)), 0.4);
        assert_eq!(animation.sample(ms(2000)), 0.4);
    }

    #[test]
    fn group_snaps_children_at_its_duration() {
        let group = AnimationGroup::new(ms(800))
            .with("short", BasicAnimation::new(0.0, 1.0, ms(400)))
            .with("long", BasicAnimation::new(0.0, 1.0, ms(1600)));

        let halfway: Vec<_> = group.sample(ms(400)).collect();
        assert_eq!(halfway[0], ("short", 1.0));
        assert!((halfway[1].1 - 0.25).abs() < 1e-4);

        let done: Vec<_> = group.sample(ms(800)).collect();
        assert_eq!(done, vec![("short", 1.0), ("long", 1.0)]);
    }

    #[test]
    fn attached_animation_starts_on_first_sample() {
        let mut value = AnimatedValue::new(0.0_f32);
        value.animate(BasicAnimation::new(0.0, 1.0, ms(800)));
        assert_eq!(value.model(), 1.0);
        assert_eq!(value.presentation(), 0.0);

        assert_eq!(value.update(ms(1000)), 0.0);
        assert!((value.update(ms(1400)) - 0.5).abs() < 1e-4);
        assert_eq!(value.update(ms(1800)), 1.0);
        assert!(!value.is_animating());
    }

    #[test]
    fn set_cancels_the_running_animation() {
        let mut value = AnimatedValue::new(0.0_f32);
        value.animate(BasicAnimation::new(0.0, 1.0, ms(800)));
        value.update(ms(0));
        value.set(0.25);
        assert_eq!(value.update(ms(400)), 0.25);
        assert!(!value.is_animating());
    }

    #[test]
    fn rects_interpolate_origin_and_size() {
        let from = Rect::new(Point::new(30.0, 10.0), Size::new(100.0, 100.0));
        let to = Rect::new(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
        let mid = from.interpolate(&to, 0.5);
        assert_eq!(mid.origin, Point::new(15.0, 5.0));
        assert_eq!(mid.size, Size::new(100.0, 100.0));
    }
}
