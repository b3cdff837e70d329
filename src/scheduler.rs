//! Main-context task scheduling.
//!
//! Everything that touches interaction state runs on one execution context, the UI thread that
//! owns the [`Scheduler`]. Work can be *posted* from anywhere through a [`SchedulerHandle`], but it
//! only ever runs inside [`Scheduler::advance_to`], which the host calls once per frame:
//!
//! - [`SchedulerHandle::post`] runs a task on the next frame, never synchronously;
//! - [`SchedulerHandle::post_after`] runs a task once the given delay has elapsed, measured from
//!   the frame that first sees the task.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Next(Task),
    After(Duration, Task),
}

struct Timer {
    due: Duration,
    sequence: u64,
    task: Task,
}

/// Cheap, cloneable, thread-safe way to queue work for the main context.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: Sender<Message>,
}

impl SchedulerHandle {
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.send(Message::Next(Box::new(task)));
    }

    pub fn post_after(&self, delay: Duration, task: impl FnOnce() + Send + 'static) {
        self.send(Message::After(delay, Box::new(task)));
    }

    fn send(&self, message: Message) {
        // The scheduler is gone when the host is shutting down; dropping the task is all there is
        // left to do.
        if self.sender.send(message).is_err() {
            tracing::debug!("scheduler dropped, discarding task");
        }
    }
}

/// The main-context run loop for deferred and timed tasks.
pub struct Scheduler {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    timers: Vec<Timer>,
    now: Duration,
    sequence: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            timers: Vec::new(),
            now: Duration::ZERO,
            sequence: 0,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            sender: self.sender.clone(),
        }
    }

    /// Time of the last [`advance_to`](Self::advance_to) call.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Moves the clock to `now` and runs every task that is due, in posting order for tasks due
    /// at the same time. Tasks posted by running tasks wait for the next call.
    ///
    /// Returns the number of tasks run.
    pub fn advance_to(&mut self, now: Duration) -> usize {
        if now < self.now {
            tracing::warn!(?now, previous = ?self.now, "scheduler clock moved backwards, ignoring");
        } else {
            self.now = now;
        }

        let mut ready: Vec<(Duration, u64, Task)> = Vec::new();
        for message in self.receiver.try_iter() {
            self.sequence += 1;
            match message {
                Message::Next(task) => ready.push((self.now, self.sequence, task)),
                Message::After(delay, task) => self.timers.push(Timer {
                    due: self.now + delay,
                    sequence: self.sequence,
                    task,
                }),
            }
        }

        let mut index = 0;
        while index < self.timers.len() {
            if self.timers[index].due <= self.now {
                let timer = self.timers.swap_remove(index);
                ready.push((timer.due, timer.sequence, timer.task));
            } else {
                index += 1;
            }
        }

        ready.sort_by_key(|(due, sequence, _)| (*due, *sequence));
        let count = ready.len();
        for (_, _, task) in ready {
            task();
        }
        if count > 0 {
            tracing::trace!(count, now = ?self.now, "ran scheduled tasks");
        }
        count
    }
}
