//! Monotonic clock and delayed-task queue.
//!
//! Everything runs on one thread. Suspension is expressed only as a task
//! scheduled for a later deadline; owners drain due tasks with
//! [`Scheduler::pop_due`] one at a time, so handling one task may cancel
//! another before it fires.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of monotonic time, measured from an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

pub type SharedClock = Rc<dyn Clock>;

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Scheduled<T> {
    deadline: Duration,
    token: TimerToken,
    task: T,
}

/// Tasks ordered by deadline, ties broken by scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_token: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration, task: T) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        let deadline = now + delay;
        // keep the queue sorted; tokens grow so equal deadlines stay FIFO
        let idx = self
            .pending
            .partition_point(|entry| entry.deadline <= deadline);
        self.pending.insert(
            idx,
            Scheduled {
                deadline,
                token,
                task,
            },
        );
        token
    }

    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|entry| entry.token != token);
        self.pending.len() != before
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|entry| entry.token == token)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.first().map(|entry| entry.deadline)
    }

    /// Removes and returns the earliest task whose deadline has passed.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerToken, T)> {
        if self.pending.first()?.deadline > now {
            return None;
        }
        let entry = self.pending.remove(0);
        Some((entry.token, entry.task))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// A restartable single-shot timer with a fixed interval, backed by a
/// [`Scheduler`] owned elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct SingleShot {
    interval: Duration,
    token: Option<TimerToken>,
}

impl SingleShot {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            token: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    /// (Re)starts the timer; a pending shot is cancelled first.
    pub fn start<T>(&mut self, scheduler: &mut Scheduler<T>, now: Duration, task: T) {
        self.stop(scheduler);
        self.token = Some(scheduler.schedule(now, self.interval, task));
    }

    pub fn stop<T>(&mut self, scheduler: &mut Scheduler<T>) {
        if let Some(token) = self.token.take() {
            scheduler.cancel(token);
        }
    }

    /// Marks the timer idle if `token` is its pending shot. Returns false
    /// for a token the timer no longer owns.
    pub fn take_fired(&mut self, token: TimerToken) -> bool {
        if self.token == Some(token) {
            self.token = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn tasks_fire_in_deadline_order() {
        let mut sched = Scheduler::new();
        sched.schedule(ms(0), ms(300), "late");
        sched.schedule(ms(0), ms(100), "early");
        sched.schedule(ms(0), ms(100), "early-second");
        assert_eq!(sched.next_deadline(), Some(ms(100)));
        assert!(sched.pop_due(ms(50)).is_none());
        assert_eq!(sched.pop_due(ms(400)).map(|(_, t)| t), Some("early"));
        assert_eq!(sched.pop_due(ms(400)).map(|(_, t)| t), Some("early-second"));
        assert_eq!(sched.pop_due(ms(400)).map(|(_, t)| t), Some("late"));
        assert!(sched.is_empty());
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut sched = Scheduler::new();
        let token = sched.schedule(ms(0), ms(10), 1);
        assert!(sched.is_pending(token));
        assert!(sched.cancel(token));
        assert!(!sched.cancel(token));
        assert!(sched.pop_due(ms(100)).is_none());
    }

    #[test]
    fn single_shot_restart_supersedes_previous_shot() {
        let mut sched = Scheduler::new();
        let mut timer = SingleShot::new(ms(700));
        timer.start(&mut sched, ms(0), 'h');
        timer.start(&mut sched, ms(500), 'h');
        assert_eq!(sched.len(), 1);
        assert!(sched.pop_due(ms(700)).is_none());
        let (token, _) = sched.pop_due(ms(1200)).expect("restarted shot");
        assert!(timer.take_fired(token));
        assert!(!timer.is_active());
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        clock.advance_ms(250);
        clock.advance(ms(5));
        assert_eq!(clock.now(), ms(255));
    }
}
