//! Worker-thread lifecycle primitives shared by both managers.

use std::{
    thread::{self, JoinHandle, ThreadId},
    time::{Duration, Instant},
};

/// Default duration of one worker cycle.
pub(crate) const CYCLE_INTERVAL: Duration = Duration::from_millis(20);

/// Default bound on native events drained per cycle, so an event storm
/// cannot starve task polling.
pub(crate) const MAX_EVENTS_PER_CYCLE: usize = 64;

/// Tuning for a manager's worker loop.
#[derive(Copy, Clone, Debug)]
pub struct WorkerConfig {
    /// Fixed duration of one worker cycle; the worker sleeps whatever
    /// remains of it after task and event processing.
    pub cycle: Duration,
    /// Maximum native events drained per cycle.
    pub max_events_per_cycle: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cycle: CYCLE_INTERVAL,
            max_events_per_cycle: MAX_EVENTS_PER_CYCLE,
        }
    }
}

/// Manager lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum RunState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Lifecycle state plus ownership of the worker thread.
///
/// Guarded by one mutex per manager; `start` and `end` hold it for
/// their full duration, so the transient `Starting`/`Stopping` states
/// are never observed by a mutating call.
pub(crate) struct Control {
    pub(crate) state: RunState,
    pub(crate) worker: Option<JoinHandle<()>>,
    pub(crate) worker_thread: Option<ThreadId>,
}

impl Control {
    pub(crate) fn new() -> Self {
        Self {
            state: RunState::Stopped,
            worker: None,
            worker_thread: None,
        }
    }

    /// True when the caller is the manager's own worker thread.
    pub(crate) fn on_worker_thread(&self) -> bool {
        self.worker_thread == Some(thread::current().id())
    }
}

/// Paces loop cycles to a fixed interval.
pub(crate) struct Pacer {
    interval: Duration,
    cycle_start: Instant,
}

impl Pacer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            cycle_start: Instant::now(),
        }
    }

    pub(crate) fn begin_cycle(&mut self) {
        self.cycle_start = Instant::now();
    }

    /// Sleep whatever remains of the current cycle.
    pub(crate) fn sleep_remaining(&self) {
        let elapsed = self.cycle_start.elapsed();
        if elapsed < self.interval {
            thread::sleep(self.interval - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacer_enforces_cycle_floor() {
        let interval = Duration::from_millis(10);
        let mut pacer = Pacer::new(interval);
        pacer.begin_cycle();
        let start = Instant::now();
        pacer.sleep_remaining();
        assert!(start.elapsed() >= interval - Duration::from_millis(1));
    }

    #[test]
    fn pacer_skips_sleep_after_long_cycle() {
        let mut pacer = Pacer::new(Duration::from_millis(5));
        pacer.begin_cycle();
        thread::sleep(Duration::from_millis(10));
        let start = Instant::now();
        pacer.sleep_remaining();
        // The cycle already overran; no further sleep.
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
