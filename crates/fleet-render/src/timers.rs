//! Interval timer contract used for popup refresh

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Handle for a running interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Starts and stops repeating timers
///
/// Implementations deliver a tick for the returned [`TimerId`] every
/// `period` until `clear_interval` is called for it.
#[cfg_attr(test, mockall::automock)]
pub trait Timers {
    fn set_interval(&mut self, period: Duration) -> TimerId;
    fn clear_interval(&mut self, id: TimerId);
}

/// Timer registry that never fires on its own; ticks are driven by the
/// caller. Tracks live intervals so leaks are observable.
#[derive(Debug, Default)]
pub struct ManualTimers {
    next_id: u64,
    active: HashMap<TimerId, Duration>,
    started: u64,
    cleared: u64,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_ids(&self) -> Vec<TimerId> {
        let mut ids: Vec<TimerId> = self.active.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn cleared(&self) -> u64 {
        self.cleared
    }
}

impl Timers for ManualTimers {
    fn set_interval(&mut self, period: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.active.insert(id, period);
        self.started += 1;
        id
    }

    fn clear_interval(&mut self, id: TimerId) {
        if self.active.remove(&id).is_some() {
            self.cleared += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_timers_track_active() {
        let mut timers = ManualTimers::new();

        let a = timers.set_interval(Duration::from_secs(1));
        let b = timers.set_interval(Duration::from_secs(1));
        assert_ne!(a, b);
        assert_eq!(timers.active_count(), 2);

        timers.clear_interval(a);
        timers.clear_interval(a);
        assert_eq!(timers.active_count(), 1);
        assert_eq!(timers.cleared(), 1);
        assert!(timers.is_active(b));
    }
}
