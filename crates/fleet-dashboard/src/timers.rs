//! Interval timers backed by tokio tasks

use fleet_render::{TimerId, Timers};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Shortest period accepted; `tokio::time::interval` rejects zero
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Each interval is a spawned task posting its id back to the session;
/// clearing aborts the task
pub struct TokioTimers {
    ticks: mpsc::UnboundedSender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    next_id: u64,
}

impl TokioTimers {
    pub fn new(ticks: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            ticks,
            tasks: HashMap::new(),
            next_id: 0,
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Timers for TokioTimers {
    fn set_interval(&mut self, period: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let ticks = self.ticks.clone();
        let period = period.max(MIN_PERIOD);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(id).is_err() {
                    break;
                }
            }
        });

        self.tasks.insert(id, handle);
        debug!("Started {} every {:?}", id, period);
        id
    }

    fn clear_interval(&mut self, id: TimerId) {
        if let Some(handle) = self.tasks.remove(&id) {
            handle.abort();
            debug!("Cleared {}", id);
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_cleared() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TokioTimers::new(tx);

        let id = timers.set_interval(Duration::from_secs(1));
        assert_eq!(rx.recv().await, Some(id));
        assert_eq!(rx.recv().await, Some(id));

        timers.clear_interval(id);
        assert_eq!(timers.active_count(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_still_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TokioTimers::new(tx);

        let id = timers.set_interval(Duration::ZERO);
        assert_eq!(rx.recv().await, Some(id));
        assert_eq!(rx.recv().await, Some(id));
        assert!(!timers.tasks[&id].is_finished());

        timers.clear_interval(id);
        assert_eq!(timers.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_intervals() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TokioTimers::new(tx);

        let a = timers.set_interval(Duration::from_secs(1));
        let b = timers.set_interval(Duration::from_millis(1500));
        assert_ne!(a, b);
        assert_eq!(timers.active_count(), 2);

        assert_eq!(rx.recv().await, Some(a));
        assert_eq!(rx.recv().await, Some(b));

        drop(timers);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
