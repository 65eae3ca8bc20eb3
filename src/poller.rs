//! Stability poller: the periodic quiescence check.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::table::TrackingTable;

pub struct Poller {
    interval: Interval,
    stable_for: Duration,
}

impl Poller {
    /// The first tick fires one full `poll_interval` after `start`. Ticks missed
    /// while the coordinator is busy are skipped rather than replayed.
    pub fn new(start: Instant, poll_interval: Duration, stable_for: Duration) -> Self {
        let mut interval = time::interval_at(start + poll_interval, poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, stable_for }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await;
        Instant::now()
    }

    /// One sweep. A file touched at T is returned by the first sweep at or
    /// after T + `stable_for`, so detection can lag by up to one poll interval.
    /// Order among files stable in the same sweep is unspecified.
    pub fn sweep(&self, table: &mut TrackingTable, now: Instant) -> Vec<PathBuf> {
        table.sweep(now, self.stable_for)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_period() {
        let start = Instant::now();
        let mut poller = Poller::new(start, Duration::from_secs(1), Duration::from_secs(3));

        let first = poller.tick().await;
        assert_eq!(first - start, Duration::from_secs(1));

        let second = poller.tick().await;
        assert_eq!(second - start, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_uses_stable_duration() {
        let start = Instant::now();
        let mut poller = Poller::new(start, Duration::from_secs(1), Duration::from_secs(3));
        let mut table = TrackingTable::new();
        table.touch(PathBuf::from("/drop/a.txt"), start);

        for _ in 0..2 {
            let now = poller.tick().await;
            assert!(poller.sweep(&mut table, now).is_empty());
        }

        let now = poller.tick().await;
        assert_eq!(poller.sweep(&mut table, now), vec![PathBuf::from("/drop/a.txt")]);
    }
}
