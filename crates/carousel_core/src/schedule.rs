use std::time::{Duration, SystemTime};

pub const DEFAULT_REBUILD_INTERVAL_MINUTES: u64 = 60;

const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when the image set is stale enough to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSchedule {
    interval: Duration,
}

impl RebuildSchedule {
    /// Interval in minutes; never shorter than one minute.
    pub fn every_minutes(minutes: u64) -> Self {
        let interval = Duration::from_secs(minutes.saturating_mul(60)).max(MIN_INTERVAL);
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A rebuild is due if none ran yet, or the interval has elapsed.
    /// A `last_run` in the future (clock moved backwards) is treated as due.
    pub fn is_due(&self, last_run: Option<SystemTime>, now: SystemTime) -> bool {
        match last_run {
            None => true,
            Some(last) => match now.duration_since(last) {
                Ok(elapsed) => elapsed >= self.interval,
                Err(_) => true,
            },
        }
    }

    /// Time left until the next rebuild is due.
    pub fn remaining(&self, last_run: Option<SystemTime>, now: SystemTime) -> Duration {
        match last_run.and_then(|last| now.duration_since(last).ok()) {
            Some(elapsed) => self.interval.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }
}

impl Default for RebuildSchedule {
    fn default() -> Self {
        Self::every_minutes(DEFAULT_REBUILD_INTERVAL_MINUTES)
    }
}
